mod labels;
pub use labels::Labels;

mod identity;
pub use identity::ProviderIdentity;

mod secret;
pub use secret::Secret;

pub mod constants;
