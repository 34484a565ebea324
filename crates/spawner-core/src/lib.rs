pub mod catalog;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod middleware;
pub mod provider;
pub mod rancher;
pub mod registry;
pub mod secrets;
pub mod session;
pub mod sweep;
pub mod wait;

pub use context::{RequestContext, ServiceContext};
pub use dispatch::{Dispatcher, Handler};
pub use error::{CoreError, CoreResult, ErrorKind, ResultExt};
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, OperationOutcome, noop_metrics};
pub use middleware::{Facade, InstrumentLayer, LoggingLayer, facade};
pub use provider::{Provider, call_provider};
pub use registry::ProviderRegistry;
pub use session::{CredentialResolver, CredentialSessionFactory, Session, SessionFactory};
pub use wait::{LongRunningOperation, OperationStatus, PollConfig, wait_for_completion};

pub mod prelude {
    pub use crate::context::{RequestContext, ServiceContext};
    pub use crate::dispatch::Handler;
    pub use crate::error::{CoreError, CoreResult, ResultExt};
    pub use crate::provider::Provider;
    pub use crate::session::{Session, SessionFactory};
}
