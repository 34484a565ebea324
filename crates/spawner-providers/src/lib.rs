//! Provider adapters.
//!
//! Each adapter translates neutral requests into calls against one cloud's
//! native API ([`api::AwsApi`], [`api::AzureApi`], [`api::GcpApi`]), waits on
//! the long-running ones and maps native shapes and failures back into the
//! neutral model.
//!
//! The [`sandbox`] module provides an in-memory implementation of all three
//! native APIs. It backs local runs and the integration tests.
pub mod api;
pub mod aws;
pub mod azure;
mod common;
pub mod fault;
pub mod gcp;
pub mod sandbox;

use std::sync::Arc;

use spawner_core::{
    PollConfig, ProviderRegistry, ServiceContext, SessionFactory, rancher::RancherApi,
    secrets::SecretStore,
};

pub use aws::AwsProvider;
pub use azure::AzureProvider;
pub use fault::{ApiFault, ApiResult};
pub use gcp::GcpProvider;

/// Shared collaborators of every adapter.
#[derive(Clone)]
pub struct AdapterDeps {
    pub service: ServiceContext,
    pub sessions: Arc<dyn SessionFactory>,
    pub secrets: Arc<dyn SecretStore>,
    pub rancher: Arc<dyn RancherApi>,
    pub poll: PollConfig,
    /// Region holding credentials and cluster tokens.
    pub secret_host_region: String,
}

/// Registry with the three adapters over the given native APIs.
pub fn registry(
    deps: AdapterDeps,
    aws: Arc<dyn api::AwsApi>,
    azure: Arc<dyn api::AzureApi>,
    gcp: Arc<dyn api::GcpApi>,
    aws_settings: aws::AwsSettings,
) -> ProviderRegistry {
    ProviderRegistry::new()
        .with(Arc::new(AwsProvider::new(aws, deps.clone(), aws_settings)))
        .with(Arc::new(AzureProvider::new(azure, deps.clone())))
        .with(Arc::new(GcpProvider::new(gcp, deps)))
}
