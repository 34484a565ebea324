//! Rancher management-server seam used by cluster registration.
use async_trait::async_trait;
use spawner_model::{Labels, Secret};

use crate::{context::RequestContext, error::CoreResult};

/// Cluster access handed to Rancher on import.
#[derive(Debug, Clone)]
pub struct RancherCluster {
    pub name: String,
    pub endpoint: String,
    pub ca_data: String,
    pub token: Secret,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RancherRegistration {
    pub cluster_id: String,
    /// Agent manifest the cluster applies to finish the import.
    pub manifest_url: String,
}

#[async_trait]
pub trait RancherApi: Send + Sync + 'static {
    async fn register_cluster(
        &self,
        ctx: &RequestContext,
        cluster: RancherCluster,
    ) -> CoreResult<RancherRegistration>;
}
