use async_trait::async_trait;
use spawner_core::Session;
use spawner_model::{Labels, Secret};

use super::OperationApi;
use crate::fault::ApiResult;

pub const GKE_RUNNING: &str = "RUNNING";
pub const IMAGE_COS_CONTAINERD: &str = "COS_CONTAINERD";
pub const DISK_PD_STANDARD: &str = "pd-standard";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GkeAccelerator {
    pub accelerator_type: String,
    pub count: u32,
    /// MIG partition size such as `3g.20gb`.
    pub partition_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GkeNodePool {
    pub name: String,
    pub machine_type: String,
    pub node_count: u32,
    /// Zero keeps the GKE default.
    pub disk_size_gb: u32,
    pub disk_type: String,
    pub image_type: String,
    pub spot: bool,
    pub accelerator: Option<GkeAccelerator>,
    pub labels: Labels,
    pub min_count: u32,
    pub max_count: u32,
    pub auto_repair: bool,
    pub auto_upgrade: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GkeClusterInput {
    pub name: String,
    pub location: String,
    pub resource_labels: Labels,
    pub node_pool: GkeNodePool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GkeCluster {
    pub id: String,
    pub name: String,
    pub location: String,
    /// `PROVISIONING`, `RUNNING`, `RECONCILING`, `STOPPING`, `ERROR`.
    pub status: String,
    pub endpoint: String,
    pub ca_data: String,
    pub resource_labels: Labels,
    pub node_pools: Vec<GkeNodePool>,
}

/// GKE and Compute Engine calls; mutations return operation names.
#[async_trait]
pub trait GcpApi: OperationApi {
    async fn create_cluster(&self, s: &Session, input: GkeClusterInput) -> ApiResult<String>;
    async fn get_cluster(&self, s: &Session, name: &str) -> ApiResult<GkeCluster>;
    async fn list_clusters(&self, s: &Session) -> ApiResult<Vec<GkeCluster>>;
    async fn delete_cluster(&self, s: &Session, name: &str) -> ApiResult<String>;

    async fn create_node_pool(
        &self,
        s: &Session,
        cluster: &str,
        pool: GkeNodePool,
    ) -> ApiResult<String>;
    async fn list_node_pools(&self, s: &Session, cluster: &str) -> ApiResult<Vec<String>>;
    async fn delete_node_pool(&self, s: &Session, cluster: &str, pool: &str) -> ApiResult<String>;

    /// Instance names of the pool's managed instance group.
    async fn list_pool_instances(
        &self,
        s: &Session,
        cluster: &str,
        pool: &str,
    ) -> ApiResult<Vec<String>>;
    async fn set_instance_labels(&self, s: &Session, ids: &[String], labels: &Labels)
    -> ApiResult<()>;

    /// OAuth access token of the session's service account.
    async fn access_token(&self, s: &Session) -> ApiResult<Secret>;
}
