use async_trait::async_trait;
use spawner_core::Session;
use spawner_model::Labels;

use super::{Accepted, CostInput, CostPeriod, KubeAccess, OperationApi};
use crate::fault::ApiResult;

pub const POWER_RUNNING: &str = "Running";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AksAgentPool {
    pub name: String,
    pub vm_size: String,
    pub count: u32,
    pub enable_auto_scaling: bool,
    pub min_count: u32,
    pub max_count: u32,
    /// Zero keeps the AKS default.
    pub os_disk_size_gb: u32,
    /// `Spot` priority instead of `Regular`.
    pub spot: bool,
    pub node_labels: Labels,
    pub tags: Labels,
    /// MIG profile such as `MIG3g`.
    pub gpu_instance_profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AksClusterInput {
    pub name: String,
    pub location: String,
    pub tags: Labels,
    pub agent_pool: AksAgentPool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AksCluster {
    pub id: String,
    pub name: String,
    pub location: String,
    /// `Creating`, `Succeeded`, `Deleting`, `Failed`.
    pub provisioning_state: String,
    /// `Running` or `Stopped`.
    pub power_state: String,
    pub fqdn: String,
    pub tags: Labels,
    pub agent_pools: Vec<AksAgentPool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AzureDiskInput {
    pub name: String,
    pub location: String,
    pub zone: String,
    /// `Standard_LRS`, `Premium_LRS`, ...
    pub sku: String,
    pub size_gb: u32,
    pub source_snapshot_uri: Option<String>,
    pub tags: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AzureDisk {
    pub id: String,
    pub name: String,
    pub location: String,
    pub zone: String,
    pub sku: String,
    pub size_gb: u32,
    /// `Unattached`, `Attached`, `Creating`.
    pub disk_state: String,
    pub source_snapshot_uri: Option<String>,
    pub tags: Labels,
}

/// AKS, managed disk and Cost Management calls.
///
/// Mutating calls return an operation handle polled through [`OperationApi`].
#[async_trait]
pub trait AzureApi: OperationApi {
    async fn begin_create_cluster(&self, s: &Session, input: AksClusterInput) -> ApiResult<String>;
    async fn get_cluster(&self, s: &Session, name: &str) -> ApiResult<AksCluster>;
    async fn list_clusters(&self, s: &Session) -> ApiResult<Vec<AksCluster>>;
    /// The operation of a missing cluster finishes with HTTP 204.
    async fn begin_delete_cluster(&self, s: &Session, name: &str) -> ApiResult<String>;

    async fn begin_create_agent_pool(
        &self,
        s: &Session,
        cluster: &str,
        pool: AksAgentPool,
    ) -> ApiResult<String>;
    async fn list_agent_pools(&self, s: &Session, cluster: &str) -> ApiResult<Vec<String>>;
    /// The operation of a missing pool finishes with HTTP 204.
    async fn begin_delete_agent_pool(
        &self,
        s: &Session,
        cluster: &str,
        pool: &str,
    ) -> ApiResult<String>;

    /// VM scale set instance ids behind an agent pool.
    async fn list_pool_instances(
        &self,
        s: &Session,
        cluster: &str,
        pool: &str,
    ) -> ApiResult<Vec<String>>;
    async fn update_instance_tags(&self, s: &Session, ids: &[String], tags: &Labels)
    -> ApiResult<()>;

    async fn cluster_user_credentials(&self, s: &Session, cluster: &str) -> ApiResult<KubeAccess>;

    async fn begin_create_disk(&self, s: &Session, input: AzureDiskInput) -> ApiResult<Accepted>;
    async fn get_disk(&self, s: &Session, id: &str) -> ApiResult<AzureDisk>;
    async fn begin_delete_disk(&self, s: &Session, id: &str) -> ApiResult<String>;
    async fn begin_create_snapshot(
        &self,
        s: &Session,
        disk_id: &str,
        tags: &Labels,
    ) -> ApiResult<Accepted>;
    async fn begin_delete_snapshot(&self, s: &Session, id: &str) -> ApiResult<String>;
    /// Copy into the session region.
    async fn begin_copy_snapshot(
        &self,
        s: &Session,
        source_region: &str,
        id: &str,
        tags: &Labels,
    ) -> ApiResult<Accepted>;

    async fn query_cost(&self, s: &Session, input: CostInput) -> ApiResult<Vec<CostPeriod>>;
}
