use std::time::Duration;

use async_trait::async_trait;
use spawner_core::Session;
use spawner_model::{DnsRecordSet, Labels, Secret};

use super::{CostInput, CostPeriod};
use crate::fault::ApiResult;

pub const EKS_ACTIVE: &str = "ACTIVE";
pub const EKS_FAILED: &str = "FAILED";
pub const EKS_CREATE_FAILED: &str = "CREATE_FAILED";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EksClusterInput {
    pub name: String,
    pub tags: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EksCluster {
    pub name: String,
    pub arn: String,
    /// `CREATING`, `ACTIVE`, `DELETING`, `FAILED`, `UPDATING`.
    pub status: String,
    pub endpoint: String,
    pub ca_data: String,
    pub tags: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EksNodegroupInput {
    pub name: String,
    pub instance_types: Vec<String>,
    /// `ON_DEMAND` or `SPOT`.
    pub capacity_type: String,
    /// `AL2_x86_64` or `AL2_x86_64_GPU`.
    pub ami_type: String,
    /// Zero keeps the EKS default.
    pub disk_size_gb: u32,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_size: u32,
    pub labels: Labels,
    pub tags: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EksNodegroup {
    pub name: String,
    pub status: String,
    pub instance_types: Vec<String>,
    pub capacity_type: String,
    pub desired_size: u32,
    pub disk_size_gb: u32,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ec2VolumeInput {
    pub availability_zone: String,
    pub volume_type: String,
    pub size_gb: u32,
    pub snapshot_id: Option<String>,
    pub tags: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ec2Volume {
    pub id: String,
    /// `creating`, `available`, `in-use`, `deleting`.
    pub state: String,
    pub size_gb: u32,
    pub volume_type: String,
    pub availability_zone: String,
    pub snapshot_id: Option<String>,
    pub tags: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ec2Snapshot {
    pub id: String,
    pub volume_id: Option<String>,
    /// `pending`, `completed`, `error`.
    pub state: String,
    pub size_gb: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Upsert,
    Delete,
}

/// One Route53 change.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    pub action: ChangeAction,
    pub record: DnsRecordSet,
    /// Alias target DNS name; replaces `record.values` when set.
    pub alias_target: Option<String>,
    /// Latency routing: set identifier and region.
    pub latency_region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcrAuth {
    /// Base64 `AWS:<password>`.
    pub token: Secret,
    pub endpoint: String,
    /// RFC 3339.
    pub expires_at: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcrRepository {
    pub registry_id: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OidcProviderInput {
    pub config_name: String,
    pub issuer_url: String,
    pub client_id: String,
}

/// EKS, EC2, Route53, ECR, Cost Explorer and S3 calls.
#[async_trait]
pub trait AwsApi: Send + Sync + 'static {
    async fn create_cluster(&self, s: &Session, input: EksClusterInput) -> ApiResult<EksCluster>;
    async fn describe_cluster(&self, s: &Session, name: &str) -> ApiResult<EksCluster>;
    async fn list_clusters(&self, s: &Session) -> ApiResult<Vec<String>>;
    async fn delete_cluster(&self, s: &Session, name: &str) -> ApiResult<()>;

    async fn create_nodegroup(
        &self,
        s: &Session,
        cluster: &str,
        input: EksNodegroupInput,
    ) -> ApiResult<()>;
    async fn describe_nodegroup(
        &self,
        s: &Session,
        cluster: &str,
        nodegroup: &str,
    ) -> ApiResult<EksNodegroup>;
    async fn list_nodegroups(&self, s: &Session, cluster: &str) -> ApiResult<Vec<String>>;
    async fn delete_nodegroup(&self, s: &Session, cluster: &str, nodegroup: &str) -> ApiResult<()>;

    /// Running instance ids matching every `(tag key, value)` filter.
    async fn describe_instances(
        &self,
        s: &Session,
        tag_filters: &[(String, String)],
    ) -> ApiResult<Vec<String>>;
    async fn create_tags(&self, s: &Session, resources: &[String], tags: &Labels) -> ApiResult<()>;

    /// Bearer token for the cluster's Kubernetes API.
    async fn cluster_token(&self, s: &Session, cluster: &str) -> ApiResult<Secret>;
    async fn associate_identity_provider(
        &self,
        s: &Session,
        cluster: &str,
        input: OidcProviderInput,
    ) -> ApiResult<()>;

    async fn create_volume(&self, s: &Session, input: Ec2VolumeInput) -> ApiResult<Ec2Volume>;
    async fn describe_volume(&self, s: &Session, id: &str) -> ApiResult<Ec2Volume>;
    async fn delete_volume(&self, s: &Session, id: &str) -> ApiResult<()>;
    async fn create_snapshot(
        &self,
        s: &Session,
        volume_id: &str,
        tags: &Labels,
    ) -> ApiResult<Ec2Snapshot>;
    async fn describe_snapshot(&self, s: &Session, id: &str) -> ApiResult<Ec2Snapshot>;
    async fn delete_snapshot(&self, s: &Session, id: &str) -> ApiResult<()>;
    /// Copy into the session region; returns the new snapshot id.
    async fn copy_snapshot(
        &self,
        s: &Session,
        source_region: &str,
        snapshot_id: &str,
        tags: &Labels,
    ) -> ApiResult<String>;

    /// Apply changes atomically; returns the change id.
    async fn change_record_sets(
        &self,
        s: &Session,
        zone_id: &str,
        changes: Vec<RecordChange>,
    ) -> ApiResult<String>;
    async fn list_record_sets(&self, s: &Session, zone_id: &str) -> ApiResult<Vec<DnsRecordSet>>;

    async fn ecr_authorization(&self, s: &Session) -> ApiResult<EcrAuth>;
    async fn create_repository(
        &self,
        s: &Session,
        name: &str,
        image_tag_mutable: bool,
        tags: &Labels,
    ) -> ApiResult<EcrRepository>;

    async fn cost_and_usage(&self, s: &Session, input: CostInput) -> ApiResult<Vec<CostPeriod>>;

    async fn presign_get_object(
        &self,
        s: &Session,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ApiResult<String>;
}
