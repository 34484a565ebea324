use std::collections::HashMap;

use spawner_model::{
    self as model, AwsCredentials, AzureCredentials, CapacityType, ClusterSpec, ClusterStatus,
    CostBreakdown, CostQuery, CredentialType, Credentials, DnsRecordSet, GcpCredentials, GitPat,
    Granularity, GroupBy, Labels, MigProfile, NodeSpec, ProviderIdentity, Secret, VolumeSpec,
};

use crate::error::ApiError;
use crate::proto;

fn identity(provider: String, region: String, account: String) -> ProviderIdentity {
    ProviderIdentity {
        provider,
        region,
        account,
    }
}

/// Empty strings are how proto3 spells "not set".
fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

fn require(field: &str, value: String) -> Result<String, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidRequest(format!("{field} cannot be empty")));
    }
    Ok(value)
}

fn labels(map: HashMap<String, String>) -> Labels {
    Labels::from(map)
}

// ============================================================================
// Node and cluster conversions
// ============================================================================

impl TryFrom<proto::NodeSpec> for NodeSpec {
    type Error = ApiError;

    fn try_from(node: proto::NodeSpec) -> Result<Self, Self::Error> {
        let capacity = match proto::CapacityType::try_from(node.capacity_type) {
            Ok(proto::CapacityType::OnDemand) => CapacityType::OnDemand,
            Ok(proto::CapacityType::Spot) => CapacityType::Spot,
            Err(_) => {
                return Err(ApiError::InvalidRequest(format!(
                    "invalid capacity type: {}",
                    node.capacity_type
                )));
            }
        };
        let mig_profile = non_empty(node.mig_profile)
            .map(|p| p.parse::<MigProfile>())
            .transpose()?;

        Ok(NodeSpec {
            name: require("node name", node.name)?,
            instance: non_empty(node.instance),
            machine_type: non_empty(node.machine_type),
            count: node.count,
            disk_size_gb: node.disk_size_gb,
            capacity,
            spot_instances: node.spot_instances,
            gpu_enabled: node.gpu_enabled,
            mig_profile,
            labels: labels(node.labels),
        })
    }
}

impl From<NodeSpec> for proto::NodeSpec {
    fn from(node: NodeSpec) -> Self {
        let capacity_type = match node.capacity {
            CapacityType::OnDemand => proto::CapacityType::OnDemand,
            CapacityType::Spot => proto::CapacityType::Spot,
        };
        proto::NodeSpec {
            name: node.name,
            instance: node.instance.unwrap_or_default(),
            machine_type: node.machine_type.unwrap_or_default(),
            count: node.count,
            disk_size_gb: node.disk_size_gb,
            capacity_type: capacity_type as i32,
            spot_instances: node.spot_instances,
            gpu_enabled: node.gpu_enabled,
            mig_profile: node
                .mig_profile
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            labels: node.labels.into_hash_map(),
        }
    }
}

impl From<ClusterSpec> for proto::ClusterSpec {
    fn from(cluster: ClusterSpec) -> Self {
        proto::ClusterSpec {
            cluster_id: cluster.cluster_id,
            name: cluster.name,
            provider: cluster.provider,
            region: cluster.region,
            nodes: cluster.nodes.into_iter().map(proto::NodeSpec::from).collect(),
            labels: cluster.labels.into_hash_map(),
        }
    }
}

impl From<ClusterStatus> for proto::ClusterStatus {
    fn from(status: ClusterStatus) -> Self {
        match status {
            ClusterStatus::Active => proto::ClusterStatus::Active,
            ClusterStatus::Inactive => proto::ClusterStatus::Inactive,
        }
    }
}

// ============================================================================
// Service requests (Proto → Domain)
// ============================================================================

impl TryFrom<proto::HealthCheckRequest> for model::HealthCheckRequest {
    type Error = ApiError;

    fn try_from(_: proto::HealthCheckRequest) -> Result<Self, Self::Error> {
        Ok(model::HealthCheckRequest {})
    }
}

impl TryFrom<proto::EchoRequest> for model::EchoRequest {
    type Error = ApiError;

    fn try_from(req: proto::EchoRequest) -> Result<Self, Self::Error> {
        Ok(model::EchoRequest { msg: req.msg })
    }
}

impl TryFrom<proto::CreateClusterRequest> for model::CreateClusterRequest {
    type Error = ApiError;

    fn try_from(req: proto::CreateClusterRequest) -> Result<Self, Self::Error> {
        let node = req
            .node
            .ok_or_else(|| ApiError::InvalidRequest("missing node spec".into()))?;

        Ok(model::CreateClusterRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
            node: NodeSpec::try_from(node)?,
            labels: labels(req.labels),
        })
    }
}

impl TryFrom<proto::GetClusterRequest> for model::GetClusterRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetClusterRequest) -> Result<Self, Self::Error> {
        Ok(model::GetClusterRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
        })
    }
}

impl TryFrom<proto::GetClustersRequest> for model::GetClustersRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetClustersRequest) -> Result<Self, Self::Error> {
        Ok(model::GetClustersRequest {
            identity: identity(req.provider, req.region, req.account_name),
        })
    }
}

impl TryFrom<proto::ClusterStatusRequest> for model::ClusterStatusRequest {
    type Error = ApiError;

    fn try_from(req: proto::ClusterStatusRequest) -> Result<Self, Self::Error> {
        Ok(model::ClusterStatusRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
        })
    }
}

impl TryFrom<proto::DeleteClusterRequest> for model::DeleteClusterRequest {
    type Error = ApiError;

    fn try_from(req: proto::DeleteClusterRequest) -> Result<Self, Self::Error> {
        Ok(model::DeleteClusterRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
            force_delete: req.force_delete,
        })
    }
}

impl TryFrom<proto::AddNodeRequest> for model::AddNodeRequest {
    type Error = ApiError;

    fn try_from(req: proto::AddNodeRequest) -> Result<Self, Self::Error> {
        let node = req
            .node
            .ok_or_else(|| ApiError::InvalidRequest("missing node spec".into()))?;

        Ok(model::AddNodeRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
            node: NodeSpec::try_from(node)?,
        })
    }
}

impl TryFrom<proto::DeleteNodeRequest> for model::DeleteNodeRequest {
    type Error = ApiError;

    fn try_from(req: proto::DeleteNodeRequest) -> Result<Self, Self::Error> {
        Ok(model::DeleteNodeRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
            node_group: require("node_group", req.node_group)?,
        })
    }
}

impl TryFrom<proto::TagNodeInstanceRequest> for model::TagNodeInstanceRequest {
    type Error = ApiError;

    fn try_from(req: proto::TagNodeInstanceRequest) -> Result<Self, Self::Error> {
        Ok(model::TagNodeInstanceRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
            node_group: require("node_group", req.node_group)?,
            labels: labels(req.labels),
        })
    }
}

impl TryFrom<proto::CreateVolumeRequest> for model::CreateVolumeRequest {
    type Error = ApiError;

    fn try_from(req: proto::CreateVolumeRequest) -> Result<Self, Self::Error> {
        Ok(model::CreateVolumeRequest {
            identity: identity(req.provider, req.region, req.account_name),
            availability_zone: req.availability_zone,
            volume_type: req.volume_type,
            size_gb: req.size_gb,
            snapshot_id: non_empty(req.snapshot_id),
            snapshot_uri: non_empty(req.snapshot_uri),
            delete_snapshot: req.delete_snapshot,
            labels: labels(req.labels),
        })
    }
}

impl TryFrom<proto::GetVolumeRequest> for model::GetVolumeRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetVolumeRequest) -> Result<Self, Self::Error> {
        Ok(model::GetVolumeRequest {
            identity: identity(req.provider, req.region, req.account_name),
            volume_id: require("volume_id", req.volume_id)?,
        })
    }
}

impl TryFrom<proto::DeleteVolumeRequest> for model::DeleteVolumeRequest {
    type Error = ApiError;

    fn try_from(req: proto::DeleteVolumeRequest) -> Result<Self, Self::Error> {
        Ok(model::DeleteVolumeRequest {
            identity: identity(req.provider, req.region, req.account_name),
            volume_id: require("volume_id", req.volume_id)?,
        })
    }
}

impl TryFrom<proto::CreateSnapshotRequest> for model::CreateSnapshotRequest {
    type Error = ApiError;

    fn try_from(req: proto::CreateSnapshotRequest) -> Result<Self, Self::Error> {
        Ok(model::CreateSnapshotRequest {
            identity: identity(req.provider, req.region, req.account_name),
            volume_id: require("volume_id", req.volume_id)?,
            labels: labels(req.labels),
        })
    }
}

impl TryFrom<proto::DeleteSnapshotRequest> for model::DeleteSnapshotRequest {
    type Error = ApiError;

    fn try_from(req: proto::DeleteSnapshotRequest) -> Result<Self, Self::Error> {
        Ok(model::DeleteSnapshotRequest {
            identity: identity(req.provider, req.region, req.account_name),
            snapshot_id: require("snapshot_id", req.snapshot_id)?,
        })
    }
}

impl TryFrom<proto::CreateSnapshotAndDeleteRequest> for model::CreateSnapshotAndDeleteRequest {
    type Error = ApiError;

    fn try_from(req: proto::CreateSnapshotAndDeleteRequest) -> Result<Self, Self::Error> {
        Ok(model::CreateSnapshotAndDeleteRequest {
            identity: identity(req.provider, req.region, req.account_name),
            volume_id: require("volume_id", req.volume_id)?,
            labels: labels(req.labels),
        })
    }
}

impl TryFrom<proto::CopySnapshotRequest> for model::CopySnapshotRequest {
    type Error = ApiError;

    fn try_from(req: proto::CopySnapshotRequest) -> Result<Self, Self::Error> {
        // Same-region copy when no source region is given.
        let source_region = non_empty(req.source_region).unwrap_or_else(|| req.region.clone());
        Ok(model::CopySnapshotRequest {
            identity: identity(req.provider, req.region, req.account_name),
            snapshot_id: require("snapshot_id", req.snapshot_id)?,
            source_region,
            labels: labels(req.labels),
        })
    }
}

impl TryFrom<proto::AddTokenRequest> for model::AddTokenRequest {
    type Error = ApiError;

    fn try_from(req: proto::AddTokenRequest) -> Result<Self, Self::Error> {
        Ok(model::AddTokenRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
        })
    }
}

impl TryFrom<proto::GetTokenRequest> for model::GetTokenRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetTokenRequest) -> Result<Self, Self::Error> {
        Ok(model::GetTokenRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
        })
    }
}

impl TryFrom<proto::RegisterWithRancherRequest> for model::RegisterWithRancherRequest {
    type Error = ApiError;

    fn try_from(req: proto::RegisterWithRancherRequest) -> Result<Self, Self::Error> {
        Ok(model::RegisterWithRancherRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
        })
    }
}

impl TryFrom<proto::RegisterClusterOidcRequest> for model::RegisterClusterOidcRequest {
    type Error = ApiError;

    fn try_from(req: proto::RegisterClusterOidcRequest) -> Result<Self, Self::Error> {
        Ok(model::RegisterClusterOidcRequest {
            identity: identity(req.provider, req.region, req.account_name),
            cluster_name: require("cluster_name", req.cluster_name)?,
            issuer_url: req.issuer_url,
            client_id: req.client_id,
        })
    }
}

// ============================================================================
// DNS conversions
// ============================================================================

impl From<proto::DnsRecordSet> for DnsRecordSet {
    fn from(r: proto::DnsRecordSet) -> Self {
        DnsRecordSet {
            record_type: r.r#type.to_ascii_uppercase(),
            name: r.name,
            values: r.values,
            ttl_seconds: r.ttl_seconds,
        }
    }
}

impl From<DnsRecordSet> for proto::DnsRecordSet {
    fn from(r: DnsRecordSet) -> Self {
        proto::DnsRecordSet {
            r#type: r.record_type,
            name: r.name,
            values: r.values,
            ttl_seconds: r.ttl_seconds,
        }
    }
}

fn records(records: Vec<proto::DnsRecordSet>) -> Result<Vec<DnsRecordSet>, ApiError> {
    if records.is_empty() {
        return Err(ApiError::InvalidRequest("records cannot be empty".into()));
    }
    Ok(records.into_iter().map(DnsRecordSet::from).collect())
}

impl TryFrom<proto::AddRoute53RecordRequest> for model::AddRoute53RecordRequest {
    type Error = ApiError;

    fn try_from(req: proto::AddRoute53RecordRequest) -> Result<Self, Self::Error> {
        Ok(model::AddRoute53RecordRequest {
            identity: identity(req.provider, req.region, req.account_name),
            dns_name: require("dns_name", req.dns_name)?,
            record_name: require("record_name", req.record_name)?,
            region_identifier: non_empty(req.region_identifier),
            is_aws_resource: req.is_aws_resource,
        })
    }
}

impl TryFrom<proto::CreateRoute53RecordsRequest> for model::CreateRoute53RecordsRequest {
    type Error = ApiError;

    fn try_from(req: proto::CreateRoute53RecordsRequest) -> Result<Self, Self::Error> {
        Ok(model::CreateRoute53RecordsRequest {
            identity: identity(req.provider, req.region, req.account_name),
            records: records(req.records)?,
        })
    }
}

impl TryFrom<proto::GetRoute53TxtRecordsRequest> for model::GetRoute53TxtRecordsRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetRoute53TxtRecordsRequest) -> Result<Self, Self::Error> {
        Ok(model::GetRoute53TxtRecordsRequest {
            identity: identity(req.provider, req.region, req.account_name),
        })
    }
}

impl TryFrom<proto::DeleteRoute53RecordsRequest> for model::DeleteRoute53RecordsRequest {
    type Error = ApiError;

    fn try_from(req: proto::DeleteRoute53RecordsRequest) -> Result<Self, Self::Error> {
        Ok(model::DeleteRoute53RecordsRequest {
            identity: identity(req.provider, req.region, req.account_name),
            records: records(req.records)?,
        })
    }
}

// ============================================================================
// Cost conversions
// ============================================================================

struct CostFields {
    ids: Vec<String>,
    start_date: String,
    end_date: String,
    granularity: String,
    cost_type: String,
    group_by: Option<proto::GroupBy>,
}

impl TryFrom<CostFields> for CostQuery {
    type Error = ApiError;

    fn try_from(f: CostFields) -> Result<Self, Self::Error> {
        let default = GroupBy::default();
        let group_by = match f.group_by {
            Some(g) => GroupBy {
                kind: non_empty(g.r#type).unwrap_or(default.kind),
                key: non_empty(g.key).unwrap_or(default.key),
            },
            None => default,
        };
        Ok(CostQuery {
            ids: f.ids,
            start_date: require("start_date", f.start_date)?,
            end_date: require("end_date", f.end_date)?,
            granularity: f.granularity.parse::<Granularity>()?,
            cost_type: f.cost_type,
            group_by,
        })
    }
}

impl From<CostBreakdown> for proto::CostBreakdown {
    fn from(c: CostBreakdown) -> Self {
        proto::CostBreakdown {
            total_cost: c.total_cost,
            group_cost: c.group_cost.into_iter().collect(),
        }
    }
}

impl TryFrom<proto::GetWorkspacesCostRequest> for model::GetWorkspacesCostRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetWorkspacesCostRequest) -> Result<Self, Self::Error> {
        let query = CostQuery::try_from(CostFields {
            ids: req.workspace_ids,
            start_date: req.start_date,
            end_date: req.end_date,
            granularity: req.granularity,
            cost_type: req.cost_type,
            group_by: req.group_by,
        })?;
        Ok(model::GetWorkspacesCostRequest {
            identity: identity(req.provider, req.region, req.account_name),
            query,
        })
    }
}

impl TryFrom<proto::GetApplicationsCostRequest> for model::GetApplicationsCostRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetApplicationsCostRequest) -> Result<Self, Self::Error> {
        let query = CostQuery::try_from(CostFields {
            ids: req.application_ids,
            start_date: req.start_date,
            end_date: req.end_date,
            granularity: req.granularity,
            cost_type: req.cost_type,
            group_by: req.group_by,
        })?;
        Ok(model::GetApplicationsCostRequest {
            identity: identity(req.provider, req.region, req.account_name),
            query,
        })
    }
}

impl TryFrom<proto::GetCostByTimeRequest> for model::GetCostByTimeRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetCostByTimeRequest) -> Result<Self, Self::Error> {
        let query = CostQuery::try_from(CostFields {
            ids: req.ids,
            start_date: req.start_date,
            end_date: req.end_date,
            granularity: req.granularity,
            cost_type: req.cost_type,
            group_by: req.group_by,
        })?;
        Ok(model::GetCostByTimeRequest {
            identity: identity(req.provider, req.region, req.account_name),
            query,
        })
    }
}

// ============================================================================
// Credential conversions
// ============================================================================

macro_rules! cred_oneof {
    ($oneof:ident) => {
        impl From<Credentials> for proto::$oneof::Cred {
            fn from(c: Credentials) -> Self {
                use proto::$oneof::Cred;
                match c {
                    Credentials::Aws(c) => Cred::AwsCred(proto::AwsCredentials {
                        access_key_id: c.access_key_id,
                        secret_access_key: c.secret_access_key.expose().to_string(),
                        session_token: c.session_token.expose().to_string(),
                    }),
                    Credentials::Azure(c) => Cred::AzureCred(proto::AzureCredentials {
                        subscription_id: c.subscription_id,
                        tenant_id: c.tenant_id,
                        client_id: c.client_id,
                        client_secret: c.client_secret.expose().to_string(),
                        resource_group: c.resource_group,
                    }),
                    Credentials::Gcp(c) => Cred::GcpCred(proto::GcpCredentials {
                        project_id: c.project_id,
                        service_account: c.service_account.expose().to_string(),
                    }),
                    Credentials::GitPat(c) => Cred::GitPat(proto::GitPersonalAccessToken {
                        token: c.token.expose().to_string(),
                    }),
                }
            }
        }

        impl From<proto::$oneof::Cred> for Credentials {
            fn from(c: proto::$oneof::Cred) -> Self {
                use proto::$oneof::Cred;
                match c {
                    Cred::AwsCred(c) => Credentials::Aws(AwsCredentials {
                        access_key_id: c.access_key_id,
                        secret_access_key: Secret::new(c.secret_access_key),
                        session_token: Secret::new(c.session_token),
                    }),
                    Cred::AzureCred(c) => Credentials::Azure(AzureCredentials {
                        subscription_id: c.subscription_id,
                        tenant_id: c.tenant_id,
                        client_id: c.client_id,
                        client_secret: Secret::new(c.client_secret),
                        resource_group: c.resource_group,
                    }),
                    Cred::GcpCred(c) => Credentials::Gcp(GcpCredentials {
                        project_id: c.project_id,
                        service_account: Secret::new(c.service_account),
                    }),
                    Cred::GitPat(c) => Credentials::GitPat(GitPat {
                        token: Secret::new(c.token),
                    }),
                }
            }
        }
    };
}

cred_oneof!(read_credential_response);
cred_oneof!(write_credential_request);

impl TryFrom<proto::ReadCredentialRequest> for model::ReadCredentialRequest {
    type Error = ApiError;

    fn try_from(req: proto::ReadCredentialRequest) -> Result<Self, Self::Error> {
        Ok(model::ReadCredentialRequest {
            account: require("account", req.account)?,
            credential_type: req.r#type.parse::<CredentialType>()?,
        })
    }
}

impl TryFrom<proto::WriteCredentialRequest> for model::WriteCredentialRequest {
    type Error = ApiError;

    fn try_from(req: proto::WriteCredentialRequest) -> Result<Self, Self::Error> {
        let credentials = Credentials::from(
            req.cred
                .ok_or_else(|| ApiError::InvalidRequest("missing credentials".into()))?,
        );
        // The type field is optional; when present it must agree with the payload.
        if let Some(declared) = non_empty(req.r#type) {
            let declared = declared.parse::<CredentialType>()?;
            if declared != credentials.credential_type() {
                return Err(ApiError::InvalidRequest(format!(
                    "credential type '{declared}' does not match '{}' payload",
                    credentials.credential_type()
                )));
            }
        }
        Ok(model::WriteCredentialRequest {
            account: require("account", req.account)?,
            credentials,
        })
    }
}

// ============================================================================
// Registry and object storage requests
// ============================================================================

impl TryFrom<proto::GetContainerRegistryAuthRequest> for model::GetContainerRegistryAuthRequest {
    type Error = ApiError;

    fn try_from(req: proto::GetContainerRegistryAuthRequest) -> Result<Self, Self::Error> {
        Ok(model::GetContainerRegistryAuthRequest {
            identity: identity(req.provider, req.region, req.account_name),
        })
    }
}

impl TryFrom<proto::CreateContainerRegistryRepoRequest>
    for model::CreateContainerRegistryRepoRequest
{
    type Error = ApiError;

    fn try_from(req: proto::CreateContainerRegistryRepoRequest) -> Result<Self, Self::Error> {
        Ok(model::CreateContainerRegistryRepoRequest {
            identity: identity(req.provider, req.region, req.account_name),
            name: require("name", req.name)?,
            image_tag_mutable: req.image_tag_mutable,
            labels: labels(req.labels),
        })
    }
}

impl TryFrom<proto::PresignS3UrlRequest> for model::PresignS3UrlRequest {
    type Error = ApiError;

    fn try_from(req: proto::PresignS3UrlRequest) -> Result<Self, Self::Error> {
        Ok(model::PresignS3UrlRequest {
            identity: identity(req.provider, req.region, req.account_name),
            bucket: require("bucket", req.bucket)?,
            file: require("file", req.file)?,
            timeout_minutes: req.timeout_minutes,
        })
    }
}

// ============================================================================
// Responses (Domain → Proto)
// ============================================================================

impl From<model::HealthCheckResponse> for proto::HealthCheckResponse {
    fn from(_: model::HealthCheckResponse) -> Self {
        proto::HealthCheckResponse {}
    }
}

impl From<model::EchoResponse> for proto::EchoResponse {
    fn from(r: model::EchoResponse) -> Self {
        proto::EchoResponse { msg: r.msg }
    }
}

impl From<model::CreateClusterResponse> for proto::CreateClusterResponse {
    fn from(r: model::CreateClusterResponse) -> Self {
        proto::CreateClusterResponse {
            cluster_name: r.cluster_name,
            cluster_id: r.cluster_id,
        }
    }
}

impl From<model::GetClusterResponse> for proto::GetClusterResponse {
    fn from(r: model::GetClusterResponse) -> Self {
        proto::GetClusterResponse {
            cluster: Some(r.cluster.into()),
        }
    }
}

impl From<model::GetClustersResponse> for proto::GetClustersResponse {
    fn from(r: model::GetClustersResponse) -> Self {
        proto::GetClustersResponse {
            clusters: r.clusters.into_iter().map(proto::ClusterSpec::from).collect(),
        }
    }
}

impl From<model::ClusterStatusResponse> for proto::ClusterStatusResponse {
    fn from(r: model::ClusterStatusResponse) -> Self {
        proto::ClusterStatusResponse {
            status: proto::ClusterStatus::from(r.status) as i32,
        }
    }
}

impl From<model::DeleteClusterResponse> for proto::DeleteClusterResponse {
    fn from(_: model::DeleteClusterResponse) -> Self {
        proto::DeleteClusterResponse {}
    }
}

impl From<model::AddNodeResponse> for proto::AddNodeResponse {
    fn from(_: model::AddNodeResponse) -> Self {
        proto::AddNodeResponse {}
    }
}

impl From<model::DeleteNodeResponse> for proto::DeleteNodeResponse {
    fn from(_: model::DeleteNodeResponse) -> Self {
        proto::DeleteNodeResponse {}
    }
}

impl From<model::TagNodeInstanceResponse> for proto::TagNodeInstanceResponse {
    fn from(r: model::TagNodeInstanceResponse) -> Self {
        proto::TagNodeInstanceResponse {
            instance_ids: r.instance_ids,
        }
    }
}

impl From<VolumeSpec> for proto::VolumeSpec {
    fn from(v: VolumeSpec) -> Self {
        proto::VolumeSpec {
            id: v.id,
            size_gb: v.size_gb,
            volume_type: v.volume_type,
            availability_zone: v.availability_zone,
            region: v.region,
            source_snapshot: v.source_snapshot.unwrap_or_default(),
            labels: v.labels.into_hash_map(),
        }
    }
}

impl From<model::CreateVolumeResponse> for proto::CreateVolumeResponse {
    fn from(r: model::CreateVolumeResponse) -> Self {
        proto::CreateVolumeResponse {
            volume_id: r.volume_id,
        }
    }
}

impl From<model::GetVolumeResponse> for proto::GetVolumeResponse {
    fn from(r: model::GetVolumeResponse) -> Self {
        proto::GetVolumeResponse {
            volume: Some(r.volume.into()),
        }
    }
}

impl From<model::DeleteVolumeResponse> for proto::DeleteVolumeResponse {
    fn from(r: model::DeleteVolumeResponse) -> Self {
        proto::DeleteVolumeResponse { deleted: r.deleted }
    }
}

impl From<model::CreateSnapshotResponse> for proto::CreateSnapshotResponse {
    fn from(r: model::CreateSnapshotResponse) -> Self {
        proto::CreateSnapshotResponse {
            snapshot_id: r.snapshot_id,
        }
    }
}

impl From<model::DeleteSnapshotResponse> for proto::DeleteSnapshotResponse {
    fn from(_: model::DeleteSnapshotResponse) -> Self {
        proto::DeleteSnapshotResponse {}
    }
}

impl From<model::CreateSnapshotAndDeleteResponse> for proto::CreateSnapshotAndDeleteResponse {
    fn from(r: model::CreateSnapshotAndDeleteResponse) -> Self {
        proto::CreateSnapshotAndDeleteResponse {
            snapshot_id: r.snapshot_id,
            volume_deleted: r.volume_deleted,
        }
    }
}

impl From<model::CopySnapshotResponse> for proto::CopySnapshotResponse {
    fn from(r: model::CopySnapshotResponse) -> Self {
        proto::CopySnapshotResponse {
            snapshot_id: r.snapshot_id,
        }
    }
}

impl From<model::AddTokenResponse> for proto::AddTokenResponse {
    fn from(r: model::AddTokenResponse) -> Self {
        proto::AddTokenResponse {
            secret_name: r.secret_name,
        }
    }
}

impl From<model::GetTokenResponse> for proto::GetTokenResponse {
    fn from(r: model::GetTokenResponse) -> Self {
        proto::GetTokenResponse {
            endpoint: r.endpoint,
            ca_data: r.ca_data,
            token: r.token.expose().to_string(),
        }
    }
}

impl From<model::AddRoute53RecordResponse> for proto::AddRoute53RecordResponse {
    fn from(r: model::AddRoute53RecordResponse) -> Self {
        proto::AddRoute53RecordResponse {
            change_id: r.change_id,
        }
    }
}

impl From<model::CreateRoute53RecordsResponse> for proto::CreateRoute53RecordsResponse {
    fn from(r: model::CreateRoute53RecordsResponse) -> Self {
        proto::CreateRoute53RecordsResponse {
            change_id: r.change_id,
        }
    }
}

impl From<model::GetRoute53TxtRecordsResponse> for proto::GetRoute53TxtRecordsResponse {
    fn from(r: model::GetRoute53TxtRecordsResponse) -> Self {
        proto::GetRoute53TxtRecordsResponse {
            records: r.records.into_iter().map(proto::DnsRecordSet::from).collect(),
        }
    }
}

impl From<model::DeleteRoute53RecordsResponse> for proto::DeleteRoute53RecordsResponse {
    fn from(r: model::DeleteRoute53RecordsResponse) -> Self {
        proto::DeleteRoute53RecordsResponse {
            change_id: r.change_id,
        }
    }
}

impl From<model::RegisterWithRancherResponse> for proto::RegisterWithRancherResponse {
    fn from(r: model::RegisterWithRancherResponse) -> Self {
        proto::RegisterWithRancherResponse {
            cluster_id: r.cluster_id,
            manifest_url: r.manifest_url,
        }
    }
}

impl From<model::RegisterClusterOidcResponse> for proto::RegisterClusterOidcResponse {
    fn from(_: model::RegisterClusterOidcResponse) -> Self {
        proto::RegisterClusterOidcResponse {}
    }
}

impl From<model::GetWorkspacesCostResponse> for proto::GetWorkspacesCostResponse {
    fn from(r: model::GetWorkspacesCostResponse) -> Self {
        proto::GetWorkspacesCostResponse {
            cost: Some(r.cost.into()),
        }
    }
}

impl From<model::GetApplicationsCostResponse> for proto::GetApplicationsCostResponse {
    fn from(r: model::GetApplicationsCostResponse) -> Self {
        proto::GetApplicationsCostResponse {
            cost: Some(r.cost.into()),
        }
    }
}

impl From<model::GetCostByTimeResponse> for proto::GetCostByTimeResponse {
    fn from(r: model::GetCostByTimeResponse) -> Self {
        let series = r
            .series
            .into_iter()
            .map(|(id, points)| {
                let points = points.into_iter().collect();
                (id, proto::CostSeries { points })
            })
            .collect();
        proto::GetCostByTimeResponse { series }
    }
}

impl From<model::ReadCredentialResponse> for proto::ReadCredentialResponse {
    fn from(r: model::ReadCredentialResponse) -> Self {
        proto::ReadCredentialResponse {
            account: r.account,
            r#type: r.credentials.credential_type().to_string(),
            cred: Some(r.credentials.into()),
        }
    }
}

impl From<model::WriteCredentialResponse> for proto::WriteCredentialResponse {
    fn from(_: model::WriteCredentialResponse) -> Self {
        proto::WriteCredentialResponse {}
    }
}

impl From<model::GetContainerRegistryAuthResponse> for proto::GetContainerRegistryAuthResponse {
    fn from(r: model::GetContainerRegistryAuthResponse) -> Self {
        proto::GetContainerRegistryAuthResponse {
            token: r.token.expose().to_string(),
            url: r.url,
            expires_at: r.expires_at,
        }
    }
}

impl From<model::CreateContainerRegistryRepoResponse>
    for proto::CreateContainerRegistryRepoResponse
{
    fn from(r: model::CreateContainerRegistryRepoResponse) -> Self {
        proto::CreateContainerRegistryRepoResponse {
            registry_id: r.registry_id,
            repository_uri: r.repository_uri,
        }
    }
}

impl From<model::PresignS3UrlResponse> for proto::PresignS3UrlResponse {
    fn from(r: model::PresignS3UrlResponse) -> Self {
        proto::PresignS3UrlResponse {
            signed_url: r.signed_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(node: Option<proto::NodeSpec>) -> proto::CreateClusterRequest {
        proto::CreateClusterRequest {
            provider: "aws".into(),
            region: "us-west-2".into(),
            account_name: "team".into(),
            cluster_name: "c1".into(),
            node,
            labels: HashMap::from([("user".to_string(), "dev-tester".to_string())]),
        }
    }

    #[test]
    fn node_spec_empty_strings_are_unset() {
        let node = NodeSpec::try_from(proto::NodeSpec {
            name: "pool".into(),
            machine_type: "m".into(),
            capacity_type: proto::CapacityType::Spot as i32,
            mig_profile: "MIG3g".into(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(node.instance, None);
        assert_eq!(node.machine_type.as_deref(), Some("m"));
        assert_eq!(node.capacity, CapacityType::Spot);
        assert_eq!(node.mig_profile, Some(MigProfile::Mig3g));
    }

    #[test]
    fn node_spec_rejects_unknown_enums() {
        let err = NodeSpec::try_from(proto::NodeSpec {
            name: "pool".into(),
            capacity_type: 42,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));

        let err = NodeSpec::try_from(proto::NodeSpec {
            name: "pool".into(),
            mig_profile: "MIG5g".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn create_cluster_requires_node() {
        let err = model::CreateClusterRequest::try_from(create_request(None)).unwrap_err();
        assert!(err.to_string().contains("missing node spec"));

        let req = model::CreateClusterRequest::try_from(create_request(Some(proto::NodeSpec {
            name: "pool".into(),
            instance: "t3.medium".into(),
            ..Default::default()
        })))
        .unwrap();
        assert_eq!(req.identity, ProviderIdentity::new("aws", "us-west-2", "team"));
        assert_eq!(req.labels.get("user"), Some("dev-tester"));
        assert_eq!(req.node.instance.as_deref(), Some("t3.medium"));
    }

    #[test]
    fn cost_query_fills_group_by_defaults() {
        let req = model::GetWorkspacesCostRequest::try_from(proto::GetWorkspacesCostRequest {
            provider: "aws".into(),
            account_name: "netbook-aws-dev".into(),
            workspace_ids: vec!["ws1".into()],
            start_date: "2022-04-01".into(),
            end_date: "2022-05-01".into(),
            granularity: "monthly".into(),
            group_by: Some(proto::GroupBy {
                r#type: String::new(),
                key: "appid".into(),
            }),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(req.query.granularity, Granularity::Monthly);
        assert_eq!(req.query.group_by.kind, "TAG");
        assert_eq!(req.query.group_by.key, "appid");
    }

    #[test]
    fn write_credential_checks_declared_type() {
        let cred = proto::write_credential_request::Cred::GitPat(proto::GitPersonalAccessToken {
            token: "t".into(),
        });

        let ok = model::WriteCredentialRequest::try_from(proto::WriteCredentialRequest {
            account: "nsp-dev".into(),
            r#type: "git-pat".into(),
            cred: Some(cred.clone()),
        })
        .unwrap();
        assert_eq!(ok.credentials.credential_type(), CredentialType::GitPat);

        let err = model::WriteCredentialRequest::try_from(proto::WriteCredentialRequest {
            account: "nsp-dev".into(),
            r#type: "aws".into(),
            cred: Some(cred),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn read_credential_response_exposes_secret_on_the_wire() {
        let resp = proto::ReadCredentialResponse::from(model::ReadCredentialResponse {
            account: "alexis".into(),
            credentials: Credentials::Aws(AwsCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: Secret::new("secret_key"),
                session_token: Secret::default(),
            }),
        });
        assert_eq!(resp.r#type, "aws");
        match resp.cred {
            Some(proto::read_credential_response::Cred::AwsCred(c)) => {
                assert_eq!(c.secret_access_key, "secret_key");
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
    }

    #[test]
    fn copy_snapshot_defaults_source_region() {
        let req = model::CopySnapshotRequest::try_from(proto::CopySnapshotRequest {
            provider: "aws".into(),
            region: "us-west-2".into(),
            account_name: "team".into(),
            snapshot_id: "snap-1".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(req.source_region, "us-west-2");
    }
}
