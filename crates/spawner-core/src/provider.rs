//! Provider adapter abstraction.
//!
//! One implementation per cloud; every operation an adapter does not override
//! answers `Unsupported`.
use async_trait::async_trait;
use spawner_model::*;

use crate::{
    context::RequestContext,
    error::{CoreError, CoreResult},
};

macro_rules! provider_trait {
    ($($method:ident($req:ty) -> $resp:ty => $op:ident;)*) => {
        /// Neutral operation set implemented against one cloud's native API.
        #[async_trait]
        pub trait Provider: Send + Sync + 'static {
            /// Provider key this adapter is registered under.
            fn name(&self) -> &'static str;

            $(
                async fn $method(&self, ctx: &RequestContext, req: $req) -> CoreResult<$resp> {
                    let _ = (ctx, req);
                    Err(CoreError::unsupported(self.name(), Operation::$op))
                }
            )*
        }

        /// Route a neutral request to the matching adapter method.
        ///
        /// Provider-independent operations are rejected with `InvalidInput`.
        pub async fn call_provider(
            provider: &dyn Provider,
            ctx: &RequestContext,
            request: Request,
        ) -> CoreResult<Response> {
            match request {
                $(Request::$op(req) => provider.$method(ctx, req).await.map(Response::from),)*
                other => Err(CoreError::invalid(format!(
                    "{} is not a provider operation",
                    other.operation()
                ))),
            }
        }
    };
}

provider_trait! {
    create_cluster(CreateClusterRequest) -> CreateClusterResponse => CreateCluster;
    get_cluster(GetClusterRequest) -> GetClusterResponse => GetCluster;
    get_clusters(GetClustersRequest) -> GetClustersResponse => GetClusters;
    cluster_status(ClusterStatusRequest) -> ClusterStatusResponse => ClusterStatus;
    delete_cluster(DeleteClusterRequest) -> DeleteClusterResponse => DeleteCluster;
    add_node(AddNodeRequest) -> AddNodeResponse => AddNode;
    delete_node(DeleteNodeRequest) -> DeleteNodeResponse => DeleteNode;
    tag_node_instance(TagNodeInstanceRequest) -> TagNodeInstanceResponse => TagNodeInstance;
    create_volume(CreateVolumeRequest) -> CreateVolumeResponse => CreateVolume;
    get_volume(GetVolumeRequest) -> GetVolumeResponse => GetVolume;
    delete_volume(DeleteVolumeRequest) -> DeleteVolumeResponse => DeleteVolume;
    create_snapshot(CreateSnapshotRequest) -> CreateSnapshotResponse => CreateSnapshot;
    delete_snapshot(DeleteSnapshotRequest) -> DeleteSnapshotResponse => DeleteSnapshot;
    create_snapshot_and_delete(CreateSnapshotAndDeleteRequest) -> CreateSnapshotAndDeleteResponse => CreateSnapshotAndDelete;
    copy_snapshot(CopySnapshotRequest) -> CopySnapshotResponse => CopySnapshot;
    add_token(AddTokenRequest) -> AddTokenResponse => AddToken;
    get_token(GetTokenRequest) -> GetTokenResponse => GetToken;
    add_route53_record(AddRoute53RecordRequest) -> AddRoute53RecordResponse => AddRoute53Record;
    create_route53_records(CreateRoute53RecordsRequest) -> CreateRoute53RecordsResponse => CreateRoute53Records;
    get_route53_txt_records(GetRoute53TxtRecordsRequest) -> GetRoute53TxtRecordsResponse => GetRoute53TxtRecords;
    delete_route53_records(DeleteRoute53RecordsRequest) -> DeleteRoute53RecordsResponse => DeleteRoute53Records;
    register_with_rancher(RegisterWithRancherRequest) -> RegisterWithRancherResponse => RegisterWithRancher;
    register_cluster_oidc(RegisterClusterOidcRequest) -> RegisterClusterOidcResponse => RegisterClusterOidc;
    get_workspaces_cost(GetWorkspacesCostRequest) -> GetWorkspacesCostResponse => GetWorkspacesCost;
    get_applications_cost(GetApplicationsCostRequest) -> GetApplicationsCostResponse => GetApplicationsCost;
    get_cost_by_time(GetCostByTimeRequest) -> GetCostByTimeResponse => GetCostByTime;
    get_container_registry_auth(GetContainerRegistryAuthRequest) -> GetContainerRegistryAuthResponse => GetContainerRegistryAuth;
    create_container_registry_repo(CreateContainerRegistryRepoRequest) -> CreateContainerRegistryRepoResponse => CreateContainerRegistryRepo;
    presign_s3_url(PresignS3UrlRequest) -> PresignS3UrlResponse => PresignS3Url;
}
