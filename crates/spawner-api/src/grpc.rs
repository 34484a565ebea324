use std::{sync::Arc, time::Duration};

use spawner_core::{Handler, RequestContext};
use spawner_model::{self as model, ModelError};
use tonic::{Request, Response, Status, metadata::MetadataMap};
use tracing::debug;

use crate::error::ApiError;
use crate::proto::{self, spawner_service_server::SpawnerService};

/// Metadata key callers put their trace id under.
pub const TRACE_ID_HEADER: &str = "trace-id";

const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// gRPC service implementation.
///
/// Wraps a [`Handler`] (normally the logging/instrumented facade) and implements
/// the generated `SpawnerService` trait. Every RPC takes the same path: wire
/// message to neutral request, one `handle` call, neutral response to wire message.
pub struct SpawnerApiService<H> {
    handler: Arc<H>,
}

impl<H> SpawnerApiService<H>
where
    H: Handler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    async fn call<P, Q, S, R>(&self, request: Request<P>) -> Result<Response<R>, Status>
    where
        P: Send + 'static,
        Q: TryFrom<P, Error = ApiError> + Into<model::Request> + Send,
        S: TryFrom<model::Response, Error = ModelError> + Send,
        R: From<S>,
    {
        let ctx = request_context(request.metadata());
        // Dropping the call (client gone, deadline hit) cancels waits downstream.
        let _cancel_on_drop = ctx.cancel_token().clone().drop_guard();

        let req = Q::try_from(request.into_inner()).map_err(|e| {
            debug!(trace_id = ?ctx.trace_id(), error = %e, "rejected request");
            Status::from(e)
        })?;

        let resp = self
            .handler
            .handle(&ctx, req.into())
            .await
            .map_err(|e| Status::from(ApiError::from(e)))?;

        let resp = S::try_from(resp).map_err(|e| Status::from(ApiError::Internal(e.to_string())))?;
        Ok(Response::new(R::from(resp)))
    }
}

/// Request context for an inbound call: trace id and deadline from metadata.
pub fn request_context(metadata: &MetadataMap) -> RequestContext {
    let mut ctx = RequestContext::new();
    if let Some(trace_id) = metadata
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        ctx = ctx.with_trace_id(trace_id);
    }
    if let Some(timeout) = metadata
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_grpc_timeout)
    {
        ctx = ctx.with_timeout(timeout);
    }
    ctx
}

/// Parse a `grpc-timeout` value: at most 8 digits followed by a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = digits.parse().ok()?;
    match unit {
        "H" => Some(Duration::from_secs(n * 3600)),
        "M" => Some(Duration::from_secs(n * 60)),
        "S" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_millis(n)),
        "u" => Some(Duration::from_micros(n)),
        "n" => Some(Duration::from_nanos(n)),
        _ => None,
    }
}

macro_rules! rpcs {
    ($($method:ident($req:ident) -> $resp:ident;)*) => {
        #[tonic::async_trait]
        impl<H> SpawnerService for SpawnerApiService<H>
        where
            H: Handler,
        {
            $(
                async fn $method(
                    &self,
                    request: Request<proto::$req>,
                ) -> Result<Response<proto::$resp>, Status> {
                    self.call::<_, model::$req, model::$resp, _>(request).await
                }
            )*
        }
    };
}

rpcs! {
    health_check(HealthCheckRequest) -> HealthCheckResponse;
    echo(EchoRequest) -> EchoResponse;
    create_cluster(CreateClusterRequest) -> CreateClusterResponse;
    get_cluster(GetClusterRequest) -> GetClusterResponse;
    get_clusters(GetClustersRequest) -> GetClustersResponse;
    cluster_status(ClusterStatusRequest) -> ClusterStatusResponse;
    delete_cluster(DeleteClusterRequest) -> DeleteClusterResponse;
    add_node(AddNodeRequest) -> AddNodeResponse;
    delete_node(DeleteNodeRequest) -> DeleteNodeResponse;
    tag_node_instance(TagNodeInstanceRequest) -> TagNodeInstanceResponse;
    create_volume(CreateVolumeRequest) -> CreateVolumeResponse;
    get_volume(GetVolumeRequest) -> GetVolumeResponse;
    delete_volume(DeleteVolumeRequest) -> DeleteVolumeResponse;
    create_snapshot(CreateSnapshotRequest) -> CreateSnapshotResponse;
    delete_snapshot(DeleteSnapshotRequest) -> DeleteSnapshotResponse;
    create_snapshot_and_delete(CreateSnapshotAndDeleteRequest) -> CreateSnapshotAndDeleteResponse;
    copy_snapshot(CopySnapshotRequest) -> CopySnapshotResponse;
    add_token(AddTokenRequest) -> AddTokenResponse;
    get_token(GetTokenRequest) -> GetTokenResponse;
    add_route53_record(AddRoute53RecordRequest) -> AddRoute53RecordResponse;
    create_route53_records(CreateRoute53RecordsRequest) -> CreateRoute53RecordsResponse;
    get_route53_txt_records(GetRoute53TxtRecordsRequest) -> GetRoute53TxtRecordsResponse;
    delete_route53_records(DeleteRoute53RecordsRequest) -> DeleteRoute53RecordsResponse;
    register_with_rancher(RegisterWithRancherRequest) -> RegisterWithRancherResponse;
    register_cluster_oidc(RegisterClusterOidcRequest) -> RegisterClusterOidcResponse;
    get_workspaces_cost(GetWorkspacesCostRequest) -> GetWorkspacesCostResponse;
    get_applications_cost(GetApplicationsCostRequest) -> GetApplicationsCostResponse;
    get_cost_by_time(GetCostByTimeRequest) -> GetCostByTimeResponse;
    read_credential(ReadCredentialRequest) -> ReadCredentialResponse;
    write_credential(WriteCredentialRequest) -> WriteCredentialResponse;
    get_container_registry_auth(GetContainerRegistryAuthRequest) -> GetContainerRegistryAuthResponse;
    create_container_registry_repo(CreateContainerRegistryRepoRequest) -> CreateContainerRegistryRepoResponse;
    presign_s3_url(PresignS3UrlRequest) -> PresignS3UrlResponse;
}
