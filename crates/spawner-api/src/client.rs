//! Client-side helpers for talking to a remote spawner service.
use async_trait::async_trait;
use spawner_core::{CoreResult, sweep::ClusterSweep};
use spawner_model::ProviderIdentity;
use tonic::{Request, transport::Channel};

use crate::error::from_status;
use crate::grpc::TRACE_ID_HEADER;
use crate::proto::{self, spawner_service_client::SpawnerServiceClient};

pub type Client = SpawnerServiceClient<Channel>;

/// Wrap `msg` in a request carrying `trace_id` metadata.
pub fn traced<T>(msg: T, trace_id: &str) -> Request<T> {
    let mut req = Request::new(msg);
    if let Ok(value) = trace_id.parse() {
        req.metadata_mut().insert(TRACE_ID_HEADER, value);
    }
    req
}

/// Cluster sweep driven through the gRPC surface.
pub struct GrpcSweep {
    client: Client,
    trace_id: String,
}

impl GrpcSweep {
    pub fn new(client: Client, trace_id: impl Into<String>) -> Self {
        Self {
            client,
            trace_id: trace_id.into(),
        }
    }
}

#[async_trait]
impl ClusterSweep for GrpcSweep {
    async fn list_clusters(&self, identity: &ProviderIdentity) -> CoreResult<Vec<String>> {
        let req = proto::GetClustersRequest {
            provider: identity.provider.clone(),
            region: identity.region.clone(),
            account_name: identity.account.clone(),
        };
        let resp = self
            .client
            .clone()
            .get_clusters(traced(req, &self.trace_id))
            .await
            .map_err(|s| from_status(&s))?;
        Ok(resp.into_inner().clusters.into_iter().map(|c| c.name).collect())
    }

    async fn delete_cluster(&self, identity: &ProviderIdentity, name: &str) -> CoreResult<()> {
        let req = proto::DeleteClusterRequest {
            provider: identity.provider.clone(),
            region: identity.region.clone(),
            account_name: identity.account.clone(),
            cluster_name: name.to_string(),
            force_delete: true,
        };
        self.client
            .clone()
            .delete_cluster(traced(req, &self.trace_id))
            .await
            .map_err(|s| from_status(&s))?;
        Ok(())
    }
}
