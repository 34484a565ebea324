//! Sequential delete-all-clusters sweep.
use async_trait::async_trait;
use spawner_model::{
    DeleteClusterRequest, DeleteClusterResponse, GetClustersRequest, GetClustersResponse,
    ProviderIdentity,
};
use tracing::{info, warn};

use crate::{
    context::RequestContext,
    dispatch::Handler,
    error::{CoreError, CoreResult},
};

/// Target a sweep lists and deletes clusters through.
#[async_trait]
pub trait ClusterSweep: Send + Sync {
    async fn list_clusters(&self, identity: &ProviderIdentity) -> CoreResult<Vec<String>>;

    async fn delete_cluster(&self, identity: &ProviderIdentity, name: &str) -> CoreResult<()>;
}

/// Per-cluster result of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepItem {
    pub cluster: String,
    pub result: Result<(), CoreError>,
}

impl SweepItem {
    /// Deleted, or already gone.
    pub fn is_settled(&self) -> bool {
        match &self.result {
            Ok(()) => true,
            Err(e) => e.is_not_found(),
        }
    }
}

/// Delete every cluster of `identity`'s region, one after another.
///
/// Listing failures abort the sweep. Per-cluster failures are logged and
/// reported per item; the sweep always continues with the next cluster.
pub async fn delete_all_clusters(
    target: &dyn ClusterSweep,
    identity: &ProviderIdentity,
) -> CoreResult<Vec<SweepItem>> {
    let clusters = target.list_clusters(identity).await?;
    info!(count = clusters.len(), region = %identity.region, "sweeping clusters");

    let mut items = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let result = target.delete_cluster(identity, &cluster).await;
        match &result {
            Ok(()) => info!(cluster = %cluster, "cluster deleted"),
            Err(e) if e.is_not_found() => info!(cluster = %cluster, "cluster already gone"),
            Err(e) => warn!(cluster = %cluster, error = %e, "cluster delete failed"),
        }
        items.push(SweepItem { cluster, result });
    }
    Ok(items)
}

/// Sweep through an in-process [`Handler`].
pub struct HandlerSweep<'a, H: ?Sized> {
    handler: &'a H,
    ctx: RequestContext,
}

impl<'a, H: Handler + ?Sized> HandlerSweep<'a, H> {
    pub fn new(handler: &'a H, ctx: RequestContext) -> Self {
        Self { handler, ctx }
    }
}

#[async_trait]
impl<'a, H: Handler + ?Sized> ClusterSweep for HandlerSweep<'a, H> {
    async fn list_clusters(&self, identity: &ProviderIdentity) -> CoreResult<Vec<String>> {
        let req = GetClustersRequest {
            identity: identity.clone(),
        };
        let resp = self.handler.handle(&self.ctx, req.into()).await?;
        let resp = GetClustersResponse::try_from(resp)?;
        Ok(resp.clusters.into_iter().map(|c| c.name).collect())
    }

    async fn delete_cluster(&self, identity: &ProviderIdentity, name: &str) -> CoreResult<()> {
        let req = DeleteClusterRequest {
            identity: identity.clone(),
            cluster_name: name.to_string(),
            force_delete: true,
        };
        let resp = self.handler.handle(&self.ctx, req.into()).await?;
        DeleteClusterResponse::try_from(resp)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Fake {
        clusters: Vec<&'static str>,
        failing: &'static str,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ClusterSweep for Fake {
        async fn list_clusters(&self, _identity: &ProviderIdentity) -> CoreResult<Vec<String>> {
            Ok(self.clusters.iter().map(|s| s.to_string()).collect())
        }

        async fn delete_cluster(&self, _identity: &ProviderIdentity, name: &str) -> CoreResult<()> {
            self.deleted.lock().unwrap().push(name.to_string());
            if name == self.failing {
                return Err(CoreError::Provider("dependency violation".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn failure_in_the_middle_does_not_short_circuit() {
        let fake = Fake {
            clusters: vec!["a", "b", "c"],
            failing: "b",
            deleted: Mutex::new(Vec::new()),
        };
        let id = ProviderIdentity::new("aws", "us-west-2", "team");

        let items = delete_all_clusters(&fake, &id).await.unwrap();

        assert_eq!(*fake.deleted.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(items.len(), 3);
        assert!(items[0].result.is_ok());
        assert!(matches!(items[1].result, Err(CoreError::Provider(_))));
        assert_eq!(items[2].cluster, "c");
        assert!(items[2].result.is_ok());
    }

    #[test]
    fn not_found_counts_as_settled() {
        let item = SweepItem {
            cluster: "x".into(),
            result: Err(CoreError::NotFound("x".into())),
        };
        assert!(item.is_settled());
    }
}
