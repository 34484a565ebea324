//! GCP adapter: GKE clusters and node pools.
//!
//! Storage, DNS, registry and cost operations are not offered on GCP and
//! answer `Unsupported` through the [`Provider`] defaults.
use std::sync::Arc;

use async_trait::async_trait;
use spawner_core::{
    CoreError, CoreResult, Provider, RequestContext, ResultExt, Session,
    catalog::{Cloud, gcp_accelerator, is_gpu, resolve_instance},
    labels::{node_labels, resource_tags},
    wait_for_completion,
};
use spawner_model::*;
use tracing::info;

use crate::{
    AdapterDeps,
    api::{
        GcpApi, KubeAccess,
        gcp::{
            DISK_PD_STANDARD, GKE_RUNNING, GkeAccelerator, GkeCluster, GkeClusterInput,
            GkeNodePool, IMAGE_COS_CONTAINERD,
        },
    },
    common::{OperationWait, cluster_status, register_rancher, require, store_kube_access},
};

pub const PROVIDER: &str = "gcp";

pub struct GcpProvider {
    api: Arc<dyn GcpApi>,
    deps: AdapterDeps,
}

/// GKE GPU partition size of a MIG profile (A100 40GB slices).
fn partition_size(profile: MigProfile) -> &'static str {
    match profile {
        MigProfile::Mig1g => "1g.5gb",
        MigProfile::Mig2g => "2g.10gb",
        MigProfile::Mig3g => "3g.20gb",
        MigProfile::Mig4g => "4g.20gb",
        MigProfile::Mig7g => "7g.40gb",
    }
}

fn mig_profile(partition: &str) -> Option<MigProfile> {
    [
        MigProfile::Mig1g,
        MigProfile::Mig2g,
        MigProfile::Mig3g,
        MigProfile::Mig4g,
        MigProfile::Mig7g,
    ]
    .into_iter()
    .find(|p| partition_size(*p) == partition)
}

impl GcpProvider {
    pub fn new(api: Arc<dyn GcpApi>, deps: AdapterDeps) -> Self {
        Self { api, deps }
    }

    async fn session(&self, ctx: &RequestContext, identity: &ProviderIdentity) -> CoreResult<Session> {
        self.deps.sessions.new_session(ctx, identity).await
    }

    async fn wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        operation: String,
        name: String,
    ) -> CoreResult<()> {
        let op = OperationWait::new(self.api.as_ref(), session, operation, name);
        wait_for_completion(&op, &self.deps.poll, ctx).await?;
        Ok(())
    }

    fn env(&self) -> &str {
        self.deps.service.env()
    }

    fn node_pool(&self, node: &NodeSpec) -> CoreResult<GkeNodePool> {
        require("node.name", &node.name)?;
        let machine_type = resolve_instance(node, Cloud::Gcp)?;
        let count = node.effective_count();

        let accelerator = match gcp_accelerator(node).filter(|_| is_gpu(node)) {
            Some(accelerator_type) => Some(GkeAccelerator {
                accelerator_type: accelerator_type.to_string(),
                count: 1,
                partition_size: node.mig_profile.map(|p| partition_size(p).to_string()),
            }),
            None if is_gpu(node) && node.mig_profile.is_some() => {
                return Err(CoreError::invalid(format!(
                    "node '{}' requests a GPU partition but machine type '{machine_type}' has no known accelerator",
                    node.name
                )));
            }
            None => None,
        };

        Ok(GkeNodePool {
            name: node.name.clone(),
            machine_type,
            node_count: count,
            disk_size_gb: node.disk_size_gb,
            disk_type: DISK_PD_STANDARD.to_string(),
            image_type: IMAGE_COS_CONTAINERD.to_string(),
            spot: node.capacity == CapacityType::Spot,
            accelerator,
            labels: node_labels(node, self.env()),
            min_count: count,
            max_count: count,
            auto_repair: false,
            auto_upgrade: false,
        })
    }

    async fn kube_access(&self, session: &Session, cluster: &str) -> CoreResult<KubeAccess> {
        let c = self
            .api
            .get_cluster(session, cluster)
            .await
            .context("get cluster")?;
        let token = self
            .api
            .access_token(session)
            .await
            .context("access token")?;
        Ok(KubeAccess {
            endpoint: c.endpoint,
            ca_data: c.ca_data,
            token,
        })
    }

    async fn delete_pool_and_wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        cluster: &str,
        pool: &str,
    ) -> CoreResult<()> {
        let op = self
            .api
            .delete_node_pool(session, cluster, pool)
            .await
            .context("delete node pool")?;
        self.wait(ctx, session, op, format!("delete node pool {cluster}/{pool}"))
            .await
    }
}

fn cluster_spec(cluster: GkeCluster) -> ClusterSpec {
    ClusterSpec {
        cluster_id: cluster.id,
        name: cluster.name,
        provider: PROVIDER.to_string(),
        region: cluster.location,
        nodes: cluster.node_pools.into_iter().map(node_spec).collect(),
        labels: cluster.resource_labels,
    }
}

fn node_spec(pool: GkeNodePool) -> NodeSpec {
    let partition = pool
        .accelerator
        .as_ref()
        .and_then(|a| a.partition_size.as_deref())
        .and_then(mig_profile);
    NodeSpec {
        instance: Some(pool.machine_type),
        count: pool.node_count,
        disk_size_gb: pool.disk_size_gb,
        capacity: if pool.spot {
            CapacityType::Spot
        } else {
            CapacityType::OnDemand
        },
        gpu_enabled: pool.accelerator.is_some(),
        mig_profile: partition,
        labels: pool.labels,
        ..NodeSpec::new(pool.name)
    }
}

#[async_trait]
impl Provider for GcpProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn create_cluster(
        &self,
        ctx: &RequestContext,
        req: CreateClusterRequest,
    ) -> CoreResult<CreateClusterResponse> {
        require("cluster_name", &req.cluster_name)?;
        let node_pool = self.node_pool(&req.node)?;
        let session = self.session(ctx, &req.identity).await?;

        let op = self
            .api
            .create_cluster(
                &session,
                GkeClusterInput {
                    name: req.cluster_name.clone(),
                    location: session.region().to_string(),
                    resource_labels: resource_tags(&req.labels, self.env()),
                    node_pool,
                },
            )
            .await
            .context("create GKE cluster")?;
        self.wait(ctx, &session, op, format!("create cluster {}", req.cluster_name))
            .await?;

        let cluster = self
            .api
            .get_cluster(&session, &req.cluster_name)
            .await
            .context("get cluster")?;
        info!(cluster = %cluster.name, "GKE cluster created");
        Ok(CreateClusterResponse {
            cluster_name: req.cluster_name,
            cluster_id: cluster.id,
        })
    }

    async fn get_cluster(
        &self,
        ctx: &RequestContext,
        req: GetClusterRequest,
    ) -> CoreResult<GetClusterResponse> {
        require("cluster_name", &req.cluster_name)?;
        let session = self.session(ctx, &req.identity).await?;
        let cluster = self
            .api
            .get_cluster(&session, &req.cluster_name)
            .await
            .context("get cluster")?;
        Ok(GetClusterResponse {
            cluster: cluster_spec(cluster),
        })
    }

    async fn get_clusters(
        &self,
        ctx: &RequestContext,
        req: GetClustersRequest,
    ) -> CoreResult<GetClustersResponse> {
        let session = self.session(ctx, &req.identity).await?;
        let clusters = self
            .api
            .list_clusters(&session)
            .await
            .context("list clusters")?
            .into_iter()
            .map(cluster_spec)
            .collect();
        Ok(GetClustersResponse { clusters })
    }

    async fn cluster_status(
        &self,
        ctx: &RequestContext,
        req: ClusterStatusRequest,
    ) -> CoreResult<ClusterStatusResponse> {
        require("cluster_name", &req.cluster_name)?;
        let session = self.session(ctx, &req.identity).await?;
        let cluster = self
            .api
            .get_cluster(&session, &req.cluster_name)
            .await
            .context("get cluster")?;
        Ok(ClusterStatusResponse {
            status: cluster_status(cluster.status == GKE_RUNNING),
        })
    }

    async fn delete_cluster(
        &self,
        ctx: &RequestContext,
        req: DeleteClusterRequest,
    ) -> CoreResult<DeleteClusterResponse> {
        require("cluster_name", &req.cluster_name)?;
        let session = self.session(ctx, &req.identity).await?;

        if req.force_delete {
            let pools = self
                .api
                .list_node_pools(&session, &req.cluster_name)
                .await
                .context("list node pools")?;
            for pool in pools {
                info!(cluster = %req.cluster_name, pool = %pool, "deleting node pool");
                self.delete_pool_and_wait(ctx, &session, &req.cluster_name, &pool)
                    .await?;
            }
        }

        let op = self
            .api
            .delete_cluster(&session, &req.cluster_name)
            .await
            .context("delete cluster")?;
        self.wait(ctx, &session, op, format!("delete cluster {}", req.cluster_name))
            .await?;
        Ok(DeleteClusterResponse {})
    }

    async fn add_node(&self, ctx: &RequestContext, req: AddNodeRequest) -> CoreResult<AddNodeResponse> {
        require("cluster_name", &req.cluster_name)?;
        let pool = self.node_pool(&req.node)?;
        let session = self.session(ctx, &req.identity).await?;

        let name = pool.name.clone();
        let op = self
            .api
            .create_node_pool(&session, &req.cluster_name, pool)
            .await
            .context("create node pool")?;
        self.wait(
            ctx,
            &session,
            op,
            format!("create node pool {}/{name}", req.cluster_name),
        )
        .await?;
        Ok(AddNodeResponse {})
    }

    async fn delete_node(
        &self,
        ctx: &RequestContext,
        req: DeleteNodeRequest,
    ) -> CoreResult<DeleteNodeResponse> {
        require("cluster_name", &req.cluster_name)?;
        require("node_group", &req.node_group)?;
        let session = self.session(ctx, &req.identity).await?;
        self.delete_pool_and_wait(ctx, &session, &req.cluster_name, &req.node_group)
            .await?;
        Ok(DeleteNodeResponse {})
    }

    async fn tag_node_instance(
        &self,
        ctx: &RequestContext,
        req: TagNodeInstanceRequest,
    ) -> CoreResult<TagNodeInstanceResponse> {
        require("cluster_name", &req.cluster_name)?;
        require("node_group", &req.node_group)?;
        let session = self.session(ctx, &req.identity).await?;

        let ids = self
            .api
            .list_pool_instances(&session, &req.cluster_name, &req.node_group)
            .await
            .context("list instance group")?;
        if ids.is_empty() {
            return Err(CoreError::TransientEmptyResult(format!(
                "no instances in node pool {}/{} yet",
                req.cluster_name, req.node_group
            )));
        }

        let labels = resource_tags(&req.labels, self.env());
        self.api
            .set_instance_labels(&session, &ids, &labels)
            .await
            .context("set instance labels")?;
        Ok(TagNodeInstanceResponse { instance_ids: ids })
    }

    async fn add_token(&self, ctx: &RequestContext, req: AddTokenRequest) -> CoreResult<AddTokenResponse> {
        require("cluster_name", &req.cluster_name)?;
        let session = self.session(ctx, &req.identity).await?;
        let access = self.kube_access(&session, &req.cluster_name).await?;
        let secret_name = store_kube_access(&self.deps, ctx, &req.cluster_name, &access).await?;
        Ok(AddTokenResponse { secret_name })
    }

    async fn get_token(&self, ctx: &RequestContext, req: GetTokenRequest) -> CoreResult<GetTokenResponse> {
        require("cluster_name", &req.cluster_name)?;
        let session = self.session(ctx, &req.identity).await?;
        let access = self.kube_access(&session, &req.cluster_name).await?;
        Ok(GetTokenResponse {
            endpoint: access.endpoint,
            ca_data: access.ca_data,
            token: access.token,
        })
    }

    async fn register_with_rancher(
        &self,
        ctx: &RequestContext,
        req: RegisterWithRancherRequest,
    ) -> CoreResult<RegisterWithRancherResponse> {
        require("cluster_name", &req.cluster_name)?;
        let session = self.session(ctx, &req.identity).await?;
        let access = self.kube_access(&session, &req.cluster_name).await?;
        let reg = register_rancher(
            &self.deps,
            ctx,
            &req.cluster_name,
            access,
            resource_tags(&Labels::new(), self.env()),
        )
        .await?;
        Ok(RegisterWithRancherResponse {
            cluster_id: reg.cluster_id,
            manifest_url: reg.manifest_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_sizes_map_back_to_profiles() {
        for p in [MigProfile::Mig1g, MigProfile::Mig3g, MigProfile::Mig7g] {
            assert_eq!(mig_profile(partition_size(p)), Some(p));
        }
        assert_eq!(mig_profile("9g.80gb"), None);
    }

    #[test]
    fn accelerator_pool_reports_gpu() {
        let node = node_spec(GkeNodePool {
            name: "gpu".into(),
            machine_type: "a2-highgpu-1g".into(),
            node_count: 2,
            accelerator: Some(GkeAccelerator {
                accelerator_type: "nvidia-tesla-a100".into(),
                count: 1,
                partition_size: Some("3g.20gb".into()),
            }),
            ..Default::default()
        });
        assert!(node.gpu_enabled);
        assert_eq!(node.mig_profile, Some(MigProfile::Mig3g));
        assert_eq!(node.count, 2);
    }
}
