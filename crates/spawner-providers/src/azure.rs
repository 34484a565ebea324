//! Azure adapter: AKS, managed disks and Cost Management.
use std::sync::Arc;

use async_trait::async_trait;
use spawner_core::{
    CoreError, CoreResult, Provider, RequestContext, ResultExt, Session,
    catalog::{Cloud, is_gpu, resolve_instance},
    labels::{node_labels, resource_tags},
    wait::Completion,
    wait_for_completion,
};
use spawner_model::*;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    AdapterDeps,
    api::{
        AzureApi, CostPeriod, KubeAccess,
        azure::{AksAgentPool, AksCluster, AksClusterInput, AzureDiskInput, POWER_RUNNING},
    },
    common::{
        OperationWait, cluster_status, cost_breakdown, cost_input, cost_series, register_rancher,
        require, store_kube_access, with_default_region,
    },
};

pub const PROVIDER: &str = "azure";

const DEFAULT_LOCATION: &str = "eastus";
const DEFAULT_COST_METRIC: &str = "ActualCost";
/// Completion status of a delete whose target did not exist.
const HTTP_NO_CONTENT: u16 = 204;

pub struct AzureProvider {
    api: Arc<dyn AzureApi>,
    deps: AdapterDeps,
}

impl AzureProvider {
    pub fn new(api: Arc<dyn AzureApi>, deps: AdapterDeps) -> Self {
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
    ) -> CoreResult<Completion> {
        let op = OperationWait::new(self.api.as_ref(), session, operation, name);
        wait_for_completion(&op, &self.deps.poll, ctx).await
    }

    /// Wait on a delete and report HTTP 204 as a missing target.
    async fn wait_delete(
        &self,
        ctx: &RequestContext,
        session: &Session,
        operation: String,
        what: String,
    ) -> CoreResult<()> {
        let done = self
            .wait(ctx, session, operation, format!("delete {what}"))
            .await?;
        if done.http_status == Some(HTTP_NO_CONTENT) {
            return Err(CoreError::NotFound(format!("{what} not found")));
        }
        Ok(())
    }

    fn env(&self) -> &str {
        self.deps.service.env()
    }

    fn agent_pool(&self, node: &NodeSpec) -> CoreResult<AksAgentPool> {
        require("node.name", &node.name)?;
        let vm_size = resolve_instance(node, Cloud::Azure)?;
        let count = node.effective_count();
        let labels = node_labels(node, self.env());

        Ok(AksAgentPool {
            name: node.name.clone(),
            vm_size,
            count,
            enable_auto_scaling: true,
            min_count: count,
            max_count: count,
            os_disk_size_gb: node.disk_size_gb,
            spot: node.capacity == CapacityType::Spot,
            tags: labels.clone(),
            node_labels: labels,
            gpu_instance_profile: node
                .mig_profile
                .filter(|_| is_gpu(node))
                .map(|p| p.as_str().to_string()),
        })
    }

    async fn kube_access(&self, session: &Session, cluster: &str) -> CoreResult<KubeAccess> {
        Ok(self
            .api
            .cluster_user_credentials(session, cluster)
            .await
            .context("cluster credentials")?)
    }

    async fn snapshot_and_wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        disk_id: &str,
        labels: &Labels,
    ) -> CoreResult<String> {
        let tags = resource_tags(labels, self.env());
        let accepted = self
            .api
            .begin_create_snapshot(session, disk_id, &tags)
            .await
            .context("create snapshot")?;
        self.wait(
            ctx,
            session,
            accepted.operation,
            format!("snapshot {}", accepted.resource_id),
        )
        .await?;
        Ok(accepted.resource_id)
    }

    async fn delete_disk_and_wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        disk_id: &str,
    ) -> CoreResult<()> {
        let op = self
            .api
            .begin_delete_disk(session, disk_id)
            .await
            .context("delete disk")?;
        self.wait_delete(ctx, session, op, format!("disk '{disk_id}'"))
            .await
    }

    async fn delete_snapshot_and_wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        snapshot: &str,
    ) -> CoreResult<()> {
        let op = self
            .api
            .begin_delete_snapshot(session, snapshot)
            .await
            .context("delete snapshot")?;
        self.wait_delete(ctx, session, op, format!("snapshot '{snapshot}'"))
            .await
    }

    async fn cost_periods(
        &self,
        ctx: &RequestContext,
        identity: &ProviderIdentity,
        query: &CostQuery,
    ) -> CoreResult<Vec<CostPeriod>> {
        let input = cost_input(query, DEFAULT_COST_METRIC)?;
        let session = self
            .session(ctx, &with_default_region(identity, DEFAULT_LOCATION))
            .await?;
        Ok(self
            .api
            .query_cost(&session, input)
            .await
            .context("query cost")?)
    }
}

fn cluster_spec(cluster: AksCluster) -> ClusterSpec {
    ClusterSpec {
        cluster_id: cluster.id,
        name: cluster.name,
        provider: PROVIDER.to_string(),
        region: cluster.location,
        nodes: cluster.agent_pools.into_iter().map(node_spec).collect(),
        labels: cluster.tags,
    }
}

fn node_spec(pool: AksAgentPool) -> NodeSpec {
    NodeSpec {
        instance: Some(pool.vm_size),
        count: pool.count,
        disk_size_gb: pool.os_disk_size_gb,
        capacity: if pool.spot {
            CapacityType::Spot
        } else {
            CapacityType::OnDemand
        },
        gpu_enabled: pool.gpu_instance_profile.is_some(),
        mig_profile: pool
            .gpu_instance_profile
            .as_deref()
            .and_then(|p| p.parse().ok()),
        labels: pool.node_labels,
        ..NodeSpec::new(pool.name)
    }
}

#[async_trait]
impl Provider for AzureProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn create_cluster(
        &self,
        ctx: &RequestContext,
        req: CreateClusterRequest,
    ) -> CoreResult<CreateClusterResponse> {
        require("cluster_name", &req.cluster_name)?;
        let agent_pool = self.agent_pool(&req.node)?;
        let session = self.session(ctx, &req.identity).await?;

        let op = self
            .api
            .begin_create_cluster(
                &session,
                AksClusterInput {
                    name: req.cluster_name.clone(),
                    location: session.region().to_string(),
                    tags: resource_tags(&req.labels, self.env()),
                    agent_pool,
                },
            )
            .await
            .context("create AKS cluster")?;
        self.wait(ctx, &session, op, format!("create cluster {}", req.cluster_name))
            .await?;

        let cluster = self
            .api
            .get_cluster(&session, &req.cluster_name)
            .await
            .context("get cluster")?;
        info!(cluster = %cluster.name, id = %cluster.id, "AKS cluster created");
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
            .filter(|c| c.location.eq_ignore_ascii_case(session.region()))
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
            status: cluster_status(cluster.power_state == POWER_RUNNING),
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
                .list_agent_pools(&session, &req.cluster_name)
                .await
                .context("list agent pools")?;
            for pool in pools {
                info!(cluster = %req.cluster_name, pool = %pool, "deleting agent pool");
                let op = self
                    .api
                    .begin_delete_agent_pool(&session, &req.cluster_name, &pool)
                    .await
                    .context("delete agent pool")?;
                match self
                    .wait_delete(ctx, &session, op, format!("node pool '{pool}'"))
                    .await
                {
                    Err(e) if e.is_not_found() => debug!(pool = %pool, "agent pool already gone"),
                    other => other?,
                }
            }
        }

        let op = self
            .api
            .begin_delete_cluster(&session, &req.cluster_name)
            .await
            .context("delete cluster")?;
        self.wait_delete(ctx, &session, op, format!("cluster '{}'", req.cluster_name))
            .await?;
        Ok(DeleteClusterResponse {})
    }

    async fn add_node(&self, ctx: &RequestContext, req: AddNodeRequest) -> CoreResult<AddNodeResponse> {
        require("cluster_name", &req.cluster_name)?;
        let pool = self.agent_pool(&req.node)?;
        let session = self.session(ctx, &req.identity).await?;

        let name = pool.name.clone();
        let op = self
            .api
            .begin_create_agent_pool(&session, &req.cluster_name, pool)
            .await
            .context("create agent pool")?;
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

        let op = self
            .api
            .begin_delete_agent_pool(&session, &req.cluster_name, &req.node_group)
            .await
            .context("delete agent pool")?;
        self.wait_delete(
            ctx,
            &session,
            op,
            format!(
                "node pool '{}' in cluster '{}'",
                req.node_group, req.cluster_name
            ),
        )
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
            .context("list scale set instances")?;
        if ids.is_empty() {
            return Err(CoreError::TransientEmptyResult(format!(
                "no instances in node pool {}/{} yet",
                req.cluster_name, req.node_group
            )));
        }

        let tags = resource_tags(&req.labels, self.env());
        self.api
            .update_instance_tags(&session, &ids, &tags)
            .await
            .context("update instance tags")?;
        Ok(TagNodeInstanceResponse { instance_ids: ids })
    }

    async fn create_volume(
        &self,
        ctx: &RequestContext,
        req: CreateVolumeRequest,
    ) -> CoreResult<CreateVolumeResponse> {
        require("availability_zone", &req.availability_zone)?;
        require("volume_type", &req.volume_type)?;
        if req.size_gb == 0 {
            return Err(CoreError::invalid("size_gb must be positive"));
        }
        let source = req
            .snapshot_uri
            .or(req.snapshot_id)
            .filter(|s| !s.trim().is_empty());
        let session = self.session(ctx, &req.identity).await?;

        let name = format!("vol-{}-{}", req.size_gb, &Uuid::new_v4().simple().to_string()[..12]);
        let accepted = self
            .api
            .begin_create_disk(
                &session,
                AzureDiskInput {
                    name,
                    location: session.region().to_string(),
                    zone: req.availability_zone,
                    sku: req.volume_type,
                    size_gb: req.size_gb,
                    source_snapshot_uri: source.clone(),
                    tags: resource_tags(&req.labels, self.env()),
                },
            )
            .await
            .context("create disk")?;
        self.wait(
            ctx,
            &session,
            accepted.operation,
            format!("create disk {}", accepted.resource_id),
        )
        .await?;

        if let (true, Some(snapshot)) = (req.delete_snapshot, source.as_deref()) {
            self.delete_snapshot_and_wait(ctx, &session, snapshot).await?;
            info!(snapshot, "deleted source snapshot");
        }
        Ok(CreateVolumeResponse {
            volume_id: accepted.resource_id,
        })
    }

    async fn get_volume(
        &self,
        ctx: &RequestContext,
        req: GetVolumeRequest,
    ) -> CoreResult<GetVolumeResponse> {
        require("volume_id", &req.volume_id)?;
        let session = self.session(ctx, &req.identity).await?;
        let disk = self
            .api
            .get_disk(&session, &req.volume_id)
            .await
            .context("get disk")?;
        Ok(GetVolumeResponse {
            volume: VolumeSpec {
                id: disk.id,
                size_gb: disk.size_gb,
                volume_type: disk.sku,
                availability_zone: disk.zone,
                region: disk.location,
                source_snapshot: disk.source_snapshot_uri,
                labels: disk.tags,
            },
        })
    }

    async fn delete_volume(
        &self,
        ctx: &RequestContext,
        req: DeleteVolumeRequest,
    ) -> CoreResult<DeleteVolumeResponse> {
        require("volume_id", &req.volume_id)?;
        let session = self.session(ctx, &req.identity).await?;
        self.delete_disk_and_wait(ctx, &session, &req.volume_id)
            .await?;
        Ok(DeleteVolumeResponse { deleted: true })
    }

    async fn create_snapshot(
        &self,
        ctx: &RequestContext,
        req: CreateSnapshotRequest,
    ) -> CoreResult<CreateSnapshotResponse> {
        require("volume_id", &req.volume_id)?;
        let session = self.session(ctx, &req.identity).await?;
        let snapshot_id = self
            .snapshot_and_wait(ctx, &session, &req.volume_id, &req.labels)
            .await?;
        Ok(CreateSnapshotResponse { snapshot_id })
    }

    async fn delete_snapshot(
        &self,
        ctx: &RequestContext,
        req: DeleteSnapshotRequest,
    ) -> CoreResult<DeleteSnapshotResponse> {
        require("snapshot_id", &req.snapshot_id)?;
        let session = self.session(ctx, &req.identity).await?;
        self.delete_snapshot_and_wait(ctx, &session, &req.snapshot_id)
            .await?;
        Ok(DeleteSnapshotResponse {})
    }

    async fn create_snapshot_and_delete(
        &self,
        ctx: &RequestContext,
        req: CreateSnapshotAndDeleteRequest,
    ) -> CoreResult<CreateSnapshotAndDeleteResponse> {
        require("volume_id", &req.volume_id)?;
        let session = self.session(ctx, &req.identity).await?;
        let snapshot_id = self
            .snapshot_and_wait(ctx, &session, &req.volume_id, &req.labels)
            .await?;
        self.delete_disk_and_wait(ctx, &session, &req.volume_id)
            .await?;
        Ok(CreateSnapshotAndDeleteResponse {
            snapshot_id,
            volume_deleted: true,
        })
    }

    async fn copy_snapshot(
        &self,
        ctx: &RequestContext,
        req: CopySnapshotRequest,
    ) -> CoreResult<CopySnapshotResponse> {
        require("snapshot_id", &req.snapshot_id)?;
        require("source_region", &req.source_region)?;
        let session = self.session(ctx, &req.identity).await?;
        let tags = resource_tags(&req.labels, self.env());
        let accepted = self
            .api
            .begin_copy_snapshot(&session, &req.source_region, &req.snapshot_id, &tags)
            .await
            .context("copy snapshot")?;
        self.wait(
            ctx,
            &session,
            accepted.operation,
            format!("copy snapshot {}", req.snapshot_id),
        )
        .await?;
        Ok(CopySnapshotResponse {
            snapshot_id: accepted.resource_id,
        })
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

    async fn get_workspaces_cost(
        &self,
        ctx: &RequestContext,
        req: GetWorkspacesCostRequest,
    ) -> CoreResult<GetWorkspacesCostResponse> {
        let periods = self.cost_periods(ctx, &req.identity, &req.query).await?;
        Ok(GetWorkspacesCostResponse {
            cost: cost_breakdown(&periods, &req.query.group_by.key),
        })
    }

    async fn get_applications_cost(
        &self,
        ctx: &RequestContext,
        req: GetApplicationsCostRequest,
    ) -> CoreResult<GetApplicationsCostResponse> {
        let periods = self.cost_periods(ctx, &req.identity, &req.query).await?;
        Ok(GetApplicationsCostResponse {
            cost: cost_breakdown(&periods, &req.query.group_by.key),
        })
    }

    async fn get_cost_by_time(
        &self,
        ctx: &RequestContext,
        req: GetCostByTimeRequest,
    ) -> CoreResult<GetCostByTimeResponse> {
        let periods = self.cost_periods(ctx, &req.identity, &req.query).await?;
        Ok(GetCostByTimeResponse {
            series: cost_series(&periods, &req.query.group_by.key),
        })
    }
}
