//! AWS adapter: EKS, EC2, Route53, ECR, Cost Explorer and S3.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use spawner_core::{
    CoreError, CoreResult, LongRunningOperation, OperationStatus, Provider, RequestContext,
    ResultExt, Session,
    catalog::{Cloud, is_gpu, resolve_instance},
    labels::{node_labels, resource_tags},
    wait_for_completion,
};
use spawner_model::*;
use tracing::{debug, info};

use crate::{
    AdapterDeps,
    api::{
        AwsApi, KubeAccess,
        aws::{
            ChangeAction, EKS_ACTIVE, EKS_CREATE_FAILED, EKS_FAILED, Ec2VolumeInput, EksCluster,
            EksClusterInput, EksNodegroup, EksNodegroupInput, OidcProviderInput, RecordChange,
        },
    },
    common::{
        cluster_status, cost_breakdown, cost_input, cost_series, register_rancher, require,
        store_kube_access, with_default_region,
    },
    fault::ApiFault,
};

pub const PROVIDER: &str = "aws";

/// Region of account-wide calls made without a caller region.
const GLOBAL_REGION: &str = "us-east-1";
const DEFAULT_COST_METRIC: &str = "BlendedCost";
const DEFAULT_PRESIGN_MINUTES: u32 = 10;
const ALIAS_TTL_SECONDS: u64 = 300;

pub(crate) const TAG_CLUSTER_NAME: &str = "eks:cluster-name";
pub(crate) const TAG_NODEGROUP_NAME: &str = "eks:nodegroup-name";

const AMI_STANDARD: &str = "AL2_x86_64";
const AMI_GPU: &str = "AL2_x86_64_GPU";

/// Deployment-level AWS settings.
#[derive(Debug, Clone, Default)]
pub struct AwsSettings {
    /// Route53 hosted zone the DNS operations act on.
    pub hosted_zone_id: String,
}

pub struct AwsProvider {
    api: Arc<dyn AwsApi>,
    deps: AdapterDeps,
    settings: AwsSettings,
}

/// Condition an [`AwsWait`] polls for.
#[derive(Debug, Clone)]
enum Target {
    ClusterActive(String),
    ClusterGone(String),
    NodegroupActive { cluster: String, nodegroup: String },
    NodegroupGone { cluster: String, nodegroup: String },
    VolumeAvailable(String),
    SnapshotCompleted(String),
}

impl Target {
    fn describe(&self) -> String {
        match self {
            Target::ClusterActive(c) => format!("wait cluster {c} active"),
            Target::ClusterGone(c) => format!("wait cluster {c} deleted"),
            Target::NodegroupActive { cluster, nodegroup } => {
                format!("wait nodegroup {cluster}/{nodegroup} active")
            }
            Target::NodegroupGone { cluster, nodegroup } => {
                format!("wait nodegroup {cluster}/{nodegroup} deleted")
            }
            Target::VolumeAvailable(v) => format!("wait volume {v} available"),
            Target::SnapshotCompleted(s) => format!("wait snapshot {s} completed"),
        }
    }
}

/// AWS has no operation handles; waits poll the describe calls.
struct AwsWait<'a> {
    api: &'a dyn AwsApi,
    session: &'a Session,
    target: Target,
    name: String,
}

fn eks_status(kind: &str, name: &str, status: &str) -> CoreResult<OperationStatus> {
    match status {
        EKS_ACTIVE => Ok(OperationStatus::done()),
        EKS_FAILED | EKS_CREATE_FAILED => {
            Err(CoreError::Provider(format!("{kind} {name} is {status}")))
        }
        _ => Ok(OperationStatus::Pending),
    }
}

fn gone<T>(res: Result<T, ApiFault>) -> CoreResult<OperationStatus> {
    match res {
        Err(ApiFault::NotFound(_)) => Ok(OperationStatus::done()),
        Err(e) => Err(e.into()),
        Ok(_) => Ok(OperationStatus::Pending),
    }
}

#[async_trait]
impl<'a> LongRunningOperation for AwsWait<'a> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&self) -> CoreResult<OperationStatus> {
        let (api, s) = (self.api, self.session);
        match &self.target {
            Target::ClusterActive(name) => {
                let c = api.describe_cluster(s, name).await?;
                eks_status("cluster", name, &c.status)
            }
            Target::ClusterGone(name) => gone(api.describe_cluster(s, name).await),
            Target::NodegroupActive { cluster, nodegroup } => {
                let ng = api.describe_nodegroup(s, cluster, nodegroup).await?;
                eks_status("nodegroup", nodegroup, &ng.status)
            }
            Target::NodegroupGone { cluster, nodegroup } => {
                gone(api.describe_nodegroup(s, cluster, nodegroup).await)
            }
            Target::VolumeAvailable(id) => {
                let v = api.describe_volume(s, id).await?;
                match v.state.as_str() {
                    "available" => Ok(OperationStatus::done()),
                    "error" => Err(CoreError::Provider(format!("volume {id} failed"))),
                    _ => Ok(OperationStatus::Pending),
                }
            }
            Target::SnapshotCompleted(id) => {
                let snap = api.describe_snapshot(s, id).await?;
                match snap.state.as_str() {
                    "completed" => Ok(OperationStatus::done()),
                    "error" => Err(CoreError::Provider(format!("snapshot {id} failed"))),
                    _ => Ok(OperationStatus::Pending),
                }
            }
        }
    }
}

impl AwsProvider {
    pub fn new(api: Arc<dyn AwsApi>, deps: AdapterDeps, settings: AwsSettings) -> Self {
        Self {
            api,
            deps,
            settings,
        }
    }

    async fn session(&self, ctx: &RequestContext, identity: &ProviderIdentity) -> CoreResult<Session> {
        self.deps.sessions.new_session(ctx, identity).await
    }

    async fn wait(&self, ctx: &RequestContext, session: &Session, target: Target) -> CoreResult<()> {
        let op = AwsWait {
            api: self.api.as_ref(),
            session,
            name: target.describe(),
            target,
        };
        let done = wait_for_completion(&op, &self.deps.poll, ctx).await?;
        debug!(operation = op.name(), polls = done.polls, "wait finished");
        Ok(())
    }

    fn env(&self) -> &str {
        self.deps.service.env()
    }

    fn hosted_zone(&self) -> CoreResult<&str> {
        let zone = self.settings.hosted_zone_id.trim();
        if zone.is_empty() {
            return Err(CoreError::Unsupported(
                "route53: no hosted zone configured".to_string(),
            ));
        }
        Ok(zone)
    }

    /// Validated nodegroup input; fails before any session exists.
    fn nodegroup_input(&self, node: &NodeSpec) -> CoreResult<EksNodegroupInput> {
        require("node.name", &node.name)?;
        let instance = resolve_instance(node, Cloud::Aws)?;
        let count = node.effective_count();

        let (capacity_type, instance_types) = match node.capacity {
            CapacityType::Spot if !node.spot_instances.is_empty() => {
                ("SPOT", node.spot_instances.clone())
            }
            CapacityType::Spot => ("SPOT", vec![instance]),
            CapacityType::OnDemand => ("ON_DEMAND", vec![instance]),
        };
        let labels = node_labels(node, self.env());

        Ok(EksNodegroupInput {
            name: node.name.clone(),
            instance_types,
            capacity_type: capacity_type.to_string(),
            ami_type: if is_gpu(node) { AMI_GPU } else { AMI_STANDARD }.to_string(),
            disk_size_gb: node.disk_size_gb,
            min_size: count,
            max_size: count,
            desired_size: count,
            tags: labels.clone(),
            labels,
        })
    }

    async fn create_nodegroup_and_wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        cluster: &str,
        input: EksNodegroupInput,
    ) -> CoreResult<()> {
        let nodegroup = input.name.clone();
        self.api
            .create_nodegroup(session, cluster, input)
            .await
            .context("create nodegroup")?;
        self.wait(
            ctx,
            session,
            Target::NodegroupActive {
                cluster: cluster.to_string(),
                nodegroup,
            },
        )
        .await
    }

    async fn delete_nodegroup_and_wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        cluster: &str,
        nodegroup: &str,
    ) -> CoreResult<()> {
        self.api
            .delete_nodegroup(session, cluster, nodegroup)
            .await
            .context("delete nodegroup")?;
        self.wait(
            ctx,
            session,
            Target::NodegroupGone {
                cluster: cluster.to_string(),
                nodegroup: nodegroup.to_string(),
            },
        )
        .await
    }

    async fn kube_access(&self, session: &Session, cluster: &str) -> CoreResult<KubeAccess> {
        let c = self
            .api
            .describe_cluster(session, cluster)
            .await
            .context("describe cluster")?;
        let token = self
            .api
            .cluster_token(session, cluster)
            .await
            .context("cluster token")?;
        Ok(KubeAccess {
            endpoint: c.endpoint,
            ca_data: c.ca_data,
            token,
        })
    }

    fn cluster_spec(session: &Session, cluster: EksCluster, nodes: Vec<EksNodegroup>) -> ClusterSpec {
        ClusterSpec {
            cluster_id: cluster.arn,
            name: cluster.name,
            provider: PROVIDER.to_string(),
            region: session.region().to_string(),
            nodes: nodes.into_iter().map(node_spec).collect(),
            labels: cluster.tags,
        }
    }

    async fn snapshot_and_wait(
        &self,
        ctx: &RequestContext,
        session: &Session,
        volume_id: &str,
        labels: &Labels,
    ) -> CoreResult<String> {
        let tags = resource_tags(labels, self.env());
        let snap = self
            .api
            .create_snapshot(session, volume_id, &tags)
            .await
            .context("create snapshot")?;
        self.wait(ctx, session, Target::SnapshotCompleted(snap.id.clone()))
            .await?;
        Ok(snap.id)
    }

    async fn change_records(
        &self,
        ctx: &RequestContext,
        identity: &ProviderIdentity,
        changes: Vec<RecordChange>,
    ) -> CoreResult<String> {
        let zone = self.hosted_zone()?;
        let session = self.session(ctx, &with_default_region(identity, GLOBAL_REGION)).await?;
        let change_id = self
            .api
            .change_record_sets(&session, zone, changes)
            .await
            .context("change record sets")?;
        info!(zone, change_id = %change_id, "route53 change submitted");
        Ok(change_id)
    }

    async fn cost_periods(
        &self,
        ctx: &RequestContext,
        identity: &ProviderIdentity,
        query: &CostQuery,
    ) -> CoreResult<Vec<crate::api::CostPeriod>> {
        let input = cost_input(query, DEFAULT_COST_METRIC)?;
        let session = self.session(ctx, &with_default_region(identity, GLOBAL_REGION)).await?;
        Ok(self
            .api
            .cost_and_usage(&session, input)
            .await
            .context("cost and usage")?)
    }
}

fn node_spec(ng: EksNodegroup) -> NodeSpec {
    let spot = ng.capacity_type == "SPOT";
    NodeSpec {
        instance: ng.instance_types.first().cloned(),
        count: ng.desired_size,
        disk_size_gb: ng.disk_size_gb,
        capacity: if spot {
            CapacityType::Spot
        } else {
            CapacityType::OnDemand
        },
        spot_instances: if spot { ng.instance_types } else { Vec::new() },
        labels: ng.labels,
        ..NodeSpec::new(ng.name)
    }
}

fn record_changes(action: ChangeAction, records: Vec<DnsRecordSet>) -> CoreResult<Vec<RecordChange>> {
    if records.is_empty() {
        return Err(CoreError::invalid("at least one record is required"));
    }
    records
        .into_iter()
        .map(|record| {
            require("record.name", &record.name)?;
            require("record.type", &record.record_type)?;
            Ok(RecordChange {
                action,
                record,
                alias_target: None,
                latency_region: None,
            })
        })
        .collect()
}

#[async_trait]
impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn create_cluster(
        &self,
        ctx: &RequestContext,
        req: CreateClusterRequest,
    ) -> CoreResult<CreateClusterResponse> {
        require("cluster_name", &req.cluster_name)?;
        let nodegroup = self.nodegroup_input(&req.node)?;
        let session = self.session(ctx, &req.identity).await?;

        let cluster = self
            .api
            .create_cluster(
                &session,
                EksClusterInput {
                    name: req.cluster_name.clone(),
                    tags: resource_tags(&req.labels, self.env()),
                },
            )
            .await
            .context("create EKS cluster")?;
        self.wait(ctx, &session, Target::ClusterActive(req.cluster_name.clone()))
            .await?;
        info!(cluster = %req.cluster_name, "cluster active, adding initial nodegroup");

        self.create_nodegroup_and_wait(ctx, &session, &req.cluster_name, nodegroup)
            .await?;

        Ok(CreateClusterResponse {
            cluster_name: req.cluster_name,
            cluster_id: cluster.arn,
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
            .describe_cluster(&session, &req.cluster_name)
            .await
            .context("describe cluster")?;
        let names = self
            .api
            .list_nodegroups(&session, &req.cluster_name)
            .await
            .context("list nodegroups")?;
        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            nodes.push(
                self.api
                    .describe_nodegroup(&session, &req.cluster_name, &name)
                    .await
                    .context("describe nodegroup")?,
            );
        }

        Ok(GetClusterResponse {
            cluster: Self::cluster_spec(&session, cluster, nodes),
        })
    }

    async fn get_clusters(
        &self,
        ctx: &RequestContext,
        req: GetClustersRequest,
    ) -> CoreResult<GetClustersResponse> {
        let session = self.session(ctx, &req.identity).await?;
        let names = self
            .api
            .list_clusters(&session)
            .await
            .context("list clusters")?;

        let mut clusters = Vec::with_capacity(names.len());
        for name in names {
            match self.api.describe_cluster(&session, &name).await {
                Ok(c) => clusters.push(Self::cluster_spec(&session, c, Vec::new())),
                // Deleted between list and describe.
                Err(ApiFault::NotFound(_)) => continue,
                Err(e) => return Err(CoreError::from(e).context("describe cluster")),
            }
        }
        Ok(GetClustersResponse { clusters })
    }

    async fn cluster_status(
        &self,
        ctx: &RequestContext,
        req: ClusterStatusRequest,
    ) -> CoreResult<ClusterStatusResponse> {
        require("cluster_name", &req.cluster_name)?;
        let session = self.session(ctx, &req.identity).await?;
        let c = self
            .api
            .describe_cluster(&session, &req.cluster_name)
            .await
            .context("describe cluster")?;
        Ok(ClusterStatusResponse {
            status: cluster_status(c.status == EKS_ACTIVE),
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
            let nodegroups = self
                .api
                .list_nodegroups(&session, &req.cluster_name)
                .await
                .context("list nodegroups")?;
            for nodegroup in nodegroups {
                info!(cluster = %req.cluster_name, nodegroup = %nodegroup, "deleting nodegroup");
                self.delete_nodegroup_and_wait(ctx, &session, &req.cluster_name, &nodegroup)
                    .await?;
            }
        }

        self.api
            .delete_cluster(&session, &req.cluster_name)
            .await
            .context("delete cluster")?;
        self.wait(ctx, &session, Target::ClusterGone(req.cluster_name.clone()))
            .await?;
        Ok(DeleteClusterResponse {})
    }

    async fn add_node(&self, ctx: &RequestContext, req: AddNodeRequest) -> CoreResult<AddNodeResponse> {
        require("cluster_name", &req.cluster_name)?;
        let input = self.nodegroup_input(&req.node)?;
        let session = self.session(ctx, &req.identity).await?;
        self.create_nodegroup_and_wait(ctx, &session, &req.cluster_name, input)
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
        self.delete_nodegroup_and_wait(ctx, &session, &req.cluster_name, &req.node_group)
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

        self.api
            .describe_cluster(&session, &req.cluster_name)
            .await
            .context("describe cluster")?;
        let filters = [
            (TAG_CLUSTER_NAME.to_string(), req.cluster_name.clone()),
            (TAG_NODEGROUP_NAME.to_string(), req.node_group.clone()),
        ];
        let ids = self
            .api
            .describe_instances(&session, &filters)
            .await
            .context("describe instances")?;
        if ids.is_empty() {
            return Err(CoreError::TransientEmptyResult(format!(
                "no instances in nodegroup {}/{} yet",
                req.cluster_name, req.node_group
            )));
        }

        let tags = resource_tags(&req.labels, self.env());
        self.api
            .create_tags(&session, &ids, &tags)
            .await
            .context("create tags")?;
        info!(count = ids.len(), nodegroup = %req.node_group, "tagged node instances");
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
        let snapshot_id = req.snapshot_id.filter(|s| !s.trim().is_empty());
        let session = self.session(ctx, &req.identity).await?;

        let volume = self
            .api
            .create_volume(
                &session,
                Ec2VolumeInput {
                    availability_zone: req.availability_zone,
                    volume_type: req.volume_type,
                    size_gb: req.size_gb,
                    snapshot_id: snapshot_id.clone(),
                    tags: resource_tags(&req.labels, self.env()),
                },
            )
            .await
            .context("create volume")?;
        self.wait(ctx, &session, Target::VolumeAvailable(volume.id.clone()))
            .await?;

        if let (true, Some(snapshot)) = (req.delete_snapshot, snapshot_id.as_deref()) {
            self.api
                .delete_snapshot(&session, snapshot)
                .await
                .context("delete source snapshot")?;
            info!(snapshot, volume = %volume.id, "deleted source snapshot");
        }
        Ok(CreateVolumeResponse {
            volume_id: volume.id,
        })
    }

    async fn get_volume(
        &self,
        ctx: &RequestContext,
        req: GetVolumeRequest,
    ) -> CoreResult<GetVolumeResponse> {
        require("volume_id", &req.volume_id)?;
        let session = self.session(ctx, &req.identity).await?;
        let v = self
            .api
            .describe_volume(&session, &req.volume_id)
            .await
            .context("describe volume")?;
        Ok(GetVolumeResponse {
            volume: VolumeSpec {
                id: v.id,
                size_gb: v.size_gb,
                volume_type: v.volume_type,
                availability_zone: v.availability_zone,
                region: session.region().to_string(),
                source_snapshot: v.snapshot_id,
                labels: v.tags,
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
        self.api
            .delete_volume(&session, &req.volume_id)
            .await
            .context("delete volume")?;
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
        self.api
            .delete_snapshot(&session, &req.snapshot_id)
            .await
            .context("delete snapshot")?;
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
        self.api
            .delete_volume(&session, &req.volume_id)
            .await
            .context("delete volume")?;
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
        let snapshot_id = self
            .api
            .copy_snapshot(&session, &req.source_region, &req.snapshot_id, &tags)
            .await
            .context("copy snapshot")?;
        self.wait(ctx, &session, Target::SnapshotCompleted(snapshot_id.clone()))
            .await?;
        Ok(CopySnapshotResponse { snapshot_id })
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

    async fn add_route53_record(
        &self,
        ctx: &RequestContext,
        req: AddRoute53RecordRequest,
    ) -> CoreResult<AddRoute53RecordResponse> {
        require("dns_name", &req.dns_name)?;
        require("record_name", &req.record_name)?;

        let latency_region = req
            .region_identifier
            .filter(|r| !r.trim().is_empty())
            .map(|_| with_default_region(&req.identity, GLOBAL_REGION).region);
        let (values, alias_target) = if req.is_aws_resource {
            (Vec::new(), Some(req.dns_name))
        } else {
            (vec![req.dns_name], None)
        };
        let change = RecordChange {
            action: ChangeAction::Upsert,
            record: DnsRecordSet {
                record_type: "A".to_string(),
                name: req.record_name,
                values,
                ttl_seconds: ALIAS_TTL_SECONDS,
            },
            alias_target,
            latency_region,
        };

        let change_id = self.change_records(ctx, &req.identity, vec![change]).await?;
        Ok(AddRoute53RecordResponse { change_id })
    }

    async fn create_route53_records(
        &self,
        ctx: &RequestContext,
        req: CreateRoute53RecordsRequest,
    ) -> CoreResult<CreateRoute53RecordsResponse> {
        let changes = record_changes(ChangeAction::Create, req.records)?;
        let change_id = self.change_records(ctx, &req.identity, changes).await?;
        Ok(CreateRoute53RecordsResponse { change_id })
    }

    async fn get_route53_txt_records(
        &self,
        ctx: &RequestContext,
        req: GetRoute53TxtRecordsRequest,
    ) -> CoreResult<GetRoute53TxtRecordsResponse> {
        let zone = self.hosted_zone()?;
        let session = self.session(ctx, &with_default_region(&req.identity, GLOBAL_REGION)).await?;
        let records = self
            .api
            .list_record_sets(&session, zone)
            .await
            .context("list record sets")?
            .into_iter()
            .filter(|r| r.record_type.eq_ignore_ascii_case("TXT"))
            .collect();
        Ok(GetRoute53TxtRecordsResponse { records })
    }

    async fn delete_route53_records(
        &self,
        ctx: &RequestContext,
        req: DeleteRoute53RecordsRequest,
    ) -> CoreResult<DeleteRoute53RecordsResponse> {
        let changes = record_changes(ChangeAction::Delete, req.records)?;
        let change_id = self.change_records(ctx, &req.identity, changes).await?;
        Ok(DeleteRoute53RecordsResponse { change_id })
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

    async fn register_cluster_oidc(
        &self,
        ctx: &RequestContext,
        req: RegisterClusterOidcRequest,
    ) -> CoreResult<RegisterClusterOidcResponse> {
        require("cluster_name", &req.cluster_name)?;
        require("issuer_url", &req.issuer_url)?;
        require("client_id", &req.client_id)?;
        let session = self.session(ctx, &req.identity).await?;
        self.api
            .associate_identity_provider(
                &session,
                &req.cluster_name,
                OidcProviderInput {
                    config_name: format!("{}-oidc", req.cluster_name),
                    issuer_url: req.issuer_url,
                    client_id: req.client_id,
                },
            )
            .await
            .context("associate identity provider")?;
        Ok(RegisterClusterOidcResponse {})
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

    async fn get_container_registry_auth(
        &self,
        ctx: &RequestContext,
        req: GetContainerRegistryAuthRequest,
    ) -> CoreResult<GetContainerRegistryAuthResponse> {
        let session = self.session(ctx, &req.identity).await?;
        let auth = self
            .api
            .ecr_authorization(&session)
            .await
            .context("ecr authorization")?;
        Ok(GetContainerRegistryAuthResponse {
            token: auth.token,
            url: auth.endpoint,
            expires_at: auth.expires_at,
        })
    }

    async fn create_container_registry_repo(
        &self,
        ctx: &RequestContext,
        req: CreateContainerRegistryRepoRequest,
    ) -> CoreResult<CreateContainerRegistryRepoResponse> {
        require("name", &req.name)?;
        let session = self.session(ctx, &req.identity).await?;
        let tags = resource_tags(&req.labels, self.env());
        let repo = self
            .api
            .create_repository(&session, &req.name, req.image_tag_mutable, &tags)
            .await
            .context("create repository")?;
        Ok(CreateContainerRegistryRepoResponse {
            registry_id: repo.registry_id,
            repository_uri: repo.uri,
        })
    }

    async fn presign_s3_url(
        &self,
        ctx: &RequestContext,
        req: PresignS3UrlRequest,
    ) -> CoreResult<PresignS3UrlResponse> {
        require("bucket", &req.bucket)?;
        require("file", &req.file)?;
        let minutes = if req.timeout_minutes == 0 {
            DEFAULT_PRESIGN_MINUTES
        } else {
            req.timeout_minutes
        };
        let key = if req.file.starts_with('/') {
            req.file
        } else {
            format!("/{}", req.file)
        };

        let session = self.session(ctx, &req.identity).await?;
        let signed_url = self
            .api
            .presign_get_object(
                &session,
                &req.bucket,
                &key,
                Duration::from_secs(u64::from(minutes) * 60),
            )
            .await
            .context("presign object")?;
        debug!(bucket = %req.bucket, key = %key, minutes, "presigned object url");
        Ok(PresignS3UrlResponse { signed_url })
    }
}
