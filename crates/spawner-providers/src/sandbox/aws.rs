use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use async_trait::async_trait;
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use spawner_core::Session;
use spawner_model::{CredentialType, Credentials, DnsRecordSet, Labels, Secret};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::trace;
use uuid::Uuid;

use super::{
    SANDBOX_AWS_ACCOUNT_ID, SandboxConfig, Shelf, expect_credentials, scope,
    state::{Lifecycle, PoolInstances, cost_report, short_id},
};
use crate::{
    api::{
        CostInput, CostPeriod,
        aws::{
            AwsApi, ChangeAction, EKS_ACTIVE, EcrAuth, EcrRepository, Ec2Snapshot, Ec2Volume,
            Ec2VolumeInput, EksCluster, EksClusterInput, EksNodegroup, EksNodegroupInput,
            OidcProviderInput, RecordChange,
        },
    },
    aws::{TAG_CLUSTER_NAME, TAG_NODEGROUP_NAME},
    fault::{ApiFault, ApiResult},
};

type Scope = (String, String);

struct NodegroupEntry {
    nodegroup: EksNodegroup,
    life: Lifecycle,
    instances: PoolInstances,
}

struct ClusterEntry {
    cluster: EksCluster,
    life: Lifecycle,
    nodegroups: BTreeMap<String, NodegroupEntry>,
    identity_providers: Vec<OidcProviderInput>,
}

struct VolumeEntry {
    scope: Scope,
    volume: Ec2Volume,
    life: Lifecycle,
}

struct SnapshotEntry {
    scope: Scope,
    snapshot: Ec2Snapshot,
    life: Lifecycle,
}

#[derive(Default)]
struct AwsState {
    clusters: BTreeMap<Scope, BTreeMap<String, ClusterEntry>>,
    volumes: HashMap<String, VolumeEntry>,
    snapshots: HashMap<String, SnapshotEntry>,
    instance_tags: HashMap<String, Labels>,
    /// Zone id to records keyed by `(name, type)`.
    zones: HashMap<String, BTreeMap<(String, String), DnsRecordSet>>,
    changes: u64,
    repositories: BTreeMap<Scope, BTreeMap<String, EcrRepository>>,
}

impl AwsState {
    fn cluster(&mut self, s: &Session, name: &str) -> ApiResult<&mut ClusterEntry> {
        self.clusters
            .get_mut(&scope(s))
            .and_then(|c| c.get_mut(name))
            .ok_or_else(|| ApiFault::not_found(format!("No cluster found for name: {name}.")))
    }

    fn volume(&mut self, s: &Session, id: &str) -> ApiResult<&mut VolumeEntry> {
        self.volumes
            .get_mut(id)
            .filter(|v| v.scope == scope(s))
            .ok_or_else(|| ApiFault::not_found(format!("The volume '{id}' does not exist.")))
    }

    fn snapshot(&mut self, scope: &Scope, id: &str) -> ApiResult<&mut SnapshotEntry> {
        self.snapshots
            .get_mut(id)
            .filter(|snap| &snap.scope == scope)
            .ok_or_else(|| ApiFault::not_found(format!("The snapshot '{id}' does not exist.")))
    }
}

/// Sandbox EKS, EC2, Route53, ECR, Cost Explorer and S3.
pub struct SandboxAws {
    shelf: Shelf<AwsState>,
}

impl SandboxAws {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            shelf: Shelf::new(config),
        }
    }

    /// Make every delete of `cluster` fail with a provider error.
    pub fn fail_cluster_delete(&self, cluster: &str) {
        self.shelf.fail_delete(cluster);
    }

    fn settle(&self) -> u32 {
        self.shelf.config.settle_polls
    }

    fn access_key(s: &Session) -> ApiResult<String> {
        match expect_credentials(s, CredentialType::Aws)? {
            Credentials::Aws(c) => Ok(c.access_key_id.clone()),
            _ => Err(ApiFault::api("AuthFailure", "aws credentials expected")),
        }
    }
}

fn instance_id() -> String {
    format!("i-{}", short_id(17))
}

fn filter_value<'a>(filters: &'a [(String, String)], key: &str) -> Option<&'a str> {
    filters
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl AwsApi for SandboxAws {
    async fn create_cluster(&self, s: &Session, input: EksClusterInput) -> ApiResult<EksCluster> {
        Self::access_key(s)?;
        let mut state = self.shelf.lock()?;
        let clusters = state.clusters.entry(scope(s)).or_default();
        if clusters.contains_key(&input.name) {
            return Err(ApiFault::api(
                "ResourceInUseException",
                format!("Cluster already exists with name: {}", input.name),
            ));
        }

        let region = s.region();
        let life = Lifecycle::toward("CREATING", EKS_ACTIVE, self.settle());
        let cluster = EksCluster {
            name: input.name.clone(),
            arn: format!(
                "arn:aws:eks:{region}:{SANDBOX_AWS_ACCOUNT_ID}:cluster/{}",
                input.name
            ),
            status: life.status().to_string(),
            endpoint: format!(
                "https://{}.gr7.{region}.eks.amazonaws.com",
                short_id(32).to_uppercase()
            ),
            ca_data: STANDARD.encode(format!("sandbox-ca/{}", input.name)),
            tags: input.tags,
        };
        clusters.insert(
            input.name,
            ClusterEntry {
                cluster: cluster.clone(),
                life,
                nodegroups: BTreeMap::new(),
                identity_providers: Vec::new(),
            },
        );
        trace!(cluster = %cluster.name, region, "sandbox eks cluster created");
        Ok(cluster)
    }

    async fn describe_cluster(&self, s: &Session, name: &str) -> ApiResult<EksCluster> {
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(s, name)?;
        if entry.life.observe() {
            if let Some(clusters) = state.clusters.get_mut(&scope(s)) {
                clusters.remove(name);
            }
            return Err(ApiFault::not_found(format!("No cluster found for name: {name}.")));
        }
        entry.cluster.status = entry.life.status().to_string();
        Ok(entry.cluster.clone())
    }

    async fn list_clusters(&self, s: &Session) -> ApiResult<Vec<String>> {
        Self::access_key(s)?;
        let state = self.shelf.lock()?;
        Ok(state
            .clusters
            .get(&scope(s))
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_cluster(&self, s: &Session, name: &str) -> ApiResult<()> {
        let settle = self.settle();
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(s, name)?;
        self.shelf.check_delete(name)?;
        if !entry.nodegroups.is_empty() {
            return Err(ApiFault::api(
                "ResourceInUseException",
                format!("Cluster has nodegroups attached: {name}"),
            ));
        }
        if !entry.life.is_removing() {
            entry.life.remove("DELETING", settle);
        }
        Ok(())
    }

    async fn create_nodegroup(
        &self,
        s: &Session,
        cluster: &str,
        input: EksNodegroupInput,
    ) -> ApiResult<()> {
        let (settle, lag) = (self.settle(), self.shelf.config.instance_lag);
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(s, cluster)?;
        if entry.nodegroups.contains_key(&input.name) {
            return Err(ApiFault::api(
                "ResourceInUseException",
                format!("NodeGroup already exists with name {}", input.name),
            ));
        }
        let life = Lifecycle::toward("CREATING", EKS_ACTIVE, settle);
        let nodegroup = EksNodegroup {
            name: input.name.clone(),
            status: life.status().to_string(),
            instance_types: input.instance_types,
            capacity_type: input.capacity_type,
            desired_size: input.desired_size,
            disk_size_gb: if input.disk_size_gb == 0 {
                20
            } else {
                input.disk_size_gb
            },
            labels: input.labels,
        };
        entry.nodegroups.insert(
            input.name,
            NodegroupEntry {
                instances: PoolInstances::new(nodegroup.desired_size, lag),
                nodegroup,
                life,
            },
        );
        Ok(())
    }

    async fn describe_nodegroup(
        &self,
        s: &Session,
        cluster: &str,
        nodegroup: &str,
    ) -> ApiResult<EksNodegroup> {
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(s, cluster)?;
        let missing = || ApiFault::not_found(format!("No node group found for name: {nodegroup}."));
        let ng = entry.nodegroups.get_mut(nodegroup).ok_or_else(missing)?;
        if ng.life.observe() {
            entry.nodegroups.remove(nodegroup);
            return Err(missing());
        }
        ng.nodegroup.status = ng.life.status().to_string();
        Ok(ng.nodegroup.clone())
    }

    async fn list_nodegroups(&self, s: &Session, cluster: &str) -> ApiResult<Vec<String>> {
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(s, cluster)?;
        Ok(entry.nodegroups.keys().cloned().collect())
    }

    async fn delete_nodegroup(&self, s: &Session, cluster: &str, nodegroup: &str) -> ApiResult<()> {
        let settle = self.settle();
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(s, cluster)?;
        let ng = entry
            .nodegroups
            .get_mut(nodegroup)
            .ok_or_else(|| ApiFault::not_found(format!("No node group found for name: {nodegroup}.")))?;
        if !ng.life.is_removing() {
            ng.life.remove("DELETING", settle);
        }
        Ok(())
    }

    async fn describe_instances(
        &self,
        s: &Session,
        tag_filters: &[(String, String)],
    ) -> ApiResult<Vec<String>> {
        let (Some(cluster), Some(nodegroup)) = (
            filter_value(tag_filters, TAG_CLUSTER_NAME),
            filter_value(tag_filters, TAG_NODEGROUP_NAME),
        ) else {
            return Ok(Vec::new());
        };
        let mut state = self.shelf.lock()?;
        let Some(ng) = state
            .clusters
            .get_mut(&scope(s))
            .and_then(|c| c.get_mut(cluster))
            .and_then(|c| c.nodegroups.get_mut(nodegroup))
        else {
            return Ok(Vec::new());
        };
        Ok(ng
            .instances
            .lookup(|_| instance_id()))
    }

    async fn create_tags(&self, _s: &Session, resources: &[String], tags: &Labels) -> ApiResult<()> {
        let mut state = self.shelf.lock()?;
        for id in resources {
            let current = state.instance_tags.remove(id).unwrap_or_default();
            state.instance_tags.insert(id.clone(), current.overlay(tags));
        }
        Ok(())
    }

    async fn cluster_token(&self, s: &Session, cluster: &str) -> ApiResult<Secret> {
        let mut state = self.shelf.lock()?;
        state.cluster(s, cluster)?;
        let presigned = format!(
            "https://sts.{}.amazonaws.com/?Action=GetCallerIdentity&Version=2011-06-15&x-k8s-aws-id={cluster}",
            s.region()
        );
        Ok(Secret::new(format!(
            "k8s-aws-v1.{}",
            URL_SAFE_NO_PAD.encode(presigned)
        )))
    }

    async fn associate_identity_provider(
        &self,
        s: &Session,
        cluster: &str,
        input: OidcProviderInput,
    ) -> ApiResult<()> {
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(s, cluster)?;
        if entry
            .identity_providers
            .iter()
            .any(|p| p.config_name == input.config_name)
        {
            return Err(ApiFault::api(
                "InvalidRequestException",
                format!("Identity provider config {} already exists", input.config_name),
            ));
        }
        entry.identity_providers.push(input);
        Ok(())
    }

    async fn create_volume(&self, s: &Session, input: Ec2VolumeInput) -> ApiResult<Ec2Volume> {
        Self::access_key(s)?;
        let settle = self.settle();
        let mut state = self.shelf.lock()?;
        if let Some(snapshot_id) = &input.snapshot_id {
            state.snapshot(&scope(s), snapshot_id)?;
        }
        let life = Lifecycle::toward("creating", "available", settle);
        let volume = Ec2Volume {
            id: format!("vol-{}", short_id(17)),
            state: life.status().to_string(),
            size_gb: input.size_gb,
            volume_type: input.volume_type,
            availability_zone: input.availability_zone,
            snapshot_id: input.snapshot_id,
            tags: input.tags,
        };
        state.volumes.insert(
            volume.id.clone(),
            VolumeEntry {
                scope: scope(s),
                volume: volume.clone(),
                life,
            },
        );
        Ok(volume)
    }

    async fn describe_volume(&self, s: &Session, id: &str) -> ApiResult<Ec2Volume> {
        let mut state = self.shelf.lock()?;
        let entry = state.volume(s, id)?;
        entry.life.observe();
        entry.volume.state = entry.life.status().to_string();
        Ok(entry.volume.clone())
    }

    async fn delete_volume(&self, s: &Session, id: &str) -> ApiResult<()> {
        let mut state = self.shelf.lock()?;
        state.volume(s, id)?;
        state.volumes.remove(id);
        Ok(())
    }

    async fn create_snapshot(
        &self,
        s: &Session,
        volume_id: &str,
        _tags: &Labels,
    ) -> ApiResult<Ec2Snapshot> {
        let settle = self.settle();
        let mut state = self.shelf.lock()?;
        let size_gb = state.volume(s, volume_id)?.volume.size_gb;
        let life = Lifecycle::toward("pending", "completed", settle);
        let snapshot = Ec2Snapshot {
            id: format!("snap-{}", short_id(17)),
            volume_id: Some(volume_id.to_string()),
            state: life.status().to_string(),
            size_gb,
        };
        state.snapshots.insert(
            snapshot.id.clone(),
            SnapshotEntry {
                scope: scope(s),
                snapshot: snapshot.clone(),
                life,
            },
        );
        Ok(snapshot)
    }

    async fn describe_snapshot(&self, s: &Session, id: &str) -> ApiResult<Ec2Snapshot> {
        let mut state = self.shelf.lock()?;
        let entry = state.snapshot(&scope(s), id)?;
        entry.life.observe();
        entry.snapshot.state = entry.life.status().to_string();
        Ok(entry.snapshot.clone())
    }

    async fn delete_snapshot(&self, s: &Session, id: &str) -> ApiResult<()> {
        let mut state = self.shelf.lock()?;
        state.snapshot(&scope(s), id)?;
        state.snapshots.remove(id);
        Ok(())
    }

    async fn copy_snapshot(
        &self,
        s: &Session,
        source_region: &str,
        snapshot_id: &str,
        _tags: &Labels,
    ) -> ApiResult<String> {
        let settle = self.settle();
        let mut state = self.shelf.lock()?;
        let source_scope = (s.account().to_string(), source_region.to_string());
        let size_gb = state.snapshot(&source_scope, snapshot_id)?.snapshot.size_gb;
        let id = format!("snap-{}", short_id(17));
        state.snapshots.insert(
            id.clone(),
            SnapshotEntry {
                scope: scope(s),
                snapshot: Ec2Snapshot {
                    id: id.clone(),
                    volume_id: None,
                    state: "pending".into(),
                    size_gb,
                },
                life: Lifecycle::toward("pending", "completed", settle),
            },
        );
        Ok(id)
    }

    async fn change_record_sets(
        &self,
        s: &Session,
        zone_id: &str,
        changes: Vec<RecordChange>,
    ) -> ApiResult<String> {
        Self::access_key(s)?;
        let mut state = self.shelf.lock()?;
        let zone = state.zones.entry(zone_id.to_string()).or_default();

        // Whole batch is validated before any change lands.
        for change in &changes {
            let key = (change.record.name.clone(), change.record.record_type.clone());
            match change.action {
                ChangeAction::Create if zone.contains_key(&key) => {
                    return Err(ApiFault::api(
                        "InvalidChangeBatch",
                        format!("record {} {} already exists", key.1, key.0),
                    ));
                }
                ChangeAction::Delete if !zone.contains_key(&key) => {
                    return Err(ApiFault::api(
                        "InvalidChangeBatch",
                        format!("record {} {} not found", key.1, key.0),
                    ));
                }
                _ => {}
            }
        }
        for change in changes {
            let mut record = change.record;
            if let Some(alias) = change.alias_target {
                record.values = vec![alias];
            }
            let key = (record.name.clone(), record.record_type.clone());
            match change.action {
                ChangeAction::Delete => {
                    zone.remove(&key);
                }
                ChangeAction::Create | ChangeAction::Upsert => {
                    zone.insert(key, record);
                }
            }
        }
        state.changes += 1;
        Ok(format!("/change/C{:012}", state.changes))
    }

    async fn list_record_sets(&self, s: &Session, zone_id: &str) -> ApiResult<Vec<DnsRecordSet>> {
        Self::access_key(s)?;
        let state = self.shelf.lock()?;
        Ok(state
            .zones
            .get(zone_id)
            .map(|z| z.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn ecr_authorization(&self, s: &Session) -> ApiResult<EcrAuth> {
        Self::access_key(s)?;
        let expires_at = (OffsetDateTime::now_utc() + time::Duration::hours(12))
            .format(&Rfc3339)
            .map_err(|e| ApiFault::api("InternalError", e.to_string()))?;
        Ok(EcrAuth {
            token: Secret::new(STANDARD.encode(format!("AWS:{}", Uuid::new_v4().simple()))),
            endpoint: format!(
                "https://{SANDBOX_AWS_ACCOUNT_ID}.dkr.ecr.{}.amazonaws.com",
                s.region()
            ),
            expires_at,
        })
    }

    async fn create_repository(
        &self,
        s: &Session,
        name: &str,
        _image_tag_mutable: bool,
        _tags: &Labels,
    ) -> ApiResult<EcrRepository> {
        Self::access_key(s)?;
        let mut state = self.shelf.lock()?;
        let repos = state.repositories.entry(scope(s)).or_default();
        if repos.contains_key(name) {
            return Err(ApiFault::api(
                "RepositoryAlreadyExistsException",
                format!(
                    "The repository with name '{name}' already exists in the registry with id '{SANDBOX_AWS_ACCOUNT_ID}'"
                ),
            ));
        }
        let repo = EcrRepository {
            registry_id: SANDBOX_AWS_ACCOUNT_ID.to_string(),
            uri: format!(
                "{SANDBOX_AWS_ACCOUNT_ID}.dkr.ecr.{}.amazonaws.com/{name}",
                s.region()
            ),
        };
        repos.insert(name.to_string(), repo.clone());
        Ok(repo)
    }

    async fn cost_and_usage(&self, s: &Session, input: CostInput) -> ApiResult<Vec<CostPeriod>> {
        Self::access_key(s)?;
        cost_report(&input)
    }

    async fn presign_get_object(
        &self,
        s: &Session,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ApiResult<String> {
        let access_key = Self::access_key(s)?;
        let region = s.region();
        let date = OffsetDateTime::now_utc().date();
        Ok(format!(
            "https://{bucket}.s3.{region}.amazonaws.com{key}?X-Amz-Algorithm=AWS4-HMAC-SHA256\
             &X-Amz-Credential={access_key}%2F{}%2F{region}%2Fs3%2Faws4_request\
             &X-Amz-Expires={}&X-Amz-SignedHeaders=host&X-Amz-Signature={}",
            date.to_string().replace('-', ""),
            expires_in.as_secs(),
            short_id(32),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawner_model::{AwsCredentials, ProviderIdentity};

    fn session() -> Session {
        Session::new(
            ProviderIdentity::new("aws", "us-west-2", "acct"),
            Credentials::Aws(AwsCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: Secret::new("s"),
                session_token: Secret::default(),
            }),
        )
    }

    #[tokio::test]
    async fn cluster_settles_then_disappears() {
        let aws = SandboxAws::new(SandboxConfig {
            settle_polls: 1,
            instance_lag: 0,
        });
        let s = session();
        let created = aws
            .create_cluster(&s, EksClusterInput { name: "c1".into(), tags: Labels::new() })
            .await
            .unwrap();
        assert_eq!(created.status, "CREATING");
        assert_eq!(aws.describe_cluster(&s, "c1").await.unwrap().status, EKS_ACTIVE);

        aws.delete_cluster(&s, "c1").await.unwrap();
        assert!(matches!(
            aws.describe_cluster(&s, "c1").await,
            Err(ApiFault::NotFound(_))
        ));
        assert!(aws.list_clusters(&s).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clusters_are_region_scoped() {
        let aws = SandboxAws::new(SandboxConfig::default());
        let s = session();
        aws.create_cluster(&s, EksClusterInput { name: "c1".into(), tags: Labels::new() })
            .await
            .unwrap();
        let other = s.in_region("eu-west-1");
        assert!(aws.list_clusters(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_record_twice_is_rejected() {
        let aws = SandboxAws::new(SandboxConfig::default());
        let s = session();
        let change = RecordChange {
            action: ChangeAction::Create,
            record: DnsRecordSet {
                record_type: "TXT".into(),
                name: "a.example.com".into(),
                values: vec!["v".into()],
                ttl_seconds: 60,
            },
            alias_target: None,
            latency_region: None,
        };
        aws.change_record_sets(&s, "Z1", vec![change.clone()]).await.unwrap();
        let err = aws.change_record_sets(&s, "Z1", vec![change]).await.unwrap_err();
        assert!(matches!(err, ApiFault::Api { code, .. } if code == "InvalidChangeBatch"));
    }
}
