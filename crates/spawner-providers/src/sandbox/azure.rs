use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use spawner_core::Session;
use spawner_model::{CredentialType, Credentials, Labels, Secret};

use super::{
    SandboxConfig, Shelf, expect_credentials,
    state::{Operations, PoolInstances, cost_report, short_id},
};
use crate::{
    api::{
        Accepted, CostInput, CostPeriod, KubeAccess, OperationApi, OperationState,
        azure::{
            AksAgentPool, AksCluster, AksClusterInput, AzureApi, AzureDisk, AzureDiskInput,
            POWER_RUNNING,
        },
    },
    fault::{ApiFault, ApiResult},
};

const HTTP_NO_CONTENT: u16 = 204;

/// Deferred mutation applied when its operation completes.
enum Effect {
    ClusterReady(String),
    ClusterRemoved(String),
    PoolRemoved { cluster: String, pool: String },
    DiskReady(String),
    DiskRemoved(String),
    SnapshotReady(String),
    SnapshotRemoved(String),
}

struct PoolEntry {
    pool: AksAgentPool,
    instances: PoolInstances,
}

struct ClusterEntry {
    cluster: AksCluster,
    pools: BTreeMap<String, PoolEntry>,
}

struct SnapshotEntry {
    location: String,
    size_gb: u32,
    ready: bool,
}

#[derive(Default)]
struct Subscription {
    clusters: BTreeMap<String, ClusterEntry>,
    disks: HashMap<String, AzureDisk>,
    snapshots: HashMap<String, SnapshotEntry>,
    instance_tags: HashMap<String, Labels>,
}

#[derive(Default)]
struct AzureState {
    ops: Operations<(String, Effect)>,
    /// Keyed by `<subscription>/<resource group>`.
    subscriptions: HashMap<String, Subscription>,
}

impl AzureState {
    fn sub(&mut self, group: &str) -> &mut Subscription {
        self.subscriptions.entry(group.to_string()).or_default()
    }

    fn apply(&mut self, group: &str, effect: Effect) {
        let sub = self.sub(group);
        match effect {
            Effect::ClusterReady(name) => {
                if let Some(c) = sub.clusters.get_mut(&name) {
                    c.cluster.provisioning_state = "Succeeded".into();
                    c.cluster.power_state = POWER_RUNNING.into();
                }
            }
            Effect::ClusterRemoved(name) => {
                sub.clusters.remove(&name);
            }
            Effect::PoolRemoved { cluster, pool } => {
                if let Some(c) = sub.clusters.get_mut(&cluster) {
                    c.pools.remove(&pool);
                }
            }
            Effect::DiskReady(id) => {
                if let Some(d) = sub.disks.get_mut(&id) {
                    d.disk_state = "Unattached".into();
                }
            }
            Effect::DiskRemoved(id) => {
                sub.disks.remove(&id);
            }
            Effect::SnapshotReady(id) => {
                if let Some(snap) = sub.snapshots.get_mut(&id) {
                    snap.ready = true;
                }
            }
            Effect::SnapshotRemoved(id) => {
                sub.snapshots.remove(&id);
            }
        }
    }
}

fn not_found(kind: &str, name: &str) -> ApiFault {
    ApiFault::not_found(format!("ResourceNotFound: {kind} '{name}' was not found"))
}

impl Subscription {
    fn cluster(&mut self, name: &str) -> ApiResult<&mut ClusterEntry> {
        self.clusters
            .get_mut(name)
            .ok_or_else(|| not_found("Microsoft.ContainerService/managedClusters", name))
    }

    fn view(entry: &ClusterEntry) -> AksCluster {
        let mut cluster = entry.cluster.clone();
        cluster.agent_pools = entry.pools.values().map(|p| p.pool.clone()).collect();
        cluster
    }
}

/// Sandbox AKS, managed disks and Cost Management.
pub struct SandboxAzure {
    shelf: Shelf<AzureState>,
}

impl SandboxAzure {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            shelf: Shelf::new(config),
        }
    }

    /// Make every delete of `cluster` fail with a provider error.
    pub fn fail_cluster_delete(&self, cluster: &str) {
        self.shelf.fail_delete(cluster);
    }

    /// Resource group path the session's credentials address.
    fn group(s: &Session) -> ApiResult<String> {
        match expect_credentials(s, CredentialType::Azure)? {
            Credentials::Azure(c) => Ok(format!(
                "/subscriptions/{}/resourceGroups/{}",
                c.subscription_id, c.resource_group
            )),
            _ => Err(ApiFault::api("AuthenticationFailed", "azure credentials expected")),
        }
    }

    fn start(
        &self,
        state: &mut AzureState,
        group: &str,
        status: Option<u16>,
        effect: Option<Effect>,
    ) -> String {
        state.ops.start(
            "azure-op",
            self.shelf.config.settle_polls,
            status,
            effect.map(|e| (group.to_string(), e)),
        )
    }

    fn new_pool(&self, pool: AksAgentPool) -> PoolEntry {
        PoolEntry {
            instances: PoolInstances::new(pool.count, self.shelf.config.instance_lag),
            pool,
        }
    }
}

#[async_trait]
impl OperationApi for SandboxAzure {
    async fn poll_operation(&self, _s: &Session, operation: &str) -> ApiResult<OperationState> {
        let mut state = self.shelf.lock()?;
        let (op, effect) = state.ops.poll(operation)?;
        if let Some((group, effect)) = effect {
            state.apply(&group, effect);
        }
        Ok(op)
    }
}

#[async_trait]
impl AzureApi for SandboxAzure {
    async fn begin_create_cluster(&self, s: &Session, input: AksClusterInput) -> ApiResult<String> {
        let group = Self::group(s)?;
        let pool = self.new_pool(input.agent_pool);
        let mut state = self.shelf.lock()?;
        let sub = state.sub(&group);
        if sub.clusters.contains_key(&input.name) {
            return Err(ApiFault::api(
                "Conflict",
                format!("managed cluster {} already exists", input.name),
            ));
        }
        let cluster = AksCluster {
            id: format!(
                "{group}/providers/Microsoft.ContainerService/managedClusters/{}",
                input.name
            ),
            name: input.name.clone(),
            location: input.location.clone(),
            provisioning_state: "Creating".into(),
            power_state: "Stopped".into(),
            fqdn: format!(
                "{}-dns-{}.hcp.{}.azmk8s.io",
                input.name,
                short_id(8),
                input.location
            ),
            tags: input.tags,
            agent_pools: Vec::new(),
        };
        sub.clusters.insert(
            input.name.clone(),
            ClusterEntry {
                cluster,
                pools: BTreeMap::from([(pool.pool.name.clone(), pool)]),
            },
        );
        Ok(self.start(&mut state, &group, None, Some(Effect::ClusterReady(input.name))))
    }

    async fn get_cluster(&self, s: &Session, name: &str) -> ApiResult<AksCluster> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let entry = state.sub(&group).cluster(name)?;
        Ok(Subscription::view(entry))
    }

    async fn list_clusters(&self, s: &Session) -> ApiResult<Vec<AksCluster>> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        Ok(state.sub(&group).clusters.values().map(Subscription::view).collect())
    }

    async fn begin_delete_cluster(&self, s: &Session, name: &str) -> ApiResult<String> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let Some(entry) = state.sub(&group).clusters.get_mut(name) else {
            return Ok(self.start(&mut state, &group, Some(HTTP_NO_CONTENT), None));
        };
        self.shelf.check_delete(name)?;
        entry.cluster.provisioning_state = "Deleting".into();
        Ok(self.start(&mut state, &group, None, Some(Effect::ClusterRemoved(name.to_string()))))
    }

    async fn begin_create_agent_pool(
        &self,
        s: &Session,
        cluster: &str,
        pool: AksAgentPool,
    ) -> ApiResult<String> {
        let group = Self::group(s)?;
        let entry_pool = self.new_pool(pool);
        let mut state = self.shelf.lock()?;
        // Agent pool PUT is create-or-update.
        state
            .sub(&group)
            .cluster(cluster)?
            .pools
            .insert(entry_pool.pool.name.clone(), entry_pool);
        Ok(self.start(&mut state, &group, None, None))
    }

    async fn list_agent_pools(&self, s: &Session, cluster: &str) -> ApiResult<Vec<String>> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let entry = state.sub(&group).cluster(cluster)?;
        Ok(entry.pools.keys().cloned().collect())
    }

    async fn begin_delete_agent_pool(
        &self,
        s: &Session,
        cluster: &str,
        pool: &str,
    ) -> ApiResult<String> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let exists = state.sub(&group).cluster(cluster)?.pools.contains_key(pool);
        if !exists {
            return Ok(self.start(&mut state, &group, Some(HTTP_NO_CONTENT), None));
        }
        Ok(self.start(
            &mut state,
            &group,
            None,
            Some(Effect::PoolRemoved {
                cluster: cluster.to_string(),
                pool: pool.to_string(),
            }),
        ))
    }

    async fn list_pool_instances(
        &self,
        s: &Session,
        cluster: &str,
        pool: &str,
    ) -> ApiResult<Vec<String>> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let entry = state
            .sub(&group)
            .cluster(cluster)?
            .pools
            .get_mut(pool)
            .ok_or_else(|| not_found("agentPools", pool))?;
        Ok(entry.instances.lookup(|n| {
            format!("{group}/providers/Microsoft.Compute/virtualMachineScaleSets/aks-{pool}-vmss/virtualMachines/{n}")
        }))
    }

    async fn update_instance_tags(
        &self,
        s: &Session,
        ids: &[String],
        tags: &Labels,
    ) -> ApiResult<()> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let sub = state.sub(&group);
        for id in ids {
            let current = sub.instance_tags.remove(id).unwrap_or_default();
            sub.instance_tags.insert(id.clone(), current.overlay(tags));
        }
        Ok(())
    }

    async fn cluster_user_credentials(&self, s: &Session, cluster: &str) -> ApiResult<KubeAccess> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let entry = state.sub(&group).cluster(cluster)?;
        Ok(KubeAccess {
            endpoint: format!("https://{}:443", entry.cluster.fqdn),
            ca_data: STANDARD.encode(format!("sandbox-ca/{cluster}")),
            token: Secret::new(short_id(32)),
        })
    }

    async fn begin_create_disk(&self, s: &Session, input: AzureDiskInput) -> ApiResult<Accepted> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let sub = state.sub(&group);
        if let Some(source) = &input.source_snapshot_uri {
            if !sub.snapshots.contains_key(source) {
                return Err(not_found("Microsoft.Compute/snapshots", source));
            }
        }
        let id = format!("{group}/providers/Microsoft.Compute/disks/{}", input.name);
        if sub.disks.contains_key(&id) {
            return Err(ApiFault::api("Conflict", format!("disk {} already exists", input.name)));
        }
        sub.disks.insert(
            id.clone(),
            AzureDisk {
                id: id.clone(),
                name: input.name,
                location: input.location,
                zone: input.zone,
                sku: input.sku,
                size_gb: input.size_gb,
                disk_state: "Creating".into(),
                source_snapshot_uri: input.source_snapshot_uri,
                tags: input.tags,
            },
        );
        let operation = self.start(&mut state, &group, None, Some(Effect::DiskReady(id.clone())));
        Ok(Accepted {
            resource_id: id,
            operation,
        })
    }

    async fn get_disk(&self, s: &Session, id: &str) -> ApiResult<AzureDisk> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        state
            .sub(&group)
            .disks
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Microsoft.Compute/disks", id))
    }

    async fn begin_delete_disk(&self, s: &Session, id: &str) -> ApiResult<String> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        if !state.sub(&group).disks.contains_key(id) {
            return Ok(self.start(&mut state, &group, Some(HTTP_NO_CONTENT), None));
        }
        Ok(self.start(&mut state, &group, None, Some(Effect::DiskRemoved(id.to_string()))))
    }

    async fn begin_create_snapshot(
        &self,
        s: &Session,
        disk_id: &str,
        _tags: &Labels,
    ) -> ApiResult<Accepted> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let sub = state.sub(&group);
        let disk = sub
            .disks
            .get(disk_id)
            .ok_or_else(|| not_found("Microsoft.Compute/disks", disk_id))?;
        let entry = SnapshotEntry {
            location: disk.location.clone(),
            size_gb: disk.size_gb,
            ready: false,
        };
        let id = format!("{group}/providers/Microsoft.Compute/snapshots/snap-{}", short_id(12));
        sub.snapshots.insert(id.clone(), entry);
        let operation = self.start(&mut state, &group, None, Some(Effect::SnapshotReady(id.clone())));
        Ok(Accepted {
            resource_id: id,
            operation,
        })
    }

    async fn begin_delete_snapshot(&self, s: &Session, id: &str) -> ApiResult<String> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        if !state.sub(&group).snapshots.contains_key(id) {
            return Ok(self.start(&mut state, &group, Some(HTTP_NO_CONTENT), None));
        }
        Ok(self.start(&mut state, &group, None, Some(Effect::SnapshotRemoved(id.to_string()))))
    }

    async fn begin_copy_snapshot(
        &self,
        s: &Session,
        source_region: &str,
        id: &str,
        _tags: &Labels,
    ) -> ApiResult<Accepted> {
        let group = Self::group(s)?;
        let mut state = self.shelf.lock()?;
        let sub = state.sub(&group);
        let size_gb = sub
            .snapshots
            .get(id)
            .filter(|snap| snap.location == source_region && snap.ready)
            .map(|snap| snap.size_gb)
            .ok_or_else(|| not_found("Microsoft.Compute/snapshots", id))?;
        let copy = format!("{group}/providers/Microsoft.Compute/snapshots/snap-{}", short_id(12));
        sub.snapshots.insert(
            copy.clone(),
            SnapshotEntry {
                location: s.region().to_string(),
                size_gb,
                ready: false,
            },
        );
        let operation = self.start(&mut state, &group, None, Some(Effect::SnapshotReady(copy.clone())));
        Ok(Accepted {
            resource_id: copy,
            operation,
        })
    }

    async fn query_cost(&self, s: &Session, input: CostInput) -> ApiResult<Vec<CostPeriod>> {
        Self::group(s)?;
        cost_report(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawner_model::{AzureCredentials, ProviderIdentity};

    fn session() -> Session {
        Session::new(
            ProviderIdentity::new("azure", "eastus", "acct"),
            Credentials::Azure(AzureCredentials {
                subscription_id: "sub".into(),
                tenant_id: "tenant".into(),
                client_id: "client".into(),
                client_secret: Secret::new("secret"),
                resource_group: "rg".into(),
            }),
        )
    }

    async fn finish(azure: &SandboxAzure, s: &Session, op: &str) -> OperationState {
        loop {
            let state = azure.poll_operation(s, op).await.unwrap();
            if state.done {
                return state;
            }
        }
    }

    #[tokio::test]
    async fn cluster_becomes_running_when_operation_completes() {
        let azure = SandboxAzure::new(SandboxConfig::default());
        let s = session();
        let op = azure
            .begin_create_cluster(
                &s,
                AksClusterInput {
                    name: "aks1".into(),
                    location: "eastus".into(),
                    tags: Labels::new(),
                    agent_pool: AksAgentPool {
                        name: "pool1".into(),
                        count: 1,
                        ..Default::default()
                    },
                },
            )
            .await
            .unwrap();
        assert_eq!(azure.get_cluster(&s, "aks1").await.unwrap().power_state, "Stopped");

        finish(&azure, &s, &op).await;
        let cluster = azure.get_cluster(&s, "aks1").await.unwrap();
        assert_eq!(cluster.power_state, POWER_RUNNING);
        assert_eq!(cluster.agent_pools.len(), 1);
    }

    #[tokio::test]
    async fn deleting_missing_cluster_finishes_with_no_content() {
        let azure = SandboxAzure::new(SandboxConfig::default());
        let s = session();
        let op = azure.begin_delete_cluster(&s, "nope").await.unwrap();
        assert_eq!(finish(&azure, &s, &op).await.http_status, Some(HTTP_NO_CONTENT));
    }
}
