use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use spawner_core::Session;
use spawner_model::{CredentialType, Credentials, Labels, Secret};

use super::{
    SandboxConfig, Shelf, expect_credentials,
    state::{Operations, PoolInstances, short_id},
};
use crate::{
    api::{
        OperationApi, OperationState,
        gcp::{GKE_RUNNING, GcpApi, GkeCluster, GkeClusterInput, GkeNodePool},
    },
    fault::{ApiFault, ApiResult},
};

/// `(project, location)` the resources live in.
type Location = (String, String);

enum Effect {
    ClusterRunning(String),
    ClusterRemoved(String),
    PoolRemoved { cluster: String, pool: String },
}

struct PoolEntry {
    pool: GkeNodePool,
    instances: PoolInstances,
}

struct ClusterEntry {
    cluster: GkeCluster,
    pools: BTreeMap<String, PoolEntry>,
}

impl ClusterEntry {
    fn view(&self) -> GkeCluster {
        let mut cluster = self.cluster.clone();
        cluster.node_pools = self.pools.values().map(|p| p.pool.clone()).collect();
        cluster
    }
}

#[derive(Default)]
struct GcpState {
    ops: Operations<(Location, Effect)>,
    clusters: HashMap<Location, BTreeMap<String, ClusterEntry>>,
    instance_labels: HashMap<String, Labels>,
}

impl GcpState {
    fn clusters(&mut self, at: &Location) -> &mut BTreeMap<String, ClusterEntry> {
        self.clusters.entry(at.clone()).or_default()
    }

    fn cluster(&mut self, at: &Location, name: &str) -> ApiResult<&mut ClusterEntry> {
        self.clusters(at).get_mut(name).ok_or_else(|| {
            ApiFault::not_found(format!(
                "Not found: projects/{}/locations/{}/clusters/{name}.",
                at.0, at.1
            ))
        })
    }

    fn apply(&mut self, at: &Location, effect: Effect) {
        let clusters = self.clusters(at);
        match effect {
            Effect::ClusterRunning(name) => {
                if let Some(c) = clusters.get_mut(&name) {
                    c.cluster.status = GKE_RUNNING.into();
                }
            }
            Effect::ClusterRemoved(name) => {
                clusters.remove(&name);
            }
            Effect::PoolRemoved { cluster, pool } => {
                if let Some(c) = clusters.get_mut(&cluster) {
                    c.pools.remove(&pool);
                }
            }
        }
    }
}

/// Sandbox GKE and Compute Engine.
pub struct SandboxGcp {
    shelf: Shelf<GcpState>,
}

impl SandboxGcp {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            shelf: Shelf::new(config),
        }
    }

    /// Make every delete of `cluster` fail with a provider error.
    pub fn fail_cluster_delete(&self, cluster: &str) {
        self.shelf.fail_delete(cluster);
    }

    fn location(s: &Session) -> ApiResult<Location> {
        match expect_credentials(s, CredentialType::Gcp)? {
            Credentials::Gcp(c) => Ok((c.project_id.clone(), s.region().to_string())),
            _ => Err(ApiFault::api("UNAUTHENTICATED", "gcp credentials expected")),
        }
    }

    fn start(&self, state: &mut GcpState, at: &Location, effect: Option<Effect>) -> String {
        state.ops.start(
            "operation",
            self.shelf.config.settle_polls,
            None,
            effect.map(|e| (at.clone(), e)),
        )
    }

    fn new_pool(&self, pool: GkeNodePool) -> PoolEntry {
        PoolEntry {
            instances: PoolInstances::new(pool.node_count, self.shelf.config.instance_lag),
            pool,
        }
    }
}

#[async_trait]
impl OperationApi for SandboxGcp {
    async fn poll_operation(&self, _s: &Session, operation: &str) -> ApiResult<OperationState> {
        let mut state = self.shelf.lock()?;
        let (op, effect) = state.ops.poll(operation)?;
        if let Some((at, effect)) = effect {
            state.apply(&at, effect);
        }
        Ok(op)
    }
}

#[async_trait]
impl GcpApi for SandboxGcp {
    async fn create_cluster(&self, s: &Session, input: GkeClusterInput) -> ApiResult<String> {
        let at = Self::location(s)?;
        let pool = self.new_pool(input.node_pool);
        let mut state = self.shelf.lock()?;
        let clusters = state.clusters(&at);
        if clusters.contains_key(&input.name) {
            return Err(ApiFault::api(
                "ALREADY_EXISTS",
                format!(
                    "Already exists: projects/{}/locations/{}/clusters/{}.",
                    at.0, at.1, input.name
                ),
            ));
        }
        let cluster = GkeCluster {
            id: short_id(32),
            name: input.name.clone(),
            location: input.location,
            status: "PROVISIONING".into(),
            endpoint: format!("https://34.118.{}.{}", clusters.len() % 250, input.name.len() % 250),
            ca_data: STANDARD.encode(format!("sandbox-ca/{}", input.name)),
            resource_labels: input.resource_labels,
            node_pools: Vec::new(),
        };
        clusters.insert(
            input.name.clone(),
            ClusterEntry {
                cluster,
                pools: BTreeMap::from([(pool.pool.name.clone(), pool)]),
            },
        );
        Ok(self.start(&mut state, &at, Some(Effect::ClusterRunning(input.name))))
    }

    async fn get_cluster(&self, s: &Session, name: &str) -> ApiResult<GkeCluster> {
        let at = Self::location(s)?;
        let mut state = self.shelf.lock()?;
        Ok(state.cluster(&at, name)?.view())
    }

    async fn list_clusters(&self, s: &Session) -> ApiResult<Vec<GkeCluster>> {
        let at = Self::location(s)?;
        let mut state = self.shelf.lock()?;
        Ok(state.clusters(&at).values().map(ClusterEntry::view).collect())
    }

    async fn delete_cluster(&self, s: &Session, name: &str) -> ApiResult<String> {
        let at = Self::location(s)?;
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(&at, name)?;
        self.shelf.check_delete(name)?;
        entry.cluster.status = "STOPPING".into();
        Ok(self.start(&mut state, &at, Some(Effect::ClusterRemoved(name.to_string()))))
    }

    async fn create_node_pool(
        &self,
        s: &Session,
        cluster: &str,
        pool: GkeNodePool,
    ) -> ApiResult<String> {
        let at = Self::location(s)?;
        let entry_pool = self.new_pool(pool);
        let mut state = self.shelf.lock()?;
        let entry = state.cluster(&at, cluster)?;
        if entry.pools.contains_key(&entry_pool.pool.name) {
            return Err(ApiFault::api(
                "ALREADY_EXISTS",
                format!("Already exists: node pool {}.", entry_pool.pool.name),
            ));
        }
        entry.pools.insert(entry_pool.pool.name.clone(), entry_pool);
        Ok(self.start(&mut state, &at, None))
    }

    async fn list_node_pools(&self, s: &Session, cluster: &str) -> ApiResult<Vec<String>> {
        let at = Self::location(s)?;
        let mut state = self.shelf.lock()?;
        Ok(state.cluster(&at, cluster)?.pools.keys().cloned().collect())
    }

    async fn delete_node_pool(&self, s: &Session, cluster: &str, pool: &str) -> ApiResult<String> {
        let at = Self::location(s)?;
        let mut state = self.shelf.lock()?;
        if !state.cluster(&at, cluster)?.pools.contains_key(pool) {
            return Err(ApiFault::not_found(format!("Not found: node pool {pool}.")));
        }
        Ok(self.start(
            &mut state,
            &at,
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
        let at = Self::location(s)?;
        let mut state = self.shelf.lock()?;
        let entry = state
            .cluster(&at, cluster)?
            .pools
            .get_mut(pool)
            .ok_or_else(|| ApiFault::not_found(format!("Not found: node pool {pool}.")))?;
        let group = short_id(8);
        Ok(entry
            .instances
            .lookup(|_| format!("gke-{cluster}-{pool}-{group}-{}", short_id(4))))
    }

    async fn set_instance_labels(
        &self,
        _s: &Session,
        ids: &[String],
        labels: &Labels,
    ) -> ApiResult<()> {
        let mut state = self.shelf.lock()?;
        for id in ids {
            let current = state.instance_labels.remove(id).unwrap_or_default();
            state.instance_labels.insert(id.clone(), current.overlay(labels));
        }
        Ok(())
    }

    async fn access_token(&self, s: &Session) -> ApiResult<Secret> {
        Self::location(s)?;
        Ok(Secret::new(format!("ya29.sandbox-{}", short_id(32))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawner_model::{GcpCredentials, ProviderIdentity};

    #[tokio::test]
    async fn delete_of_missing_cluster_is_not_found() {
        let gcp = SandboxGcp::new(SandboxConfig::default());
        let s = Session::new(
            ProviderIdentity::new("gcp", "us-central1", "acct"),
            Credentials::Gcp(GcpCredentials {
                project_id: "proj".into(),
                service_account: Secret::new("{}"),
            }),
        );
        assert!(matches!(
            gcp.delete_cluster(&s, "gke1").await,
            Err(ApiFault::NotFound(_))
        ));
    }
}
