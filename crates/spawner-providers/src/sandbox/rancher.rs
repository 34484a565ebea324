use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use spawner_core::{
    CoreError, CoreResult, RequestContext,
    rancher::{RancherApi, RancherCluster, RancherRegistration},
};
use tracing::debug;

use super::state::short_id;

/// Rancher management server that accepts every well-formed import.
pub struct SandboxRancher {
    base_url: String,
    imported: AtomicU64,
}

impl SandboxRancher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            imported: AtomicU64::new(0),
        }
    }

    /// Number of clusters imported so far.
    pub fn imported(&self) -> u64 {
        self.imported.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RancherApi for SandboxRancher {
    async fn register_cluster(
        &self,
        _ctx: &RequestContext,
        cluster: RancherCluster,
    ) -> CoreResult<RancherRegistration> {
        if cluster.endpoint.is_empty() || cluster.token.is_empty() {
            return Err(CoreError::Provider(format!(
                "rancher import of {}: cluster endpoint and token are required",
                cluster.name
            )));
        }
        let cluster_id = format!("c-{}", short_id(5));
        self.imported.fetch_add(1, Ordering::Relaxed);
        debug!(cluster = %cluster.name, %cluster_id, "sandbox rancher import");
        Ok(RancherRegistration {
            manifest_url: format!(
                "{}/v3/import/{}_{cluster_id}.yaml",
                self.base_url,
                short_id(32)
            ),
            cluster_id,
        })
    }
}
