//! In-memory clouds behind the provider-native API traits.
//!
//! Resources are scoped by account and region the way the real providers scope
//! them, and long-running mutations settle after a configurable number of
//! observations. Node instances appear only after the first lookups, so the
//! transient empty result of a freshly created pool is observable.
mod aws;
mod azure;
mod gcp;
mod rancher;
mod state;

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::Deserialize;
use spawner_core::Session;
use spawner_model::{CredentialType, Credentials};

use crate::fault::{ApiFault, ApiResult};

pub use aws::SandboxAws;
pub use azure::SandboxAzure;
pub use gcp::SandboxGcp;
pub use rancher::SandboxRancher;

/// Account id reported by the sandbox AWS cloud.
pub const SANDBOX_AWS_ACCOUNT_ID: &str = "000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Observations before a mutation settles.
    pub settle_polls: u32,
    /// Empty instance lookups after a pool is created.
    pub instance_lag: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            settle_polls: 2,
            instance_lag: 1,
        }
    }
}

/// The three sandbox clouds.
#[derive(Clone)]
pub struct SandboxCloud {
    pub aws: Arc<SandboxAws>,
    pub azure: Arc<SandboxAzure>,
    pub gcp: Arc<SandboxGcp>,
}

impl SandboxCloud {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            aws: Arc::new(SandboxAws::new(config)),
            azure: Arc::new(SandboxAzure::new(config)),
            gcp: Arc::new(SandboxGcp::new(config)),
        }
    }
}

impl Default for SandboxCloud {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

/// State plus the cluster deletes that are set up to fail.
struct Shelf<S> {
    config: SandboxConfig,
    state: Mutex<S>,
    failing_deletes: Mutex<BTreeSet<String>>,
}

impl<S: Default> Shelf<S> {
    fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            state: Mutex::new(S::default()),
            failing_deletes: Mutex::new(BTreeSet::new()),
        }
    }
}

impl<S> Shelf<S> {
    fn lock(&self) -> ApiResult<MutexGuard<'_, S>> {
        self.state
            .lock()
            .map_err(|_| ApiFault::api("InternalError", "sandbox state lock poisoned"))
    }

    fn fail_delete(&self, cluster: &str) {
        if let Ok(mut set) = self.failing_deletes.lock() {
            set.insert(cluster.to_string());
        }
    }

    fn check_delete(&self, cluster: &str) -> ApiResult<()> {
        let failing = self
            .failing_deletes
            .lock()
            .map(|set| set.contains(cluster))
            .unwrap_or(false);
        if failing {
            return Err(ApiFault::api(
                "InternalError",
                format!("injected failure deleting cluster {cluster}"),
            ));
        }
        Ok(())
    }
}

/// Rejects sessions carrying another provider's credentials.
fn expect_credentials(s: &Session, kind: CredentialType) -> ApiResult<&Credentials> {
    let creds = s.credentials();
    if creds.credential_type() != kind {
        return Err(ApiFault::api(
            "AuthFailure",
            format!("session holds {} credentials, {kind} expected", creds.credential_type()),
        ));
    }
    Ok(creds)
}

/// `(account, region)` scope of a session.
fn scope(s: &Session) -> (String, String) {
    (s.account().to_string(), s.region().to_string())
}
