//! Shared wiring for the adapter flow tests: sandbox clouds, in-memory secrets
//! and a session factory that counts how often it was asked for a session.
#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use spawner_core::{
    CoreError, CoreResult, Dispatcher, PollConfig, ProviderRegistry, RequestContext,
    ServiceContext, Session, SessionFactory, noop_metrics, secrets::MemorySecretStore,
};
use spawner_model::{
    AwsCredentials, AzureCredentials, Credentials, GcpCredentials, ProviderIdentity, Secret,
};
use spawner_providers::{
    AdapterDeps, AwsProvider, AzureProvider, GcpProvider,
    aws::AwsSettings,
    sandbox::{SandboxCloud, SandboxConfig, SandboxRancher},
};

pub const SECRET_REGION: &str = "us-east-1";
pub const HOSTED_ZONE: &str = "Z0SANDBOX";

/// Hands out fixed credentials per provider and counts every request.
#[derive(Default)]
pub struct CountingSessions {
    calls: AtomicUsize,
}

impl CountingSessions {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for CountingSessions {
    async fn new_session(
        &self,
        _ctx: &RequestContext,
        identity: &ProviderIdentity,
    ) -> CoreResult<Session> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let creds = match identity.provider_key().as_str() {
            "aws" => Credentials::Aws(AwsCredentials {
                access_key_id: "AKIASANDBOX".into(),
                secret_access_key: Secret::new("sandbox"),
                session_token: Secret::default(),
            }),
            "azure" => Credentials::Azure(AzureCredentials {
                subscription_id: "sub-1".into(),
                tenant_id: "tenant-1".into(),
                client_id: "client-1".into(),
                client_secret: Secret::new("sandbox"),
                resource_group: "rg-1".into(),
            }),
            "gcp" => Credentials::Gcp(GcpCredentials {
                project_id: "proj-1".into(),
                service_account: Secret::new("{}"),
            }),
            other => return Err(CoreError::invalid(format!("unknown provider '{other}'"))),
        };
        Ok(Session::new(identity.clone(), creds))
    }
}

pub struct Harness {
    pub cloud: SandboxCloud,
    pub sessions: Arc<CountingSessions>,
    pub secrets: Arc<MemorySecretStore>,
    pub rancher: Arc<SandboxRancher>,
    pub aws: Arc<AwsProvider>,
    pub azure: Arc<AzureProvider>,
    pub gcp: Arc<GcpProvider>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_zone(HOSTED_ZONE)
    }

    /// Harness whose AWS adapter uses `zone` as its hosted zone; empty disables DNS.
    pub fn with_zone(zone: &str) -> Self {
        let cloud = SandboxCloud::new(SandboxConfig::default());
        let sessions = Arc::new(CountingSessions::default());
        let secrets = Arc::new(MemorySecretStore::new());
        let rancher = Arc::new(SandboxRancher::new("https://rancher.sandbox"));
        let deps = AdapterDeps {
            service: ServiceContext::new("test", noop_metrics()),
            sessions: sessions.clone(),
            secrets: secrets.clone(),
            rancher: rancher.clone(),
            poll: PollConfig::new(Duration::from_millis(1)),
            secret_host_region: SECRET_REGION.to_string(),
        };
        let settings = AwsSettings {
            hosted_zone_id: zone.to_string(),
        };
        Self {
            aws: Arc::new(AwsProvider::new(cloud.aws.clone(), deps.clone(), settings)),
            azure: Arc::new(AzureProvider::new(cloud.azure.clone(), deps.clone())),
            gcp: Arc::new(GcpProvider::new(cloud.gcp.clone(), deps)),
            cloud,
            sessions,
            secrets,
            rancher,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        let registry = ProviderRegistry::new()
            .with(self.aws.clone())
            .with(self.azure.clone())
            .with(self.gcp.clone());
        Dispatcher::new(registry, self.secrets.clone(), SECRET_REGION)
    }
}

pub fn ctx() -> RequestContext {
    RequestContext::new().with_trace_id("test-trace")
}

pub fn aws_identity() -> ProviderIdentity {
    ProviderIdentity::new("aws", "us-west-2", "team")
}

pub fn azure_identity() -> ProviderIdentity {
    ProviderIdentity::new("azure", "eastus", "team")
}

pub fn gcp_identity() -> ProviderIdentity {
    ProviderIdentity::new("gcp", "us-central1", "team")
}
