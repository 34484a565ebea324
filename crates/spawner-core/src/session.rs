//! Provider session construction.
//!
//! A [`Session`] binds credentials to a provider identity. It is built per request
//! and never reused; building one performs no provider call.
use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use spawner_model::{
    AwsCredentials, AzureCredentials, CredentialType, Credentials, GcpCredentials,
    ProviderIdentity, Secret,
};
use tracing::{debug, instrument};

use crate::{
    context::RequestContext,
    error::{CoreError, CoreResult},
    secrets::{SecretStore, read_credentials},
};

/// Profile used by the local credential chain.
pub const DEFAULT_PROFILE: &str = "default";

/// Provider client session scoped to one identity.
#[derive(Debug, Clone)]
pub struct Session {
    identity: ProviderIdentity,
    credentials: Credentials,
}

impl Session {
    pub fn new(identity: ProviderIdentity, credentials: Credentials) -> Self {
        Self {
            identity,
            credentials,
        }
    }

    pub fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    pub fn region(&self) -> &str {
        &self.identity.region
    }

    pub fn account(&self) -> &str {
        &self.identity.account
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Same credentials targeting another region.
    pub fn in_region(&self, region: &str) -> Self {
        Self {
            identity: self.identity.with_region(region),
            credentials: self.credentials.clone(),
        }
    }
}

/// Builds provider sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    async fn new_session(
        &self,
        ctx: &RequestContext,
        identity: &ProviderIdentity,
    ) -> CoreResult<Session>;
}

/// Returns provider credentials for an account.
#[async_trait]
pub trait CredentialResolver: Send + Sync + 'static {
    async fn get_credentials(
        &self,
        ctx: &RequestContext,
        region: &str,
        account: &str,
        provider: &str,
    ) -> CoreResult<Credentials>;
}

/// Resolver backed by a [`SecretStore`].
pub struct SecretStoreResolver {
    store: Arc<dyn SecretStore>,
}

impl SecretStoreResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialResolver for SecretStoreResolver {
    async fn get_credentials(
        &self,
        ctx: &RequestContext,
        region: &str,
        account: &str,
        provider: &str,
    ) -> CoreResult<Credentials> {
        let kind = CredentialType::for_provider(provider)
            .ok_or_else(|| CoreError::invalid(format!("unknown provider '{provider}'")))?;

        read_credentials(self.store.as_ref(), ctx, region, account, kind)
            .await
            .map_err(|e| match e {
                CoreError::NotFound(m) => {
                    CoreError::Credential(format!("no {kind} credentials for '{account}': {m}"))
                }
                other => other,
            })
    }
}

/// One named profile of the local profiles file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocalProfile {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub azure: Option<AzureCredentials>,
    pub gcp: Option<GcpCredentials>,
}

impl LocalProfile {
    fn credentials(&self, kind: CredentialType) -> Option<Credentials> {
        match kind {
            CredentialType::Aws => {
                let key = self.aws_access_key_id.clone()?;
                let secret = self.aws_secret_access_key.clone().unwrap_or_default();
                Some(Credentials::Aws(AwsCredentials {
                    access_key_id: key,
                    secret_access_key: Secret::new(secret),
                    session_token: Secret::new(self.aws_session_token.clone().unwrap_or_default()),
                }))
            }
            CredentialType::Azure => self.azure.clone().map(Credentials::Azure),
            CredentialType::Gcp => self.gcp.clone().map(Credentials::Gcp),
            CredentialType::GitPat => None,
        }
    }
}

/// Parse a profiles file: a TOML table of named [`LocalProfile`]s.
pub fn parse_profiles(text: &str) -> CoreResult<HashMap<String, LocalProfile>> {
    toml::from_str(text).map_err(|e| CoreError::Credential(format!("profiles file: {e}")))
}

/// Credential sources of the local execution mode.
#[derive(Debug, Default, Clone)]
pub struct LocalCredentials {
    /// Configured static keys, tried first.
    pub static_aws: Option<AwsCredentials>,
    /// Profiles file consulted when no static key applies.
    pub profiles_path: Option<PathBuf>,
}

impl LocalCredentials {
    async fn resolve(&self, kind: CredentialType) -> CoreResult<Credentials> {
        if kind == CredentialType::Aws {
            if let Some(keys) = self.static_aws.as_ref().filter(|k| !k.access_key_id.is_empty()) {
                debug!("using configured static keys");
                return Ok(Credentials::Aws(keys.clone()));
            }
        }

        let path = self.profiles_path.as_ref().ok_or_else(|| {
            CoreError::Credential(format!("no local {kind} credentials configured"))
        })?;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::Credential(format!("{}: {e}", path.display())))?;
        let profiles = parse_profiles(&text)?;

        profiles
            .get(DEFAULT_PROFILE)
            .and_then(|p| p.credentials(kind))
            .ok_or_else(|| {
                CoreError::Credential(format!(
                    "profile '{DEFAULT_PROFILE}' has no {kind} credentials"
                ))
            })
    }
}

/// Default session factory.
///
/// Local mode reads [`LocalCredentials`]; otherwise credentials come from the
/// resolver, always queried in the secret-hosting region.
pub struct CredentialSessionFactory {
    resolver: Arc<dyn CredentialResolver>,
    secret_host_region: String,
    local: Option<LocalCredentials>,
}

impl CredentialSessionFactory {
    pub fn new(resolver: Arc<dyn CredentialResolver>, secret_host_region: impl Into<String>) -> Self {
        Self {
            resolver,
            secret_host_region: secret_host_region.into(),
            local: None,
        }
    }

    /// Switch to the local credential chain.
    pub fn with_local(mut self, local: LocalCredentials) -> Self {
        self.local = Some(local);
        self
    }
}

#[async_trait]
impl SessionFactory for CredentialSessionFactory {
    #[instrument(level = "debug", skip(self, ctx), fields(identity = %identity))]
    async fn new_session(
        &self,
        ctx: &RequestContext,
        identity: &ProviderIdentity,
    ) -> CoreResult<Session> {
        if identity.region.trim().is_empty() {
            return Err(CoreError::invalid("region cannot be empty"));
        }
        let provider = identity.provider_key();
        let kind = CredentialType::for_provider(&provider)
            .ok_or_else(|| CoreError::invalid(format!("unknown provider '{provider}'")))?;

        let creds = match &self.local {
            Some(local) => local.resolve(kind).await?,
            None => {
                self.resolver
                    .get_credentials(ctx, &self.secret_host_region, &identity.account, &provider)
                    .await?
            }
        };

        if creds.credential_type() != kind {
            return Err(CoreError::Credential(format!(
                "resolver returned {} credentials for provider '{provider}'",
                creds.credential_type()
            )));
        }
        if !creds.is_usable() {
            return Err(CoreError::Credential(format!(
                "{kind} credentials for '{}' are incomplete",
                identity.account
            )));
        }

        Ok(Session::new(identity.clone(), creds))
    }
}
