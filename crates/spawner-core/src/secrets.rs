//! Secret store seam and the typed-credential helpers built on it.
use std::collections::HashMap;

use async_trait::async_trait;
use spawner_model::{CredentialType, Credentials, Secret};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    context::RequestContext,
    error::{CoreError, CoreResult},
};

/// External secret storage, addressed by region and name.
#[async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Fetch a secret value; `Ok(None)` when the name is absent.
    async fn get_secret(
        &self,
        ctx: &RequestContext,
        region: &str,
        name: &str,
    ) -> CoreResult<Option<Secret>>;

    /// Create or overwrite a secret value.
    async fn put_secret(
        &self,
        ctx: &RequestContext,
        region: &str,
        name: &str,
        value: Secret,
    ) -> CoreResult<()>;
}

/// Secret name typed credentials of an account are stored under.
pub fn credential_secret_name(account: &str, kind: CredentialType) -> String {
    format!("{account}-{}", kind.as_str())
}

/// Secret name kube access of a cluster is stored under.
pub fn kube_secret_name(cluster: &str) -> String {
    format!("{cluster}-kube")
}

/// Read and decode the credentials of `account`.
///
/// Absent secrets are `NotFound`; undecodable or mistyped ones are `Credential`.
pub async fn read_credentials(
    store: &dyn SecretStore,
    ctx: &RequestContext,
    region: &str,
    account: &str,
    kind: CredentialType,
) -> CoreResult<Credentials> {
    let name = credential_secret_name(account, kind);
    let secret = store
        .get_secret(ctx, region, &name)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("secret '{name}' in {region}")))?;

    let creds: Credentials = serde_json::from_str(secret.expose())
        .map_err(|e| CoreError::Credential(format!("secret '{name}' is malformed: {e}")))?;

    if creds.credential_type() != kind {
        return Err(CoreError::Credential(format!(
            "secret '{name}' holds {} credentials, expected {kind}",
            creds.credential_type()
        )));
    }
    Ok(creds)
}

/// Encode and store the credentials of `account`.
pub async fn write_credentials(
    store: &dyn SecretStore,
    ctx: &RequestContext,
    region: &str,
    account: &str,
    creds: &Credentials,
) -> CoreResult<()> {
    if account.trim().is_empty() {
        return Err(CoreError::invalid("account cannot be empty"));
    }
    let name = credential_secret_name(account, creds.credential_type());
    let body = serde_json::to_string(creds)
        .map_err(|e| CoreError::InvalidInput(format!("credentials not encodable: {e}")))?;

    store.put_secret(ctx, region, &name, Secret::new(body)).await?;
    debug!(secret = %name, region, "credentials stored");
    Ok(())
}

/// In-process secret store.
///
/// Used by the sandbox server mode and by tests.
#[derive(Default)]
pub struct MemorySecretStore {
    inner: RwLock<HashMap<(String, String), Secret>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(
        &self,
        _ctx: &RequestContext,
        region: &str,
        name: &str,
    ) -> CoreResult<Option<Secret>> {
        let inner = self.inner.read().await;
        Ok(inner.get(&(region.to_string(), name.to_string())).cloned())
    }

    async fn put_secret(
        &self,
        _ctx: &RequestContext,
        region: &str,
        name: &str,
        value: Secret,
    ) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.insert((region.to_string(), name.to_string()), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawner_model::{AwsCredentials, GitPat};

    fn aws() -> Credentials {
        Credentials::Aws(AwsCredentials {
            access_key_id: "AKIA".into(),
            secret_access_key: Secret::new("s3cr3t"),
            session_token: Secret::default(),
        })
    }

    #[tokio::test]
    async fn write_then_read_credentials() {
        let store = MemorySecretStore::new();
        let ctx = RequestContext::new();

        write_credentials(&store, &ctx, "us-east-1", "team", &aws())
            .await
            .unwrap();
        let back = read_credentials(&store, &ctx, "us-east-1", "team", CredentialType::Aws)
            .await
            .unwrap();

        assert_eq!(back, aws());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn secrets_are_scoped_by_region() {
        let store = MemorySecretStore::new();
        let ctx = RequestContext::new();
        write_credentials(&store, &ctx, "us-east-1", "team", &aws())
            .await
            .unwrap();

        let err = read_credentials(&store, &ctx, "eu-west-1", "team", CredentialType::Aws)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn mistyped_secret_is_credential_error() {
        let store = MemorySecretStore::new();
        let ctx = RequestContext::new();
        let pat = Credentials::GitPat(GitPat {
            token: Secret::new("ghp"),
        });
        let body = serde_json::to_string(&pat).unwrap();
        store
            .put_secret(&ctx, "us-east-1", "team-aws", Secret::new(body))
            .await
            .unwrap();

        let err = read_credentials(&store, &ctx, "us-east-1", "team", CredentialType::Aws)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Credential(_)));
    }

    #[test]
    fn secret_names() {
        assert_eq!(credential_secret_name("team", CredentialType::GitPat), "team-git-pat");
        assert_eq!(kube_secret_name("c1"), "c1-kube");
    }
}
