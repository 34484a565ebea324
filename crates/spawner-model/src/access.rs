//! Cluster access: kube tokens, Rancher registration, OIDC and container registries.
use crate::{Labels, ProviderIdentity, Secret};

#[derive(Debug, Clone)]
pub struct GetTokenRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
}

/// Credentials for talking to a cluster's Kubernetes API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetTokenResponse {
    pub endpoint: String,
    /// PEM certificate authority bundle.
    pub ca_data: String,
    pub token: Secret,
}

#[derive(Debug, Clone)]
pub struct AddTokenRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddTokenResponse {
    /// Secret-store key the credentials were written under.
    pub secret_name: String,
}

#[derive(Debug, Clone)]
pub struct RegisterWithRancherRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterWithRancherResponse {
    pub cluster_id: String,
    pub manifest_url: String,
}

#[derive(Debug, Clone)]
pub struct RegisterClusterOidcRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
    pub issuer_url: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterClusterOidcResponse {}

#[derive(Debug, Clone)]
pub struct GetContainerRegistryAuthRequest {
    pub identity: ProviderIdentity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetContainerRegistryAuthResponse {
    /// Base64 `user:password` token.
    pub token: Secret,
    pub url: String,
    /// Expiry as RFC 3339.
    pub expires_at: String,
}

#[derive(Debug, Clone)]
pub struct CreateContainerRegistryRepoRequest {
    pub identity: ProviderIdentity,
    pub name: String,
    pub image_tag_mutable: bool,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateContainerRegistryRepoResponse {
    pub registry_id: String,
    pub repository_uri: String,
}
