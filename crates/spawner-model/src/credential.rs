use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ModelError, Secret};

/// Kind of credential kept in the secret store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialType {
    Aws,
    Azure,
    Gcp,
    GitPat,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::Aws => "aws",
            CredentialType::Azure => "azure",
            CredentialType::Gcp => "gcp",
            CredentialType::GitPat => "git-pat",
        }
    }

    /// Credential type a provider identifier expects, if any.
    pub fn for_provider(provider: &str) -> Option<Self> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "aws" => Some(Self::Aws),
            "azure" => Some(Self::Azure),
            "gcp" => Some(Self::Gcp),
            _ => None,
        }
    }
}

impl FromStr for CredentialType {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "azure" => Ok(Self::Azure),
            "gcp" => Ok(Self::Gcp),
            "git-pat" | "gitpat" => Ok(Self::GitPat),
            _ => Err(ModelError::UnknownCredentialType(s.to_string())),
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: Secret,
    #[serde(default)]
    pub session_token: Secret,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureCredentials {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Secret,
    pub resource_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpCredentials {
    pub project_id: String,
    /// Service account key (JSON) or a reference to it.
    pub service_account: Secret,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitPat {
    pub token: Secret,
}

/// Provider credentials; only the owning adapter interprets the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Credentials {
    Aws(AwsCredentials),
    Azure(AzureCredentials),
    Gcp(GcpCredentials),
    GitPat(GitPat),
}

impl Credentials {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Credentials::Aws(_) => CredentialType::Aws,
            Credentials::Azure(_) => CredentialType::Azure,
            Credentials::Gcp(_) => CredentialType::Gcp,
            Credentials::GitPat(_) => CredentialType::GitPat,
        }
    }

    /// Returns `true` when the secret part of the credentials is present.
    pub fn is_usable(&self) -> bool {
        match self {
            Credentials::Aws(c) => !c.access_key_id.is_empty() && !c.secret_access_key.is_empty(),
            Credentials::Azure(c) => {
                !c.subscription_id.is_empty()
                    && !c.tenant_id.is_empty()
                    && !c.client_id.is_empty()
                    && !c.client_secret.is_empty()
            }
            Credentials::Gcp(c) => !c.project_id.is_empty(),
            Credentials::GitPat(c) => !c.token.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadCredentialRequest {
    pub account: String,
    pub credential_type: CredentialType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadCredentialResponse {
    pub account: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone)]
pub struct WriteCredentialRequest {
    pub account: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteCredentialResponse {}
