use std::fmt;

use serde::{Deserialize, Serialize};

/// Provider, region and account a request is scoped to.
///
/// Immutable per request: it selects the adapter and scopes the session.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderIdentity {
    pub provider: String,
    pub region: String,
    pub account: String,
}

impl ProviderIdentity {
    pub fn new(
        provider: impl Into<String>,
        region: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            region: region.into(),
            account: account.into(),
        }
    }

    /// Normalized provider key used for registry lookups.
    pub fn provider_key(&self) -> String {
        self.provider.trim().to_ascii_lowercase()
    }

    /// Same identity in another region.
    pub fn with_region(&self, region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.provider, self.region, self.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_key_is_normalized() {
        let id = ProviderIdentity::new(" AWS ", "us-west-2", "team");
        assert_eq!(id.provider_key(), "aws");
    }

    #[test]
    fn with_region_keeps_provider_and_account() {
        let id = ProviderIdentity::new("aws", "us-west-2", "team");
        let moved = id.with_region("eu-west-1");
        assert_eq!(moved.provider, "aws");
        assert_eq!(moved.account, "team");
        assert_eq!(moved.region, "eu-west-1");
        assert_eq!(moved.to_string(), "aws/eu-west-1/team");
    }
}
