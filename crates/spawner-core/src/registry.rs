//! Provider registry that selects the adapter for a request's provider identifier.
use std::{collections::BTreeMap, sync::Arc};

use spawner_model::ProviderIdentity;
use tracing::debug;

use crate::{
    error::{CoreError, CoreResult},
    provider::Provider,
};

/// Adapters keyed by normalized provider identifier.
///
/// Filled once at startup and read-only afterwards.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own [`Provider::name`].
    ///
    /// A later registration for the same key replaces the earlier one.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let key = provider.name().trim().to_ascii_lowercase();
        debug!(provider = %key, "provider registered");
        self.providers.insert(key, provider);
    }

    /// Builder-style [`Self::register`].
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Adapter for an identity; unknown providers are `InvalidInput`.
    pub fn pick(&self, identity: &ProviderIdentity) -> CoreResult<&Arc<dyn Provider>> {
        let key = identity.provider_key();
        if key.is_empty() {
            return Err(CoreError::invalid("provider cannot be empty"));
        }
        self.providers
            .get(&key)
            .ok_or_else(|| CoreError::invalid(format!("unknown provider '{}'", identity.provider)))
    }

    /// Registered provider keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.providers.contains_key(&key.trim().to_ascii_lowercase())
    }
}
