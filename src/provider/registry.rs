//! Immutable, ordered provider registry.
//!
//! The registry is constructed once at process start through
//! [`ProviderRegistryBuilder`] and exposes no mutation afterwards, so lookups
//! need no locking and the provider set for a run is statically inspectable.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use super::Provider;

/// Read-only collection of providers for one capability.
pub struct ProviderRegistry<I, D> {
    providers: Vec<Arc<dyn Provider<I, D>>>,
}

impl<I, D> ProviderRegistry<I, D> {
    /// Start building a registry. Registration order is the tie-break for
    /// equal priorities, so build it in one place, in a deliberate order.
    pub fn builder() -> ProviderRegistryBuilder<I, D> {
        ProviderRegistryBuilder {
            providers: Vec::new(),
        }
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers whose `supports` accepts the input, stable-sorted by
    /// priority ascending with registration order breaking ties.
    ///
    /// A `supports` that panics marks its provider unsupported rather than
    /// aborting the resolution: one malformed provider must never take the
    /// whole cascade down.
    pub fn eligible_for(&self, input: &I) -> Vec<Arc<dyn Provider<I, D>>> {
        let mut eligible: Vec<Arc<dyn Provider<I, D>>> = self
            .providers
            .iter()
            .filter(|p| {
                let supported =
                    catch_unwind(AssertUnwindSafe(|| p.supports(input))).unwrap_or_else(|_| {
                        tracing::warn!(
                            provider = p.name(),
                            "supports() panicked; treating provider as unsupported"
                        );
                        false
                    });
                if !supported {
                    tracing::trace!(provider = p.name(), "provider does not support input");
                }
                supported
            })
            .cloned()
            .collect();
        // Vec::sort_by_key is stable, so registration order survives ties.
        eligible.sort_by_key(|p| p.priority());
        eligible
    }

    /// All registered providers with their priorities, in priority order.
    pub fn list(&self) -> Vec<ProviderInfo> {
        let mut infos: Vec<ProviderInfo> = self
            .providers
            .iter()
            .map(|p| ProviderInfo {
                name: p.name().to_string(),
                priority: p.priority(),
            })
            .collect();
        infos.sort_by_key(|info| info.priority);
        infos
    }
}

/// Builder for [`ProviderRegistry`]; consumed by `build`.
pub struct ProviderRegistryBuilder<I, D> {
    providers: Vec<Arc<dyn Provider<I, D>>>,
}

impl<I, D> ProviderRegistryBuilder<I, D> {
    /// Register a provider. Order of registration breaks priority ties.
    pub fn register(mut self, provider: Arc<dyn Provider<I, D>>) -> Self {
        tracing::debug!(
            provider = provider.name(),
            priority = provider.priority(),
            "registered provider"
        );
        self.providers.push(provider);
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> ProviderRegistry<I, D> {
        ProviderRegistry {
            providers: self.providers,
        }
    }
}

/// Name and priority of a registered provider, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub priority: i32,
}
