//! Per-run memoization of provider calls.
//!
//! Keyed by `(provider name, input identity)` so the same package is never
//! queried twice against the same provider within one run. Strictly additive:
//! no eviction, since a run is short-lived and bounded by the number of
//! unique entities processed. Nothing here persists across runs — merged
//! results are best-effort and expected to drift with live data.

use std::collections::HashMap;
use std::sync::Mutex;

use xxhash_rust::xxh3::xxh3_64;

use crate::provider::ProviderOutcome;

/// Additive cache of provider outcomes for one run.
pub struct MemoCache<D> {
    entries: Mutex<HashMap<u64, ProviderOutcome<D>>>,
}

impl<D> Default for MemoCache<D> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<D> MemoCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(provider: &str, identity: &str) -> u64 {
        let mut keyed = String::with_capacity(provider.len() + identity.len() + 1);
        keyed.push_str(provider);
        keyed.push('\0');
        keyed.push_str(identity);
        xxh3_64(keyed.as_bytes())
    }

    /// Whether an outcome is worth remembering. Timeouts are transient and
    /// depend on the deadline they ran under, so they are always retried on
    /// the next entity that needs the same call.
    fn cacheable(outcome: &ProviderOutcome<D>) -> bool {
        !matches!(outcome, ProviderOutcome::TimedOut)
    }

    pub fn insert(&self, provider: &str, identity: &str, outcome: &ProviderOutcome<D>)
    where
        D: Clone,
    {
        if !Self::cacheable(outcome) {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(Self::key(provider, identity), outcome.clone());
        }
    }

    pub fn get(&self, provider: &str, identity: &str) -> Option<ProviderOutcome<D>>
    where
        D: Clone,
    {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&Self::key(provider, identity)).cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FailureReason;

    #[test]
    fn success_and_failure_are_memoized() {
        let cache: MemoCache<String> = MemoCache::new();
        cache.insert("pypi.org", "pkg:pypi/requests", &ProviderOutcome::Success("data".into()));
        cache.insert(
            "repology.org",
            "pkg:pypi/requests",
            &ProviderOutcome::Failed(FailureReason::api("500")),
        );

        assert!(matches!(
            cache.get("pypi.org", "pkg:pypi/requests"),
            Some(ProviderOutcome::Success(_))
        ));
        assert!(matches!(
            cache.get("repology.org", "pkg:pypi/requests"),
            Some(ProviderOutcome::Failed(_))
        ));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn timeouts_are_not_memoized() {
        let cache: MemoCache<String> = MemoCache::new();
        cache.insert("slow", "pkg:x/y", &ProviderOutcome::TimedOut);
        assert!(cache.get("slow", "pkg:x/y").is_none());
    }

    #[test]
    fn keys_distinguish_provider_and_identity() {
        let cache: MemoCache<String> = MemoCache::new();
        cache.insert("a", "x", &ProviderOutcome::Success("ax".into()));
        assert!(cache.get("b", "x").is_none());
        assert!(cache.get("a", "y").is_none());
    }
}
