//! Package-metadata enrichment capability.
//!
//! Resolves per-component metadata by PURL under the accumulate policy:
//! every supporting source contributes, higher-priority sources win each
//! field, lower-priority sources fill the gaps. The default registry follows
//! the priority tiers of the source list: native registries (10), the
//! ecosyste.ms aggregator (45), and the local PURL fallback (70).

#[cfg(feature = "enrichment")]
pub mod cache;
#[cfg(feature = "enrichment")]
mod cratesio;
#[cfg(feature = "enrichment")]
mod ecosystems;
mod input;
mod purl_source;
mod stats;

#[cfg(feature = "enrichment")]
pub use cratesio::{CratesIoConfig, CratesIoSource};
#[cfg(feature = "enrichment")]
pub use ecosystems::{EcosystemsConfig, EcosystemsSource};
pub use input::PackageInput;
pub use purl_source::PurlFallbackSource;
pub use stats::EnrichmentStats;

#[cfg(feature = "enrichment")]
pub use pypi::{PyPiConfig, PyPiSource};
#[cfg(feature = "enrichment")]
mod pypi;

use indexmap::IndexMap;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audit::AuditSink;
use crate::config::EnrichmentConfig;
use crate::error::Result;
use crate::model::{MetadataDraft, NormalizedMetadata};
use crate::provider::{CancelToken, ProviderInfo, ProviderRegistry};
use crate::resolve::{MemoCache, Resolved, ResolutionFailure, ResolutionLimits, ResolutionPolicy, Resolver};

/// Build the default enrichment registry.
///
/// Registration happens in one place, in tier order, so the provider set for
/// a run is statically inspectable (`sources` subcommand).
pub fn default_registry(
    config: &EnrichmentConfig,
) -> Result<ProviderRegistry<PackageInput, MetadataDraft>> {
    #[allow(unused_mut)]
    let mut builder = ProviderRegistry::<PackageInput, MetadataDraft>::builder();
    #[cfg(not(feature = "enrichment"))]
    let _ = config;

    #[cfg(feature = "enrichment")]
    {
        use crate::error::SbomResolverError;

        let cache = if config.bypass_cache {
            None
        } else {
            let dir = config.cache_dir();
            Some(Arc::new(
                cache::FileCache::new(dir, Duration::from_secs(config.cache_ttl_hours * 3600))
                    .map_err(|e| SbomResolverError::config(format!("cache setup failed: {e}")))?,
            ))
        };
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let crates_config = CratesIoConfig {
            timeout,
            ..CratesIoConfig::default()
        };
        let pypi_config = PyPiConfig {
            timeout,
            ..PyPiConfig::default()
        };
        let ecosystems_config = EcosystemsConfig {
            timeout,
            ..EcosystemsConfig::default()
        };

        builder = builder
            .register(Arc::new(
                CratesIoSource::new(crates_config, cache.clone())
                    .map_err(|e| SbomResolverError::config(e.to_string()))?,
            ))
            .register(Arc::new(
                PyPiSource::new(pypi_config, cache.clone())
                    .map_err(|e| SbomResolverError::config(e.to_string()))?,
            ))
            .register(Arc::new(
                EcosystemsSource::new(ecosystems_config, cache)
                    .map_err(|e| SbomResolverError::config(e.to_string()))?,
            ));
    }

    builder = builder.register(Arc::new(PurlFallbackSource::new()));
    Ok(builder.build())
}

/// Orchestrates metadata resolution for packages.
pub struct Enricher {
    registry: ProviderRegistry<PackageInput, MetadataDraft>,
    resolver: Resolver,
    memo: MemoCache<MetadataDraft>,
}

impl Enricher {
    /// Create an enricher with the default registry.
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        Ok(Self::with_registry(default_registry(config)?, config))
    }

    /// Create an enricher over an explicit registry (tests pin mock
    /// providers this way: live sources drift, mock sources do not).
    pub fn with_registry(
        registry: ProviderRegistry<PackageInput, MetadataDraft>,
        config: &EnrichmentConfig,
    ) -> Self {
        let limits = ResolutionLimits {
            max_concurrency: config.max_concurrency,
            per_provider_timeout: Duration::from_secs(config.per_provider_timeout_secs),
            overall_deadline: Duration::from_secs(config.overall_deadline_secs),
        };
        let resolver = Resolver::new(ResolutionPolicy::Accumulate)
            .with_limits(limits)
            .stop_when_complete(config.stop_when_complete);
        Self {
            registry,
            resolver,
            memo: MemoCache::new(),
        }
    }

    /// Registered sources with priorities.
    pub fn sources(&self) -> Vec<ProviderInfo> {
        self.registry.list()
    }

    /// Resolve metadata for one package.
    pub fn resolve_package(
        &self,
        input: &PackageInput,
        sink: &dyn AuditSink,
        cancel: &CancelToken,
    ) -> std::result::Result<Resolved<NormalizedMetadata>, ResolutionFailure> {
        self.resolver
            .resolve(input, &self.registry, sink, cancel, Some(&self.memo))
    }

    /// Resolve metadata for a batch of PURLs.
    ///
    /// Entities fail independently: a PURL that cannot be parsed or resolved
    /// is reported in the stats and returned as `None`, and processing
    /// continues — partial success is the steady state here.
    pub fn resolve_all(
        &self,
        purls: &[String],
        sink: &dyn AuditSink,
        cancel: &CancelToken,
    ) -> (IndexMap<String, Option<NormalizedMetadata>>, EnrichmentStats) {
        let started = Instant::now();

        let outcomes: Vec<(String, std::result::Result<Option<NormalizedMetadata>, String>)> = purls
            .par_iter()
            .map(|purl_str| {
                let input = match PackageInput::parse(purl_str) {
                    Ok(input) => input,
                    Err(e) => {
                        tracing::warn!(purl = purl_str.as_str(), error = %e, "skipping unparsable PURL");
                        return (purl_str.clone(), Ok(None));
                    }
                };
                match self.resolve_package(&input, sink, cancel) {
                    Ok(resolved) => {
                        for degraded in resolved.degraded_attempts() {
                            tracing::debug!(purl = purl_str.as_str(), "{degraded}");
                        }
                        (purl_str.clone(), Ok(Some(resolved.value)))
                    }
                    Err(failure) => (purl_str.clone(), Err(failure.to_string())),
                }
            })
            .collect();

        let mut stats = EnrichmentStats::new();
        stats.entities = purls.len();
        let mut results = IndexMap::with_capacity(purls.len());

        for (purl, outcome) in outcomes {
            match outcome {
                Ok(Some(metadata)) => {
                    stats.enriched += 1;
                    if metadata.description.is_some()
                        && metadata.licenses.is_some()
                        && metadata.supplier.is_some()
                    {
                        stats.complete += 1;
                    }
                    results.insert(purl, Some(metadata));
                }
                Ok(None) => {
                    stats.skipped += 1;
                    results.insert(purl, None);
                }
                Err(message) => {
                    stats.failed += 1;
                    stats.errors.push(message);
                    results.insert(purl, None);
                }
            }
        }

        stats.duration = started.elapsed();
        (results, stats)
    }
}
