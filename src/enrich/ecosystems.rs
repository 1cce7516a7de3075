//! ecosyste.ms data source: multi-ecosystem aggregator.
//!
//! Tier 2 source used after the native registries: it covers many ecosystems
//! at once but its data can lag the registries it aggregates.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::enrich::cache::{CacheKey, FileCache};
use crate::net::{build_client, get_json, FetchResult};
use crate::enrich::PackageInput;
use crate::model::MetadataDraft;
use crate::provider::{Provider, ProviderContext, ProviderOutcome, ResolveInput};

/// PURL type to ecosyste.ms registry name.
const REGISTRY_NAMES: &[(&str, &str)] = &[
    ("cargo", "crates.io"),
    ("npm", "npmjs.org"),
    ("pypi", "pypi.org"),
    ("gem", "rubygems.org"),
    ("hex", "hex.pm"),
    ("pub", "pub.dev"),
    ("composer", "packagist.org"),
    ("nuget", "nuget.org"),
    ("golang", "proxy.golang.org"),
];

/// Configuration for the ecosyste.ms source.
#[derive(Debug, Clone)]
pub struct EcosystemsConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for EcosystemsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://packages.ecosyste.ms/api/v1/registries".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct EcosystemsPackage {
    description: Option<String>,
    homepage: Option<String>,
    repository_url: Option<String>,
    registry_url: Option<String>,
    licenses: Option<String>,
    normalized_licenses: Vec<String>,
}

/// Aggregator source for many package registries.
pub struct EcosystemsSource {
    config: EcosystemsConfig,
    client: Client,
    cache: Option<Arc<FileCache>>,
}

impl EcosystemsSource {
    pub fn new(config: EcosystemsConfig, cache: Option<Arc<FileCache>>) -> Result<Self, crate::provider::FailureReason> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    fn registry_for(ty: &str) -> Option<&'static str> {
        REGISTRY_NAMES
            .iter()
            .find(|(purl_type, _)| *purl_type == ty)
            .map(|(_, registry)| *registry)
    }

    fn normalize(&self, package: EcosystemsPackage) -> MetadataDraft {
        let mut draft = MetadataDraft::new();
        if let Some(description) = &package.description {
            draft.set_description(description);
        }
        // Prefer the pre-normalized license list; fall back to the raw
        // license string the upstream registry reported.
        if package.normalized_licenses.is_empty() {
            if let Some(licenses) = &package.licenses {
                draft.add_license(licenses);
            }
        } else {
            for license in &package.normalized_licenses {
                draft.add_license(license);
            }
        }
        if let Some(homepage) = &package.homepage {
            draft.set_homepage(homepage);
        }
        if let Some(repository_url) = &package.repository_url {
            draft.set_repository_url(repository_url);
        }
        if let Some(registry_url) = &package.registry_url {
            draft.set_registry_url(registry_url);
        }
        draft
    }
}

impl Provider<PackageInput, MetadataDraft> for EcosystemsSource {
    fn name(&self) -> &str {
        "ecosyste.ms"
    }

    fn priority(&self) -> i32 {
        // Tier 2: aggregator.
        45
    }

    fn supports(&self, input: &PackageInput) -> bool {
        Self::registry_for(input.ty()).is_some()
    }

    fn execute(&self, input: &PackageInput, ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let Some(registry) = Self::registry_for(input.ty()) else {
            return ProviderOutcome::Unsupported;
        };

        let cache_key = CacheKey::new(self.name(), input.identity());
        if let Some(cache) = &self.cache {
            if let Some(draft) = cache.get(&cache_key) {
                tracing::debug!(package = input.name(), "ecosyste.ms cache hit");
                return ProviderOutcome::Success(draft);
            }
        }

        let url = format!("{}/{}/packages/{}", self.config.api_base, registry, input.name());
        tracing::debug!(package = input.name(), url = url.as_str(), "fetching ecosyste.ms metadata");

        let package: EcosystemsPackage = match get_json(&self.client, &url, ctx) {
            FetchResult::Ok(body) => body,
            FetchResult::NotFound => {
                tracing::debug!(package = input.name(), "not found on ecosyste.ms");
                return ProviderOutcome::Unsupported;
            }
            FetchResult::Failed(reason) => return ProviderOutcome::Failed(reason),
            FetchResult::TimedOut => return ProviderOutcome::TimedOut,
        };

        let draft = self.normalize(package);
        if !draft.has_data() {
            return ProviderOutcome::Unsupported;
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&cache_key, &draft) {
                tracing::debug!(error = %e, "failed to cache ecosyste.ms response");
            }
        }
        ProviderOutcome::Success(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_mapping_covers_common_ecosystems() {
        assert_eq!(EcosystemsSource::registry_for("cargo"), Some("crates.io"));
        assert_eq!(EcosystemsSource::registry_for("npm"), Some("npmjs.org"));
        assert_eq!(EcosystemsSource::registry_for("deb"), None);
    }

    #[test]
    fn normalize_prefers_normalized_licenses() {
        let source = EcosystemsSource::new(EcosystemsConfig::default(), None).unwrap();
        let package: EcosystemsPackage = serde_json::from_str(
            r#"{
                "description": "A web framework",
                "licenses": "MIT,Apache-2.0",
                "normalized_licenses": ["MIT", "Apache-2.0"],
                "repository_url": "https://github.com/example/web"
            }"#,
        )
        .unwrap();
        let draft = source.normalize(package);
        assert_eq!(draft.licenses, vec!["MIT".to_string(), "Apache-2.0".to_string()]);
    }
}
