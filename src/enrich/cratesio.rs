//! crates.io data source for Rust package metadata.
//!
//! The authoritative source for `pkg:cargo/*` packages, tried before the
//! multi-ecosystem aggregators. When the PURL carries a version the
//! version-specific endpoint is used, since only it includes the license.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::enrich::cache::{CacheKey, FileCache};
use crate::net::{build_client, get_json, FetchResult};
use crate::enrich::PackageInput;
use crate::model::MetadataDraft;
use crate::provider::{Provider, ProviderContext, ProviderOutcome, ResolveInput};

/// Configuration for the crates.io source.
#[derive(Debug, Clone)]
pub struct CratesIoConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for CratesIoConfig {
    fn default() -> Self {
        Self {
            api_base: "https://crates.io/api/v1/crates".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CratesResponse {
    version: Option<VersionData>,
    #[serde(rename = "crate")]
    krate: Option<CrateData>,
}

#[derive(Debug, Deserialize)]
struct VersionData {
    description: Option<String>,
    license: Option<String>,
    homepage: Option<String>,
    repository: Option<String>,
    documentation: Option<String>,
    published_by: Option<PublishedBy>,
}

#[derive(Debug, Deserialize)]
struct PublishedBy {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrateData {
    description: Option<String>,
    homepage: Option<String>,
    repository: Option<String>,
    documentation: Option<String>,
}

/// Native source for the Rust package registry.
pub struct CratesIoSource {
    config: CratesIoConfig,
    client: Client,
    cache: Option<Arc<FileCache>>,
}

impl CratesIoSource {
    pub fn new(config: CratesIoConfig, cache: Option<Arc<FileCache>>) -> Result<Self, crate::provider::FailureReason> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    fn normalize(&self, input: &PackageInput, response: CratesResponse) -> MetadataDraft {
        let version = response.version;
        let krate = response.krate;
        let mut draft = MetadataDraft::new();

        let pick = |version_field: Option<String>, crate_field: Option<String>| {
            version_field.or(crate_field)
        };

        let (v_desc, v_home, v_repo, v_doc, v_license, v_publisher) = match version {
            Some(v) => (
                v.description,
                v.homepage,
                v.repository,
                v.documentation,
                v.license,
                v.published_by.and_then(|p| p.name),
            ),
            None => (None, None, None, None, None, None),
        };
        let (c_desc, c_home, c_repo, c_doc) = match krate {
            Some(c) => (c.description, c.homepage, c.repository, c.documentation),
            None => (None, None, None, None),
        };

        if let Some(description) = pick(v_desc, c_desc) {
            draft.set_description(&description);
        }
        // crates.io license fields are already SPDX expressions.
        if let Some(license) = v_license {
            draft.add_license(&license);
        }
        if let Some(publisher) = v_publisher {
            // The publisher serves as both supplier and maintainer detail.
            draft.set_supplier(&publisher);
            draft.set_maintainer_name(&publisher);
        }
        if let Some(homepage) = pick(v_home, c_home) {
            draft.set_homepage(&homepage);
        }
        if let Some(repository) = pick(v_repo, c_repo) {
            draft.set_repository_url(&repository);
        }
        if let Some(documentation) = pick(v_doc, c_doc) {
            draft.set_documentation_url(&documentation);
        }
        draft.set_registry_url(&format!("https://crates.io/crates/{}", input.name()));

        draft
    }
}

impl Provider<PackageInput, MetadataDraft> for CratesIoSource {
    fn name(&self) -> &str {
        "crates.io"
    }

    fn priority(&self) -> i32 {
        // Tier 1: native registry.
        10
    }

    fn supports(&self, input: &PackageInput) -> bool {
        input.ty() == "cargo"
    }

    fn execute(&self, input: &PackageInput, ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let cache_key = CacheKey::new(self.name(), input.identity());
        if let Some(cache) = &self.cache {
            if let Some(draft) = cache.get(&cache_key) {
                tracing::debug!(package = input.name(), "crates.io cache hit");
                return ProviderOutcome::Success(draft);
            }
        }

        let url = match input.version() {
            Some(version) => format!("{}/{}/{}", self.config.api_base, input.name(), version),
            None => format!("{}/{}", self.config.api_base, input.name()),
        };
        tracing::debug!(package = input.name(), url = url.as_str(), "fetching crates.io metadata");

        let response: CratesResponse = match get_json(&self.client, &url, ctx) {
            FetchResult::Ok(body) => body,
            FetchResult::NotFound => {
                tracing::debug!(package = input.name(), "not found on crates.io");
                return ProviderOutcome::Unsupported;
            }
            FetchResult::Failed(reason) => return ProviderOutcome::Failed(reason),
            FetchResult::TimedOut => return ProviderOutcome::TimedOut,
        };

        let draft = self.normalize(input, response);
        if !draft.has_data() {
            return ProviderOutcome::Unsupported;
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&cache_key, &draft) {
                tracing::debug!(error = %e, "failed to cache crates.io response");
            }
        }
        ProviderOutcome::Success(draft)
    }
}
