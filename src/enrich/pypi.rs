//! PyPI data source for Python package metadata.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::enrich::cache::{CacheKey, FileCache};
use crate::net::{build_client, get_json, FetchResult};
use crate::enrich::PackageInput;
use crate::model::MetadataDraft;
use crate::provider::{Provider, ProviderContext, ProviderOutcome, ResolveInput};

/// Configuration for the PyPI source.
#[derive(Debug, Clone)]
pub struct PyPiConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for PyPiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://pypi.org/pypi".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PyPiResponse {
    info: PyPiInfo,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PyPiInfo {
    summary: Option<String>,
    license: Option<String>,
    author: Option<String>,
    maintainer: Option<String>,
    author_email: Option<String>,
    home_page: Option<String>,
    project_urls: Option<BTreeMap<String, Option<String>>>,
}

/// Native source for the Python package index.
pub struct PyPiSource {
    config: PyPiConfig,
    client: Client,
    cache: Option<Arc<FileCache>>,
}

impl PyPiSource {
    pub fn new(config: PyPiConfig, cache: Option<Arc<FileCache>>) -> Result<Self, crate::provider::FailureReason> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    fn normalize(&self, input: &PackageInput, response: PyPiResponse) -> MetadataDraft {
        let info = response.info;
        let mut draft = MetadataDraft::new();

        if let Some(summary) = &info.summary {
            draft.set_description(summary);
        }
        if let Some(license) = &info.license {
            draft.add_license(license);
        }
        if let Some(author) = info.author.as_deref().or(info.maintainer.as_deref()) {
            draft.set_supplier(author);
            draft.set_maintainer_name(author);
        }
        if let Some(email) = &info.author_email {
            draft.set_maintainer_email(email);
        }
        if let Some(home_page) = &info.home_page {
            draft.set_homepage(home_page);
        }

        // project_urls keys are free-form; classify by common naming.
        for (key, url) in info.project_urls.unwrap_or_default() {
            let Some(url) = url else { continue };
            let key = key.to_ascii_lowercase();
            if draft.homepage.is_none() && key.contains("home") {
                draft.set_homepage(&url);
            } else if draft.repository_url.is_none()
                && (key.contains("source") || key.contains("repository") || key.contains("code"))
            {
                draft.set_repository_url(&url);
            } else if draft.documentation_url.is_none() && key.contains("doc") {
                draft.set_documentation_url(&url);
            } else if draft.issue_tracker_url.is_none()
                && (key.contains("issue") || key.contains("bug") || key.contains("tracker"))
            {
                draft.set_issue_tracker_url(&url);
            } else if draft.download_url.is_none() && key.contains("download") {
                draft.set_download_url(&url);
            }
        }

        draft.set_registry_url(&format!("https://pypi.org/project/{}/", input.name()));
        draft
    }
}

impl Provider<PackageInput, MetadataDraft> for PyPiSource {
    fn name(&self) -> &str {
        "pypi.org"
    }

    fn priority(&self) -> i32 {
        // Tier 1: native registry.
        10
    }

    fn supports(&self, input: &PackageInput) -> bool {
        input.ty() == "pypi"
    }

    fn execute(&self, input: &PackageInput, ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let cache_key = CacheKey::new(self.name(), input.identity());
        if let Some(cache) = &self.cache {
            if let Some(draft) = cache.get(&cache_key) {
                tracing::debug!(package = input.name(), "pypi cache hit");
                return ProviderOutcome::Success(draft);
            }
        }

        let url = match input.version() {
            Some(version) => format!("{}/{}/{}/json", self.config.api_base, input.name(), version),
            None => format!("{}/{}/json", self.config.api_base, input.name()),
        };
        tracing::debug!(package = input.name(), url = url.as_str(), "fetching PyPI metadata");

        let response: PyPiResponse = match get_json(&self.client, &url, ctx) {
            FetchResult::Ok(body) => body,
            FetchResult::NotFound => {
                tracing::debug!(package = input.name(), "not found on PyPI");
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
                tracing::debug!(error = %e, "failed to cache PyPI response");
            }
        }
        ProviderOutcome::Success(draft)
    }
}
