//! Configuration structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::{
    DEFAULT_CACHE_TTL_HOURS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_OVERALL_DEADLINE_SECS, DEFAULT_PER_PROVIDER_TIMEOUT_SECS, DEFAULT_TOOL_TIMEOUT_SECS,
    DEFAULT_UPLOAD_TIMEOUT_SECS,
};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub enrichment: EnrichmentConfig,
    pub augmentation: AugmentationConfig,
    pub generation: GenerationConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Overlay credentials from the environment, CI-style: explicit config
    /// wins, environment fills the gaps.
    ///
    /// Variables: `SBOMIFY_TOKEN`, `SBOMIFY_COMPONENT_ID`,
    /// `SBOMIFY_API_BASE`.
    pub fn overlay_env(&mut self) {
        let token = std::env::var("SBOMIFY_TOKEN").ok().filter(|v| !v.is_empty());
        let component_id = std::env::var("SBOMIFY_COMPONENT_ID")
            .ok()
            .filter(|v| !v.is_empty());
        let api_base = std::env::var("SBOMIFY_API_BASE").ok().filter(|v| !v.is_empty());

        if self.upload.sbomify_token.is_none() {
            self.upload.sbomify_token = token.clone();
        }
        if self.upload.sbomify_component_id.is_none() {
            self.upload.sbomify_component_id = component_id.clone();
        }
        if let Some(api_base) = &api_base {
            if self.upload.sbomify_api_base == default_sbomify_api_base() {
                self.upload.sbomify_api_base = api_base.clone();
            }
        }

        if self.augmentation.api_token.is_none() {
            self.augmentation.api_token = token;
        }
        if self.augmentation.component_id.is_none() {
            self.augmentation.component_id = component_id;
        }
        if self.augmentation.api_base_url.is_none() {
            self.augmentation.api_base_url =
                Some(api_base.unwrap_or_else(default_sbomify_api_base));
        }
    }
}

/// Enrichment capability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrichmentConfig {
    /// Concurrent provider invocations per package.
    pub max_concurrency: usize,
    pub per_provider_timeout_secs: u64,
    pub overall_deadline_secs: u64,
    /// Stop querying lower-priority sources once the NTIA core fields are
    /// populated.
    pub stop_when_complete: bool,
    /// Response cache directory; the platform cache dir when unset.
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_hours: u64,
    /// Skip the response cache and fetch fresh data.
    pub bypass_cache: bool,
    pub http_timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            per_provider_timeout_secs: DEFAULT_PER_PROVIDER_TIMEOUT_SECS,
            overall_deadline_secs: DEFAULT_OVERALL_DEADLINE_SECS,
            stop_when_complete: true,
            cache_dir: None,
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            bypass_cache: false,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl EnrichmentConfig {
    /// Effective cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("sbom-resolver")
                .join("registry")
        })
    }
}

/// Augmentation capability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AugmentationConfig {
    pub per_provider_timeout_secs: u64,
    pub overall_deadline_secs: u64,
    pub http_timeout_secs: u64,
    /// sbomify API credentials for the org-metadata provider.
    pub api_token: Option<String>,
    pub api_base_url: Option<String>,
    pub component_id: Option<String>,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            per_provider_timeout_secs: DEFAULT_PER_PROVIDER_TIMEOUT_SECS,
            overall_deadline_secs: DEFAULT_OVERALL_DEADLINE_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            api_token: None,
            api_base_url: None,
            component_id: None,
        }
    }
}

/// Generation capability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Budget for one generator tool run.
    pub tool_timeout_secs: u64,
    /// Budget for the whole generator cascade.
    pub overall_deadline_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            overall_deadline_secs: DEFAULT_TOOL_TIMEOUT_SECS * 2,
        }
    }
}

/// Upload capability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub sbomify_api_base: String,
    pub sbomify_token: Option<String>,
    pub sbomify_component_id: Option<String>,
    pub upload_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            sbomify_api_base: default_sbomify_api_base(),
            sbomify_token: None,
            sbomify_component_id: None,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
        }
    }
}

fn default_sbomify_api_base() -> String {
    "https://app.sbomify.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert!(config.enrichment.max_concurrency >= 1);
        assert!(config.enrichment.stop_when_complete);
        assert!(config.upload.sbomify_token.is_none());
    }

    #[test]
    fn cache_dir_falls_back_to_platform_dir() {
        let config = EnrichmentConfig::default();
        let dir = config.cache_dir();
        assert!(dir.to_string_lossy().contains("sbom-resolver"));
    }

    #[test]
    fn explicit_cache_dir_wins() {
        let config = EnrichmentConfig {
            cache_dir: Some(PathBuf::from("/tmp/custom")),
            ..Default::default()
        };
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/custom"));
    }
}
