//! Configuration validation.

use thiserror::Error;

use super::types::{AppConfig, AugmentationConfig, EnrichmentConfig, GenerationConfig, UploadConfig};

/// A configuration value that cannot work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroValue { field: &'static str },

    #[error("per_provider_timeout_secs ({per_provider}) exceeds overall_deadline_secs ({overall})")]
    TimeoutExceedsDeadline { per_provider: u64, overall: u64 },

    #[error("invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// Types that can check their own configuration.
pub trait Validatable {
    fn validate(&self) -> Result<(), ConfigError>;
}

fn require_nonzero(value: u64, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroValue { field })
    } else {
        Ok(())
    }
}

fn require_http_url(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}

impl Validatable for EnrichmentConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroValue {
                field: "enrichment.max_concurrency",
            });
        }
        require_nonzero(self.per_provider_timeout_secs, "enrichment.per_provider_timeout_secs")?;
        require_nonzero(self.overall_deadline_secs, "enrichment.overall_deadline_secs")?;
        require_nonzero(self.http_timeout_secs, "enrichment.http_timeout_secs")?;
        if self.per_provider_timeout_secs > self.overall_deadline_secs {
            return Err(ConfigError::TimeoutExceedsDeadline {
                per_provider: self.per_provider_timeout_secs,
                overall: self.overall_deadline_secs,
            });
        }
        Ok(())
    }
}

impl Validatable for AugmentationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero(self.per_provider_timeout_secs, "augmentation.per_provider_timeout_secs")?;
        require_nonzero(self.overall_deadline_secs, "augmentation.overall_deadline_secs")?;
        if let Some(api_base_url) = &self.api_base_url {
            require_http_url(api_base_url, "augmentation.api_base_url")?;
        }
        Ok(())
    }
}

impl Validatable for GenerationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero(self.tool_timeout_secs, "generation.tool_timeout_secs")?;
        require_nonzero(self.overall_deadline_secs, "generation.overall_deadline_secs")?;
        Ok(())
    }
}

impl Validatable for UploadConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonzero(self.upload_timeout_secs, "upload.upload_timeout_secs")?;
        require_http_url(&self.sbomify_api_base, "upload.sbomify_api_base")?;
        Ok(())
    }
}

impl Validatable for AppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.enrichment.validate()?;
        self.augmentation.validate()?;
        self.generation.validate()?;
        self.upload.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert_eq!(AppConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = EnrichmentConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroValue { .. })
        ));
    }

    #[test]
    fn timeout_must_fit_deadline() {
        let config = EnrichmentConfig {
            per_provider_timeout_secs: 300,
            overall_deadline_secs: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimeoutExceedsDeadline { .. })
        ));
    }

    #[test]
    fn bad_api_base_rejected() {
        let config = UploadConfig {
            sbomify_api_base: "not-a-url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }
}
