//! SBOM upload capability.
//!
//! Publishes a finished SBOM to the first destination that accepts it
//! (first-success policy). Destination configuration is captured at
//! construction from explicit config/environment, so `supports` stays a
//! pure check over already-known state.

#[cfg(feature = "enrichment")]
mod destinations;

#[cfg(feature = "enrichment")]
pub use destinations::{
    DependencyTrackConfig, DependencyTrackDestination, SbomifyDestination, SbomifyUploadConfig,
};

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audit::AuditSink;
use crate::config::UploadConfig;
use crate::error::{Result, SbomResolverError};
use crate::generate::SbomFormat;
use crate::model::{Single, Sourced};
use crate::provider::{CancelToken, ProviderInfo, ProviderRegistry, ResolveInput};
use crate::resolve::{Resolved, ResolutionLimits, ResolutionPolicy, Resolver};

/// Input parameters for one SBOM upload.
#[derive(Debug, Clone)]
pub struct UploadInput {
    pub sbom_file: PathBuf,
    pub format: SbomFormat,
    pub component_name: Option<String>,
    pub component_version: Option<String>,
}

impl UploadInput {
    pub fn new(sbom_file: impl Into<PathBuf>, format: SbomFormat) -> Self {
        Self {
            sbom_file: sbom_file.into(),
            format,
            component_name: None,
            component_version: None,
        }
    }

    pub fn with_component(
        mut self,
        name: Option<String>,
        version: Option<String>,
    ) -> Self {
        self.component_name = name;
        self.component_version = version;
        self
    }
}

impl ResolveInput for UploadInput {
    fn identity(&self) -> String {
        format!("upload:{}|{}", self.sbom_file.display(), self.format)
    }

    fn label(&self) -> String {
        self.sbom_file.display().to_string()
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub destination: String,
    /// Where the destination says the document landed, if it says.
    pub location: Option<String>,
}

/// Build the registry of configured destinations. Destinations that are not
/// configured are simply not registered, so the provider set mirrors the
/// environment exactly.
pub fn default_registry(config: &UploadConfig) -> ProviderRegistry<UploadInput, UploadReceipt> {
    #[allow(unused_mut)]
    let mut builder = ProviderRegistry::<UploadInput, UploadReceipt>::builder();

    #[cfg(feature = "enrichment")]
    {
        use std::sync::Arc;

        if let Some(sbomify) = SbomifyUploadConfig::from_config(config) {
            if let Ok(destination) = SbomifyDestination::new(sbomify) {
                builder = builder.register(Arc::new(destination));
            }
        }
        if let Some(dtrack) = DependencyTrackConfig::from_env() {
            if let Ok(destination) = DependencyTrackDestination::new(dtrack) {
                builder = builder.register(Arc::new(destination));
            }
        }
    }
    #[cfg(not(feature = "enrichment"))]
    let _ = config;

    builder.build()
}

/// List configured destinations.
pub fn list_destinations(config: &UploadConfig) -> Vec<ProviderInfo> {
    default_registry(config).list()
}

/// Upload an SBOM to the first destination that accepts it.
pub fn upload(
    input: &UploadInput,
    config: &UploadConfig,
    sink: &dyn AuditSink,
    cancel: &CancelToken,
) -> Result<Sourced<UploadReceipt>> {
    if !input.sbom_file.is_file() {
        return Err(SbomResolverError::validation(format!(
            "SBOM file not found: {}",
            input.sbom_file.display()
        )));
    }

    let registry = default_registry(config);
    if registry.is_empty() {
        return Err(SbomResolverError::upload(
            "no destination configured",
            crate::error::UploadErrorKind::NotConfigured(
                "set sbomify or Dependency Track credentials".to_string(),
            ),
        ));
    }

    let limits = ResolutionLimits {
        max_concurrency: 1,
        per_provider_timeout: Duration::from_secs(config.upload_timeout_secs),
        overall_deadline: Duration::from_secs(config.upload_timeout_secs * 2),
    };
    let resolver = Resolver::new(ResolutionPolicy::FirstSuccess).with_limits(limits);

    let resolved: Resolved<Single<UploadReceipt>> =
        resolver.resolve(input, &registry, sink, cancel, None)?;
    let receipt = resolved
        .value
        .into_inner()
        .ok_or_else(|| SbomResolverError::validation("upload produced no receipt"))?;
    tracing::info!(destination = receipt.source.name.as_str(), "SBOM uploaded");
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_distinguishes_files() {
        let a = UploadInput::new("a.json", SbomFormat::CycloneDx);
        let b = UploadInput::new("b.json", SbomFormat::CycloneDx);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn missing_file_is_a_validation_error() {
        let config = UploadConfig::default();
        let input = UploadInput::new("/definitely/not/here.json", SbomFormat::CycloneDx);
        let err = upload(
            &input,
            &config,
            &crate::audit::NullAuditSink,
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
