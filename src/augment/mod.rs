//! Organizational metadata augmentation capability.
//!
//! Fills the SBOM's top-level subject component (supplier, licenses,
//! description, URLs) from local project manifests and, when configured, the
//! sbomify API. Runs under the accumulate policy: the explicit override file
//! outranks manifests, manifests outrank the API.
//!
//! `supports` must stay free of I/O, so the caller detects which manifests
//! exist once, up front, and records them in the input descriptor; sources
//! only inspect that static shape.

mod sources;

pub use sources::{CargoManifestSource, LocalJsonSource, PackageJsonSource, PyProjectSource};
#[cfg(feature = "enrichment")]
pub use sources::{SbomifyApiConfig, SbomifyApiSource};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::audit::AuditSink;
use crate::config::AugmentationConfig;
use crate::error::Result;
use crate::model::{MetadataDraft, NormalizedMetadata};
use crate::provider::{CancelToken, ProviderInfo, ProviderRegistry, ResolveInput};
use crate::resolve::{Resolved, ResolutionFailure, ResolutionLimits, ResolutionPolicy, Resolver};

/// Project manifest kinds the augmentation sources understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    CargoToml,
    PackageJson,
    PyProjectToml,
    /// Explicit override file (`.sbomify.json` by convention).
    LocalJson,
}

impl ManifestKind {
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::CargoToml => "Cargo.toml",
            Self::PackageJson => "package.json",
            Self::PyProjectToml => "pyproject.toml",
            Self::LocalJson => ".sbomify.json",
        }
    }

    const ALL: [Self; 4] = [
        Self::LocalJson,
        Self::CargoToml,
        Self::PackageJson,
        Self::PyProjectToml,
    ];
}

/// Input descriptor for one augmentation run.
#[derive(Debug, Clone)]
pub struct AugmentInput {
    /// Subject component name, if known.
    pub subject: Option<String>,
    /// Workspace root the manifests live in.
    pub root: PathBuf,
    /// Manifests actually present, detected once by the caller.
    pub manifests: Vec<ManifestKind>,
    /// Component id for API-backed providers.
    pub component_id: Option<String>,
}

impl AugmentInput {
    /// Build an input by probing the workspace root for known manifests.
    /// This is the single place filesystem probing happens.
    pub fn detect(root: impl Into<PathBuf>, subject: Option<String>) -> Self {
        let root = root.into();
        let manifests = ManifestKind::ALL
            .into_iter()
            .filter(|kind| root.join(kind.file_name()).is_file())
            .collect();
        Self {
            subject,
            root,
            manifests,
            component_id: None,
        }
    }

    pub fn with_component_id(mut self, component_id: Option<String>) -> Self {
        self.component_id = component_id;
        self
    }

    pub fn has_manifest(&self, kind: ManifestKind) -> bool {
        self.manifests.contains(&kind)
    }

    pub fn manifest_path(&self, kind: ManifestKind) -> PathBuf {
        self.root.join(kind.file_name())
    }
}

impl ResolveInput for AugmentInput {
    fn identity(&self) -> String {
        format!(
            "augment:{}|{}",
            self.root.display(),
            self.subject.as_deref().unwrap_or("-")
        )
    }

    fn label(&self) -> String {
        self.subject
            .clone()
            .unwrap_or_else(|| self.root.display().to_string())
    }
}

/// Build the default augmentation registry.
pub fn default_registry(
    config: &AugmentationConfig,
) -> ProviderRegistry<AugmentInput, MetadataDraft> {
    #[allow(unused_mut)]
    let mut builder = ProviderRegistry::<AugmentInput, MetadataDraft>::builder()
        .register(Arc::new(LocalJsonSource::new()))
        .register(Arc::new(CargoManifestSource::new()))
        .register(Arc::new(PackageJsonSource::new()))
        .register(Arc::new(PyProjectSource::new()));

    #[cfg(feature = "enrichment")]
    if let (Some(token), Some(api_base)) = (&config.api_token, &config.api_base_url) {
        if let Ok(source) = SbomifyApiSource::new(SbomifyApiConfig {
            api_base: api_base.clone(),
            token: token.clone(),
            timeout: Duration::from_secs(config.http_timeout_secs),
        }) {
            builder = builder.register(Arc::new(source));
        }
    }
    #[cfg(not(feature = "enrichment"))]
    let _ = config;

    builder.build()
}

/// Orchestrates organizational metadata resolution.
pub struct Augmenter {
    registry: ProviderRegistry<AugmentInput, MetadataDraft>,
    resolver: Resolver,
}

impl Augmenter {
    pub fn new(config: &AugmentationConfig) -> Self {
        Self::with_registry(default_registry(config), config)
    }

    pub fn with_registry(
        registry: ProviderRegistry<AugmentInput, MetadataDraft>,
        config: &AugmentationConfig,
    ) -> Self {
        let limits = ResolutionLimits {
            max_concurrency: 2,
            per_provider_timeout: Duration::from_secs(config.per_provider_timeout_secs),
            overall_deadline: Duration::from_secs(config.overall_deadline_secs),
        };
        let resolver = Resolver::new(ResolutionPolicy::Accumulate).with_limits(limits);
        Self { registry, resolver }
    }

    pub fn sources(&self) -> Vec<ProviderInfo> {
        self.registry.list()
    }

    /// Resolve organizational metadata for the workspace at `root`.
    pub fn resolve(
        &self,
        input: &AugmentInput,
        sink: &dyn AuditSink,
        cancel: &CancelToken,
    ) -> std::result::Result<Resolved<NormalizedMetadata>, ResolutionFailure> {
        self.resolver.resolve(input, &self.registry, sink, cancel, None)
    }
}

/// Split a `"Name <email>"` author string into its parts.
pub(crate) fn parse_author(author: &str) -> (Option<String>, Option<String>) {
    let trimmed = author.trim();
    if trimmed.is_empty() {
        return (None, None);
    }
    if let (Some(open), true) = (trimmed.find('<'), trimmed.ends_with('>')) {
        let name = trimmed[..open].trim();
        let email = trimmed[open + 1..trimmed.len() - 1].trim();
        (
            (!name.is_empty()).then(|| name.to_string()),
            (!email.is_empty()).then(|| email.to_string()),
        )
    } else {
        (Some(trimmed.to_string()), None)
    }
}

/// Ensure a workspace path exists before augmenting.
pub fn validate_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(crate::error::SbomResolverError::validation(format!(
            "workspace root does not exist: {}",
            root.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detect_finds_present_manifests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let input = AugmentInput::detect(dir.path(), Some("x".into()));
        assert!(input.has_manifest(ManifestKind::CargoToml));
        assert!(input.has_manifest(ManifestKind::PackageJson));
        assert!(!input.has_manifest(ManifestKind::PyProjectToml));
        assert!(!input.has_manifest(ManifestKind::LocalJson));
    }

    #[test]
    fn author_string_parsing() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.com>"),
            (Some("Jane Doe".into()), Some("jane@example.com".into()))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe".into()), None));
        assert_eq!(parse_author("  "), (None, None));
    }
}
