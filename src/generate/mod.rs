//! SBOM generation capability.
//!
//! Wraps external generator tools behind the provider contract and resolves
//! them under the first-success policy: generators are tried strictly in
//! priority order and the first one that produces a valid document wins.
//! Native generators rank before the multi-ecosystem scanners.

mod generators;

pub use generators::{
    CargoCyclonedxGenerator, CdxgenGenerator, SyftGenerator, TrivyGenerator,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::audit::AuditSink;
use crate::config::GenerationConfig;
use crate::error::{Result, SbomResolverError};
use crate::model::{Single, Sourced};
use crate::provider::{CancelToken, ProviderInfo, ProviderRegistry, ResolveInput};
use crate::resolve::{Resolved, ResolutionLimits, ResolutionPolicy, Resolver};

/// Supported SBOM output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SbomFormat {
    CycloneDx,
    Spdx,
}

impl SbomFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CycloneDx => "cyclonedx",
            Self::Spdx => "spdx",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "cyclonedx" => Ok(Self::CycloneDx),
            "spdx" => Ok(Self::Spdx),
            other => Err(SbomResolverError::validation(format!(
                "unknown SBOM format: {other} (expected cyclonedx or spdx)"
            ))),
        }
    }
}

impl fmt::Display for SbomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to generate the SBOM from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationSource {
    LockFile(PathBuf),
    DockerImage(String),
}

/// Input parameters for one SBOM generation.
#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub source: GenerationSource,
    pub output_file: PathBuf,
    pub output_format: SbomFormat,
    /// Specific spec version; None uses the winning generator's default.
    pub spec_version: Option<String>,
}

impl GenerationInput {
    pub fn for_lock_file(lock_file: impl Into<PathBuf>) -> Self {
        Self {
            source: GenerationSource::LockFile(lock_file.into()),
            output_file: PathBuf::from("sbom.json"),
            output_format: SbomFormat::CycloneDx,
            spec_version: None,
        }
    }

    pub fn for_docker_image(image: impl Into<String>) -> Self {
        Self {
            source: GenerationSource::DockerImage(image.into()),
            output_file: PathBuf::from("sbom.json"),
            output_format: SbomFormat::CycloneDx,
            spec_version: None,
        }
    }

    pub fn with_output_file(mut self, output_file: impl Into<PathBuf>) -> Self {
        self.output_file = output_file.into();
        self
    }

    pub fn with_format(mut self, format: SbomFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_spec_version(mut self, version: Option<String>) -> Self {
        self.spec_version = version;
        self
    }

    /// Lock file name without its directory, if the source is a lock file.
    pub fn lock_file_name(&self) -> Option<String> {
        match &self.source {
            GenerationSource::LockFile(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            GenerationSource::DockerImage(_) => None,
        }
    }

    pub fn lock_file(&self) -> Option<&Path> {
        match &self.source {
            GenerationSource::LockFile(path) => Some(path),
            GenerationSource::DockerImage(_) => None,
        }
    }

    pub fn docker_image(&self) -> Option<&str> {
        match &self.source {
            GenerationSource::DockerImage(image) => Some(image),
            GenerationSource::LockFile(_) => None,
        }
    }
}

impl ResolveInput for GenerationInput {
    fn identity(&self) -> String {
        let source = match &self.source {
            GenerationSource::LockFile(path) => format!("lockfile:{}", path.display()),
            GenerationSource::DockerImage(image) => format!("image:{image}"),
        };
        format!(
            "{source}|{}|{}",
            self.output_format,
            self.spec_version.as_deref().unwrap_or("default")
        )
    }

    fn label(&self) -> String {
        match &self.source {
            GenerationSource::LockFile(path) => path.display().to_string(),
            GenerationSource::DockerImage(image) => image.clone(),
        }
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub generator: String,
    pub output_file: PathBuf,
    pub format: SbomFormat,
    pub spec_version: String,
}

// Lock file names per ecosystem. Generators declare support in terms of
// these lists.
pub(crate) const PYTHON_LOCK_FILES: &[&str] = &[
    "Pipfile.lock",
    "poetry.lock",
    "pyproject.toml",
    "requirements.txt",
    "uv.lock",
];
pub(crate) const RUST_LOCK_FILES: &[&str] = &["Cargo.lock"];
pub(crate) const JAVASCRIPT_LOCK_FILES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lock",
];
pub(crate) const RUBY_LOCK_FILES: &[&str] = &["Gemfile.lock"];
pub(crate) const GO_LOCK_FILES: &[&str] = &["go.mod", "go.sum"];
pub(crate) const DART_LOCK_FILES: &[&str] = &["pubspec.lock"];
pub(crate) const CPP_LOCK_FILES: &[&str] = &["conan.lock"];
pub(crate) const JAVA_LOCK_FILES: &[&str] =
    &["pom.xml", "build.gradle", "build.gradle.kts", "gradle.lockfile"];
pub(crate) const PHP_LOCK_FILES: &[&str] = &["composer.json", "composer.lock"];
pub(crate) const DOTNET_LOCK_FILES: &[&str] = &["packages.lock.json"];
pub(crate) const SWIFT_LOCK_FILES: &[&str] = &["Package.swift", "Package.resolved"];
pub(crate) const ELIXIR_LOCK_FILES: &[&str] = &["mix.lock"];

/// Every lock file name some generator understands.
pub fn is_known_lock_file(name: &str) -> bool {
    [
        PYTHON_LOCK_FILES,
        RUST_LOCK_FILES,
        JAVASCRIPT_LOCK_FILES,
        RUBY_LOCK_FILES,
        GO_LOCK_FILES,
        DART_LOCK_FILES,
        CPP_LOCK_FILES,
        JAVA_LOCK_FILES,
        PHP_LOCK_FILES,
        DOTNET_LOCK_FILES,
        SWIFT_LOCK_FILES,
        ELIXIR_LOCK_FILES,
    ]
    .iter()
    .any(|list| list.contains(&name))
}

/// Build the default generator registry, native generators first.
pub fn default_registry() -> ProviderRegistry<GenerationInput, GenerationReport> {
    ProviderRegistry::builder()
        .register(Arc::new(CargoCyclonedxGenerator::new()))
        .register(Arc::new(SyftGenerator::new()))
        .register(Arc::new(TrivyGenerator::new()))
        .register(Arc::new(CdxgenGenerator::new()))
        .build()
}

/// List registered generators with priorities.
pub fn list_generators() -> Vec<ProviderInfo> {
    default_registry().list()
}

/// Generate an SBOM, trying generators in priority order.
pub fn generate(
    input: &GenerationInput,
    config: &GenerationConfig,
    sink: &dyn AuditSink,
    cancel: &CancelToken,
) -> Result<Sourced<GenerationReport>> {
    let registry = default_registry();
    let limits = ResolutionLimits {
        max_concurrency: 1,
        per_provider_timeout: Duration::from_secs(config.tool_timeout_secs),
        overall_deadline: Duration::from_secs(config.overall_deadline_secs),
    };
    let resolver = Resolver::new(ResolutionPolicy::FirstSuccess).with_limits(limits);

    let resolved: Resolved<Single<GenerationReport>> =
        resolver.resolve(input, &registry, sink, cancel, None)?;
    let report = resolved
        .value
        .into_inner()
        .ok_or_else(|| SbomResolverError::validation("generation produced no report"))?;
    tracing::info!(
        generator = report.source.name.as_str(),
        output = %report.value.output_file.display(),
        "SBOM generated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_file_name_extraction() {
        let input = GenerationInput::for_lock_file("/work/app/Cargo.lock");
        assert_eq!(input.lock_file_name().as_deref(), Some("Cargo.lock"));
        assert!(input.docker_image().is_none());
    }

    #[test]
    fn identity_distinguishes_format() {
        let a = GenerationInput::for_lock_file("Cargo.lock").with_format(SbomFormat::CycloneDx);
        let b = GenerationInput::for_lock_file("Cargo.lock").with_format(SbomFormat::Spdx);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn known_lock_files() {
        assert!(is_known_lock_file("Cargo.lock"));
        assert!(is_known_lock_file("requirements.txt"));
        assert!(!is_known_lock_file("random.txt"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!(SbomFormat::parse("CycloneDX").unwrap(), SbomFormat::CycloneDx);
        assert_eq!(SbomFormat::parse("spdx").unwrap(), SbomFormat::Spdx);
        assert!(SbomFormat::parse("swid").is_err());
    }

    #[test]
    fn registry_orders_native_first() {
        let infos = list_generators();
        assert_eq!(infos[0].name, "cargo-cyclonedx");
    }
}
