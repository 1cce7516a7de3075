//! Augmentation sources: project manifests and the sbomify API.
//!
//! Manifest sources read local files only; their `supports` checks the
//! manifest list the caller detected, never the filesystem.

use serde_json::Value;

use crate::augment::{parse_author, AugmentInput, ManifestKind};
use crate::model::MetadataDraft;
use crate::provider::{FailureReason, Provider, ProviderContext, ProviderOutcome};

fn read_manifest(input: &AugmentInput, kind: ManifestKind) -> Result<String, FailureReason> {
    let path = input.manifest_path(kind);
    std::fs::read_to_string(&path).map_err(|e| {
        FailureReason::new(
            crate::provider::FailureKind::Io,
            format!("reading {}: {e}", path.display()),
        )
    })
}

fn success_or_unsupported(draft: MetadataDraft) -> ProviderOutcome<MetadataDraft> {
    if draft.has_data() {
        ProviderOutcome::Success(draft)
    } else {
        ProviderOutcome::Unsupported
    }
}

// ============================================================================
// Local JSON override (.sbomify.json)
// ============================================================================

/// Explicit override file. Highest-priority source: whatever the project
/// declares here beats every derived value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalJsonSource;

impl LocalJsonSource {
    pub fn new() -> Self {
        Self
    }
}

impl Provider<AugmentInput, MetadataDraft> for LocalJsonSource {
    fn name(&self) -> &str {
        "local-json"
    }

    fn priority(&self) -> i32 {
        5
    }

    fn supports(&self, input: &AugmentInput) -> bool {
        input.has_manifest(ManifestKind::LocalJson)
    }

    fn execute(&self, input: &AugmentInput, _ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let content = match read_manifest(input, ManifestKind::LocalJson) {
            Ok(content) => content,
            Err(reason) => return ProviderOutcome::Failed(reason),
        };
        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                return ProviderOutcome::Failed(FailureReason::new(
                    crate::provider::FailureKind::InvalidResponse,
                    format!("invalid .sbomify.json: {e}"),
                ))
            }
        };

        let mut draft = MetadataDraft::new();
        if let Some(description) = value.get("description").and_then(Value::as_str) {
            draft.set_description(description);
        }
        if let Some(supplier) = value.pointer("/supplier/name").and_then(Value::as_str) {
            draft.set_supplier(supplier);
        } else if let Some(supplier) = value.get("supplier").and_then(Value::as_str) {
            draft.set_supplier(supplier);
        }
        if let Some(url) = value.pointer("/supplier/url").and_then(Value::as_str) {
            draft.set_homepage(url);
        }
        if let Some(licenses) = value.get("licenses").and_then(Value::as_array) {
            for license in licenses.iter().filter_map(Value::as_str) {
                draft.add_license(license);
            }
        }
        success_or_unsupported(draft)
    }
}

// ============================================================================
// Cargo.toml
// ============================================================================

/// Reads `[package]` metadata from a Cargo manifest.
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoManifestSource;

impl CargoManifestSource {
    pub fn new() -> Self {
        Self
    }
}

impl Provider<AugmentInput, MetadataDraft> for CargoManifestSource {
    fn name(&self) -> &str {
        "cargo-manifest"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn supports(&self, input: &AugmentInput) -> bool {
        input.has_manifest(ManifestKind::CargoToml)
    }

    fn execute(&self, input: &AugmentInput, _ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let content = match read_manifest(input, ManifestKind::CargoToml) {
            Ok(content) => content,
            Err(reason) => return ProviderOutcome::Failed(reason),
        };
        let manifest: toml::Value = match toml::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                return ProviderOutcome::Failed(FailureReason::new(
                    crate::provider::FailureKind::InvalidResponse,
                    format!("invalid Cargo.toml: {e}"),
                ))
            }
        };
        let Some(package) = manifest.get("package") else {
            return ProviderOutcome::Unsupported;
        };

        let mut draft = MetadataDraft::new();
        if let Some(description) = package.get("description").and_then(toml::Value::as_str) {
            draft.set_description(description);
        }
        if let Some(license) = package.get("license").and_then(toml::Value::as_str) {
            draft.add_license(license);
        }
        // Cargo authors are "Name <email>" strings; the first one stands in
        // as supplier.
        if let Some(author) = package
            .get("authors")
            .and_then(toml::Value::as_array)
            .and_then(|authors| authors.first())
            .and_then(toml::Value::as_str)
        {
            let (name, email) = parse_author(author);
            if let Some(name) = &name {
                draft.set_supplier(name);
                draft.set_maintainer_name(name);
            }
            if let Some(email) = &email {
                draft.set_maintainer_email(email);
            }
        }
        if let Some(homepage) = package.get("homepage").and_then(toml::Value::as_str) {
            draft.set_homepage(homepage);
        }
        if let Some(repository) = package.get("repository").and_then(toml::Value::as_str) {
            draft.set_repository_url(repository);
        }
        if let Some(documentation) = package.get("documentation").and_then(toml::Value::as_str) {
            draft.set_documentation_url(documentation);
        }
        success_or_unsupported(draft)
    }
}

// ============================================================================
// package.json
// ============================================================================

/// Reads npm package manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageJsonSource;

impl PackageJsonSource {
    pub fn new() -> Self {
        Self
    }
}

impl Provider<AugmentInput, MetadataDraft> for PackageJsonSource {
    fn name(&self) -> &str {
        "package-json"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn supports(&self, input: &AugmentInput) -> bool {
        input.has_manifest(ManifestKind::PackageJson)
    }

    fn execute(&self, input: &AugmentInput, _ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let content = match read_manifest(input, ManifestKind::PackageJson) {
            Ok(content) => content,
            Err(reason) => return ProviderOutcome::Failed(reason),
        };
        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                return ProviderOutcome::Failed(FailureReason::new(
                    crate::provider::FailureKind::InvalidResponse,
                    format!("invalid package.json: {e}"),
                ))
            }
        };

        let mut draft = MetadataDraft::new();
        if let Some(description) = value.get("description").and_then(Value::as_str) {
            draft.set_description(description);
        }
        // license is either "MIT" or the legacy {"type": "MIT"} object.
        match value.get("license") {
            Some(Value::String(license)) => draft.add_license(license),
            Some(Value::Object(obj)) => {
                if let Some(license) = obj.get("type").and_then(Value::as_str) {
                    draft.add_license(license);
                }
            }
            _ => {}
        }
        // author is either "Name <email>" or {"name": ..., "email": ...}.
        match value.get("author") {
            Some(Value::String(author)) => {
                let (name, email) = parse_author(author);
                if let Some(name) = &name {
                    draft.set_supplier(name);
                    draft.set_maintainer_name(name);
                }
                if let Some(email) = &email {
                    draft.set_maintainer_email(email);
                }
            }
            Some(Value::Object(obj)) => {
                if let Some(name) = obj.get("name").and_then(Value::as_str) {
                    draft.set_supplier(name);
                    draft.set_maintainer_name(name);
                }
                if let Some(email) = obj.get("email").and_then(Value::as_str) {
                    draft.set_maintainer_email(email);
                }
            }
            _ => {}
        }
        if let Some(homepage) = value.get("homepage").and_then(Value::as_str) {
            draft.set_homepage(homepage);
        }
        // repository is either a URL string or {"url": ...}.
        match value.get("repository") {
            Some(Value::String(repository)) => draft.set_repository_url(repository),
            Some(Value::Object(obj)) => {
                if let Some(url) = obj.get("url").and_then(Value::as_str) {
                    draft.set_repository_url(url);
                }
            }
            _ => {}
        }
        if let Some(bugs) = value.pointer("/bugs/url").and_then(Value::as_str) {
            draft.set_issue_tracker_url(bugs);
        }
        success_or_unsupported(draft)
    }
}

// ============================================================================
// pyproject.toml
// ============================================================================

/// Reads PEP 621 project metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct PyProjectSource;

impl PyProjectSource {
    pub fn new() -> Self {
        Self
    }
}

impl Provider<AugmentInput, MetadataDraft> for PyProjectSource {
    fn name(&self) -> &str {
        "pyproject"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn supports(&self, input: &AugmentInput) -> bool {
        input.has_manifest(ManifestKind::PyProjectToml)
    }

    fn execute(&self, input: &AugmentInput, _ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let content = match read_manifest(input, ManifestKind::PyProjectToml) {
            Ok(content) => content,
            Err(reason) => return ProviderOutcome::Failed(reason),
        };
        let manifest: toml::Value = match toml::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                return ProviderOutcome::Failed(FailureReason::new(
                    crate::provider::FailureKind::InvalidResponse,
                    format!("invalid pyproject.toml: {e}"),
                ))
            }
        };
        let Some(project) = manifest.get("project") else {
            return ProviderOutcome::Unsupported;
        };

        let mut draft = MetadataDraft::new();
        if let Some(description) = project.get("description").and_then(toml::Value::as_str) {
            draft.set_description(description);
        }
        // license is either {text = "..."}, {file = "..."} or (PEP 639) a
        // plain SPDX string.
        match project.get("license") {
            Some(toml::Value::String(license)) => draft.add_license(license),
            Some(toml::Value::Table(table)) => {
                if let Some(text) = table.get("text").and_then(toml::Value::as_str) {
                    draft.add_license(text);
                }
            }
            _ => {}
        }
        if let Some(author) = project
            .get("authors")
            .and_then(toml::Value::as_array)
            .and_then(|authors| authors.first())
            .and_then(toml::Value::as_table)
        {
            if let Some(name) = author.get("name").and_then(toml::Value::as_str) {
                draft.set_supplier(name);
                draft.set_maintainer_name(name);
            }
            if let Some(email) = author.get("email").and_then(toml::Value::as_str) {
                draft.set_maintainer_email(email);
            }
        }
        if let Some(urls) = project.get("urls").and_then(toml::Value::as_table) {
            for (key, url) in urls {
                let Some(url) = url.as_str() else { continue };
                let key = key.to_ascii_lowercase();
                if draft.homepage.is_none() && key.contains("home") {
                    draft.set_homepage(url);
                } else if draft.repository_url.is_none()
                    && (key.contains("repository") || key.contains("source"))
                {
                    draft.set_repository_url(url);
                } else if draft.documentation_url.is_none() && key.contains("doc") {
                    draft.set_documentation_url(url);
                } else if draft.issue_tracker_url.is_none()
                    && (key.contains("issue") || key.contains("bug") || key.contains("tracker"))
                {
                    draft.set_issue_tracker_url(url);
                }
            }
        }
        success_or_unsupported(draft)
    }
}

// ============================================================================
// sbomify API
// ============================================================================

#[cfg(feature = "enrichment")]
pub use api::{SbomifyApiConfig, SbomifyApiSource};

#[cfg(feature = "enrichment")]
mod api {
    use super::*;
    use crate::net::{build_client, get_json_with_auth, FetchResult};
    use crate::provider::ResolveInput;
    use reqwest::blocking::Client;
    use serde::Deserialize;
    use std::time::Duration;

    /// Configuration for the sbomify org-metadata provider.
    #[derive(Debug, Clone)]
    pub struct SbomifyApiConfig {
        pub api_base: String,
        pub token: String,
        pub timeout: Duration,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct ComponentMeta {
        description: Option<String>,
        supplier: Option<SupplierMeta>,
        licenses: Vec<LicenseEntry>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct SupplierMeta {
        name: Option<String>,
        url: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum LicenseEntry {
        Expression(String),
        Named { name: String },
    }

    /// Organization metadata from the sbomify backend.
    pub struct SbomifyApiSource {
        config: SbomifyApiConfig,
        client: Client,
    }

    impl SbomifyApiSource {
        pub fn new(config: SbomifyApiConfig) -> Result<Self, FailureReason> {
            let client = build_client(config.timeout)?;
            Ok(Self { config, client })
        }
    }

    impl Provider<AugmentInput, MetadataDraft> for SbomifyApiSource {
        fn name(&self) -> &str {
            "sbomify-api"
        }

        fn priority(&self) -> i32 {
            // API source: authoritative org data, but after local overrides.
            50
        }

        fn supports(&self, input: &AugmentInput) -> bool {
            input.component_id.is_some()
        }

        fn execute(&self, input: &AugmentInput, ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
            let Some(component_id) = &input.component_id else {
                return ProviderOutcome::Unsupported;
            };
            let url = format!(
                "{}/api/v1/sboms/component-meta/{component_id}",
                self.config.api_base.trim_end_matches('/')
            );
            tracing::debug!(entity = input.label().as_str(), url = url.as_str(), "fetching sbomify component metadata");

            let meta: ComponentMeta =
                match get_json_with_auth(&self.client, &url, &self.config.token, ctx) {
                    FetchResult::Ok(body) => body,
                    FetchResult::NotFound => return ProviderOutcome::Unsupported,
                    FetchResult::Failed(reason) => return ProviderOutcome::Failed(reason),
                    FetchResult::TimedOut => return ProviderOutcome::TimedOut,
                };

            let mut draft = MetadataDraft::new();
            if let Some(description) = &meta.description {
                draft.set_description(description);
            }
            if let Some(supplier) = &meta.supplier {
                if let Some(name) = &supplier.name {
                    draft.set_supplier(name);
                }
                if let Some(url) = &supplier.url {
                    draft.set_homepage(url);
                }
            }
            for license in &meta.licenses {
                match license {
                    LicenseEntry::Expression(expression) => draft.add_license(expression),
                    LicenseEntry::Named { name } => draft.add_license(name),
                }
            }
            success_or_unsupported(draft)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::AugmentInput;
    use crate::provider::{CancelToken, ProviderContext};
    use std::fs;
    use std::time::{Duration, Instant};

    fn ctx() -> ProviderContext {
        ProviderContext::new(Instant::now() + Duration::from_secs(1), CancelToken::new())
    }

    fn input_in(dir: &std::path::Path) -> AugmentInput {
        AugmentInput::detect(dir, Some("demo".into()))
    }

    #[test]
    fn cargo_manifest_extraction() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            r#"
[package]
name = "demo"
version = "0.1.0"
description = "A demo crate"
license = "MIT OR Apache-2.0"
authors = ["Jane Doe <jane@example.com>"]
repository = "https://github.com/example/demo"
"#,
        )
        .unwrap();

        let source = CargoManifestSource::new();
        let input = input_in(dir.path());
        assert!(source.supports(&input));
        match source.execute(&input, &ctx()) {
            ProviderOutcome::Success(draft) => {
                assert_eq!(draft.description.as_deref(), Some("A demo crate"));
                assert_eq!(draft.licenses, vec!["MIT OR Apache-2.0".to_string()]);
                assert_eq!(draft.supplier.as_deref(), Some("Jane Doe"));
                assert_eq!(draft.maintainer_email.as_deref(), Some("jane@example.com"));
                assert_eq!(
                    draft.repository_url.as_deref(),
                    Some("git+https://github.com/example/demo")
                );
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn package_json_handles_object_author() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
                "name": "demo",
                "description": "A demo package",
                "license": "ISC",
                "author": {"name": "Acme Corp", "email": "dev@acme.example"},
                "repository": {"type": "git", "url": "git+https://github.com/acme/demo.git"},
                "bugs": {"url": "https://github.com/acme/demo/issues"}
            }"#,
        )
        .unwrap();

        let source = PackageJsonSource::new();
        let input = input_in(dir.path());
        match source.execute(&input, &ctx()) {
            ProviderOutcome::Success(draft) => {
                assert_eq!(draft.supplier.as_deref(), Some("Acme Corp"));
                assert_eq!(draft.licenses, vec!["ISC".to_string()]);
                assert_eq!(
                    draft.issue_tracker_url.as_deref(),
                    Some("https://github.com/acme/demo/issues")
                );
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn pyproject_pep621_extraction() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            r#"
[project]
name = "demo"
description = "A demo project"
license = { text = "MIT" }
authors = [{ name = "Jane Doe", email = "jane@example.com" }]

[project.urls]
Homepage = "https://demo.example.com"
"Bug Tracker" = "https://github.com/example/demo/issues"
"#,
        )
        .unwrap();

        let source = PyProjectSource::new();
        let input = input_in(dir.path());
        match source.execute(&input, &ctx()) {
            ProviderOutcome::Success(draft) => {
                assert_eq!(draft.description.as_deref(), Some("A demo project"));
                assert_eq!(draft.licenses, vec!["MIT".to_string()]);
                assert_eq!(draft.homepage.as_deref(), Some("https://demo.example.com"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn local_json_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".sbomify.json"),
            r#"{
                "description": "Override description",
                "supplier": {"name": "Override Corp", "url": "https://override.example.com"},
                "licenses": ["Apache-2.0"]
            }"#,
        )
        .unwrap();

        let source = LocalJsonSource::new();
        let input = input_in(dir.path());
        match source.execute(&input, &ctx()) {
            ProviderOutcome::Success(draft) => {
                assert_eq!(draft.supplier.as_deref(), Some("Override Corp"));
                assert_eq!(draft.description.as_deref(), Some("Override description"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn missing_package_table_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[workspace]\nmembers = []\n").unwrap();
        let source = CargoManifestSource::new();
        let input = AugmentInput {
            subject: None,
            root: dir.path().to_path_buf(),
            manifests: vec![ManifestKind::CargoToml],
            component_id: None,
        };
        assert!(matches!(
            source.execute(&input, &ctx()),
            ProviderOutcome::Unsupported
        ));
    }
}
