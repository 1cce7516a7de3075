//! Normalized, source-attributed metadata for one logical entity.
//!
//! Providers produce a [`MetadataDraft`] (plain optional fields, sanitized on
//! the way in). The resolution engine folds drafts into a
//! [`NormalizedMetadata`], whose populated slots each carry the attribution
//! of the provider that supplied them. The fold is monotonic per field: a
//! value set by a more authoritative provider (numerically lower priority) is
//! never overwritten by a less authoritative one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::AuditScope;
use crate::license;
use crate::model::merge::Absorb;
use crate::model::sanitize::{
    normalize_vcs_url, sanitize_description, sanitize_email, sanitize_license_text,
    sanitize_string, sanitize_supplier, sanitize_url, MAX_SUPPLIER_LENGTH,
};
use crate::provider::SourceRef;

/// A value plus the provider that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: SourceRef,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: SourceRef) -> Self {
        Self { value, source }
    }
}

/// The fixed set of semantic metadata slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataField {
    Description,
    Licenses,
    Supplier,
    Homepage,
    RepositoryUrl,
    DocumentationUrl,
    RegistryUrl,
    IssueTrackerUrl,
    DownloadUrl,
    MaintainerName,
    MaintainerEmail,
}

impl MetadataField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Licenses => "licenses",
            Self::Supplier => "supplier",
            Self::Homepage => "homepage",
            Self::RepositoryUrl => "repository-url",
            Self::DocumentationUrl => "documentation-url",
            Self::RegistryUrl => "registry-url",
            Self::IssueTrackerUrl => "issue-tracker-url",
            Self::DownloadUrl => "download-url",
            Self::MaintainerName => "maintainer-name",
            Self::MaintainerEmail => "maintainer-email",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata as one provider reports it, before merge.
///
/// All fields are optional; providers populate what they can. The setters
/// sanitize on the way in, so a draft never holds control characters,
/// oversized text, or URLs outside the scheme allowlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDraft {
    pub description: Option<String>,
    /// Raw license strings; SPDX sanitization happens at the merge
    /// chokepoint so the repair can be audited per entity.
    pub licenses: Vec<String>,
    pub supplier: Option<String>,
    pub homepage: Option<String>,
    pub repository_url: Option<String>,
    pub documentation_url: Option<String>,
    pub registry_url: Option<String>,
    pub issue_tracker_url: Option<String>,
    pub download_url: Option<String>,
    pub maintainer_name: Option<String>,
    pub maintainer_email: Option<String>,
}

impl MetadataDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_description(&mut self, raw: &str) {
        self.description = sanitize_description(raw);
    }

    pub fn add_license(&mut self, raw: &str) {
        if let Some(clean) = sanitize_license_text(raw) {
            self.licenses.push(clean);
        }
    }

    pub fn set_supplier(&mut self, raw: &str) {
        self.supplier = sanitize_supplier(raw);
    }

    pub fn set_homepage(&mut self, raw: &str) {
        self.homepage = sanitize_url(raw);
    }

    /// Repository URLs are additionally normalized to the SPDX VCS form.
    pub fn set_repository_url(&mut self, raw: &str) {
        let normalized = normalize_vcs_url(raw.trim());
        self.repository_url = sanitize_url(&normalized);
    }

    pub fn set_documentation_url(&mut self, raw: &str) {
        self.documentation_url = sanitize_url(raw);
    }

    pub fn set_registry_url(&mut self, raw: &str) {
        self.registry_url = sanitize_url(raw);
    }

    pub fn set_issue_tracker_url(&mut self, raw: &str) {
        self.issue_tracker_url = sanitize_url(raw);
    }

    pub fn set_download_url(&mut self, raw: &str) {
        self.download_url = sanitize_url(raw);
    }

    pub fn set_maintainer_name(&mut self, raw: &str) {
        self.maintainer_name = sanitize_string(raw, MAX_SUPPLIER_LENGTH, false);
    }

    pub fn set_maintainer_email(&mut self, raw: &str) {
        self.maintainer_email = sanitize_email(raw);
    }

    /// True if any slot is populated.
    pub fn has_data(&self) -> bool {
        self.description.is_some()
            || !self.licenses.is_empty()
            || self.supplier.is_some()
            || self.homepage.is_some()
            || self.repository_url.is_some()
            || self.documentation_url.is_some()
            || self.registry_url.is_some()
            || self.issue_tracker_url.is_some()
            || self.download_url.is_some()
            || self.maintainer_name.is_some()
            || self.maintainer_email.is_some()
    }
}

/// The canonical, source-attributed result of resolving one entity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedMetadata {
    pub description: Option<Sourced<String>>,
    /// Sanitized license expressions; every entry satisfies the sanitizer's
    /// output invariant.
    pub licenses: Option<Sourced<Vec<String>>>,
    pub supplier: Option<Sourced<String>>,
    pub homepage: Option<Sourced<String>>,
    pub repository_url: Option<Sourced<String>>,
    pub documentation_url: Option<Sourced<String>>,
    pub registry_url: Option<Sourced<String>>,
    pub issue_tracker_url: Option<Sourced<String>>,
    pub download_url: Option<Sourced<String>>,
    pub maintainer_name: Option<Sourced<String>>,
    pub maintainer_email: Option<Sourced<String>>,
}

impl NormalizedMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any slot is populated.
    pub fn has_data(&self) -> bool {
        self.description.is_some()
            || self.licenses.is_some()
            || self.supplier.is_some()
            || self.homepage.is_some()
            || self.repository_url.is_some()
            || self.documentation_url.is_some()
            || self.registry_url.is_some()
            || self.issue_tracker_url.is_some()
            || self.download_url.is_some()
            || self.maintainer_name.is_some()
            || self.maintainer_email.is_some()
    }
}

/// Write `incoming` into `slot` iff the monotonic merge rule allows it.
///
/// - empty slot: set, attributing the source
/// - occupied by a lower-or-equal priority number: keep (equal keeps the
///   earlier writer, preserving registration-order tie-breaks)
/// - occupied by a higher priority number: replace. This should not occur
///   when callers fold in sorted order, but the merge enforces the invariant
///   regardless of feed order.
fn absorb_field<T>(
    slot: &mut Option<Sourced<T>>,
    incoming: Option<T>,
    field: MetadataField,
    source: &SourceRef,
    audit: &AuditScope<'_>,
) -> usize {
    let Some(value) = incoming else {
        return 0;
    };
    match slot {
        None => {
            *slot = Some(Sourced::new(value, source.clone()));
            audit.field_written(field.as_str(), source);
            1
        }
        Some(existing) if existing.source.priority > source.priority => {
            tracing::debug!(
                field = field.as_str(),
                kept = source.name.as_str(),
                displaced = existing.source.name.as_str(),
                "out-of-order fold corrected by merge"
            );
            *existing = Sourced::new(value, source.clone());
            audit.field_written(field.as_str(), source);
            1
        }
        Some(_) => 0,
    }
}

impl Absorb<MetadataDraft> for NormalizedMetadata {
    fn absorb(&mut self, draft: MetadataDraft, source: &SourceRef, audit: &AuditScope<'_>) -> usize {
        let mut written = 0;

        written += absorb_field(
            &mut self.description,
            draft.description,
            MetadataField::Description,
            source,
            audit,
        );

        // Licenses go through the expression sanitizer here so that every
        // value in a NormalizedMetadata already satisfies the invariant,
        // and every repair is audited against this entity. Values the
        // monotonic rule will discard are not sanitized at all, so the
        // audit trail only records repairs that reached the result.
        let takes_licenses = !draft.licenses.is_empty()
            && match &self.licenses {
                None => true,
                Some(existing) => existing.source.priority > source.priority,
            };
        let licenses = if takes_licenses {
            let sanitized: Vec<String> = draft
                .licenses
                .iter()
                .map(|raw| {
                    let outcome = license::sanitize(raw);
                    if outcome.was_modified {
                        audit.license_repaired(raw, &outcome.expression, outcome.repaired_leaves);
                    }
                    outcome.expression
                })
                .collect();
            Some(sanitized)
        } else {
            None
        };
        written += absorb_field(
            &mut self.licenses,
            licenses,
            MetadataField::Licenses,
            source,
            audit,
        );

        written += absorb_field(
            &mut self.supplier,
            draft.supplier,
            MetadataField::Supplier,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.homepage,
            draft.homepage,
            MetadataField::Homepage,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.repository_url,
            draft.repository_url,
            MetadataField::RepositoryUrl,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.documentation_url,
            draft.documentation_url,
            MetadataField::DocumentationUrl,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.registry_url,
            draft.registry_url,
            MetadataField::RegistryUrl,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.issue_tracker_url,
            draft.issue_tracker_url,
            MetadataField::IssueTrackerUrl,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.download_url,
            draft.download_url,
            MetadataField::DownloadUrl,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.maintainer_name,
            draft.maintainer_name,
            MetadataField::MaintainerName,
            source,
            audit,
        );
        written += absorb_field(
            &mut self.maintainer_email,
            draft.maintainer_email,
            MetadataField::MaintainerEmail,
            source,
            audit,
        );

        written
    }

    /// Complete once the core NTIA fields are present: description,
    /// licenses, supplier. Used by the accumulate short-stop to spare
    /// rate-limited fallback sources.
    fn is_complete(&self) -> bool {
        self.description.is_some() && self.licenses.is_some() && self.supplier.is_some()
    }
}
