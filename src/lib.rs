//! **Provider-based resolution, merge, and validation of SBOM component
//! metadata.**
//!
//! `sbom-resolver` fills the gaps in software bills of materials by querying
//! an ordered set of interchangeable data providers per capability:
//! generating an SBOM from a lock file or image, fetching package metadata,
//! fetching organizational metadata, and publishing a finished SBOM. All
//! four capabilities share one resolution engine.
//!
//! ## Core Concepts & Modules
//!
//! - **[`provider`]**: the capability contract. A [`Provider`] declares what
//!   it can handle through a pure `supports` predicate and produces a
//!   [`ProviderOutcome`] value — never an escaping error — so the engine can
//!   apply fallback deterministically. Providers are registered once at
//!   startup into an immutable [`ProviderRegistry`].
//! - **[`resolve`]**: the [`Resolver`]. Filters eligible providers, orders
//!   them by priority (registration order breaks ties), then either
//!   short-circuits on the first success or fans out with bounded
//!   concurrency and folds every success in priority order. Failure is a
//!   [`ResolutionFailure`] value enumerating every attempted provider.
//! - **[`model`]**: [`NormalizedMetadata`], the canonical source-attributed
//!   record, and the monotonic per-field merge: once a field is set by a
//!   more authoritative provider it is never overwritten by a weaker one.
//! - **[`license`]**: the SPDX expression sanitizer. Parses boolean license
//!   expressions, validates every leaf against the SPDX license list, and
//!   deterministically repairs what does not validate into `LicenseRef-`
//!   identifiers. Pure, total, idempotent.
//! - **[`audit`]**: the narrow event sink the engine and merge emit through:
//!   exactly one event per field write and per license repair.
//! - **[`enrich`]**, **[`augment`]**, **[`generate`]**, **[`upload`]**: the
//!   four capabilities wired onto the engine.
//!
//! ## Example: sanitizing a license field
//!
//! ```
//! use sbom_resolver::license::sanitize;
//!
//! let outcome = sanitize("Commercial - see LICENSE.txt");
//! assert_eq!(outcome.expression, "LicenseRef-Commercial-see-LICENSE.txt");
//! assert!(outcome.was_modified);
//! assert_eq!(outcome.repaired_leaves, 1);
//!
//! // Valid SPDX passes through untouched.
//! assert!(!sanitize("MIT OR Apache-2.0").was_modified);
//! ```
//!
//! ## Example: resolving with pinned providers
//!
//! Live registries drift, so anything that needs reproducible output pins
//! its own providers:
//!
//! ```
//! use std::sync::Arc;
//! use sbom_resolver::audit::NullAuditSink;
//! use sbom_resolver::enrich::{Enricher, PackageInput, PurlFallbackSource};
//! use sbom_resolver::config::EnrichmentConfig;
//! use sbom_resolver::provider::{CancelToken, ProviderRegistry};
//!
//! let registry = ProviderRegistry::builder()
//!     .register(Arc::new(PurlFallbackSource::new()))
//!     .build();
//! let enricher = Enricher::with_registry(registry, &EnrichmentConfig::default());
//!
//! let input = PackageInput::parse("pkg:deb/debian/bash@5.1").unwrap();
//! let resolved = enricher
//!     .resolve_package(&input, &NullAuditSink, &CancelToken::new())
//!     .unwrap();
//! assert_eq!(resolved.value.supplier.unwrap().value, "Debian Project");
//! ```
//!
//! ## Feature Flags
//!
//! - `enrichment` (default): network-backed providers (registry sources,
//!   the sbomify API, upload destinations) and the on-disk response cache.
//!   Without it the crate is a pure resolution/merge/sanitize library with
//!   local providers only.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // Doc completeness: # Errors / # Panics sections are aspirational
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    // Provider adapters legitimately take many optional knobs
    clippy::struct_excessive_bools
)]

pub mod audit;
pub mod augment;
pub mod cli;
pub mod config;
pub mod document;
pub mod enrich;
pub mod error;
pub mod generate;
pub mod license;
pub mod model;
#[cfg(feature = "enrichment")]
pub(crate) mod net;
pub mod provider;
pub mod resolve;
pub mod upload;

// Re-export main types for convenience
pub use audit::{AuditEvent, AuditEventKind, AuditScope, AuditSink, MemoryAuditSink, NullAuditSink, TracingAuditSink};
pub use config::{AppConfig, AugmentationConfig, EnrichmentConfig, GenerationConfig, UploadConfig};
pub use document::CycloneDxDocument;
pub use enrich::{Enricher, EnrichmentStats, PackageInput};
pub use error::{ErrorContext, OptionContext, Result, SbomResolverError};
pub use generate::{GenerationInput, GenerationReport, SbomFormat};
pub use license::{sanitize, SanitizeOutcome};
pub use model::{Absorb, MetadataDraft, MetadataField, NormalizedMetadata, Single, Sourced};
pub use provider::{
    CancelToken, FailureKind, FailureReason, Provider, ProviderContext, ProviderInfo,
    ProviderOutcome, ProviderRegistry, ResolveInput, SourceRef,
};
pub use resolve::{
    AttemptOutcome, AttemptRecord, MemoCache, Resolved, ResolutionFailure, ResolutionLimits,
    ResolutionPolicy, Resolver,
};
pub use upload::{UploadInput, UploadReceipt};
