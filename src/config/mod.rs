//! Configuration for sbom-resolver.
//!
//! Type-safe configuration structures with validated values, defaults as
//! named constants, YAML config file discovery/loading, and an environment
//! overlay for CI use.
//!
//! # Configuration File
//!
//! Place a `.sbom-resolver.yaml` in your project root or
//! `~/.config/sbom-resolver/`:
//!
//! ```yaml
//! enrichment:
//!   max_concurrency: 4
//!   stop_when_complete: true
//! upload:
//!   sbomify_api_base: https://app.sbomify.com
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{
    DEFAULT_CACHE_TTL_HOURS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_OVERALL_DEADLINE_SECS, DEFAULT_PER_PROVIDER_TIMEOUT_SECS, DEFAULT_TOOL_TIMEOUT_SECS,
    DEFAULT_UPLOAD_TIMEOUT_SECS,
};
pub use file::{discover_config_file, load_config_file, load_or_default};
pub use types::{
    AppConfig, AugmentationConfig, EnrichmentConfig, GenerationConfig, UploadConfig,
};
pub use validation::{ConfigError, Validatable};
