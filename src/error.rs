//! Unified error types for sbom-resolver.
//!
//! Provider-local faults are not errors: they are [`crate::provider::ProviderOutcome`]
//! values absorbed by the resolution engine. Only terminal conditions (a whole
//! resolution failing, configuration problems, document I/O) surface here.

use std::path::PathBuf;
use thiserror::Error;

use crate::resolve::ResolutionFailure;

/// Main error type for sbom-resolver operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SbomResolverError {
    /// No eligible provider succeeded for an entity. Carries the full
    /// per-provider attempt record so callers can show why nothing matched.
    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),

    /// Errors reading or applying an SBOM document
    #[error("Document error: {context}")]
    Document {
        context: String,
        #[source]
        source: DocumentErrorKind,
    },

    /// Errors during SBOM generation
    #[error("Generation failed: {context}")]
    Generation {
        context: String,
        #[source]
        source: GenerationErrorKind,
    },

    /// Errors during SBOM upload
    #[error("Upload failed: {context}")]
    Upload {
        context: String,
        #[source]
        source: UploadErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific document error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DocumentErrorKind {
    #[error("Not a CycloneDX document - missing bomFormat marker")]
    NotCycloneDx,

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {field} in {context}")]
    MissingField { field: String, context: String },

    #[error("Malformed PURL: {purl} - {reason}")]
    InvalidPurl { purl: String, reason: String },
}

/// Specific generation error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GenerationErrorKind {
    #[error("Generator tool not found on PATH: {0}")]
    ToolNotFound(String),

    #[error("Generator exited with status {status}: {stderr}")]
    ToolFailed { status: i32, stderr: String },

    #[error("Generator produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("Unsupported format/version combination: {format} {version}")]
    UnsupportedFormat { format: String, version: String },
}

/// Specific upload error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UploadErrorKind {
    #[error("Destination not configured: {0}")]
    NotConfigured(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Authentication rejected by {0}")]
    AuthRejected(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for sbom-resolver operations
pub type Result<T> = std::result::Result<T, SbomResolverError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl SbomResolverError {
    /// Create a document error with context
    pub fn document(context: impl Into<String>, source: DocumentErrorKind) -> Self {
        Self::Document {
            context: context.into(),
            source,
        }
    }

    /// Create a document error for a malformed PURL
    pub fn invalid_purl(purl: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::document(
            "parsing package URL",
            DocumentErrorKind::InvalidPurl {
                purl: purl.into(),
                reason: reason.into(),
            },
        )
    }

    /// Create a generation error
    pub fn generation(context: impl Into<String>, source: GenerationErrorKind) -> Self {
        Self::Generation {
            context: context.into(),
            source,
        }
    }

    /// Create an upload error
    pub fn upload(context: impl Into<String>, source: UploadErrorKind) -> Self {
        Self::Upload {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for SbomResolverError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SbomResolverError {
    fn from(err: serde_json::Error) -> Self {
        Self::document(
            "JSON deserialization",
            DocumentErrorKind::InvalidJson(err.to_string()),
        )
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// The context string is prepended to the error's existing context,
/// creating a chain that shows the path through the code.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure (lazy evaluation).
    ///
    /// The closure is only called if the result is an error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<SbomResolverError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: SbomResolverError, new_ctx: &str) -> SbomResolverError {
    match err {
        SbomResolverError::Document {
            context: existing,
            source,
        } => SbomResolverError::Document {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomResolverError::Generation {
            context: existing,
            source,
        } => SbomResolverError::Generation {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomResolverError::Upload {
            context: existing,
            source,
        } => SbomResolverError::Upload {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomResolverError::Io {
            path,
            message,
            source,
        } => SbomResolverError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        SbomResolverError::Config(msg) => SbomResolverError::Config(chain_context(new_ctx, &msg)),
        SbomResolverError::Validation(msg) => {
            SbomResolverError::Validation(chain_context(new_ctx, &msg))
        }
        // ResolutionFailure carries its own structured attempt record; context
        // chaining would duplicate what Display already enumerates.
        other @ SbomResolverError::Resolution(_) => other,
    }
}

/// Chain two context strings together.
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to an error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| SbomResolverError::Validation(context.into()))
    }
}
