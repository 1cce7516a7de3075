//! Terminal resolution failure, with the full per-provider attempt record.

use serde::Serialize;
use std::fmt;

use crate::provider::FailureReason;

/// What happened to one attempted provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum AttemptOutcome {
    /// Produced data that entered the result.
    Success,
    /// Declared itself unable to serve the input at execution time.
    Unsupported,
    /// Provider-local fault.
    Failed(FailureReason),
    /// Exceeded its per-invocation time budget.
    TimedOut,
    /// Still outstanding when the overall deadline cut resolution off; its
    /// eventual result, if any, was discarded.
    Abandoned,
    /// Not invoked because the caller cancelled the resolution.
    Cancelled,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Abandoned => f.write_str("abandoned at deadline"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// One provider's part in a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub provider: String,
    pub priority: i32,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn new(provider: impl Into<String>, priority: i32, outcome: AttemptOutcome) -> Self {
        Self {
            provider: provider.into(),
            priority,
            outcome,
        }
    }
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {}): {}", self.provider, self.priority, self.outcome)
    }
}

/// No eligible provider produced data for an entity.
///
/// Returned, never panicked: callers must be able to show "why nothing
/// matched", so the failure enumerates every attempted provider with its
/// outcome. A failure with no attempts means no registered provider
/// supported the input at all.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionFailure {
    /// The entity that could not be resolved.
    pub entity: String,
    /// Every attempted provider, in attempt order.
    pub attempts: Vec<AttemptRecord>,
    /// True if the caller cancelled mid-resolution; the attempts then hold
    /// the partial outcomes gathered before the cancellation.
    pub cancelled: bool,
}

impl ResolutionFailure {
    pub fn no_eligible_providers(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            attempts: Vec::new(),
            cancelled: false,
        }
    }

    pub fn new(entity: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            entity: entity.into(),
            attempts,
            cancelled: false,
        }
    }

    pub fn cancelled(entity: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            entity: entity.into(),
            attempts,
            cancelled: true,
        }
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "no eligible provider for {}", self.entity);
        }
        if self.cancelled {
            write!(f, "resolution of {} cancelled after: ", self.entity)?;
        } else {
            write!(f, "no provider produced data for {}: ", self.entity)?;
        }
        for (i, attempt) in self.attempts.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{attempt}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_enumerates_attempts() {
        let failure = ResolutionFailure::new(
            "pkg:pypi/requests@2.31.0",
            vec![
                AttemptRecord::new("pypi.org", 10, AttemptOutcome::Failed(FailureReason::api("500"))),
                AttemptRecord::new("ecosyste.ms", 45, AttemptOutcome::TimedOut),
            ],
        );
        let text = failure.to_string();
        assert!(text.contains("pkg:pypi/requests@2.31.0"));
        assert!(text.contains("pypi.org"));
        assert!(text.contains("ecosyste.ms"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn display_no_eligible() {
        let failure = ResolutionFailure::no_eligible_providers("pkg:swift/x@1");
        assert_eq!(failure.to_string(), "no eligible provider for pkg:swift/x@1");
    }
}
