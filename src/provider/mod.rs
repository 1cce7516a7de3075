//! Provider contract shared by all resolution capabilities.
//!
//! A provider is a named, stateless unit of capability: it declares whether it
//! can handle a given input (`supports`, a pure predicate over the input's
//! static shape) and produces data for it (`execute`). Failures are values,
//! not panics or errors: `execute` returns a [`ProviderOutcome`] so the
//! resolution engine can apply fallback deterministically.
//!
//! Providers are registered once at process start into a [`ProviderRegistry`]
//! and are immutable for the process lifetime.

mod registry;

pub use registry::{ProviderInfo, ProviderRegistry, ProviderRegistryBuilder};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The four-member provider contract.
///
/// `I` is the capability's input descriptor (a package PURL, a lockfile
/// reference, an organizational-metadata request), `D` the data a successful
/// execution produces.
///
/// # Contract
///
/// - `supports` must be side-effect-free and must not perform I/O. It
///   inspects only the input's static shape (identifier scheme, declared
///   ecosystem, file extension). A `supports` that panics is treated as
///   unsupported by the engine, never as a fatal fault.
/// - `execute` never propagates failures past its own boundary: network
///   errors, bad responses, and tool failures come back as
///   [`ProviderOutcome::Failed`].
pub trait Provider<I, D>: Send + Sync {
    /// Unique name of this provider, used for attribution and audit.
    fn name(&self) -> &str;

    /// Priority of this provider; lower numbers are tried first.
    ///
    /// Recommended ranges follow the registry tiers: 1-20 for native or
    /// authoritative providers, 21-50 for multi-ecosystem aggregators,
    /// 51-80 for local extraction with no API calls, 81-100 for
    /// rate-limited fallbacks.
    fn priority(&self) -> i32;

    /// Pure eligibility predicate over the input's static shape.
    fn supports(&self, input: &I) -> bool;

    /// Produce data for the input, honoring the context deadline.
    fn execute(&self, input: &I, ctx: &ProviderContext) -> ProviderOutcome<D>;
}

/// Tagged result of one provider execution.
#[derive(Debug, Clone)]
pub enum ProviderOutcome<D> {
    /// The provider produced data.
    Success(D),
    /// The provider decided at execution time it cannot serve this input.
    /// Expected filtering outcome, not an error.
    Unsupported,
    /// Provider-local fault: network error, bad response, auth failure.
    /// Always recoverable by falling back to the next provider.
    Failed(FailureReason),
    /// The provider exceeded its time budget. Recoverable by fallback, but
    /// tracked distinctly since it may indicate a misbehaving dependency.
    TimedOut,
}

impl<D> ProviderOutcome<D> {
    /// True if this outcome carries data.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Why a provider execution failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Network-level fault (connect, DNS, TLS).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, message)
    }

    /// The remote API answered with an error status or unusable body.
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Api, message)
    }

    /// An external tool invocation failed.
    pub fn tool(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Tool, message)
    }

    /// Anything else, including caught panics.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Classification of provider-local faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Network,
    Api,
    Auth,
    RateLimited,
    InvalidResponse,
    Io,
    Tool,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network error",
            Self::Api => "API error",
            Self::Auth => "auth failure",
            Self::RateLimited => "rate limited",
            Self::InvalidResponse => "invalid response",
            Self::Io => "IO error",
            Self::Tool => "tool failure",
            Self::Other => "failure",
        };
        f.write_str(s)
    }
}

/// Execution context handed to `Provider::execute`.
///
/// Carries the time budget for this invocation and the cancellation token of
/// the surrounding `resolve` call. Providers doing I/O should derive their
/// request timeouts from [`ProviderContext::remaining`].
#[derive(Debug, Clone)]
pub struct ProviderContext {
    deadline: Instant,
    cancel: CancelToken,
}

impl ProviderContext {
    pub fn new(deadline: Instant, cancel: CancelToken) -> Self {
        Self { deadline, cancel }
    }

    /// Hard cutoff for this invocation.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time remaining before the cutoff; zero once past it.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once the surrounding `resolve` call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Cooperative cancellation token for an in-flight `resolve` call.
///
/// Cloning shares the flag; cancelling propagates to all holders.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every operation holding this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Attribution of a value to the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Provider name
    pub name: String,
    /// Provider priority at resolution time (lower = more authoritative)
    pub priority: i32,
}

impl SourceRef {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {})", self.name, self.priority)
    }
}

/// Inputs the resolution engine can work with.
///
/// `identity` keys per-run memoization and must be stable for equal inputs;
/// `label` names the entity in failures and audit events.
pub trait ResolveInput {
    /// Stable identity of this input, e.g. the canonical PURL string.
    fn identity(&self) -> String;

    /// Human-readable entity label for failures and audit events.
    fn label(&self) -> String {
        self.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn provider_context_remaining_saturates() {
        let ctx = ProviderContext::new(Instant::now(), CancelToken::new());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[test]
    fn failure_reason_display() {
        let reason = FailureReason::api("503 from registry");
        assert_eq!(reason.to_string(), "API error: 503 from registry");
    }
}
