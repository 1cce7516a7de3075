//! Default configuration values.

/// Concurrent provider invocations under the accumulate policy.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Time budget for one provider invocation.
pub const DEFAULT_PER_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Hard cutoff for one whole resolve call.
pub const DEFAULT_OVERALL_DEADLINE_SECS: u64 = 120;

/// Per-request timeout for registry HTTP sources.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// TTL for cached registry responses.
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// Time budget for one external generator tool run.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

/// Time budget for one upload request.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;
