//! Resolution engine: priority cascade, policies, memoization, failures.

mod engine;
mod failure;
mod memo;

pub use engine::{Resolved, ResolutionLimits, ResolutionPolicy, Resolver};
pub use failure::{AttemptOutcome, AttemptRecord, ResolutionFailure};
pub use memo::MemoCache;
