//! Merge contract between provider outputs and resolved results.

use crate::audit::AuditScope;
use crate::provider::SourceRef;
use serde::Serialize;

use super::Sourced;

/// Fold a provider's successful output into an accumulating result.
///
/// The engine feeds successes in priority order (lowest priority number
/// first), so `absorb` only ever fills gaps — but implementations must
/// enforce the monotonic rule themselves for any feed order, and must emit
/// exactly one audit event per semantic field actually written.
///
/// Returns the number of fields written.
pub trait Absorb<D>: Default {
    fn absorb(&mut self, incoming: D, source: &SourceRef, audit: &AuditScope<'_>) -> usize;

    /// True once further providers cannot add anything the caller needs.
    /// Drives the optional accumulate short-stop; the default never stops.
    fn is_complete(&self) -> bool {
        false
    }
}

/// Single-slot container for first-success capabilities (generation,
/// upload): the first writer wins and the record is complete.
///
/// This is the monotonic merge rule at whole-record granularity, so the same
/// engine fold serves both policies.
#[derive(Debug, Clone, Serialize)]
pub struct Single<T>(Option<Sourced<T>>);

impl<T> Default for Single<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Single<T> {
    pub fn get(&self) -> Option<&Sourced<T>> {
        self.0.as_ref()
    }

    pub fn into_inner(self) -> Option<Sourced<T>> {
        self.0
    }
}

impl<T> Absorb<T> for Single<T> {
    fn absorb(&mut self, incoming: T, source: &SourceRef, _audit: &AuditScope<'_>) -> usize {
        match &self.0 {
            None => {
                self.0 = Some(Sourced::new(incoming, source.clone()));
                1
            }
            Some(existing) if existing.source.priority > source.priority => {
                self.0 = Some(Sourced::new(incoming, source.clone()));
                1
            }
            Some(_) => 0,
        }
    }

    fn is_complete(&self) -> bool {
        self.0.is_some()
    }
}
