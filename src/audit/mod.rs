//! Audit event recording.
//!
//! The resolution engine and the merge model emit discrete, timestamped
//! events through a narrow sink interface supplied by the caller: exactly one
//! event per field write and one per license repair, in execution order. The
//! core never formats, stores, or serializes these events; rendering an audit
//! trail is the caller's concern.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use crate::provider::SourceRef;

/// A single audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

/// What happened.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AuditEventKind {
    /// A semantic field on an entity was set from a provider.
    FieldWritten {
        entity: String,
        field: String,
        source: String,
        priority: i32,
    },
    /// A license value was rewritten by the sanitizer.
    LicenseRepaired {
        entity: String,
        original: String,
        sanitized: String,
        repaired_leaves: usize,
    },
}

/// Narrow sink interface for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Sink that drops every event. Null Object for callers that do not keep an
/// audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Sink that logs events through `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match &event.kind {
            AuditEventKind::FieldWritten {
                entity,
                field,
                source,
                priority,
            } => {
                tracing::debug!(%entity, %field, %source, priority, "field written");
            }
            AuditEventKind::LicenseRepaired {
                entity,
                original,
                sanitized,
                repaired_leaves,
            } => {
                tracing::debug!(%entity, %original, %sanitized, repaired_leaves, "license repaired");
            }
        }
    }
}

/// Sink that buffers events in memory, for tests and batch reporting.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all recorded events in execution order.
    pub fn drain(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Sink handle scoped to one entity, with constructors for the two event
/// kinds the core guarantees.
#[derive(Clone, Copy)]
pub struct AuditScope<'a> {
    sink: &'a dyn AuditSink,
    entity: &'a str,
}

impl<'a> AuditScope<'a> {
    pub fn new(sink: &'a dyn AuditSink, entity: &'a str) -> Self {
        Self { sink, entity }
    }

    pub fn entity(&self) -> &str {
        self.entity
    }

    /// Record that `field` was set from `source`.
    pub fn field_written(&self, field: &str, source: &SourceRef) {
        self.sink.record(AuditEvent {
            timestamp: Utc::now(),
            kind: AuditEventKind::FieldWritten {
                entity: self.entity.to_string(),
                field: field.to_string(),
                source: source.name.clone(),
                priority: source.priority,
            },
        });
    }

    /// Record that a license value was repaired.
    pub fn license_repaired(&self, original: &str, sanitized: &str, repaired_leaves: usize) {
        self.sink.record(AuditEvent {
            timestamp: Utc::now(),
            kind: AuditEventKind::LicenseRepaired {
                entity: self.entity.to_string(),
                original: original.to_string(),
                sanitized: sanitized.to_string(),
                repaired_leaves,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_preserves_order() {
        let sink = MemoryAuditSink::new();
        let scope = AuditScope::new(&sink, "pkg:cargo/serde@1.0.0");

        scope.field_written("description", &SourceRef::new("crates.io", 10));
        scope.license_repaired("Commercial", "LicenseRef-Commercial", 1);

        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].kind, AuditEventKind::FieldWritten { .. }));
        assert!(matches!(
            events[1].kind,
            AuditEventKind::LicenseRepaired { .. }
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn null_sink_discards() {
        let sink = NullAuditSink;
        let scope = AuditScope::new(&sink, "entity");
        scope.field_written("homepage", &SourceRef::new("pypi.org", 10));
    }
}
