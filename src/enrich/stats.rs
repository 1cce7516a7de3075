//! Enrichment batch statistics.

use serde::Serialize;
use std::time::Duration;

/// Statistics from one enrichment batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EnrichmentStats {
    /// Number of entities in the batch
    pub entities: usize,
    /// Entities for which at least one field was resolved
    pub enriched: usize,
    /// Entities whose merged result covers the NTIA core fields
    pub complete: usize,
    /// Entities for which resolution failed outright
    pub failed: usize,
    /// Entities skipped before resolution (unparsable identifiers)
    pub skipped: usize,
    /// Duration of the whole batch
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Per-entity failure summaries, in batch order
    pub errors: Vec<String>,
}

impl EnrichmentStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a one-line summary plus any per-entity failures.
    pub fn log_summary(&self) {
        tracing::info!(
            "Enrichment complete: {}/{} entities enriched ({} NTIA-complete), \
             {} failed, {} skipped in {:?}",
            self.enriched,
            self.entities,
            self.complete,
            self.failed,
            self.skipped,
            self.duration
        );

        for err in &self.errors {
            tracing::warn!("Enrichment warning: {}", err);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_duration_as_seconds() {
        let stats = EnrichmentStats {
            entities: 2,
            duration: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["duration"], serde_json::json!(1.5));
    }
}
