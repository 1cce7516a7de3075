//! Property-based tests for the sanitizer and the monotonic merge.
//!
//! Ensures the core invariants hold across random inputs, not just the
//! hand-picked cases in the unit tests.

use proptest::prelude::*;

use sbom_resolver::audit::NullAuditSink;
use sbom_resolver::license::sanitize;
use sbom_resolver::model::{Absorb, MetadataDraft, NormalizedMetadata};
use sbom_resolver::provider::SourceRef;
use sbom_resolver::AuditScope;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn sanitize_never_panics(s in "\\PC{0,200}") {
        let _ = sanitize(&s);
    }

    #[test]
    fn sanitize_is_idempotent(s in "\\PC{0,200}") {
        let first = sanitize(&s);
        let second = sanitize(&first.expression);
        prop_assert_eq!(&second.expression, &first.expression);
        prop_assert!(!second.was_modified, "re-sanitizing {:?} changed it", first.expression);
        prop_assert_eq!(second.repaired_leaves, 0);
    }

    #[test]
    fn sanitize_is_deterministic(s in "\\PC{0,200}") {
        prop_assert_eq!(sanitize(&s).expression, sanitize(&s).expression);
    }

    #[test]
    fn valid_single_ids_pass_through(
        id in "(MIT|Apache-2\\.0|GPL-2\\.0-only|BSD-3-Clause|ISC|Unlicense|MPL-2\\.0|Zlib)"
    ) {
        let outcome = sanitize(&id);
        prop_assert!(!outcome.was_modified);
        prop_assert_eq!(outcome.expression, id);
    }

    #[test]
    fn valid_binary_expressions_pass_through(
        left in "(MIT|Apache-2\\.0|BSD-3-Clause)",
        op in "(AND|OR)",
        right in "(ISC|Zlib|MPL-2\\.0)",
    ) {
        let expr = format!("{left} {op} {right}");
        let outcome = sanitize(&expr);
        prop_assert!(!outcome.was_modified, "{} was modified to {}", expr, outcome.expression);
    }

    #[test]
    fn merge_is_monotonic_under_any_feed_order(
        priorities in proptest::collection::vec(0i32..100, 1..8),
        values in proptest::collection::vec("[a-z]{1,12}", 1..8),
    ) {
        let sink = NullAuditSink;
        let scope = AuditScope::new(&sink, "prop-entity");
        let mut merged = NormalizedMetadata::default();

        let n = priorities.len().min(values.len());
        for (i, (priority, value)) in priorities.iter().zip(values.iter()).take(n).enumerate() {
            let mut draft = MetadataDraft::new();
            draft.set_supplier(value);
            merged.absorb(draft, &SourceRef::new(format!("source-{i}"), *priority), &scope);

            // After every step the attributed priority is the minimum seen
            // so far: a weaker source never displaces a stronger one.
            let best = priorities.iter().take(i + 1).min().copied().unwrap();
            let current = merged.supplier.as_ref().expect("supplier set").source.priority;
            prop_assert_eq!(current, best);
        }
    }

    #[test]
    fn merge_is_idempotent(priority in 0i32..100, value in "[a-z]{1,12}") {
        let sink = NullAuditSink;
        let scope = AuditScope::new(&sink, "prop-entity");
        let source = SourceRef::new("source", priority);

        let mut draft = MetadataDraft::new();
        draft.set_supplier(&value);

        let mut merged = NormalizedMetadata::default();
        merged.absorb(draft.clone(), &source, &scope);
        let snapshot = format!("{merged:?}");
        let written = merged.absorb(draft, &source, &scope);

        prop_assert_eq!(written, 0);
        prop_assert_eq!(format!("{merged:?}"), snapshot);
    }
}
