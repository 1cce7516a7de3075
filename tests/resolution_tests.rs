//! Resolution engine integration tests.
//!
//! These exercise the full resolve path — capability filtering, priority
//! cascade, both policies, memoization, cancellation — with pinned mock
//! providers. Live sources drift across calendar time; mocks do not.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sbom_resolver::audit::{AuditEventKind, MemoryAuditSink, NullAuditSink};
use sbom_resolver::model::{MetadataDraft, NormalizedMetadata};
use sbom_resolver::provider::{
    CancelToken, FailureReason, Provider, ProviderContext, ProviderOutcome, ProviderRegistry,
    ResolveInput,
};
use sbom_resolver::resolve::{
    AttemptOutcome, MemoCache, Resolved, ResolutionLimits, ResolutionPolicy, Resolver,
};

// ============================================================================
// Mock provider machinery
// ============================================================================

#[derive(Debug, Clone)]
struct Pkg(&'static str);

impl ResolveInput for Pkg {
    fn identity(&self) -> String {
        self.0.to_string()
    }
}

type DraftFields = Vec<(&'static str, &'static str)>;

struct MockSource {
    name: &'static str,
    priority: i32,
    supported: bool,
    outcome: MockOutcome,
    calls: Arc<AtomicUsize>,
}

enum MockOutcome {
    Fields(DraftFields),
    Fail,
    Sleep(Duration, DraftFields),
}

impl MockSource {
    fn succeeding(name: &'static str, priority: i32, fields: DraftFields) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supported: true,
            outcome: MockOutcome::Fields(fields),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn failing(name: &'static str, priority: i32) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supported: true,
            outcome: MockOutcome::Fail,
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn slow(name: &'static str, priority: i32, delay: Duration, fields: DraftFields) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supported: true,
            outcome: MockOutcome::Sleep(delay, fields),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn unsupported(name: &'static str, priority: i32) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            supported: false,
            outcome: MockOutcome::Fail,
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn draft(fields: &DraftFields) -> MetadataDraft {
        let mut draft = MetadataDraft::new();
        for (field, value) in fields {
            match *field {
                "description" => draft.set_description(value),
                "license" => draft.add_license(value),
                "supplier" => draft.set_supplier(value),
                "homepage" => draft.set_homepage(value),
                other => panic!("unknown mock field {other}"),
            }
        }
        draft
    }
}

impl Provider<Pkg, MetadataDraft> for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports(&self, _input: &Pkg) -> bool {
        self.supported
    }

    fn execute(&self, _input: &Pkg, _ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            MockOutcome::Fields(fields) => ProviderOutcome::Success(Self::draft(fields)),
            MockOutcome::Fail => ProviderOutcome::Failed(FailureReason::api("mock failure")),
            MockOutcome::Sleep(delay, fields) => {
                std::thread::sleep(*delay);
                ProviderOutcome::Success(Self::draft(fields))
            }
        }
    }
}

fn registry(sources: Vec<Arc<MockSource>>) -> ProviderRegistry<Pkg, MetadataDraft> {
    let mut builder = ProviderRegistry::builder();
    for source in sources {
        builder = builder.register(source as Arc<dyn Provider<Pkg, MetadataDraft>>);
    }
    builder.build()
}

fn accumulate() -> Resolver {
    Resolver::new(ResolutionPolicy::Accumulate)
}

fn resolve_metadata(
    resolver: &Resolver,
    registry: &ProviderRegistry<Pkg, MetadataDraft>,
) -> Result<Resolved<NormalizedMetadata>, sbom_resolver::ResolutionFailure> {
    resolver.resolve(
        &Pkg("pkg:cargo/demo@1.0.0"),
        registry,
        &NullAuditSink,
        &CancelToken::new(),
        None,
    )
}

// ============================================================================
// Accumulate policy
// ============================================================================

mod accumulate_policy {
    use super::*;

    #[test]
    fn fill_gaps_across_priorities() {
        // A (priority 10) knows only the license; B (priority 50) knows the
        // license and homepage. A's license must win, B fills the homepage.
        let a = MockSource::succeeding("a", 10, vec![("license", "MIT")]);
        let b = MockSource::succeeding(
            "b",
            50,
            vec![("license", "GPL-3.0-only"), ("homepage", "https://b.example.com")],
        );
        let registry = registry(vec![a, b]);

        let resolved = resolve_metadata(&accumulate(), &registry).expect("both succeed");
        let metadata = resolved.value;

        let licenses = metadata.licenses.expect("license resolved");
        assert_eq!(licenses.value, vec!["MIT".to_string()]);
        assert_eq!(licenses.source.name, "a");

        let homepage = metadata.homepage.expect("homepage resolved");
        assert_eq!(homepage.value, "https://b.example.com");
        assert_eq!(homepage.source.name, "b");
    }

    #[test]
    fn failed_provider_contributes_nothing_but_does_not_abort() {
        let ok = MockSource::succeeding("ok", 20, vec![("description", "works")]);
        let bad = MockSource::failing("bad", 10);
        let registry = registry(vec![ok.clone(), bad]);

        let resolved = resolve_metadata(&accumulate(), &registry).expect("one success is enough");
        assert_eq!(resolved.contributors.len(), 1);
        assert_eq!(resolved.value.description.unwrap().source.name, "ok");
        assert!(resolved
            .attempts
            .iter()
            .any(|a| a.provider == "bad" && matches!(a.outcome, AttemptOutcome::Failed(_))));
        assert_eq!(ok.call_count(), 1);
    }

    #[test]
    fn merge_is_deterministic_regardless_of_completion_order() {
        // The slow high-priority provider finishes last but must still win
        // the description slot.
        for _ in 0..5 {
            let fast = MockSource::succeeding("fast", 50, vec![("description", "from-fast")]);
            let slow = MockSource::slow(
                "slow",
                10,
                Duration::from_millis(50),
                vec![("description", "from-slow")],
            );
            let registry = registry(vec![fast, slow]);

            let resolved = resolve_metadata(&accumulate(), &registry).expect("both succeed");
            assert_eq!(resolved.value.description.unwrap().value, "from-slow");
        }
    }

    #[test]
    fn no_eligible_providers_is_a_reportable_failure() {
        let registry = registry(vec![
            MockSource::unsupported("nope-1", 10),
            MockSource::unsupported("nope-2", 20),
        ]);
        let failure = resolve_metadata(&accumulate(), &registry).expect_err("nothing eligible");
        assert!(failure.attempts.is_empty());
        assert!(failure.to_string().contains("no eligible provider"));
    }

    #[test]
    fn all_failures_enumerated_for_diagnosis() {
        let registry = registry(vec![
            MockSource::failing("first", 10),
            MockSource::failing("second", 20),
            MockSource::failing("third", 30),
        ]);
        let failure = resolve_metadata(&accumulate(), &registry).expect_err("all fail");
        let names: Vec<_> = failure.attempts.iter().map(|a| a.provider.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        let rendered = failure.to_string();
        for name in names {
            assert!(rendered.contains(name), "failure text should name {name}");
        }
    }

    #[test]
    fn deadline_abandons_stragglers_but_keeps_finished_work() {
        let fast = MockSource::succeeding("fast", 20, vec![("description", "quick")]);
        let hung = MockSource::slow(
            "hung",
            10,
            Duration::from_secs(30),
            vec![("description", "never-seen")],
        );
        let registry = registry(vec![fast, hung]);

        let resolver = accumulate().with_limits(ResolutionLimits {
            max_concurrency: 2,
            per_provider_timeout: Duration::from_millis(150),
            overall_deadline: Duration::from_millis(250),
        });
        let resolved = resolve_metadata(&resolver, &registry).expect("fast result survives");
        assert_eq!(resolved.value.description.unwrap().value, "quick");
        assert!(resolved.attempts.iter().any(|a| a.provider == "hung"
            && matches!(a.outcome, AttemptOutcome::Abandoned | AttemptOutcome::TimedOut)));
    }

    #[test]
    fn cancellation_returns_partial_failure() {
        let registry = registry(vec![MockSource::succeeding(
            "never-reached",
            10,
            vec![("description", "x")],
        )]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let failure: sbom_resolver::ResolutionFailure = accumulate()
            .resolve::<_, _, NormalizedMetadata>(
                &Pkg("pkg:cargo/demo@1.0.0"),
                &registry,
                &NullAuditSink,
                &cancel,
                None,
            )
            .expect_err("cancelled");
        assert!(failure.cancelled);
    }
}

// ============================================================================
// First-success policy
// ============================================================================

mod first_success_policy {
    use super::*;
    use sbom_resolver::model::Single;

    fn first_success() -> Resolver {
        Resolver::new(ResolutionPolicy::FirstSuccess)
    }

    #[test]
    fn short_circuits_after_first_success() {
        let a = MockSource::failing("a", 10);
        let b = MockSource::succeeding("b", 20, vec![("description", "from-b")]);
        let c = MockSource::succeeding("c", 30, vec![("description", "from-c")]);
        let registry = registry(vec![a.clone(), b.clone(), c.clone()]);

        let resolved: Resolved<Single<MetadataDraft>> = first_success()
            .resolve(
                &Pkg("pkg:cargo/demo@1.0.0"),
                &registry,
                &NullAuditSink,
                &CancelToken::new(),
                None,
            )
            .expect("b succeeds");

        let winner = resolved.value.into_inner().expect("a winner");
        assert_eq!(winner.source.name, "b");
        assert_eq!(winner.value.description.as_deref(), Some("from-b"));

        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 0, "c must never be invoked");
    }

    #[test]
    fn providers_tried_in_priority_order_not_registration_order() {
        let low = MockSource::succeeding("low-priority", 90, vec![("description", "weak")]);
        let high = MockSource::succeeding("high-priority", 10, vec![("description", "strong")]);
        // Registered weakest first on purpose.
        let registry = registry(vec![low.clone(), high.clone()]);

        let resolved: Resolved<Single<MetadataDraft>> = first_success()
            .resolve(
                &Pkg("pkg:cargo/demo@1.0.0"),
                &registry,
                &NullAuditSink,
                &CancelToken::new(),
                None,
            )
            .expect("high priority succeeds");

        assert_eq!(resolved.value.into_inner().unwrap().source.name, "high-priority");
        assert_eq!(low.call_count(), 0);
    }
}

// ============================================================================
// Memoization
// ============================================================================

mod memoization {
    use super::*;

    #[test]
    fn identical_inputs_resolve_from_memo() {
        let source = MockSource::succeeding("memoized", 10, vec![("description", "cached")]);
        let registry = registry(vec![source.clone()]);
        let memo: MemoCache<MetadataDraft> = MemoCache::new();

        for _ in 0..4 {
            let _resolved: Resolved<NormalizedMetadata> = accumulate()
                .resolve(
                    &Pkg("pkg:cargo/demo@1.0.0"),
                    &registry,
                    &NullAuditSink,
                    &CancelToken::new(),
                    Some(&memo),
                )
                .expect("resolves");
        }

        assert_eq!(source.call_count(), 1, "later calls must hit the memo");
    }

    #[test]
    fn distinct_inputs_are_not_conflated() {
        let source = MockSource::succeeding("memoized", 10, vec![("description", "cached")]);
        let registry = registry(vec![source.clone()]);
        let memo: MemoCache<MetadataDraft> = MemoCache::new();

        for purl in ["pkg:cargo/one@1.0.0", "pkg:cargo/two@2.0.0"] {
            let _resolved: Resolved<NormalizedMetadata> = accumulate()
                .resolve(&Pkg(purl), &registry, &NullAuditSink, &CancelToken::new(), Some(&memo))
                .expect("resolves");
        }
        assert_eq!(source.call_count(), 2);
    }
}

// ============================================================================
// Audit events
// ============================================================================

mod audit_events {
    use super::*;

    #[test]
    fn one_event_per_field_write_in_fold_order() {
        let a = MockSource::succeeding("a", 10, vec![("description", "desc"), ("license", "MIT")]);
        let b = MockSource::succeeding("b", 50, vec![("homepage", "https://b.example.com")]);
        let registry = registry(vec![a, b]);
        let sink = MemoryAuditSink::new();

        let _resolved: Resolved<NormalizedMetadata> = accumulate()
            .resolve(
                &Pkg("pkg:cargo/demo@1.0.0"),
                &registry,
                &sink,
                &CancelToken::new(),
                None,
            )
            .expect("resolves");

        let events = sink.drain();
        let written: Vec<(String, String)> = events
            .iter()
            .filter_map(|e| match &e.kind {
                AuditEventKind::FieldWritten { field, source, .. } => {
                    Some((field.clone(), source.clone()))
                }
                AuditEventKind::LicenseRepaired { .. } => None,
            })
            .collect();

        // a's fields fold before b's regardless of completion order.
        assert_eq!(
            written,
            vec![
                ("description".to_string(), "a".to_string()),
                ("licenses".to_string(), "a".to_string()),
                ("homepage".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn license_repairs_are_audited_against_the_entity() {
        let vendor = MockSource::succeeding(
            "vendor-db",
            10,
            vec![("license", "Commercial - see LICENSE.txt")],
        );
        let registry = registry(vec![vendor]);
        let sink = MemoryAuditSink::new();

        let _resolved: Resolved<NormalizedMetadata> = accumulate()
            .resolve(
                &Pkg("pkg:generic/blob@1.0.0"),
                &registry,
                &sink,
                &CancelToken::new(),
                None,
            )
            .expect("resolves");

        let events = sink.drain();
        let repair = events
            .iter()
            .find_map(|e| match &e.kind {
                AuditEventKind::LicenseRepaired {
                    entity,
                    original,
                    sanitized,
                    repaired_leaves,
                } => Some((entity.clone(), original.clone(), sanitized.clone(), *repaired_leaves)),
                AuditEventKind::FieldWritten { .. } => None,
            })
            .expect("exactly one repair event");
        assert_eq!(repair.0, "pkg:generic/blob@1.0.0");
        assert_eq!(repair.1, "Commercial - see LICENSE.txt");
        assert_eq!(repair.2, "LicenseRef-Commercial-see-LICENSE.txt");
        assert_eq!(repair.3, 1);
    }
}
