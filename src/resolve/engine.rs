//! The resolution engine: capability-matching priority cascade.
//!
//! One `resolve` call filters the registry to providers supporting the
//! input, orders them by priority (registration order breaking ties), and
//! either short-circuits on the first success (first-success policy) or
//! dispatches them with bounded concurrency and folds every success into one
//! result in priority order (accumulate policy).
//!
//! All provider faults stay local: they become [`AttemptRecord`]s and the
//! next candidate is tried. Only a total failure — no eligible provider, or
//! none succeeded — escapes, as a [`ResolutionFailure`] value. The engine
//! never retries a provider within one call; retry policy belongs to the
//! caller, by re-invoking `resolve`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::audit::{AuditScope, AuditSink, NullAuditSink};
use crate::model::Absorb;
use crate::provider::{
    CancelToken, FailureReason, Provider, ProviderContext, ProviderOutcome, ProviderRegistry,
    ResolveInput, SourceRef,
};

use super::failure::{AttemptOutcome, AttemptRecord, ResolutionFailure};
use super::memo::MemoCache;

/// How provider results are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Invoke providers strictly in priority order, sequentially, and stop
    /// at the first success. Used where one artifact is wanted (generation,
    /// upload): concurrency would waste calls the first success makes moot.
    FirstSuccess,
    /// Invoke all eligible providers, concurrently within limits, and fold
    /// every success into one result so later providers fill only the gaps.
    /// Used for enrichment and augmentation.
    Accumulate,
}

/// Numeric knobs bounding one `resolve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionLimits {
    /// Concurrent provider invocations under accumulate. Keeps the engine
    /// inside external API rate limits.
    pub max_concurrency: usize,
    /// Time budget for a single provider invocation.
    pub per_provider_timeout: Duration,
    /// Hard cutoff for the whole call; outstanding invocations past it are
    /// abandoned and resolution proceeds with what is in hand.
    pub overall_deadline: Duration,
}

impl Default for ResolutionLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            per_provider_timeout: Duration::from_secs(30),
            overall_deadline: Duration::from_secs(120),
        }
    }
}

/// Successful resolution of one entity.
#[derive(Debug)]
pub struct Resolved<R> {
    /// The folded result.
    pub value: R,
    /// Providers whose data entered the result, in fold order.
    pub contributors: Vec<SourceRef>,
    /// Every attempted provider with its outcome, for reporting.
    pub attempts: Vec<AttemptRecord>,
    /// Wall-clock time the resolution took.
    pub elapsed: Duration,
}

impl<R> Resolved<R> {
    /// Attempts that failed or timed out; non-fatal under accumulate but
    /// worth surfacing as warnings.
    pub fn degraded_attempts(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.attempts.iter().filter(|a| {
            matches!(
                a.outcome,
                AttemptOutcome::Failed(_) | AttemptOutcome::TimedOut | AttemptOutcome::Abandoned
            )
        })
    }
}

/// The resolution engine for one capability.
#[derive(Debug, Clone)]
pub struct Resolver {
    policy: ResolutionPolicy,
    limits: ResolutionLimits,
    stop_when_complete: bool,
}

impl Resolver {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self {
            policy,
            limits: ResolutionLimits::default(),
            stop_when_complete: false,
        }
    }

    pub fn with_limits(mut self, limits: ResolutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Under accumulate, stop dispatching further providers once the
    /// accumulating result reports itself complete. Providers skipped this
    /// way are strictly lower priority, so the monotonic merge is unaffected;
    /// the point is to spare rate-limited fallback sources.
    pub fn stop_when_complete(mut self, stop: bool) -> Self {
        self.stop_when_complete = stop;
        self
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Resolve one input against a provider registry.
    ///
    /// Returns the folded result or a [`ResolutionFailure`] enumerating
    /// every attempted provider. Cancellation through `cancel` aborts the
    /// call and yields a failure carrying the partial outcomes gathered so
    /// far.
    pub fn resolve<I, D, R>(
        &self,
        input: &I,
        registry: &ProviderRegistry<I, D>,
        sink: &dyn AuditSink,
        cancel: &CancelToken,
        memo: Option<&MemoCache<D>>,
    ) -> Result<Resolved<R>, ResolutionFailure>
    where
        I: ResolveInput + Clone + Send + Sync + 'static,
        D: Clone + Send + 'static,
        R: Absorb<D>,
    {
        match self.policy {
            ResolutionPolicy::FirstSuccess => self.resolve_sequential(input, registry, sink, cancel, memo),
            ResolutionPolicy::Accumulate => self.resolve_concurrent(input, registry, sink, cancel, memo),
        }
    }

    fn resolve_sequential<I, D, R>(
        &self,
        input: &I,
        registry: &ProviderRegistry<I, D>,
        sink: &dyn AuditSink,
        cancel: &CancelToken,
        memo: Option<&MemoCache<D>>,
    ) -> Result<Resolved<R>, ResolutionFailure>
    where
        I: ResolveInput,
        D: Clone,
        R: Absorb<D>,
    {
        let started = Instant::now();
        let overall = started + self.limits.overall_deadline;
        let entity = input.label();
        let identity = input.identity();

        let eligible = registry.eligible_for(input);
        if eligible.is_empty() {
            tracing::debug!(entity = entity.as_str(), "no eligible providers");
            return Err(ResolutionFailure::no_eligible_providers(entity));
        }

        let scope = AuditScope::new(sink, &entity);
        let mut attempts = Vec::with_capacity(eligible.len());

        for provider in &eligible {
            if cancel.is_cancelled() {
                return Err(ResolutionFailure::cancelled(entity, attempts));
            }
            let now = Instant::now();
            if now >= overall {
                attempts.push(AttemptRecord::new(
                    provider.name(),
                    provider.priority(),
                    AttemptOutcome::Abandoned,
                ));
                continue;
            }

            let outcome = self.invoke(provider.as_ref(), input, &identity, overall, cancel, memo);

            match outcome {
                ProviderOutcome::Success(data) => {
                    let source = SourceRef::new(provider.name(), provider.priority());
                    let mut value = R::default();
                    value.absorb(data, &source, &scope);
                    attempts.push(AttemptRecord::new(
                        provider.name(),
                        provider.priority(),
                        AttemptOutcome::Success,
                    ));
                    tracing::debug!(entity = entity.as_str(), provider = provider.name(), "first success");
                    return Ok(Resolved {
                        value,
                        contributors: vec![source],
                        attempts,
                        elapsed: started.elapsed(),
                    });
                }
                ProviderOutcome::Unsupported => {
                    attempts.push(AttemptRecord::new(
                        provider.name(),
                        provider.priority(),
                        AttemptOutcome::Unsupported,
                    ));
                }
                ProviderOutcome::Failed(reason) => {
                    tracing::warn!(entity = entity.as_str(), provider = provider.name(), %reason, "provider failed; trying next");
                    attempts.push(AttemptRecord::new(
                        provider.name(),
                        provider.priority(),
                        AttemptOutcome::Failed(reason),
                    ));
                }
                ProviderOutcome::TimedOut => {
                    tracing::warn!(entity = entity.as_str(), provider = provider.name(), "provider timed out; trying next");
                    attempts.push(AttemptRecord::new(
                        provider.name(),
                        provider.priority(),
                        AttemptOutcome::TimedOut,
                    ));
                }
            }
        }

        Err(ResolutionFailure::new(entity, attempts))
    }

    /// Run one provider synchronously, consulting and feeding the memo
    /// cache, converting panics to failures and overruns to timeouts.
    fn invoke<I, D>(
        &self,
        provider: &dyn Provider<I, D>,
        input: &I,
        identity: &str,
        overall: Instant,
        cancel: &CancelToken,
        memo: Option<&MemoCache<D>>,
    ) -> ProviderOutcome<D>
    where
        D: Clone,
    {
        if let Some(hit) = memo.and_then(|m| m.get(provider.name(), identity)) {
            tracing::trace!(provider = provider.name(), identity, "memoized outcome");
            return hit;
        }

        let deadline = (Instant::now() + self.limits.per_provider_timeout).min(overall);
        let ctx = ProviderContext::new(deadline, cancel.clone());
        let attempt_started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| provider.execute(input, &ctx)))
            .unwrap_or_else(|_| ProviderOutcome::Failed(FailureReason::other("provider panicked")));
        let outcome = if attempt_started.elapsed() > self.limits.per_provider_timeout {
            ProviderOutcome::TimedOut
        } else {
            outcome
        };

        if let Some(m) = memo {
            m.insert(provider.name(), identity, &outcome);
        }
        outcome
    }

    fn resolve_concurrent<I, D, R>(
        &self,
        input: &I,
        registry: &ProviderRegistry<I, D>,
        sink: &dyn AuditSink,
        cancel: &CancelToken,
        memo: Option<&MemoCache<D>>,
    ) -> Result<Resolved<R>, ResolutionFailure>
    where
        I: ResolveInput + Clone + Send + Sync + 'static,
        D: Clone + Send + 'static,
        R: Absorb<D>,
    {
        let started = Instant::now();
        let overall = started + self.limits.overall_deadline;
        let entity = input.label();
        let identity = input.identity();

        let eligible = registry.eligible_for(input);
        if eligible.is_empty() {
            tracing::debug!(entity = entity.as_str(), "no eligible providers");
            return Err(ResolutionFailure::no_eligible_providers(entity));
        }

        let shared_input = Arc::new(input.clone());
        let (tx, rx) = mpsc::channel::<(usize, ProviderOutcome<D>)>();
        let cap = self.limits.max_concurrency.max(1);

        let mut outcomes: Vec<Option<ProviderOutcome<D>>> = (0..eligible.len()).map(|_| None).collect();
        let mut next = 0usize;
        let mut in_flight = 0usize;
        let mut stop_dispatch = false;
        let mut was_cancelled = false;

        // Probe fold for the short-stop check. It absorbs clones against a
        // null sink so the real fold below stays the single audited pass.
        let null_sink = NullAuditSink;
        let null_scope = AuditScope::new(&null_sink, &entity);
        let mut probe = R::default();

        loop {
            while !stop_dispatch && in_flight < cap && next < eligible.len() {
                let idx = next;
                next += 1;
                let provider = Arc::clone(&eligible[idx]);

                if let Some(hit) = memo.and_then(|m| m.get(provider.name(), &identity)) {
                    tracing::trace!(provider = provider.name(), identity = identity.as_str(), "memoized outcome");
                    if self.stop_when_complete {
                        if let ProviderOutcome::Success(data) = &hit {
                            let source = SourceRef::new(provider.name(), provider.priority());
                            probe.absorb(data.clone(), &source, &null_scope);
                            if probe.is_complete() {
                                stop_dispatch = true;
                                tracing::debug!(entity = entity.as_str(), "result complete; skipping remaining providers");
                            }
                        }
                    }
                    outcomes[idx] = Some(hit);
                    continue;
                }

                let deadline = (Instant::now() + self.limits.per_provider_timeout).min(overall);
                let ctx = ProviderContext::new(deadline, cancel.clone());
                let per_timeout = self.limits.per_provider_timeout;
                let worker_tx = tx.clone();
                let worker_input = Arc::clone(&shared_input);
                std::thread::spawn(move || {
                    let attempt_started = Instant::now();
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| provider.execute(&worker_input, &ctx)))
                            .unwrap_or_else(|_| {
                                ProviderOutcome::Failed(FailureReason::other("provider panicked"))
                            });
                    let outcome = if attempt_started.elapsed() > per_timeout {
                        ProviderOutcome::TimedOut
                    } else {
                        outcome
                    };
                    // The receiver may be gone if the deadline already cut
                    // this resolution off; the result is then discarded.
                    let _ = worker_tx.send((idx, outcome));
                });
                in_flight += 1;
            }

            if in_flight == 0 && (stop_dispatch || next >= eligible.len()) {
                break;
            }
            if cancel.is_cancelled() {
                was_cancelled = true;
                break;
            }
            let now = Instant::now();
            if now >= overall {
                tracing::warn!(entity = entity.as_str(), in_flight, "overall deadline reached; abandoning outstanding providers");
                break;
            }

            // Short poll so cancellation is noticed promptly.
            let wait = overall.saturating_duration_since(now).min(Duration::from_millis(50));
            match rx.recv_timeout(wait) {
                Ok((idx, outcome)) => {
                    in_flight -= 1;
                    let provider = &eligible[idx];
                    if let Some(m) = memo {
                        m.insert(provider.name(), &identity, &outcome);
                    }
                    if self.stop_when_complete {
                        if let ProviderOutcome::Success(data) = &outcome {
                            let source = SourceRef::new(provider.name(), provider.priority());
                            probe.absorb(data.clone(), &source, &null_scope);
                            if probe.is_complete() {
                                stop_dispatch = true;
                                tracing::debug!(entity = entity.as_str(), "result complete; skipping remaining providers");
                            }
                        }
                    }
                    outcomes[idx] = Some(outcome);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        // Buffered outcomes fold in priority order (the eligible list is
        // already sorted), never in completion order, so the result is
        // deterministic for a fixed set of outcomes.
        let scope = AuditScope::new(sink, &entity);
        let mut attempts = Vec::with_capacity(eligible.len());
        let mut value = R::default();
        let mut contributors = Vec::new();

        for (idx, provider) in eligible.iter().enumerate() {
            let name = provider.name();
            let priority = provider.priority();
            match outcomes[idx].take() {
                Some(ProviderOutcome::Success(data)) => {
                    let source = SourceRef::new(name, priority);
                    let written = value.absorb(data, &source, &scope);
                    tracing::debug!(entity = entity.as_str(), provider = name, written, "folded provider result");
                    contributors.push(source);
                    attempts.push(AttemptRecord::new(name, priority, AttemptOutcome::Success));
                }
                Some(ProviderOutcome::Unsupported) => {
                    attempts.push(AttemptRecord::new(name, priority, AttemptOutcome::Unsupported));
                }
                Some(ProviderOutcome::Failed(reason)) => {
                    tracing::warn!(entity = entity.as_str(), provider = name, %reason, "provider failed");
                    attempts.push(AttemptRecord::new(name, priority, AttemptOutcome::Failed(reason)));
                }
                Some(ProviderOutcome::TimedOut) => {
                    tracing::warn!(entity = entity.as_str(), provider = name, "provider timed out");
                    attempts.push(AttemptRecord::new(name, priority, AttemptOutcome::TimedOut));
                }
                None if idx < next => {
                    // Dispatched but still outstanding when we stopped.
                    attempts.push(AttemptRecord::new(
                        name,
                        priority,
                        if was_cancelled {
                            AttemptOutcome::Cancelled
                        } else {
                            AttemptOutcome::Abandoned
                        },
                    ));
                }
                None => {
                    // Never dispatched. Deliberately skipped providers
                    // (short-stop) are not attempts; the rest were starved
                    // by cancellation or the deadline.
                    if was_cancelled {
                        attempts.push(AttemptRecord::new(name, priority, AttemptOutcome::Cancelled));
                    } else if !stop_dispatch {
                        attempts.push(AttemptRecord::new(name, priority, AttemptOutcome::Abandoned));
                    }
                }
            }
        }

        if was_cancelled {
            return Err(ResolutionFailure::cancelled(entity, attempts));
        }
        if contributors.is_empty() {
            return Err(ResolutionFailure::new(entity, attempts));
        }

        Ok(Resolved {
            value,
            contributors,
            attempts,
            elapsed: started.elapsed(),
        })
    }
}
