//! # Verifier Reconciler
//!
//! Drives accepted proofs to `verified` or `failed`.
//!
//! ## One attempt
//!
//! 1. Claim the id in the in-process in-flight set.
//! 2. Load the record; skip it if terminal or not yet due.
//! 3. Dispatch through compare-and-set: `attempts += 1` and lease the record
//!    until `now + max(delay(attempts), attempt_timeout + LEASE_MARGIN)`, so
//!    no other worker finds it due while the verifier call can still run.
//! 4. Submit the envelope, bounded by the attempt timeout.
//! 5. Apply the verdict through compare-and-set, guarded by the dispatched
//!    snapshot.
//!
//! Callers pass a logical `now`. Within a batch or an attempt, time advances
//! from that base by the monotonic clock: an attempt starts at the instant
//! it acquires its permit, and the verdict is stamped with the instant the
//! verifier answered.
//!
//! ## Concurrency
//!
//! Ids reconcile concurrently up to `concurrency`. Two workers racing on the
//! same id are stopped first by the in-flight set and, across processes, by
//! the store guard: the loser sees `Stale` and backs off.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use proofrelay_core::{ProofId, ProofRecord};
use proofrelay_state::{plan, ProofStore, StoreError, Transition, TransitionError};
use proofrelay_verifier_client::{ExternalVerifier, TransientVerifierError, VerifierVerdict};

use crate::backoff::{BackoffPolicy, JitterSource, NoJitter};

/// Capacity of the ingestion-to-reconciler queue.
const QUEUE_CAPACITY: usize = 1024;

/// Headroom on top of the attempt timeout for the two store round trips.
const LEASE_MARGIN: Duration = Duration::from_secs(1);

/// A logical instant that advances with the monotonic clock.
#[derive(Debug, Clone, Copy)]
struct LogicalClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl LogicalClock {
    fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.origin.elapsed())
            .ok()
            .and_then(|elapsed| self.base.checked_add_signed(elapsed))
            .unwrap_or(self.base)
    }
}

fn add_duration(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Reconciler tuning.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Retry budget and delay curve.
    pub backoff: BackoffPolicy,
    /// Time between scans for due records.
    pub poll_interval: Duration,
    /// Maximum ids taken per scan.
    pub batch_size: usize,
    /// Maximum attempts in flight at once.
    pub concurrency: usize,
    /// Outer bound on a single verifier call.
    pub attempt_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            poll_interval: Duration::from_millis(2000),
            batch_size: 64,
            concurrency: 8,
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

/// Why an id was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No such record.
    NotFound,
    /// Already `verified` or `failed`.
    Terminal,
    /// `submitted` with a future `next_attempt_at`.
    NotDue,
    /// Another worker in this process holds the id.
    InFlight,
    /// The record changed under us; someone else applied a transition.
    LostRace,
}

/// Result of reconciling one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The verifier accepted the proof.
    Verified,
    /// The verifier rejected the proof or the budget ran out.
    Failed,
    /// Transient failure; retried at the given instant.
    Rescheduled(DateTime<Utc>),
    /// Nothing was done.
    Skipped(SkipReason),
}

/// Tally of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Records moved to `verified`.
    pub verified: usize,
    /// Records moved to `failed`.
    pub failed: usize,
    /// Records rescheduled after a transient failure.
    pub rescheduled: usize,
    /// Ids skipped.
    pub skipped: usize,
    /// Ids that hit a store error.
    pub errors: usize,
}

impl PassSummary {
    fn record(&mut self, result: &Result<ReconcileOutcome, StoreError>) {
        match result {
            Ok(ReconcileOutcome::Verified) => self.verified += 1,
            Ok(ReconcileOutcome::Failed) => self.failed += 1,
            Ok(ReconcileOutcome::Rescheduled(_)) => self.rescheduled += 1,
            Ok(ReconcileOutcome::Skipped(_)) => self.skipped += 1,
            Err(_) => self.errors += 1,
        }
    }

    /// Ids that reached the verifier.
    pub fn attempted(&self) -> usize {
        self.verified + self.failed + self.rescheduled
    }
}

/// Sends freshly accepted ids to a running reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    tx: mpsc::Sender<ProofId>,
}

impl ReconcilerHandle {
    /// Queue an id for immediate reconciliation. Best effort: returns
    /// `false` if the queue is full or closed, and the periodic scan picks
    /// the id up later.
    pub fn enqueue(&self, id: ProofId) -> bool {
        match self.tx.try_send(id) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "reconciler queue unavailable; id left for periodic scan");
                false
            }
        }
    }
}

/// Removes an id from the in-flight set when dropped.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<ProofId>>>,
    id: ProofId,
}

impl InFlightGuard {
    fn claim(set: &Arc<Mutex<HashSet<ProofId>>>, id: &ProofId) -> Option<Self> {
        if !set.lock().insert(id.clone()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            id: id.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

/// The reconciliation worker.
pub struct VerifierReconciler {
    store: Arc<dyn ProofStore>,
    verifier: Arc<dyn ExternalVerifier>,
    config: ReconcilerConfig,
    jitter: Arc<dyn JitterSource>,
    in_flight: Arc<Mutex<HashSet<ProofId>>>,
}

impl std::fmt::Debug for VerifierReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierReconciler")
            .field("config", &self.config)
            .field("jitter", &self.jitter)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

impl VerifierReconciler {
    /// Create a reconciler without jitter.
    pub fn new(
        store: Arc<dyn ProofStore>,
        verifier: Arc<dyn ExternalVerifier>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            verifier,
            config,
            jitter: Arc::new(NoJitter),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replace the jitter source.
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    fn next_due(&self, attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        add_duration(now, self.jitter.apply(self.config.backoff.delay_for(attempts)))
    }

    /// Dispatch lease: the backoff delay, but never shorter than one full
    /// verifier call.
    fn lease_until(&self, attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let call_bound = add_duration(now, self.config.attempt_timeout.saturating_add(LEASE_MARGIN));
        self.next_due(attempts, now).max(call_bound)
    }

    /// Run one attempt for `id` starting at instant `now`.
    ///
    /// Only store failures surface as `Err`; every verifier outcome is
    /// reflected in the record.
    pub async fn reconcile(&self, id: &ProofId, now: DateTime<Utc>) -> Result<ReconcileOutcome, StoreError> {
        let clock = LogicalClock::starting_at(now);
        let Some(_guard) = InFlightGuard::claim(&self.in_flight, id) else {
            return Ok(ReconcileOutcome::Skipped(SkipReason::InFlight));
        };

        let Some(record) = self.store.get_by_id(id).await? else {
            return Ok(ReconcileOutcome::Skipped(SkipReason::NotFound));
        };
        if record.verifier_status.is_terminal() {
            return Ok(ReconcileOutcome::Skipped(SkipReason::Terminal));
        }
        if !record.is_due(now) {
            return Ok(ReconcileOutcome::Skipped(SkipReason::NotDue));
        }

        let Some(dispatched) = self.dispatch(&record, now).await? else {
            return Ok(ReconcileOutcome::Skipped(SkipReason::LostRace));
        };
        let attempt = dispatched.attempts;
        tracing::info!(proof_id = %id, attempt, "submitting proof to verifier");

        let verdict = match tokio::time::timeout(
            self.config.attempt_timeout,
            self.verifier.submit(&dispatched.envelope),
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(_) => VerifierVerdict::Transient(TransientVerifierError::Timeout(
                self.config.attempt_timeout.as_millis() as u64,
            )),
        };

        self.complete(&dispatched, verdict, clock.now()).await
    }

    async fn dispatch(&self, record: &ProofRecord, now: DateTime<Utc>) -> Result<Option<ProofRecord>, StoreError> {
        let transition = Transition::Dispatch {
            at: now,
            lease_until: self.lease_until(record.attempts.saturating_add(1), now),
        };
        let (guard, update) = match plan(record, &transition) {
            Ok(planned) => planned,
            Err(e) => {
                tracing::error!(proof_id = %record.id(), error = %e, "refused dispatch on eligible record");
                return Ok(None);
            }
        };
        match self.store.compare_and_set_status(record.id(), guard, update).await {
            Ok(updated) => Ok(Some(updated)),
            Err(StoreError::Stale { .. }) => {
                tracing::debug!(proof_id = %record.id(), "dispatch lost race; another worker owns this attempt");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn complete(
        &self,
        dispatched: &ProofRecord,
        verdict: VerifierVerdict,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, StoreError> {
        let id = dispatched.id();
        let attempts = dispatched.attempts;
        let (transition, outcome) = match verdict {
            VerifierVerdict::Accepted { message } => {
                tracing::info!(proof_id = %id, attempt = attempts, status = "verified", "verifier accepted proof");
                (Transition::Accept { message, at: now }, ReconcileOutcome::Verified)
            }
            VerifierVerdict::Rejected(e) => {
                tracing::warn!(proof_id = %id, attempt = attempts, status = "failed", error = %e, "verifier rejected proof");
                (
                    Transition::Reject {
                        message: e.to_string(),
                        at: now,
                    },
                    ReconcileOutcome::Failed,
                )
            }
            VerifierVerdict::Transient(e) if self.config.backoff.is_exhausted(attempts) => {
                tracing::warn!(proof_id = %id, attempt = attempts, status = "failed", error = %e, "retry budget exhausted");
                (
                    Transition::Exhaust {
                        message: format!("retry budget exhausted after {attempts} attempts: {e}"),
                        at: now,
                    },
                    ReconcileOutcome::Failed,
                )
            }
            VerifierVerdict::Transient(e) => {
                let next_attempt_at = self.next_due(attempts, now);
                let delay_ms = (next_attempt_at - now).num_milliseconds();
                tracing::warn!(proof_id = %id, attempt = attempts, delay_ms, error = %e, "transient verifier failure; rescheduling");
                (
                    Transition::Reschedule {
                        message: e.to_string(),
                        next_attempt_at,
                    },
                    ReconcileOutcome::Rescheduled(next_attempt_at),
                )
            }
        };

        let (guard, update) = match plan(dispatched, &transition) {
            Ok(planned) => planned,
            Err(e @ TransitionError::AlreadyTerminal { .. }) => {
                tracing::error!(proof_id = %id, error = %e, "invariant violation: verdict for terminal record");
                return Ok(ReconcileOutcome::Skipped(SkipReason::Terminal));
            }
            Err(e) => {
                tracing::error!(proof_id = %id, error = %e, "invariant violation: verdict for undispatched record");
                return Ok(ReconcileOutcome::Skipped(SkipReason::LostRace));
            }
        };
        match self.store.compare_and_set_status(id, guard, update).await {
            Ok(_) => Ok(outcome),
            Err(StoreError::Stale { .. }) => {
                tracing::warn!(proof_id = %id, attempt = attempts, "verdict discarded; record changed during attempt");
                Ok(ReconcileOutcome::Skipped(SkipReason::LostRace))
            }
            Err(e) => Err(e),
        }
    }

    /// Reconcile a set of ids concurrently, bounded by `concurrency`. Each
    /// attempt starts at the instant its permit is granted.
    pub async fn reconcile_many(self: &Arc<Self>, ids: Vec<ProofId>, now: DateTime<Utc>) -> PassSummary {
        let clock = LogicalClock::starting_at(now);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for id in ids {
            let this = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = this.reconcile(&id, clock.now()).await;
                if let Err(e) = &result {
                    tracing::error!(proof_id = %id, error = %e, "reconciliation failed");
                }
                result
            });
        }

        let mut summary = PassSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => summary.record(&result),
                Err(e) => {
                    tracing::error!(error = %e, "reconciliation task panicked");
                    summary.errors += 1;
                }
            }
        }
        summary
    }

    /// Scan for due records and reconcile up to `batch_size` of them.
    pub async fn run_pass(self: &Arc<Self>, now: DateTime<Utc>) -> Result<PassSummary, StoreError> {
        let ids = self
            .store
            .list_eligible_for_reconciliation(now, self.config.batch_size)
            .await?;
        if ids.is_empty() {
            return Ok(PassSummary::default());
        }
        let summary = self.reconcile_many(ids, now).await;
        tracing::debug!(?summary, "reconciliation pass complete");
        Ok(summary)
    }

    /// Start the background loop. It runs until `shutdown` flips to `true`
    /// or its sender is dropped; attempts still in flight are abandoned.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> (ReconcilerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let task = tokio::spawn(self.run(rx, shutdown));
        (ReconcilerHandle { tx }, task)
    }

    async fn run(self: Arc<Self>, mut queue: mpsc::Receiver<ProofId>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            concurrency = self.config.concurrency,
            max_attempts = self.config.backoff.max_attempts,
            "verifier reconciler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            let queued = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                Some(id) = queue.recv() => {
                    let mut ids = vec![id];
                    while ids.len() < self.config.batch_size.max(1) {
                        match queue.try_recv() {
                            Ok(id) => ids.push(id),
                            Err(_) => break,
                        }
                    }
                    Some(ids)
                }
                _ = ticker.tick() => None,
            };

            let now = Utc::now();
            let work = async {
                match queued {
                    Some(ids) => Ok(self.reconcile_many(ids, now).await),
                    None => self.run_pass(now).await,
                }
            };
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = work => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "failed to list records for reconciliation");
                    }
                }
            }
        }
        tracing::info!("verifier reconciler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proofrelay_core::{ProofEnvelope, SizeMetrics, VerifierStatus};
    use proofrelay_state::InMemoryProofStore;
    use proofrelay_verifier_client::TerminalVerifierError;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct Scripted {
        verdicts: Mutex<VecDeque<VerifierVerdict>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(verdicts: Vec<VerifierVerdict>) -> Arc<Self> {
            Arc::new(Self {
                verdicts: Mutex::new(verdicts.into()),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl ExternalVerifier for Scripted {
        async fn submit(&self, _envelope: &ProofEnvelope) -> VerifierVerdict {
            *self.calls.lock() += 1;
            self.verdicts
                .lock()
                .pop_front()
                .unwrap_or(VerifierVerdict::Transient(TransientVerifierError::Transport("script exhausted".into())))
        }
    }

    #[derive(Debug)]
    struct Hangs;

    /// Accepts every proof after a fixed delay.
    #[derive(Debug)]
    struct Slow(Duration);

    #[async_trait]
    impl ExternalVerifier for Slow {
        async fn submit(&self, _envelope: &ProofEnvelope) -> VerifierVerdict {
            tokio::time::sleep(self.0).await;
            accepted()
        }
    }

    #[async_trait]
    impl ExternalVerifier for Hangs {
        async fn submit(&self, _envelope: &ProofEnvelope) -> VerifierVerdict {
            std::future::pending::<VerifierVerdict>().await
        }
    }

    fn accepted() -> VerifierVerdict {
        VerifierVerdict::Accepted {
            message: "ok".into(),
        }
    }

    fn transient() -> VerifierVerdict {
        VerifierVerdict::Transient(TransientVerifierError::Status {
            status: 503,
            body: "busy".into(),
        })
    }

    fn config() -> ReconcilerConfig {
        ReconcilerConfig {
            backoff: BackoffPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(100),
                multiplier: 2.0,
                max_delay: Duration::from_secs(10),
            },
            attempt_timeout: Duration::from_millis(200),
            ..ReconcilerConfig::default()
        }
    }

    async fn seeded_store(id: &str) -> Arc<InMemoryProofStore> {
        let store = Arc::new(InMemoryProofStore::new());
        let envelope = ProofEnvelope {
            id: ProofId::new(id).unwrap(),
            chain: "starknet".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
            payload: serde_json::Map::new(),
            signature: "c2ln".into(),
        };
        let metrics = SizeMetrics::of(&envelope).unwrap();
        store
            .create(ProofRecord::new_pending(envelope, metrics, Utc::now()))
            .await
            .unwrap();
        store
    }

    fn pid(s: &str) -> ProofId {
        ProofId::new(s).unwrap()
    }

    #[tokio::test]
    async fn accepted_verdict_verifies() {
        let store = seeded_store("p1").await;
        let rec = VerifierReconciler::new(store.clone(), Scripted::new(vec![accepted()]), config());
        let now = Utc::now();
        assert_eq!(rec.reconcile(&pid("p1"), now).await.unwrap(), ReconcileOutcome::Verified);

        let r = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
        assert_eq!(r.verifier_status, VerifierStatus::Verified);
        assert_eq!(r.attempts, 1);
        assert_eq!(r.last_attempt_at, Some(now));
        assert!(r.verified_at.unwrap() >= now);
        assert_eq!(r.verifier_message.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn rejection_fails_without_retry() {
        let store = seeded_store("p1").await;
        let verifier = Scripted::new(vec![VerifierVerdict::Rejected(TerminalVerifierError::Status {
            status: 400,
            body: "bad".into(),
        })]);
        let rec = VerifierReconciler::new(store.clone(), verifier.clone(), config());
        let now = Utc::now();
        assert_eq!(rec.reconcile(&pid("p1"), now).await.unwrap(), ReconcileOutcome::Failed);
        assert_eq!(
            rec.reconcile(&pid("p1"), now + chrono::Duration::hours(1)).await.unwrap(),
            ReconcileOutcome::Skipped(SkipReason::Terminal)
        );
        assert_eq!(*verifier.calls.lock(), 1);
    }

    #[tokio::test]
    async fn transient_reschedules_with_backoff() {
        let store = seeded_store("p1").await;
        let rec = VerifierReconciler::new(store.clone(), Scripted::new(vec![transient()]), config());
        let now = Utc::now();
        let ReconcileOutcome::Rescheduled(next) = rec.reconcile(&pid("p1"), now).await.unwrap() else {
            panic!("expected a reschedule");
        };
        assert!(next >= now + chrono::Duration::milliseconds(100));
        assert!(next < now + chrono::Duration::seconds(1));
        let r = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
        assert_eq!(r.verifier_status, VerifierStatus::Submitted);
        assert_eq!(r.next_attempt_at, Some(next));

        // Not due until the delay elapses.
        assert_eq!(
            rec.reconcile(&pid("p1"), now + chrono::Duration::milliseconds(50)).await.unwrap(),
            ReconcileOutcome::Skipped(SkipReason::NotDue)
        );
    }

    #[tokio::test]
    async fn hanging_verifier_is_bounded_by_timeout() {
        let store = seeded_store("p1").await;
        let rec = VerifierReconciler::new(store.clone(), Arc::new(Hangs), config());
        let outcome = rec.reconcile(&pid("p1"), Utc::now()).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Rescheduled(_)));
        let r = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
        assert!(r.verifier_message.unwrap().contains("200 ms"));
    }

    #[test]
    fn dispatch_lease_outlasts_the_verifier_call() {
        let rec = VerifierReconciler::new(
            Arc::new(InMemoryProofStore::new()),
            Scripted::new(vec![]),
            config(),
        );
        let now = Utc::now();
        // 100 ms backoff is shorter than the 200 ms call bound plus margin.
        assert_eq!(rec.lease_until(1, now), now + chrono::Duration::milliseconds(1200));
        // At attempt 10 the capped 10 s backoff is the longer of the two.
        assert_eq!(rec.lease_until(10, now), now + chrono::Duration::seconds(10));
    }

    #[tokio::test]
    async fn dispatched_record_is_not_due_while_the_call_runs() {
        let store = seeded_store("p1").await;
        let rec = Arc::new(VerifierReconciler::new(
            store.clone(),
            Arc::new(Slow(Duration::from_millis(100))),
            config(),
        ));
        let now = Utc::now();
        let task = {
            let rec = Arc::clone(&rec);
            tokio::spawn(async move { rec.reconcile(&pid("p1"), now).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        let r = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
        assert_eq!(r.verifier_status, VerifierStatus::Submitted);
        assert!(r.next_attempt_at.unwrap() >= now + chrono::Duration::milliseconds(200));
        assert!(!r.is_due(now + chrono::Duration::milliseconds(500)));

        assert_eq!(task.await.unwrap().unwrap(), ReconcileOutcome::Verified);
    }

    #[tokio::test]
    async fn verdict_is_stamped_when_the_verifier_answers() {
        let store = seeded_store("p1").await;
        let rec = VerifierReconciler::new(store.clone(), Arc::new(Slow(Duration::from_millis(50))), config());
        let now = Utc::now();
        assert_eq!(rec.reconcile(&pid("p1"), now).await.unwrap(), ReconcileOutcome::Verified);

        let r = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
        let started = r.last_attempt_at.unwrap();
        let verified = r.verified_at.unwrap();
        assert_eq!(started, now);
        assert!(verified >= started + chrono::Duration::milliseconds(50), "{started} -> {verified}");
    }

    #[tokio::test]
    async fn queued_attempt_starts_when_its_permit_is_granted() {
        let store = seeded_store("p1").await;
        let envelope = ProofEnvelope {
            id: pid("p2"),
            chain: "starknet".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
            payload: serde_json::Map::new(),
            signature: "c2ln".into(),
        };
        let metrics = SizeMetrics::of(&envelope).unwrap();
        store
            .create(ProofRecord::new_pending(envelope, metrics, Utc::now()))
            .await
            .unwrap();
        let rec = Arc::new(VerifierReconciler::new(
            store.clone(),
            Arc::new(Slow(Duration::from_millis(50))),
            ReconcilerConfig {
                concurrency: 1,
                ..config()
            },
        ));

        let summary = rec.reconcile_many(vec![pid("p1"), pid("p2")], Utc::now()).await;
        assert_eq!(summary.verified, 2);

        let a = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
        let b = store.get_by_id(&pid("p2")).await.unwrap().unwrap();
        let (first, second) = if a.last_attempt_at <= b.last_attempt_at { (a, b) } else { (b, a) };
        assert!(second.last_attempt_at.unwrap() >= first.verified_at.unwrap());
    }

    #[tokio::test]
    async fn in_flight_id_is_skipped() {
        let store = seeded_store("p1").await;
        let rec = VerifierReconciler::new(store, Scripted::new(vec![accepted()]), config());
        let _held = InFlightGuard::claim(&rec.in_flight, &pid("p1")).unwrap();
        assert_eq!(
            rec.reconcile(&pid("p1"), Utc::now()).await.unwrap(),
            ReconcileOutcome::Skipped(SkipReason::InFlight)
        );
    }

    #[tokio::test]
    async fn in_flight_guard_releases_on_drop() {
        let set = Arc::new(Mutex::new(HashSet::new()));
        {
            let _g = InFlightGuard::claim(&set, &pid("x")).unwrap();
            assert!(InFlightGuard::claim(&set, &pid("x")).is_none());
        }
        assert!(InFlightGuard::claim(&set, &pid("x")).is_some());
    }

    #[tokio::test]
    async fn unknown_id_is_skipped() {
        let store = Arc::new(InMemoryProofStore::new());
        let rec = VerifierReconciler::new(store, Scripted::new(vec![]), config());
        assert_eq!(
            rec.reconcile(&pid("ghost"), Utc::now()).await.unwrap(),
            ReconcileOutcome::Skipped(SkipReason::NotFound)
        );
    }

    #[tokio::test]
    async fn spawned_loop_reconciles_enqueued_ids_and_stops() {
        let store = seeded_store("p1").await;
        let rec = Arc::new(VerifierReconciler::new(
            store.clone(),
            Scripted::new(vec![accepted()]),
            ReconcilerConfig {
                poll_interval: Duration::from_secs(3600),
                ..config()
            },
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) = rec.spawn(shutdown_rx);
        assert!(handle.enqueue(pid("p1")));

        for _ in 0..100 {
            let r = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
            if r.verifier_status == VerifierStatus::Verified {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let r = store.get_by_id(&pid("p1")).await.unwrap().unwrap();
        assert_eq!(r.verifier_status, VerifierStatus::Verified);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}
