//! Per-cycle signal accumulator.
//!
//! One accumulator serves exactly one collection cycle: it fans
//! `compute_signal` out to every provider, arms a one-shot timeout, and
//! delivers a single completion — over a `tokio::sync::oneshot` — once every
//! signal slot is set or the timer fires, whichever comes first.
//!
//! The race is deliberately asymmetric. Fast path: every provider reports
//! before the timer and completion fires on the last `ready()`. Slow path:
//! the timer fires and any slot still unset reads as `false`. A provider that
//! both races the timer and later reports again cannot cause a second
//! completion: the `fired` flag and the oneshot sender live under one mutex
//! and the sender is taken exactly once.
//!
//! Late writes are deliberately not rejected: a provider reporting after
//! completion still gets its value stored and visible to late readers, even
//! though the decision already ran with the stale/default value.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::page::PageContext;
use crate::provider::ActionProvider;
use crate::signals::SignalSet;
use crate::types::ActionType;

// ---------------------------------------------------------------------------
// SignalAccumulator
// ---------------------------------------------------------------------------

struct Inner {
    signals: SignalSet,
    fired: bool,
    timed_out: bool,
    done: Option<oneshot::Sender<()>>,
    timer: Option<JoinHandle<()>>,
}

/// Collects provider signals for one cycle and fires completion exactly once.
pub struct SignalAccumulator {
    page: Arc<dyn PageContext>,
    generation: u64,
    inner: Mutex<Inner>,
}

impl SignalAccumulator {
    /// Fan out to `providers` and arm the timeout.
    ///
    /// Returns the shared accumulator and the completion receiver. Each
    /// provider receives its own [`SignalReporter`]; provider calls carry no
    /// ordering guarantee relative to each other, and `start` does not wait
    /// for any of them — it returns as soon as the fan-out and timer are in
    /// place.
    ///
    /// Callers are expected not to start an accumulator for an empty
    /// provider list (the orchestrator skips the cycle instead); an empty
    /// list here would only ever complete via the timeout.
    pub fn start(
        page: Arc<dyn PageContext>,
        generation: u64,
        providers: &[(ActionType, Arc<dyn ActionProvider>)],
        timeout: Duration,
    ) -> (Arc<Self>, oneshot::Receiver<()>) {
        let (done_tx, done_rx) = oneshot::channel();
        let accumulator = Arc::new(SignalAccumulator {
            page,
            generation,
            inner: Mutex::new(Inner {
                signals: SignalSet::new(providers.iter().map(|(a, _)| *a)),
                fired: false,
                timed_out: false,
                done: Some(done_tx),
                timer: None,
            }),
        });

        debug!(
            generation,
            providers = providers.len(),
            timeout_ms = timeout.as_millis() as u64,
            "starting signal collection"
        );
        for (action, provider) in providers {
            let reporter = SignalReporter {
                accumulator: Arc::clone(&accumulator),
                action: *action,
            };
            provider.compute_signal(Arc::clone(&accumulator.page), reporter);
        }

        // Every provider may have reported synchronously during fan-out, in
        // which case completion already fired and there is nothing to race.
        if !accumulator.lock().fired {
            let timer_owner = Arc::clone(&accumulator);
            // Anchor the deadline now, not at the timer task's first poll,
            // so executor scheduling cannot stretch the budget.
            let deadline = tokio::time::Instant::now() + timeout;
            let timer = tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                timer_owner.try_complete(true);
            });
            let mut inner = accumulator.lock();
            if inner.fired {
                timer.abort();
            } else {
                inner.timer = Some(timer);
            }
        }

        (accumulator, done_rx)
    }

    /// Store a signal value. Idempotent; never triggers completion by
    /// itself, and keeps working after completion (late values stay visible
    /// to late readers).
    pub fn set_signal(&self, action: ActionType, value: bool) {
        trace!(%action, value, generation = self.generation, "signal reported");
        self.lock().signals.set(action, value);
    }

    /// Re-check completion. Called by providers after `set_signal`; a silent
    /// no-op once completion has fired.
    pub fn notify_ready(&self) {
        self.try_complete(false);
    }

    /// Whether the timeout branch (rather than a full signal set) triggered
    /// completion. Providers use this to treat a late reply differently.
    pub fn timed_out(&self) -> bool {
        self.lock().timed_out
    }

    /// Current value for `action`, defaulting unset to `false`. Valid before
    /// and after completion.
    pub fn signal(&self, action: ActionType) -> bool {
        self.lock().signals.get(action)
    }

    /// Snapshot of the signal set, for feature-vector building.
    pub fn signals(&self) -> SignalSet {
        self.lock().signals.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page(&self) -> &Arc<dyn PageContext> {
        &self.page
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Single completion gate for both the timer and `notify_ready`.
    ///
    /// `fired` and the oneshot sender are mutated under one lock, so the
    /// completion can be delivered at most once; the send happens after the
    /// lock is released.
    fn try_complete(&self, from_timer: bool) {
        let sender = {
            let mut inner = self.lock();
            if inner.fired {
                return;
            }
            if from_timer {
                inner.timed_out = true;
            }
            if !inner.timed_out && !inner.signals.is_complete() {
                return;
            }
            inner.fired = true;
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.done.take()
        };
        if let Some(tx) = sender {
            debug!(
                generation = self.generation,
                timed_out = from_timer,
                "signal collection complete"
            );
            let _ = tx.send(());
        }
    }
}

impl Drop for SignalAccumulator {
    fn drop(&mut self) {
        // The cycle is over; a still-armed timer has nothing left to do.
        if let Some(timer) = self.lock().timer.take() {
            timer.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// SignalReporter
// ---------------------------------------------------------------------------

/// Per-provider handle into one accumulator cycle.
///
/// Cheap to clone into a provider's spawned task. Reporting into a finished
/// cycle is harmless: values are stored for late readers but completion never
/// fires twice.
#[derive(Clone)]
pub struct SignalReporter {
    accumulator: Arc<SignalAccumulator>,
    action: ActionType,
}

impl SignalReporter {
    /// Store this provider's signal value. Must be followed by
    /// [`ready`](SignalReporter::ready); setting alone never triggers
    /// evaluation.
    pub fn set(&self, value: bool) {
        self.accumulator.set_signal(self.action, value);
    }

    /// Request a completion re-check after one or more `set` calls.
    pub fn ready(&self) {
        self.accumulator.notify_ready();
    }

    /// Whether the cycle already completed via timeout — i.e. this
    /// provider's reply (if it is about to report) arrived too late to
    /// matter for selection.
    pub fn timed_out(&self) -> bool {
        self.accumulator.timed_out()
    }

    /// The cycle generation this reporter belongs to. Providers that keep
    /// long-lived subscriptions compare generations to drop superseded
    /// replies.
    pub fn generation(&self) -> u64 {
        self.accumulator.generation()
    }

    pub fn action(&self) -> ActionType {
        self.action
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageHandle;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(100);

    /// Provider that reports a fixed value synchronously, or never reports
    /// at all when `value` is `None`.
    struct FixedProvider {
        value: Option<bool>,
    }

    impl ActionProvider for FixedProvider {
        fn compute_signal(&self, _page: Arc<dyn PageContext>, reporter: SignalReporter) {
            if let Some(value) = self.value {
                reporter.set(value);
                reporter.ready();
            }
        }
    }

    fn fixed(value: Option<bool>) -> Arc<dyn ActionProvider> {
        Arc::new(FixedProvider { value })
    }

    /// Provider that holds its reporter and reports only when told to.
    #[derive(Default)]
    struct HeldProvider {
        reporter: std::sync::Mutex<Option<SignalReporter>>,
    }

    impl HeldProvider {
        fn report(&self, value: bool) {
            let reporter = self
                .reporter
                .lock()
                .unwrap()
                .clone()
                .expect("compute_signal not called");
            reporter.set(value);
            reporter.ready();
        }
    }

    impl ActionProvider for HeldProvider {
        fn compute_signal(&self, _page: Arc<dyn PageContext>, reporter: SignalReporter) {
            *self.reporter.lock().unwrap() = Some(reporter);
        }
    }

    fn page() -> Arc<dyn PageContext> {
        Arc::new(PageHandle::new("https://example.com/product"))
    }

    fn four_fast_providers() -> Vec<(ActionType, Arc<dyn ActionProvider>)> {
        vec![
            (ActionType::PriceTracking, fixed(Some(true))),
            (ActionType::ReaderMode, fixed(Some(true))),
            (ActionType::PriceInsights, fixed(Some(true))),
            (ActionType::Discounts, fixed(Some(true))),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn all_fast_providers_complete_without_timeout() {
        let (acc, mut done) = SignalAccumulator::start(page(), 1, &four_fast_providers(), TIMEOUT);

        // Everything reported synchronously during fan-out; completion is
        // already delivered — no time advance needed.
        done.try_recv().expect("completion should have fired");
        assert!(!acc.timed_out());
        for (action, _) in four_fast_providers() {
            assert!(acc.signal(action));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn silent_provider_defaults_false_at_timeout() {
        let providers = vec![
            (ActionType::PriceTracking, fixed(Some(true))),
            (ActionType::ReaderMode, fixed(Some(false))),
            (ActionType::Discounts, fixed(None)), // never reports
        ];
        let (acc, done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        done.await.expect("completion fires via timer");
        assert!(acc.timed_out());
        assert!(acc.signal(ActionType::PriceTracking));
        assert!(!acc.signal(ActionType::ReaderMode));
        assert!(!acc.signal(ActionType::Discounts));
    }

    #[tokio::test(start_paused = true)]
    async fn no_provider_reports_all_false_at_timeout() {
        let providers = vec![
            (ActionType::PriceTracking, fixed(None)),
            (ActionType::TabGrouping, fixed(None)),
        ];
        let (acc, done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        done.await.expect("completion fires via timer");
        assert!(acc.timed_out());
        assert!(!acc.signal(ActionType::PriceTracking));
        assert!(!acc.signal(ActionType::TabGrouping));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_fires_on_last_ready_not_on_timer() {
        let held = Arc::new(HeldProvider::default());
        let providers: Vec<(ActionType, Arc<dyn ActionProvider>)> = vec![
            (ActionType::PriceTracking, fixed(Some(true))),
            (ActionType::ReaderMode, held.clone()),
        ];
        let (acc, mut done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        // One slot still unset: no completion yet.
        assert!(done.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(10)).await;
        held.report(true);

        done.try_recv().expect("last ready completes the cycle");
        assert!(!acc.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn late_report_after_completion_is_stored_but_fires_nothing() {
        let held = Arc::new(HeldProvider::default());
        let providers: Vec<(ActionType, Arc<dyn ActionProvider>)> =
            vec![(ActionType::PriceTracking, held.clone())];
        let (acc, mut done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        held.report(true);
        done.try_recv().expect("completion fired once");
        assert!(acc.signal(ActionType::PriceTracking));

        // Post-completion re-report: value flips for late readers, but the
        // oneshot is spent and the fired flag holds, so nothing else happens.
        held.report(false);
        assert!(!acc.signal(ActionType::PriceTracking));
        assert!(!acc.timed_out());
        acc.notify_ready();
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fire_after_completion_is_a_noop() {
        let held = Arc::new(HeldProvider::default());
        let providers: Vec<(ActionType, Arc<dyn ActionProvider>)> =
            vec![(ActionType::Discounts, held.clone())];
        let (acc, done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        held.report(true);
        done.await.expect("fast-path completion");

        // Let the timer deadline pass; the armed timer was aborted and the
        // timeout branch must not retroactively flip `timed_out`.
        tokio::time::advance(TIMEOUT * 2).await;
        tokio::task::yield_now().await;
        assert!(!acc.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn ready_without_set_leaves_slot_unset_until_timeout() {
        struct ReadyOnly;
        impl ActionProvider for ReadyOnly {
            fn compute_signal(&self, _page: Arc<dyn PageContext>, reporter: SignalReporter) {
                // Provider bug tolerance: ready() with no set() is legal.
                reporter.ready();
            }
        }
        let providers: Vec<(ActionType, Arc<dyn ActionProvider>)> =
            vec![(ActionType::ReaderMode, Arc::new(ReadyOnly))];
        let (acc, done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        done.await.expect("completion fires via timer");
        assert!(acc.timed_out());
        assert!(!acc.signal(ActionType::ReaderMode));
    }

    #[tokio::test(start_paused = true)]
    async fn set_without_ready_never_completes_early() {
        struct SetOnly;
        impl ActionProvider for SetOnly {
            fn compute_signal(&self, _page: Arc<dyn PageContext>, reporter: SignalReporter) {
                reporter.set(true);
                // Missing ready(): setting alone never triggers evaluation.
            }
        }
        let providers: Vec<(ActionType, Arc<dyn ActionProvider>)> =
            vec![(ActionType::PriceInsights, Arc::new(SetOnly))];
        let (acc, mut done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        assert!(done.try_recv().is_err());
        done.await.expect("only the timer completes this cycle");
        assert!(acc.timed_out());
        // The value itself was stored and is visible.
        assert!(acc.signal(ActionType::PriceInsights));
    }

    #[tokio::test(start_paused = true)]
    async fn multiple_sets_before_ready_last_write_wins() {
        struct Flapping;
        impl ActionProvider for Flapping {
            fn compute_signal(&self, _page: Arc<dyn PageContext>, reporter: SignalReporter) {
                reporter.set(true);
                reporter.set(false);
                reporter.set(true);
                reporter.ready();
            }
        }
        let providers: Vec<(ActionType, Arc<dyn ActionProvider>)> =
            vec![(ActionType::Discounts, Arc::new(Flapping))];
        let (acc, done) = SignalAccumulator::start(page(), 1, &providers, TIMEOUT);

        done.await.expect("completion");
        assert!(acc.signal(ActionType::Discounts));
        assert!(!acc.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_exposes_cycle_generation() {
        let held = Arc::new(HeldProvider::default());
        let providers: Vec<(ActionType, Arc<dyn ActionProvider>)> =
            vec![(ActionType::TabGrouping, held.clone())];
        let (_acc, _done) = SignalAccumulator::start(page(), 7, &providers, TIMEOUT);

        let reporter = held.reporter.lock().unwrap().clone().unwrap();
        assert_eq!(reporter.generation(), 7);
        assert_eq!(reporter.action(), ActionType::TabGrouping);
    }
}
