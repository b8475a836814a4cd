//! Per-page-view orchestration.
//!
//! The orchestrator owns the active provider set and drives one collection
//! cycle per qualifying page event:
//!
//! ```text
//! Idle → Collecting → Scoring → Dispatched
//! ```
//!
//! `Dispatched` is terminal until the next qualifying event, which restarts
//! at `Collecting`. Each cycle gets a fresh generation number; any event that
//! starts a new cycle makes the previous one stale, and stale results are
//! discarded at the `Scoring → Dispatched` edge — the accumulator itself
//! always runs to completion, it is only the dispatch that is dropped.
//!
//! There are no retries: a scoring call that errors or never resolves leaves
//! this page view without a contextual action, which is always a safe end
//! state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::accumulator::SignalAccumulator;
use crate::config::OrchestratorConfig;
use crate::page::PageContext;
use crate::provider::{ActionProvider, ProviderRegistry};
use crate::scoring::{ActionScorer, ActionSink, FeatureVector, ScoringRequest};
use crate::types::{ActionType, PageEvent, PageId};

// ---------------------------------------------------------------------------
// CycleStage / DispatchedOutcome
// ---------------------------------------------------------------------------

/// Observable stage of the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Idle,
    Collecting,
    Scoring,
    Dispatched,
}

/// The result of the most recent completed dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedOutcome {
    /// The winning action, or `None` for the default/no-action outcome.
    pub action: Option<ActionType>,
    /// The page view the outcome was computed for.
    pub page: PageId,
    pub decided_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct State {
    stage: CycleStage,
    /// Identity of the page the in-flight cycle (if any) belongs to. Cleared
    /// on deactivate/destroy so in-flight results go stale.
    observed_page: Option<PageId>,
    /// Generation of the in-flight (or last) cycle.
    cycle: u64,
    last_outcome: Option<DispatchedOutcome>,
}

/// Drives signal collection, scoring, and dispatch for one owned page slot.
///
/// Methods must be called from within a tokio runtime; cycle follow-ups run
/// on spawned tasks and re-validate against the orchestrator state before
/// touching the sink.
pub struct Orchestrator {
    registry: Mutex<ProviderRegistry>,
    scorer: Arc<dyn ActionScorer>,
    sink: Arc<dyn ActionSink>,
    config: OrchestratorConfig,
    generation: AtomicU64,
    state: Mutex<State>,
}

impl Orchestrator {
    pub fn new(
        registry: ProviderRegistry,
        scorer: Arc<dyn ActionScorer>,
        sink: Arc<dyn ActionSink>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        Arc::new(Orchestrator {
            registry: Mutex::new(registry),
            scorer,
            sink,
            config,
            generation: AtomicU64::new(0),
            state: Mutex::new(State {
                stage: CycleStage::Idle,
                observed_page: None,
                cycle: 0,
                last_outcome: None,
            }),
        })
    }

    /// Replace the active provider set (old providers disposed first).
    ///
    /// Contract: call only between cycles. A rebuild cannot corrupt an
    /// in-flight cycle — it holds its own provider snapshot — but disposed
    /// providers stop reporting, so their slots degrade to `false` at the
    /// timeout.
    pub fn rebuild_providers(&self, new: Vec<(ActionType, Arc<dyn ActionProvider>)>) {
        self.lock_registry().rebuild(new);
    }

    /// Feed one page lifecycle event into the state machine.
    pub fn on_page_event(self: &Arc<Self>, page: Arc<dyn PageContext>, event: PageEvent) {
        trace!(page = %page.id(), ?event, "page event");
        match event {
            PageEvent::FirstMeaningfulPaint | PageEvent::Activated => self.begin_cycle(page),
            PageEvent::Deactivated | PageEvent::Destroyed => {
                let mut state = self.lock_state();
                if state.observed_page == Some(page.id()) {
                    debug!(page = %page.id(), "observed page gone; in-flight results now stale");
                    state.observed_page = None;
                    state.stage = CycleStage::Idle;
                }
            }
        }
    }

    pub fn stage(&self) -> CycleStage {
        self.lock_state().stage
    }

    pub fn last_outcome(&self) -> Option<DispatchedOutcome> {
        self.lock_state().last_outcome.clone()
    }

    // -----------------------------------------------------------------------
    // Cycle driving
    // -----------------------------------------------------------------------

    fn begin_cycle(self: &Arc<Self>, page: Arc<dyn PageContext>) {
        if !page.is_eligible() {
            debug!(page = %page.id(), "page ineligible; dispatching no-action outcome");
            self.sink.show_action(None);
            let mut state = self.lock_state();
            state.stage = CycleStage::Idle;
            state.last_outcome = Some(DispatchedOutcome {
                action: None,
                page: page.id(),
                decided_at: Utc::now(),
            });
            return;
        }

        let providers = self.lock_registry().snapshot();
        if providers.is_empty() {
            debug!("no providers registered; skipping collection");
            return;
        }

        let cycle = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.lock_state();
            state.stage = CycleStage::Collecting;
            state.observed_page = Some(page.id());
            state.cycle = cycle;
        }

        let (accumulator, done) = SignalAccumulator::start(
            Arc::clone(&page),
            cycle,
            &providers,
            self.config.signal_timeout(),
        );

        let this = Arc::clone(self);
        tokio::spawn(async move {
            if done.await.is_err() {
                return;
            }
            this.advance_stage(cycle, CycleStage::Scoring);

            let request = ScoringRequest {
                url: accumulator.page().url(),
                features: FeatureVector::from_signals(&accumulator.signals()),
            };
            let chosen = match this.scorer.score(request).await {
                Ok(chosen) => chosen,
                Err(e) => {
                    debug!(cycle, error = %e, "scoring failed; cycle abandoned");
                    this.advance_stage(cycle, CycleStage::Idle);
                    return;
                }
            };

            if !this.is_current(cycle, accumulator.page().as_ref()) {
                debug!(cycle, "stale scoring result discarded");
                return;
            }

            // Winners and losers alike hear about the choice.
            for (_, provider) in &providers {
                provider.on_action_chosen(accumulator.page().as_ref(), chosen);
            }
            this.sink.show_action(chosen);

            let mut state = this.lock_state();
            state.stage = CycleStage::Dispatched;
            state.last_outcome = Some(DispatchedOutcome {
                action: chosen,
                page: accumulator.page().id(),
                decided_at: Utc::now(),
            });
            debug!(cycle, action = ?chosen, "contextual action dispatched");
        });
    }

    /// The staleness check at the `Scoring → Dispatched` edge: the cycle
    /// must still be the latest one, its page must still be the observed
    /// page, and the page must still be eligible (alive, non-private,
    /// settled).
    fn is_current(&self, cycle: u64, page: &dyn PageContext) -> bool {
        if !page.is_eligible() {
            return false;
        }
        let state = self.lock_state();
        state.cycle == cycle && state.observed_page == Some(page.id())
    }

    fn advance_stage(&self, cycle: u64, stage: CycleStage) {
        let mut state = self.lock_state();
        if state.cycle == cycle {
            state.stage = stage;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registry(&self) -> MutexGuard<'_, ProviderRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
