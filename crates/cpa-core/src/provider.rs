//! Provider contract and registry.
//!
//! An [`ActionProvider`] is an independent asynchronous source of one boolean
//! signal. The only hard obligation is that `compute_signal` reports back —
//! `reporter.set(..)` then `reporter.ready()` — on every control path,
//! including early-exit guards. A provider that never reports degrades to
//! `false` at the accumulator timeout; it must never hang the cycle.

use std::sync::Arc;

use tracing::debug;

use crate::accumulator::SignalReporter;
use crate::page::PageContext;
use crate::types::ActionType;

// ---------------------------------------------------------------------------
// ActionProvider
// ---------------------------------------------------------------------------

/// Capability interface for one contextual action backend.
///
/// `compute_signal` may finish synchronously or hand the reporter to its own
/// spawned task and return immediately; the accumulator imposes no ordering
/// between providers. `on_action_chosen` and `dispose` are optional hooks
/// with default no-ops.
pub trait ActionProvider: Send + Sync {
    /// Compute whether this provider's action applies to `page`, reporting
    /// the result through `reporter`. Must terminate in
    /// `reporter.set(..); reporter.ready()` on every path.
    fn compute_signal(&self, page: Arc<dyn PageContext>, reporter: SignalReporter);

    /// Called once per cycle after the winner is picked, on winners and
    /// losers alike. `chosen` is `None` when no action won.
    fn on_action_chosen(&self, page: &dyn PageContext, chosen: Option<ActionType>) {
        let _ = (page, chosen);
    }

    /// Retire the provider: cancel outstanding async work so no further
    /// reports reach a finished accumulator. Must be idempotent.
    fn dispose(&self) {}
}

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

/// Ordered set of active providers, one per action type.
///
/// Shared across cycles; rebuilt — old providers disposed first — only
/// between cycles, never while one is collecting. Each cycle takes a
/// [`snapshot`](ProviderRegistry::snapshot) so a rebuild cannot change the
/// set an in-flight accumulator fanned out to.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<(ActionType, Arc<dyn ActionProvider>)>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<(ActionType, Arc<dyn ActionProvider>)>) -> Self {
        ProviderRegistry { providers }
    }

    /// Replace the active provider set. Every old provider is disposed
    /// exactly once before any new provider is installed.
    pub fn rebuild(&mut self, new: Vec<(ActionType, Arc<dyn ActionProvider>)>) {
        debug!(old = self.providers.len(), new = new.len(), "rebuilding provider registry");
        for (_, provider) in self.providers.drain(..) {
            provider.dispose();
        }
        self.providers = new;
    }

    /// Clone the provider list for one collection cycle.
    pub fn snapshot(&self) -> Vec<(ActionType, Arc<dyn ActionProvider>)> {
        self.providers.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
