//! Tab grouping provider.
//!
//! Purely local heuristic: suggest grouping once enough ungrouped tabs have
//! piled up. No async work at all — this is the provider that exercises the
//! synchronous completion path of the accumulator contract.

use std::sync::Arc;

use tracing::trace;

use cpa_core::{ActionProvider, PageContext, SignalReporter};

/// Host boundary onto the tab strip.
pub trait TabModel: Send + Sync {
    /// Number of open tabs not currently in any group.
    fn ungrouped_tab_count(&self) -> usize;
}

pub const DEFAULT_MIN_TABS: usize = 3;

pub struct TabGroupingProvider {
    tabs: Arc<dyn TabModel>,
    min_tabs: usize,
}

impl TabGroupingProvider {
    pub fn new(tabs: Arc<dyn TabModel>) -> Self {
        Self::with_min_tabs(tabs, DEFAULT_MIN_TABS)
    }

    pub fn with_min_tabs(tabs: Arc<dyn TabModel>, min_tabs: usize) -> Self {
        TabGroupingProvider { tabs, min_tabs }
    }
}

impl ActionProvider for TabGroupingProvider {
    fn compute_signal(&self, _page: Arc<dyn PageContext>, reporter: SignalReporter) {
        let count = self.tabs.ungrouped_tab_count();
        trace!(count, min = self.min_tabs, "tab grouping heuristic");
        reporter.set(count >= self.min_tabs);
        reporter.ready();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
