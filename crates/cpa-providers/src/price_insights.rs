//! Price insights provider.
//!
//! Applicable when the market-data backend has history for the product on
//! the current page. Unlike price tracking there is no cross-request
//! subscription to supersede: every cycle issues a fresh lookup bound to its
//! own reporter, and a late reply simply lands in a finished accumulator.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::trace;

use cpa_core::{ActionProvider, PageContext, SignalReporter};

use crate::has_web_scheme;

// ---------------------------------------------------------------------------
// PriceInsightsBackend
// ---------------------------------------------------------------------------

/// Price history summary for one product page.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceInsights {
    pub has_price_history: bool,
    pub is_price_low: bool,
}

pub trait PriceInsightsBackend: Send + Sync {
    /// `None` when the page is not a known product.
    fn price_insights(&self, url: &str) -> BoxFuture<'static, Option<PriceInsights>>;
}

// ---------------------------------------------------------------------------
// PriceInsightsProvider
// ---------------------------------------------------------------------------

pub struct PriceInsightsProvider {
    backend: Arc<dyn PriceInsightsBackend>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PriceInsightsProvider {
    pub fn new(backend: Arc<dyn PriceInsightsBackend>) -> Self {
        PriceInsightsProvider {
            backend,
            tasks: Mutex::new(Vec::new()),
        }
    }
}

impl ActionProvider for PriceInsightsProvider {
    fn compute_signal(&self, page: Arc<dyn PageContext>, reporter: SignalReporter) {
        let url = page.url();
        if !has_web_scheme(&url) {
            reporter.set(false);
            reporter.ready();
            return;
        }

        let lookup = self.backend.price_insights(&url);
        let handle = tokio::spawn(async move {
            let insights = lookup.await;
            trace!(?insights, "price insights lookup finished");
            reporter.set(insights.map(|i| i.has_price_history).unwrap_or(false));
            reporter.ready();
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    fn dispose(&self) {
        for task in self.tasks.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
