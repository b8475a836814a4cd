//! Price tracking provider.
//!
//! Asks the shopping backend whether the current page shows a trackable
//! product. The backend can be arbitrarily slow, so the query runs on a
//! spawned task; a reply belonging to a superseded request (a newer
//! `compute_signal` bumped the generation) is dropped without reporting —
//! the old cycle's slot then degrades to `false` at the timeout, which is
//! exactly the contract for a reply that arrived too late to matter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use cpa_core::{ActionProvider, ActionType, PageContext, SignalReporter};

use crate::has_web_scheme;

// ---------------------------------------------------------------------------
// ShoppingBackend
// ---------------------------------------------------------------------------

/// Domain boundary: the actual price lookup lives elsewhere.
pub trait ShoppingBackend: Send + Sync {
    fn is_price_trackable(&self, url: &str) -> BoxFuture<'static, bool>;
}

// ---------------------------------------------------------------------------
// PriceTrackingProvider
// ---------------------------------------------------------------------------

pub struct PriceTrackingProvider {
    backend: Arc<dyn ShoppingBackend>,
    /// Generation of the most recent `compute_signal`; older replies are
    /// superseded and must not report.
    latest: Arc<AtomicU64>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PriceTrackingProvider {
    pub fn new(backend: Arc<dyn ShoppingBackend>) -> Self {
        PriceTrackingProvider {
            backend,
            latest: Arc::new(AtomicU64::new(0)),
            tasks: Mutex::new(Vec::new()),
        }
    }
}

impl ActionProvider for PriceTrackingProvider {
    fn compute_signal(&self, page: Arc<dyn PageContext>, reporter: SignalReporter) {
        let url = page.url();
        if !has_web_scheme(&url) {
            trace!(url, "non-web scheme; price tracking not applicable");
            reporter.set(false);
            reporter.ready();
            return;
        }

        self.latest.store(reporter.generation(), Ordering::SeqCst);
        let latest = Arc::clone(&self.latest);
        let query = self.backend.is_price_trackable(&url);

        let handle = tokio::spawn(async move {
            let trackable = query.await;
            if latest.load(Ordering::SeqCst) != reporter.generation() {
                debug!(
                    generation = reporter.generation(),
                    "superseded price tracking reply dropped"
                );
                return;
            }
            reporter.set(trackable);
            reporter.ready();
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        // Providers outlive page views; reap finished queries so the handle
        // list stays bounded across navigations.
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    fn on_action_chosen(&self, page: &dyn PageContext, chosen: Option<ActionType>) {
        match chosen {
            Some(ActionType::PriceTracking) => {
                debug!(url = page.url(), "price tracking won this page view");
            }
            Some(other) => trace!(%other, "price tracking lost"),
            None => trace!("no contextual action won"),
        }
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
