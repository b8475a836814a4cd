//! Discounts provider.
//!
//! Fetches the discounts available for the current page; the signal is
//! simply "any discount exists". The fetch is useful even when it loses the
//! timer race: a reply arriving after the accumulator timed out is still
//! written to the provider's cache (and to the accumulator, where late
//! readers can see it) so the discounts are on hand the next time the UI
//! asks — the selection for this page view just proceeded without them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use cpa_core::{ActionProvider, ActionType, PageContext, SignalReporter};

use crate::has_web_scheme;

// ---------------------------------------------------------------------------
// DiscountsBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Discount {
    pub code: String,
    pub description: String,
}

pub trait DiscountsBackend: Send + Sync {
    fn fetch_discounts(&self, url: &str) -> BoxFuture<'static, Vec<Discount>>;
}

// ---------------------------------------------------------------------------
// DiscountsProvider
// ---------------------------------------------------------------------------

pub struct DiscountsProvider {
    backend: Arc<dyn DiscountsBackend>,
    cache: Arc<Mutex<HashMap<String, Vec<Discount>>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DiscountsProvider {
    pub fn new(backend: Arc<dyn DiscountsBackend>) -> Self {
        DiscountsProvider {
            backend,
            cache: Arc::new(Mutex::new(HashMap::new())),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Discounts fetched for `url` so far, if any. Populated even by replies
    /// that arrived after the cycle timed out.
    pub fn cached_discounts(&self, url: &str) -> Option<Vec<Discount>> {
        self.lock_cache().get(url).cloned()
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, Vec<Discount>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ActionProvider for DiscountsProvider {
    fn compute_signal(&self, page: Arc<dyn PageContext>, reporter: SignalReporter) {
        let url = page.url();
        if !has_web_scheme(&url) {
            reporter.set(false);
            reporter.ready();
            return;
        }

        let fetch = self.backend.fetch_discounts(&url);
        let cache = Arc::clone(&self.cache);
        let handle = tokio::spawn(async move {
            let discounts = fetch.await;
            if reporter.timed_out() {
                debug!(
                    url,
                    count = discounts.len(),
                    "discounts arrived after timeout; caching for later"
                );
            } else {
                trace!(url, count = discounts.len(), "discounts fetched in time");
            }
            cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(url, discounts.clone());
            // Report regardless: in-time replies feed selection, late ones
            // stay visible to late readers.
            reporter.set(!discounts.is_empty());
            reporter.ready();
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    fn on_action_chosen(&self, page: &dyn PageContext, chosen: Option<ActionType>) {
        if chosen == Some(ActionType::Discounts) {
            debug!(url = page.url(), "discounts action won this page view");
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
