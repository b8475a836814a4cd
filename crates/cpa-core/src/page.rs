//! Page/context source boundary.
//!
//! The orchestrator never talks to a real browser page; it queries this trait
//! synchronously for eligibility and identity, and receives lifecycle events
//! (`PageEvent`) from the host. Hosts adapt their page abstraction to
//! `PageContext`; tests and simple embedders can use [`PageHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::PageId;

// ---------------------------------------------------------------------------
// PageContext
// ---------------------------------------------------------------------------

/// Synchronous view of the currently displayed page.
///
/// All accessors must be cheap and non-blocking; the orchestrator calls them
/// on its own context, including from spawned cycle tasks.
pub trait PageContext: Send + Sync {
    /// Stable identity of this page view. Used for staleness checks.
    fn id(&self) -> PageId;

    /// Last committed address of the page.
    fn url(&self) -> String;

    /// Incognito/private contexts never get contextual actions.
    fn is_private(&self) -> bool;

    /// `true` once the page has been torn down.
    fn is_destroyed(&self) -> bool;

    /// `true` while a navigation is still in flight.
    fn is_loading(&self) -> bool;

    /// A page qualifies for a collection cycle only when it is a live,
    /// non-private, settled page.
    fn is_eligible(&self) -> bool {
        !self.is_private() && !self.is_destroyed() && !self.is_loading()
    }
}

// ---------------------------------------------------------------------------
// PageHandle
// ---------------------------------------------------------------------------

/// In-memory `PageContext` implementation.
///
/// Cheap to clone (shared state), with setters so the owning host can flip
/// lifecycle flags as the underlying page changes.
#[derive(Clone)]
pub struct PageHandle {
    id: PageId,
    url: Arc<str>,
    private: bool,
    destroyed: Arc<AtomicBool>,
    loading: Arc<AtomicBool>,
}

impl PageHandle {
    pub fn new(url: impl Into<String>) -> Self {
        PageHandle {
            id: PageId::new(),
            url: url.into().into(),
            private: false,
            destroyed: Arc::new(AtomicBool::new(false)),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn new_private(url: impl Into<String>) -> Self {
        PageHandle {
            private: true,
            ..PageHandle::new(url)
        }
    }

    pub fn set_destroyed(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }
}

impl PageContext for PageHandle {
    fn id(&self) -> PageId {
        self.id
    }

    fn url(&self) -> String {
        self.url.to_string()
    }

    fn is_private(&self) -> bool {
        self.private
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}
