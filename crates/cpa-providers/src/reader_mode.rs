//! Reader mode provider.
//!
//! Distillability is a one-shot determination made elsewhere (the page has
//! to settle before anyone knows whether it distills into an article). The
//! host publishes it through a `watch` channel holding `None` until the
//! verdict lands. This provider reports immediately when the verdict is
//! already known, and otherwise parks a waiter task; a newer
//! `compute_signal` replaces a still-pending waiter, so only the latest
//! request ever reports.

use std::sync::Mutex;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use cpa_core::{ActionProvider, PageContext, SignalReporter};

use crate::has_web_scheme;

pub struct ReaderModeProvider {
    distillability: watch::Receiver<Option<bool>>,
    /// The waiter for the most recent request; replaced (and the old one
    /// aborted) when a newer `compute_signal` supersedes it.
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ReaderModeProvider {
    pub fn new(distillability: watch::Receiver<Option<bool>>) -> Self {
        ReaderModeProvider {
            distillability,
            pending: Mutex::new(None),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ActionProvider for ReaderModeProvider {
    fn compute_signal(&self, page: std::sync::Arc<dyn PageContext>, reporter: SignalReporter) {
        if !has_web_scheme(&page.url()) {
            reporter.set(false);
            reporter.ready();
            return;
        }

        if let Some(verdict) = *self.distillability.borrow() {
            reporter.set(verdict);
            reporter.ready();
            return;
        }

        trace!(url = page.url(), "distillability unknown; waiting for verdict");
        let mut rx = self.distillability.clone();
        let waiter = tokio::spawn(async move {
            loop {
                let current = *rx.borrow_and_update();
                if let Some(verdict) = current {
                    reporter.set(verdict);
                    reporter.ready();
                    return;
                }
                if rx.changed().await.is_err() {
                    // Publisher gone; the verdict will never arrive.
                    reporter.set(false);
                    reporter.ready();
                    return;
                }
            }
        });

        if let Some(old) = self.lock_pending().replace(waiter) {
            trace!("superseding pending distillability waiter");
            old.abort();
        }
    }

    fn dispose(&self) {
        if let Some(waiter) = self.lock_pending().take() {
            waiter.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cpa_core::{ActionType, PageHandle, SignalAccumulator};
    use std::sync::Arc;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn start_cycle(
        provider: Arc<ReaderModeProvider>,
        url: &str,
        generation: u64,
    ) -> (
        Arc<SignalAccumulator>,
        tokio::sync::oneshot::Receiver<()>,
    ) {
        let page: Arc<dyn PageContext> = Arc::new(PageHandle::new(url));
        SignalAccumulator::start(
            page,
            generation,
            &[(ActionType::ReaderMode, provider)],
            TIMEOUT,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn known_verdict_reports_synchronously() {
        let (_tx, rx) = watch::channel(Some(true));
        let provider = Arc::new(ReaderModeProvider::new(rx));
        let (acc, mut done) = start_cycle(provider, "https://example.com/article", 1);

        done.try_recv().expect("verdict was already known");
        assert!(acc.signal(ActionType::ReaderMode));
    }

    #[tokio::test(start_paused = true)]
    async fn verdict_arriving_mid_cycle_completes_before_timeout() {
        let (tx, rx) = watch::channel(None);
        let provider = Arc::new(ReaderModeProvider::new(rx));
        let (acc, done) = start_cycle(provider, "https://example.com/article", 1);

        tokio::time::advance(Duration::from_millis(10)).await;
        tx.send(Some(true)).unwrap();

        done.await.unwrap();
        assert!(acc.signal(ActionType::ReaderMode));
        assert!(!acc.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn non_distillable_verdict_reports_false() {
        let (tx, rx) = watch::channel(None);
        let provider = Arc::new(ReaderModeProvider::new(rx));
        let (acc, done) = start_cycle(provider, "https://example.com/gallery", 1);

        tx.send(Some(false)).unwrap();
        done.await.unwrap();
        assert!(!acc.signal(ActionType::ReaderMode));
        assert!(!acc.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_supersedes_pending_waiter() {
        let (tx, rx) = watch::channel(None);
        let provider = Arc::new(ReaderModeProvider::new(rx));

        let (old_acc, old_done) = start_cycle(provider.clone(), "https://example.com/a", 1);
        let (new_acc, new_done) = start_cycle(provider.clone(), "https://example.com/b", 2);
        tokio::task::yield_now().await;

        tx.send(Some(true)).unwrap();
        new_done.await.unwrap();
        assert!(new_acc.signal(ActionType::ReaderMode));
        assert!(!new_acc.timed_out());

        // The superseded waiter was aborted; the old cycle only times out.
        old_done.await.unwrap();
        assert!(old_acc.timed_out());
        assert!(!old_acc.signal(ActionType::ReaderMode));
    }

    #[tokio::test(start_paused = true)]
    async fn publisher_dropped_reports_false() {
        let (tx, rx) = watch::channel(None);
        let provider = Arc::new(ReaderModeProvider::new(rx));
        let (acc, done) = start_cycle(provider, "https://example.com/article", 1);

        drop(tx);
        done.await.unwrap();
        assert!(!acc.signal(ActionType::ReaderMode));
        assert!(!acc.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn non_web_page_reports_false_without_waiting() {
        let (_tx, rx) = watch::channel(None);
        let provider = Arc::new(ReaderModeProvider::new(rx));
        let (acc, mut done) = start_cycle(provider, "about:blank", 1);

        done.try_recv().expect("guard path completes synchronously");
        assert!(!acc.signal(ActionType::ReaderMode));
    }
}
