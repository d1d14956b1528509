//! Visibility prober - bounded waits on rendered visibility

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;
use waybill_surface::{ElementHandle, PageSurface};

/// Polls an element's rendered visibility with a bounded wait.
///
/// Never raises: `false` on timeout, so callers can treat absence as a valid
/// negative assertion. Surface failures (stale handle, closed page) also read
/// as not-visible.
pub struct VisibilityProber {
    page: Arc<dyn PageSurface>,
    poll_interval: Duration,
}

impl VisibilityProber {
    pub fn new(page: Arc<dyn PageSurface>) -> Self {
        Self {
            page,
            poll_interval: Duration::from_millis(250),
        }
    }

    pub fn with_poll_interval(page: Arc<dyn PageSurface>, poll_interval: Duration) -> Self {
        Self {
            page,
            poll_interval,
        }
    }

    /// Wait until the element is attached and visible, or the budget expires.
    pub async fn await_visible(&self, handle: &ElementHandle, timeout: Duration) -> bool {
        self.await_state(handle, timeout, true).await
    }

    /// Wait until the element is detached or hidden, or the budget expires.
    pub async fn await_hidden(&self, handle: &ElementHandle, timeout: Duration) -> bool {
        self.await_state(handle, timeout, false).await
    }

    async fn await_state(&self, handle: &ElementHandle, timeout: Duration, want: bool) -> bool {
        let start = Instant::now();
        loop {
            if self.probe(handle).await == want {
                return true;
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                debug!(
                    element = %handle.element.0,
                    want_visible = want,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "visibility probe timed out"
                );
                return false;
            }
            sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }

    async fn probe(&self, handle: &ElementHandle) -> bool {
        let attached = self.page.is_attached(handle).await.unwrap_or(false);
        if !attached {
            return false;
        }
        self.page.is_visible(handle).await.unwrap_or(false)
    }
}
