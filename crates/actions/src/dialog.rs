//! One-shot dialog capture

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;
use waybill_surface::{DialogEvent, PageSurface, SurfaceError};

use crate::errors::ActionError;

/// One-shot awaitable for the next dialog raised by the page.
///
/// Arm it *before* the action that may raise the dialog, then await
/// [`DialogCapture::next`]. The subscription is a scoped resource: it is
/// released when the capture is consumed or dropped, even if the awaited
/// dialog never fires.
pub struct DialogCapture {
    rx: broadcast::Receiver<DialogEvent>,
}

impl DialogCapture {
    pub fn arm(page: &dyn PageSurface) -> Self {
        Self {
            rx: page.subscribe_dialogs(),
        }
    }

    /// Wait for the next dialog, consuming the capture.
    pub async fn next(mut self, timeout: Duration) -> Result<DialogEvent, ActionError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Ok(event)) => {
                    debug!(message = %event.message, "captured dialog");
                    return Ok(event);
                }
                // Missed events mean the page raised dialogs faster than we
                // drained; keep waiting for the next one.
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(ActionError::Surface(SurfaceError::PageClosed));
                }
                Err(_) => {
                    return Err(ActionError::DialogTimeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            }
        }
    }
}
