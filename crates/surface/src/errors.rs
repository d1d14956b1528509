//! Error types for the browser surface

use thiserror::Error;

/// Errors reported by a [`crate::PageSurface`] implementation.
///
/// `FrameDetached` and `InvalidSelector` are expected outcomes during a
/// resolution sweep: a frame may vanish between enumeration and query, and a
/// candidate may be syntactically invalid for its query kind. The resolution
/// engine maps both to "zero matches in this scope" rather than aborting.
#[derive(Debug, Error, Clone)]
pub enum SurfaceError {
    /// The queried sub-document detached between enumeration and query.
    #[error("Frame detached: {0}")]
    FrameDetached(String),

    /// The selector expression is not valid for its query kind.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// The element handle no longer refers to an attached element.
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// The page has been closed.
    #[error("Page closed")]
    PageClosed,

    /// Navigation failed.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Driver-level I/O or protocol error.
    #[error("Surface I/O error: {0}")]
    Io(String),
}

impl SurfaceError {
    /// True when the error means "no matches in this scope" for a query.
    pub fn is_empty_query(&self) -> bool {
        matches!(
            self,
            SurfaceError::FrameDetached(_) | SurfaceError::InvalidSelector(_)
        )
    }
}
