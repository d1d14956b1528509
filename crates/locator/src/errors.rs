//! Error types for the resolution engine

use thiserror::Error;
use waybill_surface::SurfaceError;

/// Resolution error enumeration.
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Caller supplied an empty candidate list.
    #[error("No selector candidates supplied")]
    NoCandidates,

    /// No candidate matched anywhere within the budget on a non-optional
    /// lookup. Carries the full attempted list for diagnosability.
    #[error("Resolution timeout after {elapsed_ms}ms (budget {timeout_ms}ms); tried: [{candidates}]")]
    ResolutionTimeout {
        candidates: String,
        timeout_ms: u64,
        elapsed_ms: u64,
    },

    /// The surface failed in a way that is not "zero matches here".
    #[error("Surface error during resolution: {0}")]
    Surface(#[from] SurfaceError),
}
