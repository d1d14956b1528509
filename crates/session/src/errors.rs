//! Error types for session bootstrap

use thiserror::Error;
use waybill_actions::ActionError;
use waybill_locator::LocatorError;
use waybill_surface::SurfaceError;

/// Bootstrap error enumeration.
#[derive(Debug, Error, Clone)]
pub enum BootstrapError {
    /// Neither terminal login signal was observed within the overall
    /// deadline. Distinct from a resolution timeout: this aggregates
    /// multiple underlying probes.
    #[error("Login did not reach a terminal state within {deadline_ms}ms (elapsed {elapsed_ms}ms)")]
    Timeout { deadline_ms: u64, elapsed_ms: u64 },

    /// Neither the configured candidates nor the heuristics found the input.
    #[error("Could not locate the {field} input on the login form")]
    CredentialFieldNotFound { field: &'static str },

    /// The configuration carried no base URL.
    #[error("Base URL is empty; provide it via the bootstrap configuration")]
    EmptyBaseUrl,

    /// A non-optional resolution inside the flow failed.
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// An action or post-action wait inside the flow failed.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Driver-level failure.
    #[error("Surface error during bootstrap: {0}")]
    Surface(#[from] SurfaceError),
}
