//! Error types for action coordination

use std::fmt;

use thiserror::Error;
use waybill_locator::LocatorError;
use waybill_surface::SurfaceError;

/// The actionability constraint that failed on a non-force action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionabilityConstraint {
    /// Element is no longer attached to its document.
    NotAttached,

    /// Element renders with no visible box.
    NotVisible,

    /// Another element obscures the interaction point.
    Covered,
}

impl fmt::Display for ActionabilityConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionabilityConstraint::NotAttached => write!(f, "not attached"),
            ActionabilityConstraint::NotVisible => write!(f, "not visible"),
            ActionabilityConstraint::Covered => write!(f, "covered"),
        }
    }
}

/// Action coordination error enumeration.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Element found but not interactable on a non-force action. Never
    /// silently downgraded to a no-op.
    #[error("Element '{element}' not actionable: {constraint}")]
    NotActionable {
        element: String,
        constraint: ActionabilityConstraint,
    },

    /// Post-action condition not reached within budget.
    #[error("Wait strategy '{strategy}' timed out after {elapsed_ms}ms")]
    WaitTimeout {
        strategy: &'static str,
        elapsed_ms: u64,
    },

    /// URL predicate not satisfied within budget; carries the final URL for
    /// diagnosis.
    #[error("URL predicate {predicate} not satisfied after {elapsed_ms}ms; final URL: {final_url}")]
    UrlTimeout {
        predicate: String,
        final_url: String,
        elapsed_ms: u64,
    },

    /// A `Matches` predicate carried an unparsable pattern.
    #[error("Invalid URL pattern '{pattern}': {reason}")]
    InvalidUrlPattern { pattern: String, reason: String },

    /// No dialog appeared within the capture budget.
    #[error("No dialog observed within {timeout_ms}ms")]
    DialogTimeout { timeout_ms: u64 },

    /// Secondary-target resolution failed.
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// Driver-level failure.
    #[error("Surface error during action: {0}")]
    Surface(#[from] SurfaceError),
}
