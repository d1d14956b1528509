//! Action/wait coordination - interact, then wait until the page settles.
//!
//! Every interaction is gated on actionability (attached, visible, not
//! covered) unless forced, and followed by a declared wait strategy so the
//! next resolution is not racing a pending re-render: DOM readiness, a
//! network quiet window, a URL predicate, or the appearance/disappearance of
//! a secondary element.

pub mod coordinator;
pub mod dialog;
pub mod errors;
pub mod types;

pub use coordinator::*;
pub use dialog::*;
pub use errors::*;
pub use types::*;
