//! Browser automation surface - the seam between the synchronization engine
//! and whatever actually drives a browser.
//!
//! The locator, actions and session crates only ever talk to the [`PageSurface`]
//! and [`BrowserSurface`] traits defined here. A production implementation
//! bridges to a real driver; the [`fake`] module ships an in-memory double with
//! scheduled DOM mutations for tests.

pub mod errors;
pub mod page;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use errors::*;
pub use page::*;
