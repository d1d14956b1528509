//! Locator resolution engine - bounded-polling element resolution.
//!
//! Given an ordered list of selector candidates and a timeout budget, the
//! engine sweeps the main document and every attached iframe until one match
//! is found or the budget expires. Every poll re-queries from scratch: the DOM
//! mutates concurrently with the search, so no handle survives a polling
//! interval. Optional lookups return `None` instead of raising.

pub mod errors;
pub mod prober;
pub mod resolver;
pub mod types;

pub use errors::*;
pub use prober::*;
pub use resolver::*;
pub use types::*;
