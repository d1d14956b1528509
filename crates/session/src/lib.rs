//! Session bootstrap - the login workflow as a state machine.
//!
//! Composes resolution and action/wait calls into the portal login flow:
//! navigate, locate credential inputs (configured candidates first, attribute
//! heuristics second), submit, handle the forced-logout detour, then poll for
//! a terminal logged-in signal within a deadline. One machine instance per
//! login attempt; one page per scenario, released on every exit path.

pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod scope;

pub use bootstrap::*;
pub use config::*;
pub use errors::*;
pub use scope::*;
