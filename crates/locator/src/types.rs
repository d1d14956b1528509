//! Data types for the resolution engine

use std::time::Duration;

use waybill_core_types::{ScopeId, SelectorCandidate};
use waybill_surface::ElementHandle;

/// Tuning knobs for the polling resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Sleep between resolution passes.
    pub poll_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Outcome of a successful resolution: a handle bound to exactly one scope,
/// plus the candidate that matched it.
///
/// The handle is only valid until the DOM mutates it away; retry logic must
/// go back through the resolver instead of reusing this.
#[derive(Debug, Clone)]
pub struct ResolvedElement {
    pub handle: ElementHandle,
    pub matched: SelectorCandidate,
}

impl ResolvedElement {
    pub fn new(handle: ElementHandle, matched: SelectorCandidate) -> Self {
        Self { handle, matched }
    }

    /// Scope the match was found in.
    pub fn scope(&self) -> &ScopeId {
        &self.handle.scope
    }
}
