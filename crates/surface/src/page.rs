//! Page and browser surface traits

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use waybill_core_types::{DocumentReady, ElementId, FrameId, ScopeId, SelectorCandidate};

use crate::errors::SurfaceError;

/// Handle to a concrete element, bound to exactly one scope.
///
/// A handle is a snapshot: it stays valid only until the DOM mutates the
/// element away. Callers that poll must re-query instead of holding one
/// across a polling interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Scope the element was found in.
    pub scope: ScopeId,

    /// Driver-level element identity within that scope.
    pub element: ElementId,
}

impl ElementHandle {
    pub fn new(scope: ScopeId, element: ElementId) -> Self {
        Self { scope, element }
    }
}

/// A dialog (alert/confirm) raised by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogEvent {
    pub message: String,
}

/// One page owned by a single scenario execution context.
///
/// Queries are scope-aware so the resolution engine can sweep the main
/// document and every attached iframe. All methods are suspension points;
/// none blocks a dedicated OS thread.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Navigate the main document to `url`.
    async fn goto(&self, url: &str) -> Result<(), SurfaceError>;

    /// Current location of the main document.
    async fn current_url(&self) -> Result<String, SurfaceError>;

    /// Readiness of the main document.
    async fn ready_state(&self) -> Result<DocumentReady, SurfaceError>;

    /// How long the page has seen no network activity. Zero while requests
    /// are in flight.
    async fn network_idle_for(&self) -> Result<Duration, SurfaceError>;

    /// Live sub-documents in attachment order.
    async fn frames(&self) -> Result<Vec<FrameId>, SurfaceError>;

    /// All elements matching `candidate` within `scope`, in DOM order.
    async fn query(
        &self,
        scope: &ScopeId,
        candidate: &SelectorCandidate,
    ) -> Result<Vec<ElementHandle>, SurfaceError>;

    /// Whether the element is still attached to its document.
    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, SurfaceError>;

    /// Whether the element renders with a non-zero box and is not hidden.
    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, SurfaceError>;

    /// Whether another element obscures this one at its interaction point.
    async fn is_covered(&self, handle: &ElementHandle) -> Result<bool, SurfaceError>;

    /// Read an attribute value, `None` when absent.
    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError>;

    /// Click the element. `force` skips driver-side actionability waits.
    async fn click(&self, handle: &ElementHandle, force: bool) -> Result<(), SurfaceError>;

    /// Replace the element's value with `text`.
    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<(), SurfaceError>;

    /// Clear the element's value.
    async fn clear(&self, handle: &ElementHandle) -> Result<(), SurfaceError>;

    /// Hover the element.
    async fn hover(&self, handle: &ElementHandle) -> Result<(), SurfaceError>;

    /// Type `text` key by key instead of replacing the value.
    async fn type_text(&self, handle: &ElementHandle, text: &str) -> Result<(), SurfaceError>;

    /// Select the option with the given value in a select element.
    async fn select_option(&self, handle: &ElementHandle, value: &str)
        -> Result<(), SurfaceError>;

    /// Press a single key (e.g. "Enter") with the element focused.
    async fn press(&self, handle: &ElementHandle, key: &str) -> Result<(), SurfaceError>;

    /// Subscribe to dialog events. Dropping the receiver deregisters.
    fn subscribe_dialogs(&self) -> broadcast::Receiver<DialogEvent>;

    /// Release the page. Idempotent; later calls are no-ops.
    async fn close(&self) -> Result<(), SurfaceError>;
}

/// Factory for scenario-scoped pages.
///
/// Each scenario acquires its own page and must not share it with
/// concurrently running scenarios.
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    async fn new_page(&self) -> Result<Arc<dyn PageSurface>, SurfaceError>;
}
