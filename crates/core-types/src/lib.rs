//! Shared leaf types for the waybill synchronization engine.
//!
//! Everything here is plain data: ids, query scopes, selector candidates and
//! the document readiness ladder. Behavior lives in the surface, locator,
//! actions and session crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a sub-document (iframe) within a page.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FrameId(pub String);

impl FrameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a concrete element within one scope.
///
/// Handles are only meaningful until the DOM mutates the element away; the
/// resolution engine re-queries on every poll rather than caching these.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// A queryable document context: the main document or one attached iframe.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ScopeId {
    /// The top-level document.
    Main,

    /// A sub-document, addressed by its frame id.
    Frame(FrameId),
}

impl ScopeId {
    pub fn is_main(&self) -> bool {
        matches!(self, ScopeId::Main)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Main => write!(f, "main"),
            ScopeId::Frame(id) => write!(f, "frame:{}", id.0),
        }
    }
}

/// One alternative selector expression describing a logical UI target.
///
/// Callers supply an ordered list of these; earlier candidates are tried
/// first on every poll cycle. The kind is explicit so each expression is
/// dispatched to the matching query primitive instead of being sniffed from
/// string prefixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectorCandidate {
    /// CSS selector.
    Css(String),

    /// XPath expression.
    XPath(String),

    /// ARIA role plus accessible name.
    Role { role: String, name: String },

    /// Text content (exact or partial match).
    Text { content: String, exact: bool },
}

impl SelectorCandidate {
    /// String form used in logs and timeout diagnostics.
    pub fn describe(&self) -> String {
        match self {
            SelectorCandidate::Css(s) => format!("css:{}", s),
            SelectorCandidate::XPath(s) => format!("xpath:{}", s),
            SelectorCandidate::Role { role, name } => {
                format!("role:{}[name='{}']", role, name)
            }
            SelectorCandidate::Text { content, exact } => {
                if *exact {
                    format!("text:exact:'{}'", content)
                } else {
                    format!("text:partial:'{}'", content)
                }
            }
        }
    }

    /// Render a whole candidate list for an error message.
    pub fn describe_list(candidates: &[SelectorCandidate]) -> String {
        candidates
            .iter()
            .map(SelectorCandidate::describe)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SelectorCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Document readiness ladder, ordered so `>=` comparisons express "at least".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentReady {
    /// Still parsing.
    Loading,

    /// DOMContentLoaded has fired.
    ContentLoaded,

    /// All subresources finished.
    Complete,
}
