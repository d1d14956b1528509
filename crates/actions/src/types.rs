//! Action and wait-strategy data types

use std::fmt;
use std::time::Duration;

use regex::Regex;
use waybill_core_types::SelectorCandidate;

use crate::errors::ActionError;

/// One interaction with a resolved element.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Click, gated on actionability.
    Click,

    /// Click without the actionability gate. Some disabled controls still
    /// need a forced hover/click to surface tooltip content for
    /// negative-path assertions.
    ForceClick,

    /// Replace the element's value.
    Fill(String),

    /// Clear the element's value.
    Clear,

    /// Hover the element.
    Hover,

    /// Type key by key instead of replacing the value.
    TypeSequentially(String),

    /// Select a dropdown option by value.
    SelectOption(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::ForceClick => "force_click",
            Action::Fill(_) => "fill",
            Action::Clear => "clear",
            Action::Hover => "hover",
            Action::TypeSequentially(_) => "type_sequentially",
            Action::SelectOption(_) => "select_option",
        }
    }

    /// Force-mode actions bypass the actionability gate.
    pub fn is_force(&self) -> bool {
        matches!(self, Action::ForceClick)
    }
}

/// Predicate over the current location.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlPredicate {
    /// Location contains the substring.
    Contains(String),

    /// Location equals the string exactly.
    Equals(String),

    /// Location matches the regex pattern.
    Matches(String),
}

impl UrlPredicate {
    pub fn eval(&self, url: &str) -> Result<bool, ActionError> {
        match self {
            UrlPredicate::Contains(needle) => Ok(url.contains(needle)),
            UrlPredicate::Equals(expected) => Ok(url == expected),
            UrlPredicate::Matches(pattern) => {
                let re = Regex::new(pattern).map_err(|err| ActionError::InvalidUrlPattern {
                    pattern: pattern.clone(),
                    reason: err.to_string(),
                })?;
                Ok(re.is_match(url))
            }
        }
    }
}

impl fmt::Display for UrlPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPredicate::Contains(s) => write!(f, "contains('{}')", s),
            UrlPredicate::Equals(s) => write!(f, "equals('{}')", s),
            UrlPredicate::Matches(s) => write!(f, "matches('{}')", s),
        }
    }
}

/// Post-action synchronization strategy, chosen per action semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitStrategy {
    /// No post-condition.
    None,

    /// Document readiness reached "content loaded". For clicks that trigger
    /// a full route change.
    DomReady,

    /// No network activity for a fixed quiet window. For actions that
    /// submit data to the backend (save, confirm, search).
    NetworkIdle,

    /// Current location satisfies the predicate.
    UrlPredicate(UrlPredicate),

    /// A secondary element becomes visible (e.g. a confirmation dialog).
    ElementVisible(Vec<SelectorCandidate>),

    /// A secondary element disappears or hides.
    ElementHidden(Vec<SelectorCandidate>),
}

impl WaitStrategy {
    /// Stable name for logs and timeout errors.
    pub fn name(&self) -> &'static str {
        match self {
            WaitStrategy::None => "none",
            WaitStrategy::DomReady => "dom_ready",
            WaitStrategy::NetworkIdle => "network_idle",
            WaitStrategy::UrlPredicate(_) => "url_predicate",
            WaitStrategy::ElementVisible(_) => "element_visible",
            WaitStrategy::ElementHidden(_) => "element_hidden",
        }
    }
}

/// Tuning knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Sleep between wait-condition probes.
    pub poll_interval: Duration,

    /// Quiet window for `NetworkIdle`.
    pub network_quiet_window: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            network_quiet_window: Duration::from_millis(500),
        }
    }
}
