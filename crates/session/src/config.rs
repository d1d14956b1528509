//! Bootstrap configuration
//!
//! Everything the state machine needs arrives through this struct at
//! construction time. There is deliberately no process-wide lookup: the
//! credential/config source is a collaborator that hands these in as opaque
//! strings.

use std::time::Duration;

use waybill_core_types::SelectorCandidate;

/// Candidate lists for the login flow's logical targets. Defaults mirror the
/// portal's login screen; callers override per environment.
#[derive(Debug, Clone)]
pub struct LoginTargets {
    /// Username/email input.
    pub username: Vec<SelectorCandidate>,

    /// Password input.
    pub password: Vec<SelectorCandidate>,

    /// Sign-in submit button.
    pub sign_in: Vec<SelectorCandidate>,

    /// "Log out all sessions" detour control.
    pub detour: Vec<SelectorCandidate>,

    /// Profile control shown in the authenticated chrome.
    pub profile: Vec<SelectorCandidate>,

    /// Log-out control shown in the authenticated chrome.
    pub logout: Vec<SelectorCandidate>,

    /// Dashboard-specific element.
    pub dashboard: Vec<SelectorCandidate>,
}

impl Default for LoginTargets {
    fn default() -> Self {
        Self {
            username: vec![SelectorCandidate::Role {
                role: "textbox".to_string(),
                name: "Username".to_string(),
            }],
            password: vec![SelectorCandidate::Role {
                role: "textbox".to_string(),
                name: "Password".to_string(),
            }],
            sign_in: vec![SelectorCandidate::Role {
                role: "button".to_string(),
                name: "Sign in".to_string(),
            }],
            detour: vec![
                SelectorCandidate::Css("#lbtLogOutAllSessions".to_string()),
                SelectorCandidate::Text {
                    content: "log out all sessions".to_string(),
                    exact: false,
                },
            ],
            profile: vec![SelectorCandidate::Role {
                role: "button".to_string(),
                name: "A".to_string(),
            }],
            logout: vec![SelectorCandidate::Role {
                role: "button".to_string(),
                name: "Log out".to_string(),
            }],
            dashboard: vec![
                SelectorCandidate::Role {
                    role: "link".to_string(),
                    name: "Dashboard".to_string(),
                },
                SelectorCandidate::Text {
                    content: "Dashboard".to_string(),
                    exact: false,
                },
            ],
        }
    }
}

/// Explicit configuration for one bootstrap attempt.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Portal entry URL.
    pub base_url: String,

    /// Login credentials, opaque to the machine.
    pub username: String,
    pub password: String,

    /// Candidate lists for the flow's targets.
    pub targets: LoginTargets,

    /// Overall deadline for reaching a terminal logged-in signal.
    pub deadline: Duration,

    /// Interval between terminal-signal probes.
    pub poll_interval: Duration,

    /// Budget for the non-optional credential-input lookups before the
    /// heuristic scan kicks in.
    pub field_probe_timeout: Duration,

    /// Optional probe budget for the sign-in button.
    pub submit_probe_timeout: Duration,

    /// Optional probe budget for the forced-logout detour control.
    pub detour_probe_timeout: Duration,

    /// Budget for the DomReady wait after the initial navigation.
    pub navigation_timeout: Duration,

    /// Short pause after each credential fill, letting the form's input
    /// listeners settle before the next keystroke lands.
    pub settle_pause: Duration,
}

impl BootstrapConfig {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            targets: LoginTargets::default(),
            deadline: Duration::from_millis(15_000),
            poll_interval: Duration::from_millis(500),
            field_probe_timeout: Duration::from_millis(5_000),
            submit_probe_timeout: Duration::from_millis(2_000),
            detour_probe_timeout: Duration::from_millis(3_000),
            navigation_timeout: Duration::from_millis(10_000),
            settle_pause: Duration::from_millis(500),
        }
    }
}
