//! Login bootstrap state machine

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use waybill_actions::{Action, ActionCoordinator, CoordinatorConfig, WaitStrategy};
use waybill_core_types::SelectorCandidate;
use waybill_locator::{ElementResolver, PollingResolver, ResolvedElement};
use waybill_surface::PageSurface;

use crate::config::BootstrapConfig;
use crate::credentials::{heuristic_scan, CredentialField};
use crate::errors::BootstrapError;

const LOGIN_FORM_PROBE: Duration = Duration::from_millis(1_000);
const AUTH_PROBE: Duration = Duration::from_millis(2_000);
const LOGOUT_CONTROL_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Lifecycle of one login attempt. Created at navigation start, mutated only
/// by the machine, discarded at scenario end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AnonymousAtLogin,
    CredentialsSubmitted,
    ForcedLogoutDetour,
    Authenticated,
    TimedOut,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AnonymousAtLogin => "anonymous_at_login",
            SessionState::CredentialsSubmitted => "credentials_submitted",
            SessionState::ForcedLogoutDetour => "forced_logout_detour",
            SessionState::Authenticated => "authenticated",
            SessionState::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// Drives the login workflow: navigate, locate and fill credentials, submit,
/// take the forced-logout detour when it appears, then poll for a terminal
/// logged-in signal. Strictly sequential; one instance per attempt.
pub struct SessionBootstrap {
    page: Arc<dyn PageSurface>,
    resolver: Arc<dyn ElementResolver>,
    coordinator: ActionCoordinator,
    config: BootstrapConfig,
    state: SessionState,
}

impl SessionBootstrap {
    pub fn new(page: Arc<dyn PageSurface>, config: BootstrapConfig) -> Self {
        let resolver: Arc<dyn ElementResolver> = Arc::new(PollingResolver::new(page.clone()));
        let coordinator = ActionCoordinator::with_parts(
            page.clone(),
            resolver.clone(),
            CoordinatorConfig::default(),
        );
        Self {
            page,
            resolver,
            coordinator,
            config,
            state: SessionState::AnonymousAtLogin,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the whole login flow to a terminal state.
    pub async fn login(&mut self) -> Result<(), BootstrapError> {
        self.navigate().await?;

        let username = self
            .locate_field(CredentialField::Username)
            .await?;
        let password = self
            .locate_field(CredentialField::Password)
            .await?;
        self.fill_credentials(&username, &password).await?;
        self.submit(&password).await?;
        self.transition(SessionState::CredentialsSubmitted);

        if let Some(detour) = self.detour_control().await? {
            self.transition(SessionState::ForcedLogoutDetour);
            self.run_detour(&detour).await?;
        }

        self.await_terminal_signal().await
    }

    /// Profile or log-out control visible in the chrome.
    pub async fn is_authenticated(&self) -> Result<bool, BootstrapError> {
        for candidates in [&self.config.targets.profile, &self.config.targets.logout] {
            if self.probe_visible(candidates, AUTH_PROBE).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Username input still visible, i.e. the login form is on screen.
    pub async fn is_login_form_visible(&self) -> Result<bool, BootstrapError> {
        self.probe_visible(&self.config.targets.username, LOGIN_FORM_PROBE)
            .await
    }

    /// Leave the portal: open the profile menu, click log out.
    pub async fn logout(&self) -> Result<(), BootstrapError> {
        let profile = self
            .resolver
            .resolve(&self.config.targets.profile, LOGOUT_CONTROL_TIMEOUT)
            .await?;
        self.coordinator
            .perform_and_wait(&profile, Action::Click, WaitStrategy::None, Duration::ZERO)
            .await?;

        let logout = self
            .resolver
            .resolve(&self.config.targets.logout, LOGOUT_CONTROL_TIMEOUT)
            .await?;
        self.coordinator
            .perform_and_wait(&logout, Action::Click, WaitStrategy::None, Duration::ZERO)
            .await?;
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = %self.state, to = %next, "bootstrap state transition");
        self.state = next;
    }

    async fn navigate(&self) -> Result<(), BootstrapError> {
        if self.config.base_url.trim().is_empty() {
            return Err(BootstrapError::EmptyBaseUrl);
        }
        info!(url = %self.config.base_url, "navigating to portal");
        self.page.goto(&self.config.base_url).await?;
        self.coordinator
            .wait(&WaitStrategy::DomReady, self.config.navigation_timeout)
            .await?;
        Ok(())
    }

    /// Configured candidates first, attribute heuristics second.
    async fn locate_field(
        &self,
        field: CredentialField,
    ) -> Result<ResolvedElement, BootstrapError> {
        let candidates = match field {
            CredentialField::Username => &self.config.targets.username,
            CredentialField::Password => &self.config.targets.password,
        };
        if let Some(found) = self
            .resolver
            .try_resolve(candidates, self.config.field_probe_timeout)
            .await?
        {
            return Ok(found);
        }

        debug!(field = field.name(), "configured candidates missed, scanning inputs");
        heuristic_scan(&self.page, field)
            .await?
            .ok_or(BootstrapError::CredentialFieldNotFound {
                field: field.name(),
            })
    }

    async fn fill_credentials(
        &self,
        username: &ResolvedElement,
        password: &ResolvedElement,
    ) -> Result<(), BootstrapError> {
        self.coordinator
            .perform_and_wait(
                username,
                Action::Fill(self.config.username.clone()),
                WaitStrategy::None,
                Duration::ZERO,
            )
            .await?;
        sleep(self.config.settle_pause).await;

        self.coordinator
            .perform_and_wait(
                password,
                Action::Fill(self.config.password.clone()),
                WaitStrategy::None,
                Duration::ZERO,
            )
            .await?;
        sleep(self.config.settle_pause).await;
        Ok(())
    }

    /// Click the sign-in button when it resolves within its probe budget,
    /// otherwise press Enter in the password field.
    async fn submit(&self, password: &ResolvedElement) -> Result<(), BootstrapError> {
        match self
            .resolver
            .try_resolve(
                &self.config.targets.sign_in,
                self.config.submit_probe_timeout,
            )
            .await?
        {
            Some(button) => {
                self.coordinator
                    .perform_and_wait(&button, Action::Click, WaitStrategy::None, Duration::ZERO)
                    .await?;
            }
            None => {
                debug!("no sign-in button, submitting via Enter");
                self.page.press(&password.handle, "Enter").await?;
            }
        }
        Ok(())
    }

    /// Inherently optional probe for the "log out all sessions" control.
    async fn detour_control(&self) -> Result<Option<ResolvedElement>, BootstrapError> {
        let found = self
            .resolver
            .try_resolve(
                &self.config.targets.detour,
                self.config.detour_probe_timeout,
            )
            .await?;
        match found {
            Some(control) if self.page.is_visible(&control.handle).await? => Ok(Some(control)),
            _ => Ok(None),
        }
    }

    /// Click the detour control, then re-fill and resubmit exactly once. The
    /// form re-renders, so the inputs are re-resolved from scratch.
    async fn run_detour(&self, detour: &ResolvedElement) -> Result<(), BootstrapError> {
        self.coordinator
            .perform_and_wait(detour, Action::Click, WaitStrategy::None, Duration::ZERO)
            .await?;

        let username = self.locate_field(CredentialField::Username).await?;
        let password = self.locate_field(CredentialField::Password).await?;
        self.fill_credentials(&username, &password).await?;
        self.page.press(&password.handle, "Enter").await?;
        Ok(())
    }

    /// Poll for either terminal signal until the deadline. First observed
    /// signal wins.
    async fn await_terminal_signal(&mut self) -> Result<(), BootstrapError> {
        let start = Instant::now();
        loop {
            if self.signal_observed().await? {
                self.transition(SessionState::Authenticated);
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed >= self.config.deadline {
                self.transition(SessionState::TimedOut);
                return Err(BootstrapError::Timeout {
                    deadline_ms: self.config.deadline.as_millis() as u64,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
            sleep(self.config.poll_interval.min(self.config.deadline - elapsed)).await;
        }
    }

    async fn signal_observed(&self) -> Result<bool, BootstrapError> {
        let targets = &self.config.targets;
        for candidates in [&targets.profile, &targets.logout, &targets.dashboard] {
            if self.probe_visible(candidates, Duration::ZERO).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn probe_visible(
        &self,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<bool, BootstrapError> {
        match self.resolver.try_resolve(candidates, timeout).await? {
            Some(found) => Ok(self.page.is_visible(&found.handle).await?),
            None => Ok(false),
        }
    }
}
