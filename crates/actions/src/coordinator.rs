//! Action/wait coordinator

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use waybill_core_types::{DocumentReady, SelectorCandidate};
use waybill_locator::{ElementResolver, PollingResolver, ResolvedElement, VisibilityProber};
use waybill_surface::{ElementHandle, PageSurface};

use crate::errors::{ActionError, ActionabilityConstraint};
use crate::types::{Action, CoordinatorConfig, UrlPredicate, WaitStrategy};

/// Wraps resolved elements with pre-action actionability gating and
/// post-action synchronization.
pub struct ActionCoordinator {
    page: Arc<dyn PageSurface>,
    resolver: Arc<dyn ElementResolver>,
    prober: VisibilityProber,
    config: CoordinatorConfig,
}

impl ActionCoordinator {
    pub fn new(page: Arc<dyn PageSurface>) -> Self {
        let resolver = Arc::new(PollingResolver::new(page.clone()));
        Self::with_parts(page, resolver, CoordinatorConfig::default())
    }

    pub fn with_parts(
        page: Arc<dyn PageSurface>,
        resolver: Arc<dyn ElementResolver>,
        config: CoordinatorConfig,
    ) -> Self {
        let prober = VisibilityProber::new(page.clone());
        Self {
            page,
            resolver,
            prober,
            config,
        }
    }

    /// Perform `action` on `element`, then wait until `strategy` is satisfied
    /// within `timeout`.
    pub async fn perform_and_wait(
        &self,
        element: &ResolvedElement,
        action: Action,
        strategy: WaitStrategy,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        debug!(
            action = action.name(),
            strategy = strategy.name(),
            element = %element.handle.element.0,
            "performing action"
        );

        if !action.is_force() {
            self.ensure_actionable(&element.handle).await?;
        }
        self.dispatch(&element.handle, &action).await?;
        self.apply_strategy(&strategy, timeout).await
    }

    /// Explicit wait without a preceding action, e.g. after a navigation the
    /// coordinator did not itself perform.
    pub async fn wait(&self, strategy: &WaitStrategy, timeout: Duration) -> Result<(), ActionError> {
        self.apply_strategy(strategy, timeout).await
    }

    /// Re-validate the element right before acting: attached, visible, not
    /// covered. Failures surface the exact constraint, never a silent no-op.
    async fn ensure_actionable(&self, handle: &ElementHandle) -> Result<(), ActionError> {
        let fail = |constraint| {
            warn!(element = %handle.element.0, %constraint, "actionability check failed");
            Err(ActionError::NotActionable {
                element: handle.element.0.clone(),
                constraint,
            })
        };

        if !self.page.is_attached(handle).await? {
            return fail(ActionabilityConstraint::NotAttached);
        }
        if !self.page.is_visible(handle).await? {
            return fail(ActionabilityConstraint::NotVisible);
        }
        if self.page.is_covered(handle).await? {
            return fail(ActionabilityConstraint::Covered);
        }
        Ok(())
    }

    async fn dispatch(&self, handle: &ElementHandle, action: &Action) -> Result<(), ActionError> {
        match action {
            Action::Click => self.page.click(handle, false).await?,
            Action::ForceClick => self.page.click(handle, true).await?,
            Action::Fill(text) => self.page.fill(handle, text).await?,
            Action::Clear => self.page.clear(handle).await?,
            Action::Hover => self.page.hover(handle).await?,
            Action::TypeSequentially(text) => self.page.type_text(handle, text).await?,
            Action::SelectOption(value) => self.page.select_option(handle, value).await?,
        }
        Ok(())
    }

    async fn apply_strategy(
        &self,
        strategy: &WaitStrategy,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        match strategy {
            WaitStrategy::None => Ok(()),
            WaitStrategy::DomReady => self.wait_dom_ready(timeout).await,
            WaitStrategy::NetworkIdle => self.wait_network_idle(timeout).await,
            WaitStrategy::UrlPredicate(predicate) => self.wait_url(predicate, timeout).await,
            WaitStrategy::ElementVisible(candidates) => {
                self.wait_element(candidates, true, timeout).await
            }
            WaitStrategy::ElementHidden(candidates) => {
                self.wait_element(candidates, false, timeout).await
            }
        }
    }

    async fn wait_dom_ready(&self, timeout: Duration) -> Result<(), ActionError> {
        let start = Instant::now();
        loop {
            if self.page.ready_state().await? >= DocumentReady::ContentLoaded {
                return Ok(());
            }
            self.pause_or_timeout(start, timeout, "dom_ready").await?;
        }
    }

    async fn wait_network_idle(&self, timeout: Duration) -> Result<(), ActionError> {
        let start = Instant::now();
        loop {
            if self.page.network_idle_for().await? >= self.config.network_quiet_window {
                return Ok(());
            }
            self.pause_or_timeout(start, timeout, "network_idle").await?;
        }
    }

    async fn wait_url(
        &self,
        predicate: &UrlPredicate,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        let start = Instant::now();
        loop {
            let url = self.page.current_url().await?;
            if predicate.eval(&url)? {
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(ActionError::UrlTimeout {
                    predicate: predicate.to_string(),
                    final_url: url,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
            sleep(self.config.poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// Wait for a secondary target to appear (or go away). Every cycle
    /// re-resolves instead of holding a handle across the interval; the
    /// visibility probe itself is delegated to the prober.
    async fn wait_element(
        &self,
        candidates: &[SelectorCandidate],
        want_visible: bool,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        let strategy = if want_visible {
            "element_visible"
        } else {
            "element_hidden"
        };

        let start = Instant::now();
        loop {
            let resolved = self.resolver.try_resolve(candidates, Duration::ZERO).await?;
            let satisfied = match (&resolved, want_visible) {
                (Some(el), true) => self.prober.await_visible(&el.handle, Duration::ZERO).await,
                (Some(el), false) => self.prober.await_hidden(&el.handle, Duration::ZERO).await,
                // Absence means hidden, not an error.
                (None, false) => true,
                (None, true) => false,
            };
            if satisfied {
                return Ok(());
            }
            self.pause_or_timeout(start, timeout, strategy).await?;
        }
    }

    /// Sleep one poll interval, or raise `WaitTimeout` once the budget is gone.
    async fn pause_or_timeout(
        &self,
        start: Instant,
        timeout: Duration,
        strategy: &'static str,
    ) -> Result<(), ActionError> {
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(ActionError::WaitTimeout {
                strategy,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        sleep(self.config.poll_interval.min(timeout - elapsed)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waybill_core_types::{ElementId, ScopeId};
    use waybill_surface::fake::{FakeElement, FakeMutation, FakePage};

    fn css(expr: &str) -> SelectorCandidate {
        SelectorCandidate::Css(expr.to_string())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn resolve(
        coordinator: &ActionCoordinator,
        expr: &str,
    ) -> ResolvedElement {
        coordinator
            .resolver
            .resolve(&[css(expr)], ms(500))
            .await
            .unwrap()
    }

    fn coordinator(page: Arc<FakePage>) -> ActionCoordinator {
        ActionCoordinator::new(page)
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_element_fails_the_gate() {
        let page = FakePage::builder()
            .element(FakeElement::new("save").matches("#save").hidden())
            .build();
        let c = coordinator(page.clone());
        let el = resolve(&c, "#save").await;

        let err = c
            .perform_and_wait(&el, Action::Click, WaitStrategy::None, ms(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::NotActionable {
                constraint: ActionabilityConstraint::NotVisible,
                ..
            }
        ));
        assert_eq!(page.count_actions("save", "click"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn covered_element_fails_the_gate() {
        let page = FakePage::builder()
            .element(FakeElement::new("save").matches("#save").covered())
            .build();
        let c = coordinator(page.clone());
        let el = resolve(&c, "#save").await;

        let err = c
            .perform_and_wait(&el, Action::Click, WaitStrategy::None, ms(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::NotActionable {
                constraint: ActionabilityConstraint::Covered,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn detached_element_fails_the_gate() {
        let page = FakePage::builder()
            .element(FakeElement::new("row").matches("#row"))
            .build();
        let c = coordinator(page.clone());
        let el = resolve(&c, "#row").await;

        page.schedule(ms(1), FakeMutation::Remove(ElementId("row".to_string())));
        tokio::time::sleep(ms(10)).await;

        let err = c
            .perform_and_wait(&el, Action::Click, WaitStrategy::None, ms(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::NotActionable {
                constraint: ActionabilityConstraint::NotAttached,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn force_click_bypasses_the_gate() {
        // Disabled controls sometimes need a forced click to surface their
        // tooltip for negative-path assertions.
        let page = FakePage::builder()
            .element(FakeElement::new("disabled").matches("#disabled").covered())
            .build();
        let c = coordinator(page.clone());
        let el = resolve(&c, "#disabled").await;

        c.perform_and_wait(&el, Action::ForceClick, WaitStrategy::None, ms(500))
            .await
            .unwrap();
        assert_eq!(page.count_actions("disabled", "force_click"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn network_idle_waits_for_the_quiet_window() {
        let page = FakePage::builder()
            .element(FakeElement::new("save").matches("#save"))
            .build();
        page.on_click("save", ms(0), FakeMutation::NetworkBusy(ms(400)));
        let c = coordinator(page.clone());
        let el = resolve(&c, "#save").await;

        let start = Instant::now();
        c.perform_and_wait(&el, Action::Click, WaitStrategy::NetworkIdle, ms(2000))
            .await
            .unwrap();
        let elapsed = start.elapsed();
        // Busy for 400ms, then a 500ms quiet window must elapse.
        assert!(elapsed >= ms(900), "settled too early: {:?}", elapsed);
        assert!(elapsed <= ms(1100), "settled too late: {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn network_idle_timeout_names_the_strategy() {
        let page = FakePage::builder()
            .element(FakeElement::new("save").matches("#save"))
            .build();
        page.set_network_busy(ms(10_000));
        let c = coordinator(page.clone());
        let el = resolve(&c, "#save").await;

        let err = c
            .perform_and_wait(&el, Action::Click, WaitStrategy::NetworkIdle, ms(1000))
            .await
            .unwrap_err();
        match err {
            ActionError::WaitTimeout {
                strategy,
                elapsed_ms,
            } => {
                assert_eq!(strategy, "network_idle");
                assert!(elapsed_ms >= 1000);
            }
            other => panic!("expected WaitTimeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dom_ready_resolves_once_content_loads() {
        let page = FakePage::builder()
            .ready(DocumentReady::Loading)
            .element(FakeElement::new("nav").matches("#nav"))
            .build();
        page.on_click(
            "nav",
            ms(300),
            FakeMutation::SetReady(DocumentReady::ContentLoaded),
        );
        let c = coordinator(page.clone());
        let el = resolve(&c, "#nav").await;

        c.perform_and_wait(&el, Action::Click, WaitStrategy::DomReady, ms(1000))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn url_predicate_waits_for_navigation() {
        let page = FakePage::builder()
            .url("https://portal.example.com/login")
            .element(FakeElement::new("go").matches("#go"))
            .build();
        page.on_click(
            "go",
            ms(200),
            FakeMutation::SetUrl("https://portal.example.com/dashboard".to_string()),
        );
        let c = coordinator(page.clone());
        let el = resolve(&c, "#go").await;

        c.perform_and_wait(
            &el,
            Action::Click,
            WaitStrategy::UrlPredicate(UrlPredicate::Contains("/dashboard".to_string())),
            ms(1000),
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn url_timeout_carries_the_final_url() {
        let page = FakePage::builder()
            .url("https://portal.example.com/login")
            .element(FakeElement::new("go").matches("#go"))
            .build();
        let c = coordinator(page.clone());
        let el = resolve(&c, "#go").await;

        let err = c
            .perform_and_wait(
                &el,
                Action::Click,
                WaitStrategy::UrlPredicate(UrlPredicate::Contains("/dashboard".to_string())),
                ms(500),
            )
            .await
            .unwrap_err();
        match err {
            ActionError::UrlTimeout {
                final_url,
                elapsed_ms,
                ..
            } => {
                assert_eq!(final_url, "https://portal.example.com/login");
                assert!(elapsed_ms >= 500);
            }
            other => panic!("expected UrlTimeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn element_visible_waits_for_the_confirmation() {
        let page = FakePage::builder()
            .element(FakeElement::new("delete").matches("#delete"))
            .build();
        page.on_click(
            "delete",
            ms(250),
            FakeMutation::Append {
                scope: ScopeId::Main,
                element: FakeElement::new("confirm").matches("#confirm"),
            },
        );
        let c = coordinator(page.clone());
        let el = resolve(&c, "#delete").await;

        c.perform_and_wait(
            &el,
            Action::Click,
            WaitStrategy::ElementVisible(vec![css("#confirm")]),
            ms(1000),
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn element_hidden_waits_for_the_spinner_to_go() {
        let page = FakePage::builder()
            .element(FakeElement::new("search").matches("#search"))
            .element(FakeElement::new("spinner").matches("#spinner"))
            .build();
        page.on_click(
            "search",
            ms(200),
            FakeMutation::Remove(ElementId("spinner".to_string())),
        );
        let c = coordinator(page.clone());
        let el = resolve(&c, "#search").await;

        c.perform_and_wait(
            &el,
            Action::Click,
            WaitStrategy::ElementHidden(vec![css("#spinner")]),
            ms(1000),
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn already_absent_secondary_target_counts_as_hidden() {
        let page = FakePage::builder()
            .element(FakeElement::new("search").matches("#search"))
            .build();
        let c = coordinator(page.clone());
        let el = resolve(&c, "#search").await;

        let start = Instant::now();
        c.perform_and_wait(
            &el,
            Action::Click,
            WaitStrategy::ElementHidden(vec![css("#spinner")]),
            ms(1000),
        )
        .await
        .unwrap();
        assert!(start.elapsed() < ms(50));
    }

    #[tokio::test(start_paused = true)]
    async fn value_actions_reach_the_surface() {
        let page = FakePage::builder()
            .element(FakeElement::new("qty").matches("#qty"))
            .element(FakeElement::new("carrier").matches("#carrier"))
            .build();
        let c = coordinator(page.clone());

        let qty = resolve(&c, "#qty").await;
        c.perform_and_wait(&qty, Action::Fill("3".to_string()), WaitStrategy::None, ms(100))
            .await
            .unwrap();
        c.perform_and_wait(&qty, Action::Clear, WaitStrategy::None, ms(100))
            .await
            .unwrap();
        c.perform_and_wait(
            &qty,
            Action::TypeSequentially("12".to_string()),
            WaitStrategy::None,
            ms(100),
        )
        .await
        .unwrap();

        let carrier = resolve(&c, "#carrier").await;
        c.perform_and_wait(
            &carrier,
            Action::SelectOption("ocean".to_string()),
            WaitStrategy::None,
            ms(100),
        )
        .await
        .unwrap();

        assert_eq!(page.count_actions("qty", "fill"), 1);
        assert_eq!(page.count_actions("qty", "clear"), 1);
        assert_eq!(page.count_actions("qty", "type_text"), 1);
        assert_eq!(page.count_actions("carrier", "select_option"), 1);
    }
}
