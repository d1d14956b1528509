//! Polling resolver over the candidate x scope matrix

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use waybill_core_types::{ScopeId, SelectorCandidate};
use waybill_surface::PageSurface;

use crate::errors::LocatorError;
use crate::types::{ResolvedElement, ResolverConfig};

/// Element resolver seam. Step and page code depend on this trait so the
/// engine can be swapped in tests.
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve or raise `ResolutionTimeout` when the budget expires.
    async fn resolve(
        &self,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<ResolvedElement, LocatorError>;

    /// Optional lookup: `Ok(None)` on budget expiry, never a timeout error.
    async fn try_resolve(
        &self,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<Option<ResolvedElement>, LocatorError>;
}

/// Default resolver: fixed-interval polling with a global budget across the
/// whole candidate x scope matrix.
pub struct PollingResolver {
    page: Arc<dyn PageSurface>,
    config: ResolverConfig,
}

impl PollingResolver {
    pub fn new(page: Arc<dyn PageSurface>) -> Self {
        Self::with_config(page, ResolverConfig::default())
    }

    pub fn with_config(page: Arc<dyn PageSurface>, config: ResolverConfig) -> Self {
        Self { page, config }
    }

    /// Query one scope for one candidate. Detached frames and kind-invalid
    /// candidates count as zero matches; anything else is a real failure.
    async fn first_match(
        &self,
        scope: &ScopeId,
        candidate: &SelectorCandidate,
    ) -> Result<Option<ResolvedElement>, LocatorError> {
        match self.page.query(scope, candidate).await {
            Ok(handles) => Ok(handles
                .into_iter()
                .next()
                .map(|handle| ResolvedElement::new(handle, candidate.clone()))),
            Err(err) if err.is_empty_query() => {
                debug!(scope = %scope, candidate = %candidate, error = %err, "scope yielded no matches");
                Ok(None)
            }
            Err(err) => Err(LocatorError::Surface(err)),
        }
    }

    /// One pass over the matrix: every candidate against the main document in
    /// list order, then every candidate against each live frame in attachment
    /// order. Candidate-list order is the primary tie-break; DOM order within
    /// a query is secondary.
    async fn sweep(
        &self,
        candidates: &[SelectorCandidate],
    ) -> Result<Option<ResolvedElement>, LocatorError> {
        for candidate in candidates {
            if let Some(found) = self.first_match(&ScopeId::Main, candidate).await? {
                return Ok(Some(found));
            }
        }

        let frames = self.page.frames().await?;
        for candidate in candidates {
            for frame in &frames {
                let scope = ScopeId::Frame(frame.clone());
                if let Some(found) = self.first_match(&scope, candidate).await? {
                    return Ok(Some(found));
                }
            }
        }

        Ok(None)
    }

    /// Shared loop behind both resolve flavors. Runs at least one full pass
    /// even with a zero budget, and never sleeps past the deadline.
    async fn resolve_inner(
        &self,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<(Option<ResolvedElement>, Duration), LocatorError> {
        if candidates.is_empty() {
            return Err(LocatorError::NoCandidates);
        }

        let start = Instant::now();
        loop {
            if let Some(found) = self.sweep(candidates).await? {
                debug!(
                    candidate = %found.matched,
                    scope = %found.scope(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "resolved element"
                );
                return Ok((Some(found), start.elapsed()));
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok((None, elapsed));
            }
            sleep(self.config.poll_interval.min(timeout - elapsed)).await;
        }
    }
}

#[async_trait]
impl ElementResolver for PollingResolver {
    async fn resolve(
        &self,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<ResolvedElement, LocatorError> {
        let (found, elapsed) = self.resolve_inner(candidates, timeout).await?;
        match found {
            Some(element) => Ok(element),
            None => {
                let err = LocatorError::ResolutionTimeout {
                    candidates: SelectorCandidate::describe_list(candidates),
                    timeout_ms: timeout.as_millis() as u64,
                    elapsed_ms: elapsed.as_millis() as u64,
                };
                info!(error = %err, "resolution exhausted its budget");
                Err(err)
            }
        }
    }

    async fn try_resolve(
        &self,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<Option<ResolvedElement>, LocatorError> {
        let (found, _) = self.resolve_inner(candidates, timeout).await?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waybill_core_types::FrameId;
    use waybill_surface::fake::{FakeElement, FakeMutation, FakePage};

    fn css(expr: &str) -> SelectorCandidate {
        SelectorCandidate::Css(expr.to_string())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn finds_present_element_immediately() {
        let page = FakePage::builder()
            .element(FakeElement::new("user").matches("#user"))
            .build();
        let resolver = PollingResolver::new(page);

        let start = Instant::now();
        let found = resolver.resolve(&[css("#user")], ms(1000)).await.unwrap();
        assert_eq!(found.handle.element.0, "user");
        assert!(found.scope().is_main());
        assert!(start.elapsed() < ms(50));
    }

    #[tokio::test(start_paused = true)]
    async fn finds_element_appended_mid_budget() {
        let page = FakePage::builder().build();
        page.schedule(
            ms(300),
            FakeMutation::Append {
                scope: ScopeId::Main,
                element: FakeElement::new("user").matches("#user"),
            },
        );
        let resolver = PollingResolver::new(page);

        let start = Instant::now();
        let found = resolver.resolve(&[css("#user")], ms(1000)).await.unwrap();
        let elapsed = start.elapsed();
        assert_eq!(found.handle.element.0, "user");
        assert!(elapsed >= ms(300), "found too early: {:?}", elapsed);
        assert!(elapsed <= ms(550), "found too late: {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_raises_within_one_poll_interval() {
        let page = FakePage::builder().build();
        let resolver = PollingResolver::new(page);

        let start = Instant::now();
        let err = resolver
            .resolve(&[css("#missing")], ms(500))
            .await
            .unwrap_err();
        let elapsed = start.elapsed();
        assert!(elapsed >= ms(500), "raised too early: {:?}", elapsed);
        assert!(elapsed <= ms(750), "raised too late: {:?}", elapsed);

        match err {
            LocatorError::ResolutionTimeout {
                candidates,
                timeout_ms,
                elapsed_ms,
            } => {
                assert!(candidates.contains("#missing"));
                assert_eq!(timeout_ms, 500);
                assert!(elapsed_ms >= 500);
            }
            other => panic!("expected ResolutionTimeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn optional_lookup_returns_none_quietly() {
        let page = FakePage::builder().build();
        let resolver = PollingResolver::new(page);

        let found = resolver
            .try_resolve(&[css("#missing")], ms(300))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn candidate_list_order_is_primary_tie_break() {
        // DOM order has #b first; candidate order asks for #a first.
        let page = FakePage::builder()
            .element(FakeElement::new("b").matches("#b"))
            .element(FakeElement::new("a").matches("#a"))
            .build();
        let resolver = PollingResolver::new(page);

        let found = resolver
            .resolve(&[css("#a"), css("#b")], ms(500))
            .await
            .unwrap();
        assert_eq!(found.handle.element.0, "a");
        assert_eq!(found.matched, css("#a"));
    }

    #[tokio::test(start_paused = true)]
    async fn dom_order_breaks_ties_within_one_candidate() {
        let page = FakePage::builder()
            .element(FakeElement::new("row-1").matches(".row"))
            .element(FakeElement::new("row-2").matches(".row"))
            .build();
        let resolver = PollingResolver::new(page);

        let found = resolver.resolve(&[css(".row")], ms(500)).await.unwrap();
        assert_eq!(found.handle.element.0, "row-1");
    }

    #[tokio::test(start_paused = true)]
    async fn main_document_tier_beats_frames() {
        // The frame matches the first candidate, the main document only the
        // second; the main-document tier is still searched first.
        let page = FakePage::builder()
            .element(FakeElement::new("main-hit").matches("#second"))
            .frame(
                "embedded",
                vec![FakeElement::new("frame-hit").matches("#first")],
            )
            .build();
        let resolver = PollingResolver::new(page);

        let found = resolver
            .resolve(&[css("#first"), css("#second")], ms(500))
            .await
            .unwrap();
        assert_eq!(found.handle.element.0, "main-hit");
        assert!(found.scope().is_main());
    }

    #[tokio::test(start_paused = true)]
    async fn frame_match_found_when_main_is_empty() {
        let page = FakePage::builder()
            .frame("first", vec![])
            .frame(
                "second",
                vec![FakeElement::new("target").matches("#target")],
            )
            .build();
        let resolver = PollingResolver::new(page);

        let found = resolver.resolve(&[css("#target")], ms(500)).await.unwrap();
        assert_eq!(
            found.scope(),
            &ScopeId::Frame(FrameId("second".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn detaching_frame_does_not_abort_resolution() {
        let page = FakePage::builder()
            .frame("doomed", vec![FakeElement::new("x").matches("#other")])
            .build();
        page.schedule(ms(100), FakeMutation::DetachFrame(FrameId("doomed".to_string())));
        page.schedule(
            ms(400),
            FakeMutation::Append {
                scope: ScopeId::Main,
                element: FakeElement::new("late").matches("#late"),
            },
        );
        let resolver = PollingResolver::new(page);

        let found = resolver.resolve(&[css("#late")], ms(1000)).await.unwrap();
        assert_eq!(found.handle.element.0, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_candidate_is_skipped_not_fatal() {
        let page = FakePage::builder()
            .invalid_selector("##bad")
            .element(FakeElement::new("good").matches("#good"))
            .build();
        let resolver = PollingResolver::new(page);

        let found = resolver
            .resolve(&[css("##bad"), css("#good")], ms(500))
            .await
            .unwrap();
        assert_eq!(found.handle.element.0, "good");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_resolution_is_idempotent_on_stable_dom() {
        let page = FakePage::builder()
            .element(FakeElement::new("stable").matches("#stable"))
            .build();
        let resolver = PollingResolver::new(page);

        let first = resolver.resolve(&[css("#stable")], ms(500)).await.unwrap();
        let second = resolver.resolve(&[css("#stable")], ms(500)).await.unwrap();
        assert_eq!(first.handle, second.handle);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_still_runs_one_pass() {
        let page = FakePage::builder()
            .element(FakeElement::new("user").matches("#user"))
            .build();
        let resolver = PollingResolver::new(page);

        let found = resolver.resolve(&[css("#user")], ms(0)).await.unwrap();
        assert_eq!(found.handle.element.0, "user");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_candidate_list_is_rejected() {
        let page = FakePage::builder().build();
        let resolver = PollingResolver::new(page);

        assert!(matches!(
            resolver.resolve(&[], ms(500)).await,
            Err(LocatorError::NoCandidates)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn role_and_text_candidates_resolve() {
        let page = FakePage::builder()
            .element(FakeElement::new("sign-in").role("button", "Sign in"))
            .element(FakeElement::new("banner").text("Welcome to the portal"))
            .build();
        let resolver = PollingResolver::new(page);

        let by_role = resolver
            .resolve(
                &[SelectorCandidate::Role {
                    role: "button".to_string(),
                    name: "sign in".to_string(),
                }],
                ms(500),
            )
            .await
            .unwrap();
        assert_eq!(by_role.handle.element.0, "sign-in");

        let by_text = resolver
            .resolve(
                &[SelectorCandidate::Text {
                    content: "welcome".to_string(),
                    exact: false,
                }],
                ms(500),
            )
            .await
            .unwrap();
        assert_eq!(by_text.handle.element.0, "banner");
    }
}
