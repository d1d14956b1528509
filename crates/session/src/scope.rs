//! Scenario-scoped page lifecycle

use std::future::Future;
use std::sync::Arc;

use tracing::warn;
use waybill_surface::{BrowserSurface, PageSurface};

use crate::errors::BootstrapError;

/// Run one scenario against a fresh page, releasing the page on every exit
/// path. The scenario's own outcome is returned untouched; a close failure
/// is logged rather than allowed to mask it.
pub async fn with_scenario<T, F, Fut>(
    browser: &dyn BrowserSurface,
    scenario: F,
) -> Result<T, BootstrapError>
where
    F: FnOnce(Arc<dyn PageSurface>) -> Fut,
    Fut: Future<Output = Result<T, BootstrapError>>,
{
    let page = browser.new_page().await?;
    let outcome = scenario(page.clone()).await;
    if let Err(err) = page.close().await {
        warn!(error = %err, "failed to release scenario page");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use waybill_surface::fake::FakeBrowser;

    #[tokio::test]
    async fn page_is_released_on_success() {
        let browser = FakeBrowser::new();
        let result = with_scenario(&browser, |page| async move {
            page.current_url().await?;
            Ok(())
        })
        .await;
        assert!(result.is_ok());

        let issued = browser.issued();
        assert_eq!(issued.len(), 1);
        assert!(issued[0].is_closed());
    }

    #[tokio::test]
    async fn page_is_released_on_failure() {
        let browser = FakeBrowser::new();
        let result: Result<(), BootstrapError> =
            with_scenario(&browser, |_page| async move { Err(BootstrapError::EmptyBaseUrl) }).await;
        assert!(matches!(result, Err(BootstrapError::EmptyBaseUrl)));

        let issued = browser.issued();
        assert_eq!(issued.len(), 1);
        assert!(issued[0].is_closed());
    }
}
