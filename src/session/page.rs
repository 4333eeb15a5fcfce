//! Page capability and its CDP-backed implementation
//!
//! Jobs drive a session through this trait; the session layer never exposes
//! raw protocol plumbing to them. All DOM waits are bounded polls with an
//! explicit timeout, surfacing `Error::ElementTimeout` on expiry.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use crate::cdp::{CdpClient, EvaluationResult, NavigationResult, ScreenshotFormat};
use crate::{Error, Result};

/// Page capability trait
#[async_trait]
pub trait Page: Send + Sync + std::fmt::Debug {
    /// Navigate to a URL
    async fn goto(&self, url: &str) -> Result<NavigationResult>;

    /// Wait until a CSS selector matches an element
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Wait until a JavaScript expression evaluates to true
    async fn wait_for_function(&self, expression: &str, timeout: Duration) -> Result<()>;

    /// Text content of the first element matching a selector
    async fn text_content(&self, selector: &str) -> Result<Option<String>>;

    /// Whether the first element matching a selector is visible
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Evaluate a JavaScript expression
    async fn evaluate(&self, expression: &str) -> Result<EvaluationResult>;

    /// Capture a PNG screenshot
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    /// Close the page connection
    async fn close(&self) -> Result<()>;

    /// Check if the page connection is active
    fn is_active(&self) -> bool;
}

/// Embed a string as a JavaScript string literal
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// CDP-backed page implementation
#[derive(Debug)]
pub struct CdpPage {
    client: Arc<dyn CdpClient>,
    poll_interval: Duration,
}

impl CdpPage {
    /// Create a page over a CDP client
    pub fn new(client: Arc<dyn CdpClient>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Poll an expression until it is true or the deadline passes
    async fn wait_until(&self, what: &str, expression: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.client.evaluate(expression, false).await {
                Ok(EvaluationResult::Bool(true)) => return Ok(()),
                Ok(_) => {}
                Err(Error::ScriptExecutionFailed(e)) => {
                    // The document may still be mid-navigation
                    debug!("Wait expression failed, retrying: {}", e);
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(Error::element_timeout(format!(
                    "{} not satisfied within {:?}",
                    what, timeout
                )));
            }

            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn goto(&self, url: &str) -> Result<NavigationResult> {
        self.client.navigate(url).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let expression = format!("document.querySelector({}) !== null", js_string(selector));
        self.wait_until(selector, &expression, timeout).await
    }

    async fn wait_for_function(&self, expression: &str, timeout: Duration) -> Result<()> {
        self.wait_until("wait condition", expression, timeout).await
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        let expression = format!(
            "(() => {{ const e = document.querySelector({}); return e ? e.textContent : null; }})()",
            js_string(selector)
        );

        match self.client.evaluate(&expression, false).await? {
            EvaluationResult::String(text) => Ok(Some(text)),
            _ => Ok(None),
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let expression = format!(
            "(() => {{ \
                const e = document.querySelector({}); \
                if (!e) return false; \
                const r = e.getBoundingClientRect(); \
                return r.width > 0 && r.height > 0 && getComputedStyle(e).visibility !== 'hidden'; \
            }})()",
            js_string(selector)
        );

        match self.client.evaluate(&expression, false).await? {
            EvaluationResult::Bool(visible) => Ok(visible),
            _ => Ok(false),
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<EvaluationResult> {
        self.client.evaluate(expression, false).await
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        self.client.screenshot(ScreenshotFormat::Png, full_page).await
    }

    async fn close(&self) -> Result<()> {
        self.client.connection().close().await
    }

    fn is_active(&self) -> bool {
        self.client.connection().is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::MockCdpClient;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_string(".loader"), "\".loader\"");
    }

    #[tokio::test]
    async fn test_wait_for_selector_found() {
        let client = Arc::new(MockCdpClient::new());
        client
            .script_eval("document.querySelector(\".hero\")", serde_json::json!(true))
            .await;

        let page = CdpPage::new(client);
        let result = page
            .wait_for_selector(".hero", Duration::from_millis(500))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_selector_times_out() {
        let client = Arc::new(MockCdpClient::new());
        let page = CdpPage::new(client);

        let result = page
            .wait_for_selector(".missing", Duration::from_millis(250))
            .await;
        assert!(matches!(result, Err(Error::ElementTimeout(_))));
    }

    #[tokio::test]
    async fn test_text_content() {
        let client = Arc::new(MockCdpClient::new());
        client
            .script_eval("querySelector(\"h3\")", serde_json::json!("You are a bot"))
            .await;

        let page = CdpPage::new(client);
        let text = page.text_content("h3").await.unwrap();
        assert_eq!(text.as_deref(), Some("You are a bot"));
    }

    #[tokio::test]
    async fn test_text_content_missing_element() {
        let client = Arc::new(MockCdpClient::new());
        let page = CdpPage::new(client);

        // Mock evaluates unregistered expressions to null
        let text = page.text_content("h3").await.unwrap();
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_is_visible() {
        let client = Arc::new(MockCdpClient::new());
        client
            .script_eval("status__status.trustworthy", serde_json::json!(true))
            .await;

        let page = CdpPage::new(client);
        assert!(page
            .is_visible(".identity-status__status.trustworthy")
            .await
            .unwrap());
        assert!(!page
            .is_visible(".identity-status__status.unreliable")
            .await
            .unwrap());
    }
}
