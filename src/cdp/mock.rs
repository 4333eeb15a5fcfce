//! Mock CDP implementation for testing
//!
//! This module provides mock implementations of CDP traits for development and testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cdp::traits::*;
use crate::Error;

/// Mock CDP connection
#[derive(Debug)]
pub struct MockCdpConnection {
    is_active: Arc<AtomicBool>,
    next_id: AtomicU64,
    /// Injected Page.navigate errorText
    navigation_error: Option<String>,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self {
            is_active: Arc::new(AtomicBool::new(true)),
            next_id: AtomicU64::new(1),
            navigation_error: None,
        }
    }

    /// Connection whose Page.navigate replies carry the given errorText
    pub fn with_navigation_error<S: Into<String>>(error_text: S) -> Self {
        Self {
            navigation_error: Some(error_text.into()),
            ..Self::new()
        }
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, _params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Connection is closed"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Simulate different responses based on method
        let result = match method {
            "Page.navigate" => match &self.navigation_error {
                Some(error_text) => Some(serde_json::json!({
                    "frameId": uuid::Uuid::new_v4().to_string(),
                    "errorText": error_text,
                })),
                None => Some(serde_json::json!({
                    "frameId": uuid::Uuid::new_v4().to_string(),
                    "loaderId": uuid::Uuid::new_v4().to_string(),
                })),
            },
            "Runtime.evaluate" => Some(serde_json::json!({
                "result": {
                    "type": "string",
                    "value": "complete"
                }
            })),
            "Page.captureScreenshot" => Some(serde_json::json!({
                "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg=="
            })),
            _ => Some(serde_json::json!({})),
        };

        Ok(CdpResponse {
            id,
            result,
            error: None,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Mock CDP client with scripted evaluate results
///
/// Evaluate results are matched by substring against the incoming expression,
/// first registration wins.
#[derive(Debug)]
pub struct MockCdpClient {
    connection: Arc<MockCdpConnection>,
    eval_responses: Mutex<Vec<(String, serde_json::Value)>>,
    visited: Mutex<Vec<String>>,
    status_code: u16,
}

impl MockCdpClient {
    /// Create a new mock CDP client
    pub fn new() -> Self {
        Self {
            connection: Arc::new(MockCdpConnection::new()),
            eval_responses: Mutex::new(Vec::new()),
            visited: Mutex::new(Vec::new()),
            status_code: 200,
        }
    }

    /// Client whose navigations report the given status code
    pub fn with_status(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::new()
        }
    }

    /// Register an evaluate reply for expressions containing `fragment`
    pub async fn script_eval<S: Into<String>>(&self, fragment: S, value: serde_json::Value) {
        self.eval_responses.lock().await.push((fragment.into(), value));
    }

    /// URLs passed to navigate, in order
    pub async fn visited(&self) -> Vec<String> {
        self.visited.lock().await.clone()
    }
}

impl Default for MockCdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        self.connection.clone()
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        self.visited.lock().await.push(url.to_string());
        Ok(NavigationResult {
            url: url.to_string(),
            status_code: self.status_code,
        })
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult, Error> {
        let responses = self.eval_responses.lock().await;
        for (fragment, value) in responses.iter() {
            if script.contains(fragment.as_str()) {
                return Ok(match value {
                    serde_json::Value::String(s) => EvaluationResult::String(s.clone()),
                    serde_json::Value::Number(n) => {
                        EvaluationResult::Number(n.as_f64().unwrap_or(0.0))
                    }
                    serde_json::Value::Bool(b) => EvaluationResult::Bool(*b),
                    serde_json::Value::Null => EvaluationResult::Null,
                    other => EvaluationResult::Object(other.clone()),
                });
            }
        }
        Ok(EvaluationResult::Null)
    }

    async fn screenshot(&self, format: ScreenshotFormat, _full_page: bool) -> Result<Vec<u8>, Error> {
        // Minimal magic bytes are enough for the callers under test
        Ok(match format {
            ScreenshotFormat::Png => vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            ScreenshotFormat::Jpeg(_) => vec![0xFF, 0xD8, 0xFF, 0xE0],
        })
    }

    async fn enable_domain(&self, _domain: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;

        if let Some(error) = response.error {
            return Err(Error::cdp(format!("{:?}", error)));
        }

        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }
}

/// Mock CDP browser
#[derive(Debug)]
pub struct MockCdpBrowser {
    is_active: AtomicBool,
    targets: Vec<TargetInfo>,
}

impl MockCdpBrowser {
    /// Create a new mock CDP browser with no pre-existing targets
    pub fn new() -> Self {
        Self {
            is_active: AtomicBool::new(true),
            targets: Vec::new(),
        }
    }

    /// Browser that already has the given page targets open
    pub fn with_targets(targets: Vec<TargetInfo>) -> Self {
        Self {
            is_active: AtomicBool::new(true),
            targets,
        }
    }
}

impl Default for MockCdpBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_client(&self, _target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Browser is closed"));
        }

        Ok(Arc::new(MockCdpClient::new()))
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "Chrome/120.0.0.0".to_string(),
            websocket_debugger_url: Some("ws://127.0.0.1:9222/devtools/browser/mock".to_string()),
        })
    }

    async fn get_targets(&self) -> Result<Vec<TargetInfo>, Error> {
        Ok(self.targets.clone())
    }

    async fn create_target(&self, url: &str) -> Result<String, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Browser is closed"));
        }

        let target_id = uuid::Uuid::new_v4().to_string();
        let ws_url = format!("ws://127.0.0.1:9222/devtools/page/{}", target_id);
        tracing::debug!("Mock: Created target for {} => {}", url, ws_url);
        Ok(ws_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connection() {
        let conn = MockCdpConnection::new();
        assert!(conn.is_active());

        let response = conn
            .send_command("Runtime.evaluate", serde_json::json!({}))
            .await
            .unwrap();
        assert!(response.result.is_some());
        assert!(response.error.is_none());

        conn.close().await.unwrap();
        assert!(!conn.is_active());
    }

    #[tokio::test]
    async fn test_mock_client_records_navigations() {
        let client = MockCdpClient::new();

        let result = client.navigate("https://example.com").await.unwrap();
        assert_eq!(result.url, "https://example.com");
        assert_eq!(result.status_code, 200);

        assert_eq!(client.visited().await, vec!["https://example.com"]);
    }

    #[tokio::test]
    async fn test_mock_client_scripted_evaluate() {
        let client = MockCdpClient::new();
        client
            .script_eval("document.title", serde_json::json!("Test Page"))
            .await;

        let result = client.evaluate("document.title", false).await.unwrap();
        assert!(matches!(result, EvaluationResult::String(s) if s == "Test Page"));

        // Unregistered expressions evaluate to null
        let result = client.evaluate("1 + 1", false).await.unwrap();
        assert!(matches!(result, EvaluationResult::Null));
    }

    #[tokio::test]
    async fn test_mock_browser_targets() {
        let browser = MockCdpBrowser::new();
        assert!(browser.get_targets().await.unwrap().is_empty());

        let ws_url = browser.create_target("about:blank").await.unwrap();
        assert!(ws_url.starts_with("ws://"));

        browser.close().await.unwrap();
        assert!(browser.create_target("about:blank").await.is_err());
    }
}
