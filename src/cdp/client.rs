//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for common operations.

use super::traits::*;
use super::types::{EvaluateParams, EvaluateResponse, NavigateParams, RemoteObject};
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tracing::{debug, info};

/// Expression reading the HTTP status of the main document from the
/// navigation timing entry. Yields 0 when the browser does not expose it.
const RESPONSE_STATUS_EXPRESSION: &str = "(() => { \
    const e = performance.getEntriesByType('navigation')[0]; \
    return e && e.responseStatus ? e.responseStatus : 0; \
})()";

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
}

impl CdpClientImpl {
    /// Create a new CDP client
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => {
                let value = obj
                    .value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                EvaluationResult::String(value)
            }
            "number" => {
                let value = obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
                EvaluationResult::Number(value)
            }
            "boolean" => {
                let value = obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false);
                EvaluationResult::Bool(value)
            }
            "undefined" | "null" => EvaluationResult::Null,
            "object" | "function" | "bigint" | "symbol" => {
                EvaluationResult::Object(obj.value.clone().unwrap_or(serde_json::Value::Null))
            }
            _ => EvaluationResult::Null,
        }
    }

    /// Poll document.readyState until the page settles or the attempts run out
    async fn wait_for_load(&self) {
        let max_attempts = 50; // 5 seconds (50 * 100ms)

        for attempt in 0..max_attempts {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            match self.evaluate("document.readyState", false).await {
                Ok(EvaluationResult::String(state)) if state == "complete" => {
                    debug!("Page loaded on attempt {}", attempt + 1);
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    // Page might not be ready yet, continue polling
                    debug!("Ready state check failed on attempt {}: {}", attempt + 1, e);
                }
            }
        }

        debug!("Page load polling timeout - continuing anyway");
    }

    /// Read the main document status from the navigation timing entry
    async fn response_status(&self) -> u16 {
        match self.evaluate(RESPONSE_STATUS_EXPRESSION, false).await {
            Ok(EvaluationResult::Number(n)) if n > 0.0 => n as u16,
            _ => 200, // older browsers do not expose responseStatus
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    /// Get the underlying connection
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
            referrer: None,
        };

        let result = self
            .call_method("Page.navigate", serde_json::to_value(params)?)
            .await?;

        // A non-empty errorText means the navigation itself failed (bad DNS,
        // connection refused, aborted load)
        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            if !error_text.is_empty() {
                return Err(Error::navigation(format!("{}: {}", url, error_text)));
            }
        }

        self.wait_for_load().await;

        let status_code = self.response_status().await;

        let final_url = match self.evaluate("window.location.href", false).await {
            Ok(EvaluationResult::String(href)) if !href.is_empty() => href,
            _ => url.to_string(),
        };

        Ok(NavigationResult {
            url: final_url,
            status_code,
        })
    }

    /// Evaluate JavaScript in the page
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        };

        let result = self
            .call_method("Runtime.evaluate", serde_json::to_value(params)?)
            .await?;

        let eval_response: EvaluateResponse = serde_json::from_value(result)
            .map_err(|e| Error::cdp(format!("Failed to parse evaluate response: {}", e)))?;

        if let Some(exception) = &eval_response.exception_details {
            return Err(Error::script_execution_failed(
                exception
                    .get("exception")
                    .and_then(|e| e.get("description"))
                    .and_then(|d| d.as_str())
                    .unwrap_or("Unknown error")
                    .to_string(),
            ));
        }

        Ok(Self::parse_remote_object(&eval_response.result))
    }

    /// Capture a screenshot
    async fn screenshot(&self, format: ScreenshotFormat, full_page: bool) -> Result<Vec<u8>, Error> {
        info!("Capturing screenshot (full_page: {})", full_page);

        let (format_str, quality) = match format {
            ScreenshotFormat::Png => ("png", None),
            ScreenshotFormat::Jpeg(q) => ("jpeg", Some(q)),
        };

        let mut params = serde_json::json!({
            "format": format_str,
            "captureBeyondViewport": full_page,
        });

        if let Some(q) = quality {
            params["quality"] = serde_json::json!(q);
        }

        let result = self.call_method("Page.captureScreenshot", params).await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    /// Enable a domain
    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);

        let method = format!("{}.enable", domain);
        let _ = self.call_method(&method, serde_json::json!({})).await?;

        Ok(())
    }

    /// Call a raw CDP method
    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;

        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_object_string() {
        let obj = RemoteObject {
            r#type: "string".to_string(),
            value: Some(serde_json::json!("test")),
            ..RemoteObject::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::String(s) if s == "test"));
    }

    #[test]
    fn test_parse_remote_object_number() {
        let obj = RemoteObject {
            r#type: "number".to_string(),
            value: Some(serde_json::json!(42.5)),
            ..RemoteObject::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::Number(n) if n == 42.5));
    }

    #[test]
    fn test_parse_remote_object_bool() {
        let obj = RemoteObject {
            r#type: "boolean".to_string(),
            value: Some(serde_json::json!(true)),
            ..RemoteObject::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::Bool(true)));
    }

    #[test]
    fn test_parse_remote_object_null() {
        let obj = RemoteObject {
            r#type: "undefined".to_string(),
            ..RemoteObject::default()
        };

        let result = CdpClientImpl::parse_remote_object(&obj);
        assert!(matches!(result, EvaluationResult::Null));
    }

    #[tokio::test]
    async fn test_navigate_surfaces_error_text() {
        let connection = Arc::new(crate::cdp::mock::MockCdpConnection::with_navigation_error(
            "net::ERR_NAME_NOT_RESOLVED",
        ));
        let client = CdpClientImpl::new(connection);

        let result = client.navigate("https://no-such-host.invalid/").await;
        assert!(matches!(result, Err(Error::Navigation(_))));
    }
}
