//! CDP (Chrome DevTools Protocol) type definitions
//!
//! This module defines the core data structures for CDP communication.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// CDP JSON-RPC notification (event)
#[derive(Debug, Clone, Deserialize)]
pub struct CdpNotification {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    #[serde(default)]
    pub params: serde_json::Value,
}

/// CDP JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
    /// Referrer URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// JavaScript evaluation parameters
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Whether to await promise
    #[serde(skip_serializing_if = "Option::is_none", rename = "awaitPromise")]
    pub await_promise: Option<bool>,
    /// Whether to return as value
    #[serde(skip_serializing_if = "Option::is_none", rename = "returnByValue")]
    pub return_by_value: Option<bool>,
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
    /// Exception details if evaluation failed
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_request_serialization() {
        let request = CdpRequest {
            id: 1,
            method: "Page.navigate".to_string(),
            params: Some(serde_json::json!({ "url": "https://example.com" })),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"Page.navigate\""));
    }

    #[test]
    fn test_cdp_request_without_params() {
        let request = CdpRequest {
            id: 2,
            method: "Page.enable".to_string(),
            params: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        // params should not be serialized when None
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn test_response_with_error_deserialization() {
        let json = r#"{"id":7,"error":{"code":-32000,"message":"Cannot navigate"}}"#;
        let response: CdpRpcResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.id, 7);
        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "Cannot navigate");
    }

    #[test]
    fn test_notification_deserialization() {
        let json = r#"{"method":"Page.loadEventFired","params":{"timestamp":12.5}}"#;
        let notification: CdpNotification = serde_json::from_str(json).unwrap();

        assert_eq!(notification.method, "Page.loadEventFired");
    }
}
