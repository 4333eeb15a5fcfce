//! CDP browser control implementation
//!
//! Browser-level operations over the DevTools discovery HTTP endpoint
//! (`/json/version`, `/json`, `/json/new`).

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Discovery HTTP endpoint (e.g., "http://127.0.0.1:9222")
    endpoint: String,
    /// Active connections (target_id -> connection)
    connections: Arc<tokio::sync::Mutex<std::collections::HashMap<String, Arc<dyn CdpConnection>>>>,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller for a discovery endpoint
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint_str = endpoint.into();
        debug!("Creating CDP browser controller for endpoint: {}", endpoint_str);
        Self {
            endpoint: endpoint_str,
            connections: Arc::new(tokio::sync::Mutex::new(std::collections::HashMap::new())),
        }
    }

    /// Controller for a debugging port on localhost
    pub fn for_port(port: u16) -> Self {
        Self::new(format!("http://127.0.0.1:{}", port))
    }

    async fn fetch_json(&self, path: &str) -> Result<serde_json::Value, Error> {
        let url = format!("{}{}", self.endpoint, path);
        debug!("Fetching {}", url);

        let response = reqwest::get(&url)
            .await
            .map_err(|e| Error::connection(format!("Failed to reach {}: {}", url, e)))?;

        response
            .json()
            .await
            .map_err(|e| Error::connection(format!("Failed to parse {}: {}", url, e)))
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    /// Create a new CDP client for a target WebSocket URL
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        info!("Creating CDP client for target: {}", target_url);

        let connection = CdpWebSocketConnection::new(target_url).await?;

        let target_id = target_url.rsplit('/').next().unwrap_or("unknown").to_string();

        let mut connections = self.connections.lock().await;
        connections.insert(target_id, Arc::clone(&connection) as Arc<dyn CdpConnection>);
        drop(connections);

        let client = Arc::new(CdpClientImpl::new(connection));

        // Page and Runtime are the only domains the session layer relies on
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    /// Close all tracked connections to the browser
    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;

        if connections.is_empty() {
            debug!("No active CDP connections to close");
            return Ok(());
        }

        info!("Closing {} active CDP connections", connections.len());

        let mut failed = 0;
        for (target_id, connection) in connections.iter() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target_id, e);
                failed += 1;
            }
        }

        let total = connections.len();
        connections.clear();
        debug!("Connection close summary: {} succeeded, {} failed", total - failed, failed);

        Ok(())
    }

    /// Get browser version
    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let version_json = self.fetch_json("/json/version").await?;

        Ok(BrowserVersion {
            protocol_version: version_json
                .get("Protocol-Version")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            product: version_json
                .get("Browser")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            websocket_debugger_url: version_json
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }

    /// List all targets (pages, workers, etc.)
    async fn get_targets(&self) -> Result<Vec<TargetInfo>, Error> {
        let targets_json = self.fetch_json("/json").await?;

        let targets_json = targets_json
            .as_array()
            .ok_or_else(|| Error::connection("Target list is not an array"))?;

        let mut targets = Vec::new();
        for target_json in targets_json {
            if let (Some(target_id), Some(target_type), Some(url)) = (
                target_json.get("id").and_then(|v| v.as_str()),
                target_json.get("type").and_then(|v| v.as_str()),
                target_json.get("url").and_then(|v| v.as_str()),
            ) {
                targets.push(TargetInfo {
                    target_id: target_id.to_string(),
                    target_type: target_type.to_string(),
                    title: target_json
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    url: url.to_string(),
                    websocket_debugger_url: target_json
                        .get("webSocketDebuggerUrl")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                });
            }
        }

        Ok(targets)
    }

    /// Create a new page target using the /json/new discovery endpoint
    async fn create_target(&self, url: &str) -> Result<String, Error> {
        info!("Creating new target with URL: {}", url);

        let new_url = format!("{}/json/new?{}", self.endpoint, url);

        let client = reqwest::Client::new();
        let response = client.put(&new_url).send().await.map_err(|e| {
            Error::connection(format!(
                "Failed to reach DevTools endpoint at {}: {}",
                self.endpoint, e
            ))
        })?;

        let target_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::connection(format!("Failed to parse new target response: {}", e)))?;

        let ws_url = target_json
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::connection("No webSocketDebuggerUrl in new target response"))?;

        debug!("Created new target with WebSocket URL: {}", ws_url);

        Ok(ws_url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_creation() {
        let browser = CdpBrowserImpl::new("http://127.0.0.1:9222");
        assert_eq!(browser.endpoint, "http://127.0.0.1:9222");
    }

    #[test]
    fn test_for_port() {
        let browser = CdpBrowserImpl::for_port(9333);
        assert_eq!(browser.endpoint, "http://127.0.0.1:9333");
    }
}
