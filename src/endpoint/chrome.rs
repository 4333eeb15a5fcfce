//! Chrome acquisition implementation
//!
//! Launch mode spawns Chrome on an ephemeral debugging port and discovers the
//! chosen port through the DevToolsActivePort file in the profile directory.
//! Attach mode probes `http://localhost:{port}/json/version` and only spawns a
//! subprocess when nothing is listening yet.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use super::{BrowserEndpoint, HandleBundle};
use crate::cdp::{CdpBrowser, CdpBrowserImpl};
use crate::config::{AttachMode, SessionConfig};
use crate::session::{CdpPage, Page};
use crate::{Error, Result};

/// Well-known Chrome executable locations, checked in order
const CHROME_CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
];

/// Chrome-backed browser endpoint
#[derive(Debug, Default)]
pub struct ChromeEndpoint;

impl ChromeEndpoint {
    /// Create a new Chrome endpoint
    pub fn new() -> Self {
        Self
    }

    /// Resolve the Chrome executable path
    fn resolve_executable(config: &SessionConfig) -> Result<String> {
        if let Some(path) = &config.chrome_path {
            return Ok(path.clone());
        }

        for candidate in CHROME_CANDIDATES {
            if Path::new(candidate).exists() {
                return Ok((*candidate).to_string());
            }
        }

        Err(Error::launch(
            "No Chrome executable found; set chrome_path or SCRAPPER_CHROME_PATH",
        ))
    }

    /// Build the Chrome argument list for a debugging port
    ///
    /// Port 0 asks Chrome to pick an ephemeral port and publish it through the
    /// DevToolsActivePort file.
    pub fn chrome_args(config: &SessionConfig, port: u16) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", port),
            format!("--user-data-dir={}", config.profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
        ];

        if config.headless {
            args.push("--headless=new".to_string());
        }

        args
    }

    /// Spawn the Chrome subprocess
    fn spawn_chrome(config: &SessionConfig, port: u16) -> Result<Child> {
        let executable = Self::resolve_executable(config)?;
        let args = Self::chrome_args(config, port);

        info!("Spawning {} with debugging port {}", executable, port);

        Command::new(&executable)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::launch(format!("Failed to spawn {}: {}", executable, e)))
    }

    /// Single readiness probe of the discovery endpoint
    ///
    /// `None` means "not yet ready": connection failure or a version document
    /// without a webSocketDebuggerUrl field.
    pub async fn probe_debugger_url(port: u16) -> Option<String> {
        let url = format!("http://localhost:{}/json/version", port);

        let response = reqwest::get(&url).await.ok()?;
        let version: serde_json::Value = response.json().await.ok()?;

        version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Poll the discovery endpoint until it publishes a debugger URL
    pub async fn poll_debugger_url(
        port: u16,
        deadline: Instant,
        interval: Duration,
    ) -> Result<String> {
        loop {
            if let Some(ws_url) = Self::probe_debugger_url(port).await {
                return Ok(ws_url);
            }

            if Instant::now() >= deadline {
                return Err(Error::timeout(format!(
                    "Debugging endpoint on port {} never became reachable",
                    port
                )));
            }

            debug!("Endpoint on port {} not ready yet, retrying", port);
            sleep(interval).await;
        }
    }

    /// Poll the DevToolsActivePort file Chrome writes into the profile dir
    async fn poll_devtools_port(
        profile_dir: &Path,
        deadline: Instant,
        interval: Duration,
    ) -> Result<u16> {
        let port_file = profile_dir.join("DevToolsActivePort");

        loop {
            if let Ok(content) = tokio::fs::read_to_string(&port_file).await {
                if let Some(port) = content.lines().next().and_then(|l| l.trim().parse().ok()) {
                    return Ok(port);
                }
            }

            if Instant::now() >= deadline {
                return Err(Error::timeout(format!(
                    "Chrome never published {}",
                    port_file.display()
                )));
            }

            sleep(interval).await;
        }
    }

    /// Build the page handle once the debugging port is known
    ///
    /// Reuses the first existing page target (a restored session keeps its
    /// pages open), otherwise creates a fresh one.
    async fn open_page(port: u16) -> Result<(Arc<dyn CdpBrowser>, Arc<dyn Page>)> {
        let browser: Arc<dyn CdpBrowser> = Arc::new(CdpBrowserImpl::for_port(port));

        match browser.get_version().await {
            Ok(version) => info!("Connected to {}", version.product),
            Err(e) => debug!("Version fetch failed: {}", e),
        }

        let targets = browser.get_targets().await?;
        let existing = targets
            .into_iter()
            .find(|t| t.target_type == "page" && t.websocket_debugger_url.is_some());

        let ws_url = match existing {
            Some(target) => {
                debug!("Reusing existing page target {}", target.target_id);
                // Checked above
                target.websocket_debugger_url.unwrap_or_default()
            }
            None => browser.create_target("about:blank").await?,
        };

        let client = browser.create_client(&ws_url).await?;
        let page: Arc<dyn Page> = Arc::new(CdpPage::new(client));

        Ok((browser, page))
    }

    /// Launch-mode acquisition
    async fn acquire_launch(&self, config: &SessionConfig) -> Result<HandleBundle> {
        tokio::fs::create_dir_all(&config.profile_dir)
            .await
            .map_err(|e| Error::launch(format!("Failed to create profile dir: {}", e)))?;

        let deadline = Instant::now() + Duration::from_millis(config.connect_timeout_ms);
        let interval = Duration::from_millis(config.poll_interval_ms);

        let mut child = Self::spawn_chrome(config, 0)?;

        let acquired: Result<(Arc<dyn CdpBrowser>, Arc<dyn Page>)> = async {
            let port = Self::poll_devtools_port(&config.profile_dir, deadline, interval).await?;
            debug!("Chrome chose debugging port {}", port);
            Self::poll_debugger_url(port, deadline, interval).await?;
            Self::open_page(port).await
        }
        .await;

        match acquired {
            Ok((browser, page)) => Ok(HandleBundle {
                process: Some(child),
                browser: Some(browser),
                page,
            }),
            Err(e) => {
                // No partial state survives a failed acquisition
                warn!("Acquisition failed, terminating spawned browser: {}", e);
                let _ = child.start_kill();
                Err(e)
            }
        }
    }

    /// Attach-mode acquisition
    async fn acquire_attach(&self, config: &SessionConfig) -> Result<HandleBundle> {
        let port = config
            .endpoint_port
            .ok_or_else(|| Error::configuration("endpoint_port is required in attach mode"))?;

        let deadline = Instant::now() + Duration::from_millis(config.connect_timeout_ms);
        let interval = Duration::from_millis(config.poll_interval_ms);

        // Fast path: a browser is already listening, nothing to spawn
        if Self::probe_debugger_url(port).await.is_some() {
            info!("Attaching to running browser on port {}", port);
            let (browser, page) = Self::open_page(port).await?;
            return Ok(HandleBundle {
                process: None,
                browser: Some(browser),
                page,
            });
        }

        info!("No browser on port {}, spawning one", port);
        let mut child = Self::spawn_chrome(config, port)?;

        let acquired: Result<(Arc<dyn CdpBrowser>, Arc<dyn Page>)> = async {
            Self::poll_debugger_url(port, deadline, interval).await?;
            Self::open_page(port).await
        }
        .await;

        match acquired {
            Ok((browser, page)) => Ok(HandleBundle {
                process: Some(child),
                browser: Some(browser),
                page,
            }),
            Err(e) => {
                warn!("Acquisition failed, terminating spawned browser: {}", e);
                let _ = child.start_kill();
                Err(e)
            }
        }
    }
}

#[async_trait]
impl BrowserEndpoint for ChromeEndpoint {
    async fn acquire(&self, config: &SessionConfig) -> Result<HandleBundle> {
        config.validate()?;

        match config.attach_mode {
            AttachMode::Launch => self.acquire_launch(config).await,
            AttachMode::AttachByEndpoint => self.acquire_attach(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_args_launch() {
        let config = SessionConfig::default();
        let args = ChromeEndpoint::chrome_args(&config, 0);

        assert!(args.contains(&"--remote-debugging-port=0".to_string()));
        assert!(args.contains(&"--no-first-run".to_string()));
        assert!(args.contains(&"--no-default-browser-check".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-data-dir=")));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_chrome_args_headless() {
        let config = SessionConfig {
            headless: true,
            ..SessionConfig::default()
        };
        let args = ChromeEndpoint::chrome_args(&config, 9222);

        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
    }

    #[tokio::test]
    async fn test_probe_unreachable_port_is_not_ready() {
        // Nothing listens on this port
        assert!(ChromeEndpoint::probe_debugger_url(1).await.is_none());
    }

    #[tokio::test]
    async fn test_poll_times_out_on_unreachable_port() {
        let deadline = Instant::now() + Duration::from_millis(200);
        let result =
            ChromeEndpoint::poll_debugger_url(1, deadline, Duration::from_millis(50)).await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_devtools_port_file_poll_times_out() {
        let dir = std::env::temp_dir().join("post-scrapper-no-such-profile");
        let deadline = Instant::now() + Duration::from_millis(150);
        let result =
            ChromeEndpoint::poll_devtools_port(&dir, deadline, Duration::from_millis(50)).await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
