//! Browser acquisition layer
//!
//! A `BrowserEndpoint` turns a `SessionConfig` into a usable bundle of handles,
//! either by launching a fresh persistent browser or by attaching to an
//! already-running one over its remote debugging port.

use async_trait::async_trait;
use std::sync::Arc;

use crate::cdp::CdpBrowser;
use crate::config::SessionConfig;
use crate::session::Page;
use crate::Result;

pub mod chrome;

pub use chrome::ChromeEndpoint;

/// Handles produced by a successful acquisition
///
/// `process` is only present when the endpoint spawned the browser itself;
/// attaching to a pre-existing browser leaves it `None` so teardown never
/// kills a browser the operator started manually.
pub struct HandleBundle {
    /// Spawned browser subprocess, if any
    pub process: Option<tokio::process::Child>,
    /// Browser-level control handle, if applicable to the mode
    pub browser: Option<Arc<dyn CdpBrowser>>,
    /// The page the session will drive
    pub page: Arc<dyn Page>,
}

impl std::fmt::Debug for HandleBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleBundle")
            .field("process", &self.process.is_some())
            .field("browser", &self.browser.is_some())
            .finish()
    }
}

/// Browser acquisition strategy
#[async_trait]
pub trait BrowserEndpoint: Send + Sync {
    /// Acquire browser handles according to the configuration
    ///
    /// Must not retain partial state on failure: anything acquired before the
    /// error (including a spawned subprocess) is released before it surfaces.
    async fn acquire(&self, config: &SessionConfig) -> Result<HandleBundle>;
}
