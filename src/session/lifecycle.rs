//! Session lifecycle
//!
//! A `Session` owns everything a job needs to drive a browser: the page
//! handle, the browser-level control handle, and (in launch mode) the spawned
//! subprocess. Acquisition is all-or-nothing; teardown is best-effort and
//! ordered from the most derived resource to the most fundamental.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::cdp::{CdpBrowser, NavigationResult};
use crate::config::SessionConfig;
use crate::endpoint::{BrowserEndpoint, ChromeEndpoint};
use crate::jobs::{Job, JobOutcome};
use crate::session::Page;
use crate::{Error, Result};

/// Grace period before a spawned browser is force-killed on teardown
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but not yet attached to a browser
    Uninitialized,
    /// Browser acquired, page handle usable
    Ready,
    /// Torn down; handles released
    Closed,
}

/// Blocking hook for an operator-attended teardown pause
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Display a prompt and wait for a line of operator input
    async fn wait_for_operator(&self, prompt: &str) -> Result<String>;
}

/// Prompt implementation reading from standard input
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl OperatorPrompt for StdinPrompt {
    async fn wait_for_operator(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();

        let line = tokio::task::spawn_blocking(move || {
            use std::io::Write;

            let mut stdout = std::io::stdout();
            write!(stdout, "{}", prompt)?;
            stdout.flush()?;

            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok::<String, std::io::Error>(line)
        })
        .await
        .map_err(|e| Error::internal(format!("Prompt task panicked: {}", e)))??;

        Ok(line)
    }
}

/// A browser automation session
pub struct Session {
    state: SessionState,
    process: Option<tokio::process::Child>,
    browser: Option<Arc<dyn CdpBrowser>>,
    page: Option<Arc<dyn Page>>,
    job: Option<Box<dyn Job>>,
    prompt: Option<Box<dyn OperatorPrompt>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("process", &self.process.is_some())
            .field("job", &self.job.is_some())
            .finish()
    }
}

impl Session {
    /// Acquire a session using the default Chrome endpoint
    pub async fn enter(config: SessionConfig) -> Result<Self> {
        Self::enter_with(config, &ChromeEndpoint::new()).await
    }

    /// Acquire a session through an explicit endpoint
    ///
    /// On failure nothing is retained; the session either reaches `Ready` or
    /// never exists.
    pub async fn enter_with(
        config: SessionConfig,
        endpoint: &dyn BrowserEndpoint,
    ) -> Result<Self> {
        config.validate()?;

        let bundle = endpoint.acquire(&config).await?;
        info!("Stealth session ready");

        Ok(Self {
            state: SessionState::Ready,
            process: bundle.process,
            browser: bundle.browser,
            page: Some(bundle.page),
            job: None,
            prompt: None,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The page handle, if the session is ready
    pub fn page(&self) -> Result<Arc<dyn Page>> {
        match (&self.state, &self.page) {
            (SessionState::Ready, Some(page)) => Ok(page.clone()),
            _ => Err(Error::session_not_ready(format!(
                "Session is {:?}",
                self.state
            ))),
        }
    }

    /// Install the teardown pause hook
    pub fn set_prompt(&mut self, prompt: Box<dyn OperatorPrompt>) {
        self.prompt = Some(prompt);
    }

    /// Navigate the session page and classify the response status
    pub async fn open(&self, url: &str) -> Result<NavigationResult> {
        let page = self.page()?;
        let result = page.goto(url).await?;

        if (200..300).contains(&result.status_code) {
            info!("{} : {}", url, result.status_code);
        } else {
            warn!("{} : {}", url, result.status_code);
        }

        Ok(result)
    }

    /// Assign the session's job; replaces any previously assigned job
    pub fn set_job(&mut self, job: Box<dyn Job>) {
        if let Some(old) = &self.job {
            debug!("Replacing pending job: {}", old);
        }
        self.job = Some(job);
    }

    /// Run the assigned job to completion
    pub async fn start(&mut self) -> Result<JobOutcome> {
        if self.state != SessionState::Ready {
            return Err(Error::session_not_ready(format!(
                "Session is {:?}",
                self.state
            )));
        }

        let mut job = self.job.take().ok_or(Error::NoJobAssigned)?;

        info!("Starting job: {}", job);
        let outcome = job.run(self).await;
        self.job = Some(job);

        match &outcome {
            Ok(_) => info!("Job finished"),
            Err(e) => warn!("Job failed: {}", e),
        }

        outcome
    }

    /// Assign and run a job in one step
    pub async fn run(&mut self, job: Box<dyn Job>) -> Result<JobOutcome> {
        self.set_job(job);
        self.start().await
    }

    /// Tear the session down
    ///
    /// Idempotent and infallible: every step is attempted regardless of
    /// earlier failures, which are logged and swallowed. Order is page
    /// connection, then browser handle, then subprocess.
    pub async fn exit(&mut self) {
        if self.state == SessionState::Closed {
            debug!("Session already closed");
            return;
        }

        let verbose = self.teardown_pause().await;

        if let Some(page) = self.page.take() {
            match page.close().await {
                Ok(()) => log_teardown(verbose, "Closed page connection"),
                Err(e) => warn!("Failed to close page connection: {}", e),
            }
        }

        if let Some(browser) = self.browser.take() {
            match browser.close().await {
                Ok(()) => log_teardown(verbose, "Closed browser handle"),
                Err(e) => warn!("Failed to close browser handle: {}", e),
            }
        }

        if let Some(mut child) = self.process.take() {
            match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
                Ok(Ok(status)) => {
                    log_teardown(verbose, &format!("Browser exited: {}", status));
                }
                Ok(Err(e)) => warn!("Failed waiting for browser exit: {}", e),
                Err(_) => {
                    warn!("Browser still running after grace period, killing");
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill browser process: {}", e);
                    }
                }
            }
        }

        self.job = None;
        self.state = SessionState::Closed;
        info!("Session closed");
    }

    /// Optional operator pause before teardown
    ///
    /// Returns whether the operator asked for verbose teardown logging.
    async fn teardown_pause(&self) -> bool {
        let Some(prompt) = &self.prompt else {
            return false;
        };

        match prompt
            .wait_for_operator("Run finished; press enter to close (type 'debug' for verbose teardown): ")
            .await
        {
            Ok(input) => input.trim().eq_ignore_ascii_case("debug"),
            Err(e) => {
                warn!("Operator prompt failed: {}", e);
                false
            }
        }
    }
}

fn log_teardown(verbose: bool, message: &str) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{MockEndpoint, MockPage, RecordingJob};

    #[tokio::test]
    async fn test_enter_reaches_ready() {
        let endpoint = MockEndpoint::new(Arc::new(MockPage::new()));
        let session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.page().is_ok());
    }

    #[tokio::test]
    async fn test_enter_failure_leaves_no_session() {
        let endpoint = MockEndpoint::failing();
        let result = Session::enter_with(SessionConfig::default(), &endpoint).await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_enter_rejects_invalid_config() {
        let config = SessionConfig {
            endpoint_port: Some(9222),
            ..SessionConfig::default()
        };

        let endpoint = MockEndpoint::new(Arc::new(MockPage::new()));
        let result = Session::enter_with(config, &endpoint).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_open_records_navigation() {
        let page = Arc::new(MockPage::new());
        let endpoint = MockEndpoint::new(page.clone());
        let session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        let result = session.open("https://example.com").await.unwrap();
        assert_eq!(result.status_code, 200);
        assert_eq!(page.visited(), vec!["https://example.com"]);
    }

    #[tokio::test]
    async fn test_open_surfaces_non_success_status() {
        let page = Arc::new(MockPage::new().with_status(503));
        let endpoint = MockEndpoint::new(page);
        let session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        // A non-2xx status is reported, not an error
        let result = session.open("https://example.com").await.unwrap();
        assert_eq!(result.status_code, 503);
    }

    #[tokio::test]
    async fn test_start_without_job() {
        let page = Arc::new(MockPage::new());
        let endpoint = MockEndpoint::new(page.clone());
        let mut session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        assert!(matches!(session.start().await, Err(Error::NoJobAssigned)));
        // The page was never touched
        assert!(page.visited().is_empty());
    }

    #[tokio::test]
    async fn test_set_job_last_write_wins() {
        let endpoint = MockEndpoint::new(Arc::new(MockPage::new()));
        let mut session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        let (first, first_runs) = RecordingJob::new("first");
        let (second, second_runs) = RecordingJob::new("second");

        session.set_job(Box::new(first));
        session.set_job(Box::new(second));
        session.start().await.unwrap();

        assert_eq!(first_runs.load(std::sync::atomic::Ordering::Relaxed), 0);
        assert_eq!(second_runs.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_job_survives_for_rerun() {
        let endpoint = MockEndpoint::new(Arc::new(MockPage::new()));
        let mut session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        let (job, runs) = RecordingJob::new("repeat");
        session.set_job(Box::new(job));
        session.start().await.unwrap();
        session.start().await.unwrap();

        assert_eq!(runs.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_exit_is_idempotent() {
        let page = Arc::new(MockPage::new());
        let endpoint = MockEndpoint::new(page.clone());
        let mut session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        session.exit().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!page.is_active());

        // Second exit is harmless
        session.exit().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_page_unusable_after_exit() {
        let endpoint = MockEndpoint::new(Arc::new(MockPage::new()));
        let mut session = Session::enter_with(SessionConfig::default(), &endpoint)
            .await
            .unwrap();

        session.exit().await;
        assert!(matches!(session.page(), Err(Error::SessionNotReady(_))));
        assert!(matches!(
            session.start().await,
            Err(Error::SessionNotReady(_))
        ));
    }
}
