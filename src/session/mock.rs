//! Mock session implementations for testing
//!
//! `MockPage` scripts page behavior per selector/expression; `MockEndpoint`
//! hands a session a pre-built page without touching any real browser.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

use crate::cdp::mock::MockCdpBrowser;
use crate::cdp::{CdpBrowser, EvaluationResult, NavigationResult};
use crate::config::SessionConfig;
use crate::endpoint::{BrowserEndpoint, HandleBundle};
use crate::jobs::{Job, JobOutcome};
use crate::session::{Page, Session};
use crate::{Error, Result};

/// Scripted page for driving jobs in tests
#[derive(Debug)]
pub struct MockPage {
    texts: HashMap<String, String>,
    visible: HashSet<String>,
    eval_results: Vec<(String, EvaluationResult)>,
    functions_ready: bool,
    status_code: u16,
    navigation_error: Option<String>,
    visited: Mutex<Vec<String>>,
    screenshots: AtomicUsize,
    active: AtomicBool,
}

impl MockPage {
    /// Page where every navigation succeeds with status 200
    pub fn new() -> Self {
        Self {
            texts: HashMap::new(),
            visible: HashSet::new(),
            eval_results: Vec::new(),
            functions_ready: true,
            status_code: 200,
            navigation_error: None,
            visited: Mutex::new(Vec::new()),
            screenshots: AtomicUsize::new(0),
            active: AtomicBool::new(true),
        }
    }

    /// Script the text content of a selector (also makes it waitable)
    pub fn with_text(mut self, selector: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(selector.into(), text.into());
        self
    }

    /// Mark a selector as present and visible
    pub fn with_visible(mut self, selector: impl Into<String>) -> Self {
        self.visible.insert(selector.into());
        self
    }

    /// Script an evaluate result for expressions containing `fragment`
    pub fn with_eval(mut self, fragment: impl Into<String>, result: EvaluationResult) -> Self {
        self.eval_results.push((fragment.into(), result));
        self
    }

    /// Report the given status code for every navigation
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Fail every navigation with the given error text
    pub fn with_navigation_error(mut self, error_text: impl Into<String>) -> Self {
        self.navigation_error = Some(error_text.into());
        self
    }

    /// Make every wait_for_function call time out
    pub fn with_functions_stalled(mut self) -> Self {
        self.functions_ready = false;
        self
    }

    /// URLs navigated to, in order
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of screenshots captured
    pub fn screenshots(&self) -> usize {
        self.screenshots.load(Ordering::Relaxed)
    }
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str) -> Result<NavigationResult> {
        if let Some(error_text) = &self.navigation_error {
            return Err(Error::navigation(error_text.clone()));
        }

        self.visited
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        Ok(NavigationResult {
            url: url.to_string(),
            status_code: self.status_code,
        })
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.texts.contains_key(selector) || self.visible.contains(selector) {
            Ok(())
        } else {
            Err(Error::element_timeout(format!(
                "{} not satisfied within {:?}",
                selector, timeout
            )))
        }
    }

    async fn wait_for_function(&self, _expression: &str, timeout: Duration) -> Result<()> {
        if self.functions_ready {
            Ok(())
        } else {
            Err(Error::element_timeout(format!(
                "wait condition not satisfied within {:?}",
                timeout
            )))
        }
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.texts.get(selector).cloned())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.visible.contains(selector))
    }

    async fn evaluate(&self, expression: &str) -> Result<EvaluationResult> {
        for (fragment, result) in &self.eval_results {
            if expression.contains(fragment.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(EvaluationResult::Null)
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>> {
        self.screenshots.fetch_add(1, Ordering::Relaxed);
        Ok(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
    }

    async fn close(&self) -> Result<()> {
        self.active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Endpoint handing out a pre-built page
pub struct MockEndpoint {
    page: Option<Arc<dyn Page>>,
}

impl MockEndpoint {
    /// Endpoint whose acquisitions succeed with the given page
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self { page: Some(page) }
    }

    /// Endpoint whose acquisitions always time out
    pub fn failing() -> Self {
        Self { page: None }
    }
}

#[async_trait]
impl BrowserEndpoint for MockEndpoint {
    async fn acquire(&self, _config: &SessionConfig) -> Result<HandleBundle> {
        let page = self
            .page
            .clone()
            .ok_or_else(|| Error::timeout("Mock endpoint never becomes reachable"))?;

        let browser: Arc<dyn CdpBrowser> = Arc::new(MockCdpBrowser::new());

        Ok(HandleBundle {
            process: None,
            browser: Some(browser),
            page,
        })
    }
}

/// Job that only counts how many times it ran
pub struct RecordingJob {
    label: String,
    runs: Arc<AtomicUsize>,
}

impl RecordingJob {
    /// Create a job and a handle to its run counter
    pub fn new(label: impl Into<String>) -> (Self, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        (
            Self {
                label: label.into(),
                runs: runs.clone(),
            },
            runs,
        )
    }
}

impl std::fmt::Display for RecordingJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordingJob({})", self.label)
    }
}

#[async_trait]
impl Job for RecordingJob {
    async fn run(&mut self, _session: &Session) -> Result<JobOutcome> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        Ok(JobOutcome::Completed)
    }
}

/// Build a ready session around a scripted page
pub async fn ready_session(page: Arc<dyn Page>) -> Session {
    let endpoint = MockEndpoint::new(page);
    match Session::enter_with(SessionConfig::default(), &endpoint).await {
        Ok(session) => session,
        Err(e) => panic!("mock acquisition failed: {}", e),
    }
}
