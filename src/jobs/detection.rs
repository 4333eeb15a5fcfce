//! Bot-detection probe suite
//!
//! Visits three public fingerprinting sites in a fixed order and classifies
//! each verdict. Every probe owns its page-specific selectors and timeout; a
//! probe that errors (navigation failure, element timeout) aborts the whole
//! run so a broken session is never mistaken for a clean bill of health.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::{info, warn};

use super::{Job, JobOutcome};
use crate::session::Session;
use crate::Result;

const FINGERPRINT_URL: &str = "https://fingerprint.com/products/bot-detection/";
const FINGERPRINT_HEADING: &str = "h3[class^=\"HeroSection-module--botSubTitle\"]";
const FINGERPRINT_BOT_TEXT: &str = "You are a bot";
const FINGERPRINT_TIMEOUT: Duration = Duration::from_secs(20);

const IPHEY_URL: &str = "https://iphey.com/";
const IPHEY_LOADER_HIDDEN: &str = "(() => { \
    const loader = document.querySelector('.loader'); \
    return !!loader && loader.classList.contains('hide'); \
})()";
const IPHEY_TIMEOUT: Duration = Duration::from_secs(15);
/// Verdict classes in the order they are checked; first visible wins
const IPHEY_STATUS_LABELS: &[(&str, &str)] = &[
    ("trustworthy", "Good"),
    ("suspicious", "Suspicious"),
    ("unreliable", "Bot"),
];

const BROWSERSCAN_URL: &str = "https://www.browserscan.net/bot-detection";
const BROWSERSCAN_RESULTS_PRESENT: &str = "(() => { \
    const r = document.evaluate(\"//strong[text()='Test Results:']\", document, null, \
        XPathResult.FIRST_ORDERED_NODE_TYPE, null); \
    return r.singleNodeValue !== null; \
})()";
const BROWSERSCAN_RESULTS_TEXT: &str = "(() => { \
    const r = document.evaluate(\"//strong[text()='Test Results:']/following-sibling::strong[1]\", \
        document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null); \
    const n = r.singleNodeValue; \
    return n ? n.textContent : ''; \
})()";
const BROWSERSCAN_NORMAL_TEXT: &str = "Normal";
const BROWSERSCAN_TIMEOUT: Duration = Duration::from_secs(15);

/// Verdict of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The site saw a regular browser
    Pass,
    /// The site flagged the browser
    Fail,
    /// The site loaded but never rendered a recognizable verdict
    Unknown,
}

/// One probe's classified verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    /// Stable identifier of the probed site
    pub site_id: &'static str,
    /// Classified verdict
    pub outcome: CheckOutcome,
    /// The raw label the site displayed, if one was found
    pub raw_label: Option<String>,
}

/// Tally over a full probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionSummary {
    /// Probes that saw a regular browser
    pub pass: u32,
    /// Probes that flagged the browser or rendered no verdict
    pub fail: u32,
    /// Per-site results in probe order
    pub results: Vec<DetectionResult>,
}

/// Job that runs the full bot-detection probe suite
#[derive(Debug)]
pub struct DetectionCheckJob {
    screenshot_path: PathBuf,
    pass: u32,
    fail: u32,
    results: Vec<DetectionResult>,
}

impl DetectionCheckJob {
    /// Suite with the default screenshot destination (`bot.png`)
    pub fn new() -> Self {
        Self::with_screenshot_path("bot.png")
    }

    /// Suite writing its evidence screenshot to the given path
    pub fn with_screenshot_path(path: impl Into<PathBuf>) -> Self {
        Self {
            screenshot_path: path.into(),
            pass: 0,
            fail: 0,
            results: Vec::new(),
        }
    }

    fn record(&mut self, result: DetectionResult) {
        match result.outcome {
            CheckOutcome::Pass => {
                self.pass += 1;
                info!("{} passed", result.site_id);
            }
            CheckOutcome::Fail => {
                self.fail += 1;
                warn!(
                    "{} failed, status: {}",
                    result.site_id,
                    result.raw_label.as_deref().unwrap_or("none")
                );
            }
            CheckOutcome::Unknown => {
                // No recognizable verdict still counts against the tally
                self.fail += 1;
                warn!("{} rendered no recognizable verdict", result.site_id);
            }
        }
        self.results.push(result);
    }

    /// fingerprint.com: a heading appears once the verdict is in
    async fn check_fingerprint(&self, session: &Session) -> Result<DetectionResult> {
        session.open(FINGERPRINT_URL).await?;
        let page = session.page()?;

        page.wait_for_selector(FINGERPRINT_HEADING, FINGERPRINT_TIMEOUT)
            .await?;
        let heading = page
            .text_content(FINGERPRINT_HEADING)
            .await?
            .unwrap_or_default();

        let outcome = if heading == FINGERPRINT_BOT_TEXT {
            CheckOutcome::Fail
        } else {
            CheckOutcome::Pass
        };

        Ok(DetectionResult {
            site_id: "fingerprint.com",
            outcome,
            raw_label: Some(heading),
        })
    }

    /// iphey.com: wait out the loader animation, then read the status badge
    async fn check_iphey(&self, session: &Session) -> Result<DetectionResult> {
        session.open(IPHEY_URL).await?;
        let page = session.page()?;

        page.wait_for_function(IPHEY_LOADER_HIDDEN, IPHEY_TIMEOUT)
            .await?;

        let mut label = None;
        for (class, mapped) in IPHEY_STATUS_LABELS {
            let selector = format!(".identity-status__status.{}", class);
            if page.is_visible(&selector).await? {
                label = Some(*mapped);
                break;
            }
        }

        let outcome = match label {
            Some("Good") => CheckOutcome::Pass,
            Some(_) => CheckOutcome::Fail,
            None => CheckOutcome::Unknown,
        };

        Ok(DetectionResult {
            site_id: "iphey.com",
            outcome,
            raw_label: label.map(|l| l.to_string()),
        })
    }

    /// browserscan.net: read the verdict next to "Test Results:" and keep a
    /// full-page screenshot as evidence
    async fn check_browserscan(&self, session: &Session) -> Result<DetectionResult> {
        session.open(BROWSERSCAN_URL).await?;
        let page = session.page()?;

        page.wait_for_function(BROWSERSCAN_RESULTS_PRESENT, BROWSERSCAN_TIMEOUT)
            .await?;

        let verdict = match page.evaluate(BROWSERSCAN_RESULTS_TEXT).await? {
            crate::cdp::EvaluationResult::String(s) => s,
            _ => String::new(),
        };

        let shot = page.screenshot(true).await?;
        tokio::fs::write(&self.screenshot_path, &shot).await?;
        info!("Saved evidence screenshot to {}", self.screenshot_path.display());

        let outcome = if verdict == BROWSERSCAN_NORMAL_TEXT {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail
        };

        Ok(DetectionResult {
            site_id: "browserscan.net",
            outcome,
            raw_label: if verdict.is_empty() { None } else { Some(verdict) },
        })
    }
}

impl Default for DetectionCheckJob {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DetectionCheckJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DetectionCheckJob")
    }
}

#[async_trait]
impl Job for DetectionCheckJob {
    async fn run(&mut self, session: &Session) -> Result<JobOutcome> {
        // A rerun starts from a clean tally
        self.pass = 0;
        self.fail = 0;
        self.results.clear();

        let result = self.check_fingerprint(session).await?;
        self.record(result);

        let result = self.check_iphey(session).await?;
        self.record(result);

        let result = self.check_browserscan(session).await?;
        self.record(result);

        let summary = DetectionSummary {
            pass: self.pass,
            fail: self.fail,
            results: self.results.clone(),
        };

        info!(
            "Bot detection checks finished: {} pass, {} fail",
            summary.pass, summary.fail
        );

        Ok(JobOutcome::Detection(summary))
    }
}
