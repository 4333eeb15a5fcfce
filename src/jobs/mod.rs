//! Job layer
//!
//! A job is a unit of browser work handed to a session. The session drives the
//! lifecycle; the job only sees the capability surface (`Session::open`, the
//! `Page` handle) and reports a typed outcome.
//!
//! Module structure:
//! - `site_visit`: navigate-and-report jobs
//! - `detection`: bot-detection probe suite

use async_trait::async_trait;

use crate::session::Session;
use crate::Result;

pub mod detection;
pub mod site_visit;

pub use detection::{CheckOutcome, DetectionCheckJob, DetectionResult, DetectionSummary};
pub use site_visit::SiteVisitJob;

/// A unit of browser work
///
/// `Display` names the job in logs; keep it short and stable.
#[async_trait]
pub trait Job: Send + Sync + std::fmt::Display {
    /// Run the job against a ready session
    async fn run(&mut self, session: &Session) -> Result<JobOutcome>;
}

/// What a completed job produced
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job ran to completion with nothing to report
    Completed,
    /// A detection suite ran; per-site results attached
    Detection(DetectionSummary),
}
