//! Simple navigation jobs

use async_trait::async_trait;

use super::{Job, JobOutcome};
use crate::session::Session;
use crate::Result;

/// Job that opens a single URL and reports the response status
#[derive(Debug, Clone)]
pub struct SiteVisitJob {
    url: String,
}

impl SiteVisitJob {
    /// Visit an arbitrary URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Visit a public profile page, optionally its mentions feed
    pub fn profile(user: &str, mentions: bool) -> Self {
        let mut url = format!("https://www.facebook.com/{}", user);
        if mentions {
            url.push_str("/mentions");
        }
        Self { url }
    }

    /// The URL this job will open
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for SiteVisitJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SiteVisitJob({})", self.url)
    }
}

#[async_trait]
impl Job for SiteVisitJob {
    async fn run(&mut self, session: &Session) -> Result<JobOutcome> {
        session.open(&self.url).await?;
        Ok(JobOutcome::Completed)
    }
}
