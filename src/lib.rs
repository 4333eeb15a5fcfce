//! # post-scrapper
//!
//! Browser automation session manager with a bot-detection probe suite,
//! built directly on the Chrome DevTools Protocol.
//!
//! ## Architecture
//!
//! - **cdp**: WebSocket JSON-RPC transport and a typed client for the
//!   protocol commands the session layer needs
//! - **endpoint**: browser acquisition (launch a persistent-profile Chrome,
//!   or attach to one already listening on a debugging port)
//! - **session**: scoped session lifecycle and the `Page` capability jobs
//!   drive the browser through
//! - **jobs**: units of browser work; `DetectionCheckJob` probes public
//!   fingerprinting sites and tallies their verdicts
//!
//! ## Example
//!
//! ```no_run
//! use post_scrapper::config::SessionConfig;
//! use post_scrapper::jobs::DetectionCheckJob;
//! use post_scrapper::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = Session::enter(SessionConfig::default()).await?;
//!     let outcome = session.run(Box::new(DetectionCheckJob::new())).await;
//!     session.exit().await;
//!     outcome?;
//!     Ok(())
//! }
//! ```

pub mod cdp;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod jobs;
pub mod session;

pub use config::{AttachMode, SessionConfig};
pub use error::{Error, Result};
pub use jobs::{DetectionCheckJob, Job, JobOutcome, SiteVisitJob};
pub use session::{Page, Session, SessionState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
