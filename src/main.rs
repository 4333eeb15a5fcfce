//! post-scrapper binary
//!
//! Acquires a browser session per the environment, runs the bot-detection
//! probe suite, and exits non-zero when any probe flags the browser.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use post_scrapper::config::SessionConfig;
use post_scrapper::jobs::{DetectionCheckJob, JobOutcome};
use post_scrapper::session::{Session, StdinPrompt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("post-scrapper v{}", post_scrapper::VERSION);

    let config = SessionConfig::from_env().context("Invalid configuration")?;
    let interactive = config.interactive_pause;

    let mut session = Session::enter(config)
        .await
        .context("Failed to acquire browser session")?;

    if interactive {
        session.set_prompt(Box::new(StdinPrompt));
    }

    let outcome = session.run(Box::new(DetectionCheckJob::new())).await;

    // Teardown runs regardless of how the job went
    session.exit().await;

    match outcome.context("Detection check failed")? {
        JobOutcome::Detection(summary) if summary.fail > 0 => {
            warn!(
                "{} of {} probes flagged this browser",
                summary.fail,
                summary.results.len()
            );
            std::process::exit(1);
        }
        _ => Ok(()),
    }
}
