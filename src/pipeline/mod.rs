//! The scrape pipeline: filters, seed collection, detail enrichment and
//! the orchestrator that sequences them over one browser session.

pub mod enrich;
pub mod filters;
pub mod locate;
pub mod orchestrator;
pub mod parse;
pub mod seeds;

use std::time::{Duration, Instant};

use crate::browser::Page;

const CHALLENGE_POLL: Duration = Duration::from_millis(500);

/// Wait while the page title still shows an anti-bot interstitial.
/// Returns false if the interstitial is still up after `timeout`.
pub async fn wait_out_challenge(page: &dyn Page, marker: &str, timeout: Duration) -> bool {
    let started = Instant::now();
    loop {
        match page.title().await {
            Ok(title) if !title.contains(marker) => return true,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Could not read page title while waiting for challenge: {e}");
                return true;
            }
        }
        if started.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(CHALLENGE_POLL).await;
    }
}
