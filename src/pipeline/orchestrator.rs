use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::FutureExt;

use crate::browser::{BrowserSession, Page, SessionLauncher};
use crate::error::ScrapeError;
use crate::models::request::ScrapeRequest;
use crate::models::task::{ScrapeOutcome, ScrapeResult};
use crate::pipeline::enrich::DetailEnricher;
use crate::pipeline::filters::{FilterSummary, FilterSynchronizer, RetryPolicy};
use crate::pipeline::seeds::collect_seeds;
use crate::pipeline::wait_out_challenge;
use crate::scrapers::{SiteScraper, get_scraper};

/// Runs one scrape from session launch to the final record list.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    launcher: Arc<dyn SessionLauncher>,
    retry: RetryPolicy,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl ScrapeOrchestrator {
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            launcher,
            retry: RetryPolicy::default(),
            today: local_today,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[allow(dead_code)]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let scraper = get_scraper(request.site);
        self.scrape_with(&*scraper, request).await
    }

    pub async fn scrape_with(
        &self,
        scraper: &dyn SiteScraper,
        request: &ScrapeRequest,
    ) -> Result<ScrapeResult, ScrapeError> {
        let site = scraper.site().name();
        let session = self
            .launcher
            .launch(scraper.launch_options(request))
            .await
            .map_err(|source| ScrapeError::Launch { site, source })?;

        // Close the session even if scraping panics.
        let result = AssertUnwindSafe(self.run(&*session, scraper, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ScrapeError::Panicked {
                    site,
                    message: panic_message(&*panic),
                })
            });

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser session: {e}");
        }
        result
    }

    async fn run(
        &self,
        session: &dyn BrowserSession,
        scraper: &dyn SiteScraper,
        request: &ScrapeRequest,
    ) -> Result<ScrapeResult, ScrapeError> {
        let site = scraper.site().name();
        let listing = session
            .open_page()
            .await
            .map_err(|source| ScrapeError::Listing { site, source })?;

        let result = self.scan(session, &*listing, scraper, request).await;

        if let Err(e) = listing.close().await {
            tracing::debug!("Failed to close listing page: {e}");
        }
        result
    }

    async fn scan(
        &self,
        session: &dyn BrowserSession,
        listing: &dyn Page,
        scraper: &dyn SiteScraper,
        request: &ScrapeRequest,
    ) -> Result<ScrapeResult, ScrapeError> {
        let site = scraper.site().name();
        let timeout = request.request_timeout;
        let url = scraper.listing_url(request);
        tracing::info!("Scraping {site} at {url}");

        if let Err(e) = listing.goto(&url).await {
            tracing::warn!("Failed to load {site} listing page: {e}");
            return Ok(ScrapeResult::listing_unavailable());
        }
        if let Some(marker) = scraper.challenge_marker()
            && !wait_out_challenge(listing, marker, timeout).await
        {
            tracing::warn!("{site} listing is stuck behind a challenge page");
            return Ok(ScrapeResult::listing_unavailable());
        }
        if let Err(e) = listing.wait_for(scraper.listing_ready(), timeout).await {
            tracing::warn!("{site} listing never rendered: {e}");
            return Ok(ScrapeResult::listing_unavailable());
        }

        let sync = FilterSynchronizer::new(listing, self.retry);
        if let (Some(search_box), Some(term)) = (scraper.search_box(), request.search_term.as_deref()) {
            sync.submit_search(search_box, term, self.retry.presence_timeout)
                .await;
        }
        let specs = scraper.filter_specs(request);
        if !specs.is_empty() {
            let outcomes = sync.apply(&specs, timeout).await;
            let summary = FilterSummary::of(&outcomes);
            tracing::info!(
                "Filters: {} already selected, {} selected, {} failed",
                summary.already_selected,
                summary.selected,
                summary.failed
            );
        }

        let seeds = collect_seeds(listing, scraper, request.results_wanted)
            .await
            .map_err(|source| ScrapeError::Listing { site, source })?;

        let enricher = DetailEnricher::new(session, scraper, request, (self.today)());
        let pause = scraper.detail_pause();
        let mut jobs = Vec::with_capacity(seeds.len().min(request.results_wanted));
        for seed in &seeds {
            if jobs.len() >= request.results_wanted {
                break;
            }
            jobs.push(enricher.enrich(seed).await);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        tracing::info!("Scraped {} jobs from {site}", jobs.len());
        Ok(ScrapeResult {
            outcome: ScrapeOutcome::Scraped,
            jobs,
        })
    }
}
