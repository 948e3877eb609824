use chrono::NaiveDate;

use crate::browser::{BrowserSession, Locator, Page};
use crate::error::BrowserError;
use crate::models::job::{ExtractedDetail, JobRecord, Location};
use crate::models::request::{DescriptionFormat, ScrapeRequest};
use crate::pipeline::locate::{Extract, Lookup, extract_or_default, resolve};
use crate::pipeline::parse::{parse_compensation, parse_posted_date, title_from_slug};
use crate::pipeline::seeds::Seed;
use crate::pipeline::wait_out_challenge;
use crate::scrapers::{SiteDefaults, SiteScraper, absolute_url};

const FALLBACK_TITLE: &str = "Untitled";

/// Visits each seed's detail page and builds its [`JobRecord`].
pub struct DetailEnricher<'a> {
    session: &'a dyn BrowserSession,
    scraper: &'a dyn SiteScraper,
    request: &'a ScrapeRequest,
    today: NaiveDate,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(
        session: &'a dyn BrowserSession,
        scraper: &'a dyn SiteScraper,
        request: &'a ScrapeRequest,
        today: NaiveDate,
    ) -> Self {
        Self {
            session,
            scraper,
            request,
            today,
        }
    }

    /// Always produces a record; a detail page that cannot be read falls
    /// back to what the listing card said.
    pub async fn enrich(&self, seed: &Seed) -> JobRecord {
        let detail = match self.fetch(seed).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!("Failed to extract details for {}: {e}", seed.url);
                degraded_detail(seed, self.scraper.defaults(), self.today)
            }
        };
        merge(seed, detail, self.scraper.defaults(), self.today)
    }

    async fn fetch(&self, seed: &Seed) -> Result<ExtractedDetail, BrowserError> {
        let page = self.session.open_page().await?;
        let result = self.read_detail(&*page, seed).await;
        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close detail page for {}: {e}", seed.url);
        }
        result
    }

    async fn read_detail(&self, page: &dyn Page, seed: &Seed) -> Result<ExtractedDetail, BrowserError> {
        page.goto(&seed.url).await?;
        if let Some(marker) = self.scraper.challenge_marker()
            && !wait_out_challenge(page, marker, self.request.request_timeout).await
        {
            tracing::warn!("Challenge page still showing for {}", seed.url);
        }

        let chains = self.scraper.detail_chains();
        let defaults = self.scraper.defaults();

        let title = extract_or_default(page, "title", chains.title).await;
        let company_name = extract_or_default(page, "company", chains.company).await;
        let location_text = extract_or_default(page, "location", chains.location).await;
        let salary_text = extract_or_default(page, "salary", chains.salary).await;
        let job_url_direct = extract_or_default(page, "apply link", chains.apply_url)
            .await
            .and_then(|href| absolute_url(&seed.url, &href));
        let description = self.description(page, chains.description).await;
        let date_posted = extract_or_default(page, "posted date", chains.posted_date)
            .await
            .and_then(|text| parse_posted_date(&text, defaults.date_format));
        let is_remote = extract_or_default(page, "remote", chains.remote)
            .await
            .map(|text| text.to_lowercase().contains("remote"));
        let language_requirements = extract_or_default(page, "language", chains.language)
            .await
            .and_then(|raw| self.scraper.language_requirements(&raw));

        Ok(ExtractedDetail {
            title,
            company_name,
            location_text,
            salary_text,
            job_url_direct,
            description,
            date_posted,
            is_remote,
            language_requirements,
        })
    }

    async fn description(&self, page: &dyn Page, containers: &[Locator<'static>]) -> Option<String> {
        let extract = match self.request.description_format {
            DescriptionFormat::Html => Extract::Html,
            DescriptionFormat::Plain => Extract::Text,
        };
        let chain: Vec<Lookup> = containers
            .iter()
            .map(|&locator| Lookup { locator, extract })
            .collect();
        match resolve(page, &chain).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Could not read description: {e}");
                None
            }
        }
    }
}

/// Detail stand-in built from the seed alone.
pub fn degraded_detail(seed: &Seed, defaults: &SiteDefaults, today: NaiveDate) -> ExtractedDetail {
    ExtractedDetail {
        title: seed.title_hint.clone(),
        company_name: seed.company_hint.clone(),
        location_text: Some(defaults.location.to_string()),
        date_posted: Some(today),
        ..ExtractedDetail::default()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Combine detail page values with seed hints. Detail values win, seed
/// hints fill the gaps, site defaults fill what is left.
pub fn merge(seed: &Seed, detail: ExtractedDetail, defaults: &SiteDefaults, today: NaiveDate) -> JobRecord {
    let title = present(detail.title)
        .or_else(|| present(seed.title_hint.clone()))
        .or_else(|| title_from_slug(&seed.url))
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());

    let location_text = present(detail.location_text).unwrap_or_else(|| defaults.location.to_string());

    let compensation = present(detail.salary_text)
        .or_else(|| present(seed.salary_hint.clone()))
        .and_then(|text| parse_compensation(&text, defaults.salary));

    let description = match (detail.language_requirements, present(detail.description)) {
        (Some(lang), body) => Some(format!(
            "Language requirements: {lang}\n\n{}",
            body.unwrap_or_default()
        )),
        (None, body) => body,
    };

    JobRecord {
        title,
        company_name: present(detail.company_name).or_else(|| present(seed.company_hint.clone())),
        job_url: seed.url.clone(),
        job_url_direct: detail.job_url_direct,
        location: Location {
            country: defaults.country,
            city: Some(location_text),
        },
        description,
        is_remote: detail.is_remote.or(seed.remote_hint.then_some(true)),
        date_posted: detail.date_posted.unwrap_or(today),
        compensation,
        skills: seed.skills.clone(),
    }
}
