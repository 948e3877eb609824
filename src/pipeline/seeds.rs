use std::collections::HashSet;
use std::time::Duration;

use crate::browser::Page;
use crate::error::BrowserError;
use crate::pipeline::locate::all_matches;
use crate::pipeline::parse::squash_whitespace;
use crate::scrapers::SiteScraper;

/// How long to wait for the first card (or an empty-results marker).
const CARDS_TIMEOUT: Duration = Duration::from_secs(5);

/// A posting reference taken from the listing page, waiting to be enriched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seed {
    /// Absolute detail page URL. Unique within one scrape.
    pub url: String,
    pub title_hint: Option<String>,
    pub company_hint: Option<String>,
    pub skills: Vec<String>,
    pub remote_hint: bool,
    pub salary_hint: Option<String>,
}

/// A tag chip shown on a listing card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub text: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagHints {
    pub salary: Option<String>,
    pub remote: bool,
    pub skills: Vec<String>,
}

/// Sort card tags into salary, remote and skill hints.
///
/// A tag linking to `salary_marker` is the salary; one mentioning
/// "remote" sets the remote hint; tags mentioning any of `excluded`
/// (language or residency requirements) are dropped; the rest are skills.
pub fn classify_tags(tags: &[Tag], salary_marker: &str, excluded: &[&str]) -> TagHints {
    let mut hints = TagHints::default();
    for tag in tags {
        let text = squash_whitespace(&tag.text);
        let lower = text.to_lowercase();

        if tag.href.as_deref().is_some_and(|h| h.contains(salary_marker)) {
            if hints.salary.is_none() {
                hints.salary = Some(text);
            }
            continue;
        }
        if lower.contains("remote") {
            hints.remote = true;
            continue;
        }
        if !text.is_empty() && !excluded.iter().any(|x| lower.contains(x)) {
            hints.skills.push(text);
        }
    }
    hints
}

/// Seeds in harvest order, unique by URL, capped in size.
#[derive(Debug)]
pub struct SeedSet {
    cap: usize,
    seen: HashSet<String>,
    seeds: Vec<Seed>,
}

impl SeedSet {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            seen: HashSet::new(),
            seeds: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.seeds.len() >= self.cap
    }

    /// Add a seed unless the set is full or already has its URL.
    pub fn push(&mut self, seed: Seed) -> bool {
        if self.is_full() || !self.seen.insert(seed.url.clone()) {
            return false;
        }
        self.seeds.push(seed);
        true
    }

    pub fn into_vec(self) -> Vec<Seed> {
        self.seeds
    }
}

/// Scan the listing page for up to `cap` seeds.
pub async fn collect_seeds(
    page: &dyn Page,
    scraper: &dyn SiteScraper,
    cap: usize,
) -> Result<Vec<Seed>, BrowserError> {
    let mut set = SeedSet::new(cap);
    if set.is_full() {
        return Ok(set.into_vec());
    }

    if let Err(e) = page.wait_for(scraper.results_marker(), CARDS_TIMEOUT).await {
        tracing::debug!("No listing cards showed up yet: {e}");
    }

    let cards = all_matches(page, scraper.card_locators()).await?;
    tracing::debug!("Found {} listing cards", cards.len());

    for card in &cards {
        if set.is_full() {
            break;
        }
        match scraper.read_card(&**card).await {
            Ok(seeds) => {
                for seed in seeds {
                    if !set.push(seed) && set.is_full() {
                        break;
                    }
                }
            }
            Err(e) => tracing::warn!("Error parsing listing card: {e}"),
        }
    }

    let seeds = set.into_vec();
    tracing::info!("Collected {} seeds from {} cards", seeds.len(), cards.len());
    Ok(seeds)
}
