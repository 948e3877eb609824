// Site scrapers. Each site describes where its listing lives, how its
// filters are addressed and which locators hold each detail field; the
// pipeline does the driving.

/// Declares a closed set of site option values. Each variant carries the
/// token the site uses for it, which is also its accepted JSON spelling.
macro_rules! site_options {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $token)] $variant),+
        }

        impl $name {
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }
    };
}

pub mod japandev;
pub mod runner;
pub mod tokyodev;

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{Element, LaunchOptions, Locator};
use crate::error::BrowserError;
use crate::models::job::Country;
use crate::models::request::{ScrapeRequest, Site};
use crate::pipeline::filters::FilterSpec;
use crate::pipeline::locate::Lookup;
use crate::pipeline::parse::SalaryConvention;
use crate::pipeline::seeds::Seed;

/// Values used when a page does not say otherwise.
#[derive(Debug, Clone, Copy)]
pub struct SiteDefaults {
    pub country: Country,
    pub location: &'static str,
    pub salary: SalaryConvention,
    /// `chrono` format of posted dates on detail pages.
    pub date_format: &'static str,
}

/// Lookup chains for every detail page field, tried in order.
#[derive(Debug, Clone, Copy)]
pub struct DetailChains {
    pub title: &'static [Lookup],
    pub company: &'static [Lookup],
    pub location: &'static [Lookup],
    pub salary: &'static [Lookup],
    pub apply_url: &'static [Lookup],
    /// Description containers; read as text or markup per request.
    pub description: &'static [Locator<'static>],
    pub posted_date: &'static [Lookup],
    /// Text searched for "remote".
    pub remote: &'static [Lookup],
    pub language: &'static [Lookup],
}

/// Trait that all site scrapers implement.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    fn site(&self) -> Site;

    fn launch_options(&self, request: &ScrapeRequest) -> LaunchOptions {
        LaunchOptions {
            block_images: true,
            page_load_timeout: request.request_timeout,
        }
    }

    /// Listing page to open for this request.
    fn listing_url(&self, request: &ScrapeRequest) -> String;

    /// Present once the listing page has rendered.
    fn listing_ready(&self) -> Locator<'static>;

    /// Title fragment shown while an anti-bot interstitial is up.
    fn challenge_marker(&self) -> Option<&'static str> {
        None
    }

    /// Search box for sites that take the search term through the UI.
    fn search_box(&self) -> Option<Locator<'static>> {
        None
    }

    /// Toggle filters to switch on for this request.
    fn filter_specs(&self, request: &ScrapeRequest) -> Vec<FilterSpec>;

    /// Card containers, primary layout first.
    fn card_locators(&self) -> &'static [Locator<'static>];

    /// Matches once cards, or the empty-results notice, are on the page.
    fn results_marker(&self) -> Locator<'static>;

    /// Read the seeds on one card. A card may list several postings.
    async fn read_card(&self, card: &dyn Element) -> Result<Vec<Seed>, BrowserError>;

    fn detail_chains(&self) -> &'static DetailChains;

    fn defaults(&self) -> &'static SiteDefaults;

    /// Condense raw language-requirement text into one line.
    fn language_requirements(&self, _raw: &str) -> Option<String> {
        None
    }

    /// Pause after each detail page.
    fn detail_pause(&self) -> Duration {
        Duration::ZERO
    }
}

/// Look up the scraper for a site.
pub fn get_scraper(site: Site) -> Box<dyn SiteScraper> {
    match site {
        Site::JapanDev => Box::new(japandev::JapanDev),
        Site::TokyoDev => Box::new(tokyodev::TokyoDev),
    }
}

/// Resolve a possibly relative link against the page it appeared on.
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(base).ok()?;
    base.join(href.trim()).ok().map(String::from)
}
