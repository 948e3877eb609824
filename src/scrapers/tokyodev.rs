use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

use crate::browser::{Element, LaunchOptions, Locator};
use crate::error::BrowserError;
use crate::models::job::Country;
use crate::models::request::{ScrapeRequest, Site, SiteOptions};
use crate::pipeline::filters::FilterSpec;
use crate::pipeline::locate::{Extract, Lookup, resolve};
use crate::pipeline::parse::SalaryConvention;
use crate::pipeline::seeds::{Seed, Tag, classify_tags};
use crate::scrapers::{DetailChains, SiteDefaults, SiteScraper, absolute_url};

/// Characters that encodeURIComponent does NOT encode.
const ENCODE_URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const BASE_URL: &str = "https://www.tokyodev.com";
const SALARY_MARKER: &str = "/jobs/salary-data";
const NON_SKILL_TAGS: &[&str] = &["japanese", "resident"];

site_options!(JapaneseRequirement {
    None => "none",
    Basic => "basic",
    Conversational => "conversational",
    Business => "business",
    Fluent => "fluent",
});

site_options!(EnglishRequirement {
    None => "none",
    Basic => "basic",
    Conversational => "conversational",
    Business => "business",
    Fluent => "fluent",
});

site_options!(ApplicantLocation {
    ApplyFromAbroad => "apply_from_abroad",
    JapanResidentsOnly => "japan_residents_only",
});

site_options!(Seniority {
    Intern => "intern",
    Junior => "junior",
    Intermediate => "intermediate",
    Senior => "senior",
});

site_options!(MinSalary {
    Yen4M => "4000000",
    Yen6M => "6000000",
    Yen8M => "8000000",
    Yen10M => "10000000",
    Yen12M => "12000000",
    Yen15M => "15000000",
});

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokyoDevOptions {
    pub min_salary: Option<MinSalary>,
    pub japanese_requirements: Vec<JapaneseRequirement>,
    pub english_requirements: Vec<EnglishRequirement>,
    pub applicant_locations: Vec<ApplicantLocation>,
    pub seniorities: Vec<Seniority>,
    pub categories: Vec<String>,
}

impl Default for TokyoDevOptions {
    fn default() -> Self {
        Self {
            min_salary: None,
            japanese_requirements: vec![JapaneseRequirement::None, JapaneseRequirement::Basic],
            english_requirements: Vec::new(),
            applicant_locations: vec![ApplicantLocation::ApplyFromAbroad],
            seniorities: vec![Seniority::Intern, Seniority::Junior, Seniority::Intermediate],
            categories: Vec::new(),
        }
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, ENCODE_URI_COMPONENT_SET).to_string()
}

/// Build the filtered listing URL. TokyoDev filters live in the query string.
pub fn jobs_url(request: &ScrapeRequest, options: &TokyoDevOptions) -> String {
    let mut params: Vec<(&str, &str)> = vec![("query[]", request.search_term.as_deref().unwrap_or(""))];
    params.extend(
        options
            .japanese_requirements
            .iter()
            .map(|r| ("japanese_requirement[]", r.token())),
    );
    params.extend(
        options
            .english_requirements
            .iter()
            .map(|r| ("english_requirement[]", r.token())),
    );
    if request.is_remote {
        params.push(("remote_policy[]", "fully_remote"));
        params.push(("remote_policy[]", "partially_remote"));
    }
    params.extend(
        options
            .applicant_locations
            .iter()
            .map(|l| ("applicant_location[]", l.token())),
    );
    params.extend(options.seniorities.iter().map(|s| ("seniority[]", s.token())));
    params.extend(options.categories.iter().map(|c| ("category[]", c.as_str())));
    // The site always sends salary, empty when unset.
    params.push(("salary", options.min_salary.map(MinSalary::token).unwrap_or("")));

    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect();
    format!("{BASE_URL}/jobs?{}", query.join("&"))
}

fn looks_like_salary(text: &str) -> bool {
    text.contains('¥') && (text.contains('~') || text.to_uppercase().contains('M'))
}

static CARD_LOCATORS: [Locator<'static>; 1] = [Locator::Css("ul.list-inside > li")];

const CARD_COMPANY: &[Lookup] = &[Lookup::css("h3 a", Extract::Text)];
const CARD_ITEMS: Locator<'static> = Locator::Css("div[data-collapsable-list-target='item']");
const ITEM_LINK: Locator<'static> = Locator::Css("h4 a");
const ITEM_TAGS: Locator<'static> = Locator::Css("div.flex.gap-2 a");

static DETAIL: DetailChains = DetailChains {
    title: &[Lookup::css("h1", Extract::Text)],
    company: &[Lookup::css(
        "#job-header a[href^='/companies/'] span.font-bold",
        Extract::Text,
    )],
    location: &[],
    salary: &[Lookup::xpath(
        "//*[@id='job-header']//span[contains(., '¥')]",
        Extract::FirstTextWhere(looks_like_salary),
    )],
    apply_url: &[Lookup::xpath("//a[contains(., 'Apply')]", Extract::Attr("href"))],
    description: &[Locator::Css(".prose"), Locator::Css("body")],
    posted_date: &[],
    remote: &[Lookup::css("#job-header", Extract::Text)],
    language: &[Lookup::css("#job-header [data-controller='tooltip']", Extract::AllText)],
};

static DEFAULTS: SiteDefaults = SiteDefaults {
    country: Country::Japan,
    location: "Tokyo",
    // Amounts always carry an M suffix ("¥7.5M ~ ¥14M").
    salary: SalaryConvention {
        default_currency: "JPY",
        bare_unit: None,
    },
    date_format: "%Y-%m-%d",
};

/// tokyodev.com: filters go in the URL; the listing groups postings by company.
pub struct TokyoDev;

impl TokyoDev {
    async fn read_item(&self, item: &dyn Element, company: Option<&str>) -> Result<Option<Seed>, BrowserError> {
        let Some(link) = item.locate(ITEM_LINK).await?.into_iter().next() else {
            return Ok(None);
        };
        let Some(url) = link
            .attr("href")
            .await?
            .and_then(|href| absolute_url(BASE_URL, &href))
        else {
            return Ok(None);
        };
        let title = link.text().await?;

        let mut tags = Vec::new();
        for tag in item.locate(ITEM_TAGS).await? {
            tags.push(Tag {
                text: tag.text().await?,
                href: tag.attr("href").await?,
            });
        }
        let hints = classify_tags(&tags, SALARY_MARKER, NON_SKILL_TAGS);

        Ok(Some(Seed {
            url,
            title_hint: Some(title.trim().to_string()).filter(|t| !t.is_empty()),
            company_hint: company.map(String::from),
            skills: hints.skills,
            remote_hint: hints.remote,
            salary_hint: hints.salary,
        }))
    }
}

#[async_trait]
impl SiteScraper for TokyoDev {
    fn site(&self) -> Site {
        Site::TokyoDev
    }

    fn launch_options(&self, request: &ScrapeRequest) -> LaunchOptions {
        // Cloudflare is less suspicious of sessions that load every resource.
        LaunchOptions {
            block_images: false,
            page_load_timeout: request.request_timeout,
        }
    }

    fn listing_url(&self, request: &ScrapeRequest) -> String {
        match &request.options {
            SiteOptions::TokyoDev(options) => jobs_url(request, options),
            _ => jobs_url(request, &TokyoDevOptions::default()),
        }
    }

    fn listing_ready(&self) -> Locator<'static> {
        Locator::Css("ul.list-inside")
    }

    fn challenge_marker(&self) -> Option<&'static str> {
        Some("Just a moment")
    }

    fn filter_specs(&self, _request: &ScrapeRequest) -> Vec<FilterSpec> {
        Vec::new()
    }

    fn card_locators(&self) -> &'static [Locator<'static>] {
        &CARD_LOCATORS
    }

    fn results_marker(&self) -> Locator<'static> {
        Locator::Css("ul.list-inside > li")
    }

    async fn read_card(&self, card: &dyn Element) -> Result<Vec<Seed>, BrowserError> {
        let company = match resolve(card, CARD_COMPANY).await {
            Ok(company) => company,
            Err(e) => {
                tracing::debug!("Could not read company on card: {e}");
                None
            }
        };

        let mut seeds = Vec::new();
        for item in card.locate(CARD_ITEMS).await? {
            match self.read_item(&*item, company.as_deref()).await {
                Ok(Some(seed)) => seeds.push(seed),
                Ok(None) => {}
                Err(e) => tracing::debug!("Skipping unreadable job row: {e}"),
            }
        }
        Ok(seeds)
    }

    fn detail_chains(&self) -> &'static DetailChains {
        &DETAIL
    }

    fn defaults(&self) -> &'static SiteDefaults {
        &DEFAULTS
    }

    /// Keeps the first Japanese and first English requirement.
    fn language_requirements(&self, raw: &str) -> Option<String> {
        let japanese = raw.lines().find(|l| l.contains("Japanese"));
        let english = raw.lines().find(|l| l.contains("English"));
        let bits: Vec<&str> = [japanese, english].into_iter().flatten().collect();
        (!bits.is_empty()).then(|| bits.join(" | "))
    }

    fn detail_pause(&self) -> Duration {
        Duration::from_millis(300)
    }
}
