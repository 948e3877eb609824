use async_trait::async_trait;
use serde::Deserialize;

use crate::browser::{Element, Locator};
use crate::error::BrowserError;
use crate::models::job::Country;
use crate::models::request::{ScrapeRequest, Site, SiteOptions};
use crate::pipeline::filters::FilterSpec;
use crate::pipeline::locate::{Extract, Lookup, first_match, resolve};
use crate::pipeline::parse::SalaryConvention;
use crate::pipeline::seeds::Seed;
use crate::scrapers::{DetailChains, SiteDefaults, SiteScraper, absolute_url};

const BASE_URL: &str = "https://japan-dev.com/japan-jobs-relocation";

site_options!(ApplicantLocation {
    Anywhere => "anywhere",
    JapanOnly => "japan_only",
});

site_options!(JapaneseLevel {
    NotRequired => "not_required",
    Conversational => "conversational",
    Business => "business",
    Fluent => "fluent",
    Native => "native",
});

site_options!(EnglishLevel {
    NotRequired => "not_required",
    Conversational => "conversational",
    Business => "business",
    Fluent => "fluent",
    Native => "native",
});

site_options!(RemoteWork {
    NoRemote => "no_remote",
    PartialRemote => "partial_remote",
    FullRemote => "full_remote",
    AnywhereInJapan => "anywhere_in_japan",
    Worldwide => "worldwide",
});

site_options!(Seniority {
    NewGrad => "new_grad",
    Junior => "junior",
    MidLevel => "mid_level",
    Senior => "senior",
    Lead => "lead",
});

site_options!(SalaryBand {
    Under6M => "under_6m",
    From6MTo8M => "6m_8m",
    From8MTo10M => "8m_10m",
    From10MTo12M => "10m_12m",
    Over12M => "over_12m",
});

site_options!(JobType {
    FullTime => "full_time",
    Contract => "contract",
    PartTime => "part_time",
    Internship => "internship",
});

site_options!(OfficeLocation {
    Tokyo => "tokyo",
    Osaka => "osaka",
    Kyoto => "kyoto",
    Fukuoka => "fukuoka",
    Nagoya => "nagoya",
    Yokohama => "yokohama",
    Other => "other",
});

site_options!(CompanyType {
    Startup => "startup",
    Enterprise => "enterprise",
    Agency => "agency",
    Foreign => "foreign",
});

site_options!(Skill {
    JavaScript => "javascript",
    TypeScript => "typescript",
    Python => "python",
    Go => "go",
    Java => "java",
    Kotlin => "kotlin",
    Swift => "swift",
    Ruby => "ruby",
    Rust => "rust",
    Php => "php",
    CSharp => "csharp",
    React => "react",
    Aws => "aws",
    MachineLearning => "machine_learning",
});

/// A toggle not covered by the typed options: clicks `id="{key}-{token}"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFilter {
    pub key: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JapanDevOptions {
    pub applicant_locations: Vec<ApplicantLocation>,
    pub japanese_levels: Vec<JapaneseLevel>,
    pub english_levels: Vec<EnglishLevel>,
    pub remote_work: Vec<RemoteWork>,
    pub seniorities: Vec<Seniority>,
    pub salary_filters: Vec<SalaryBand>,
    pub job_types: Vec<JobType>,
    pub office_locations: Vec<OfficeLocation>,
    pub company_types: Vec<CompanyType>,
    pub skills: Vec<Skill>,
    pub raw_filters: Vec<RawFilter>,
}

fn push_group<T: Copy>(out: &mut Vec<FilterSpec>, category: &str, values: &[T], token: fn(T) -> &'static str) {
    out.extend(values.iter().map(|&v| FilterSpec::new(category, token(v))));
}

impl JapanDevOptions {
    /// Toggles for these options, in the order they are applied.
    /// A bare remote flag with no explicit remote options selects every
    /// remote choice except "no remote".
    pub fn filter_specs(&self, is_remote: bool) -> Vec<FilterSpec> {
        let mut specs = Vec::new();
        push_group(&mut specs, "applicant_location", &self.applicant_locations, ApplicantLocation::token);
        push_group(&mut specs, "japanese_level", &self.japanese_levels, JapaneseLevel::token);
        push_group(&mut specs, "english_level", &self.english_levels, EnglishLevel::token);
        push_group(&mut specs, "remote_work", &self.remote_work, RemoteWork::token);
        push_group(&mut specs, "seniority", &self.seniorities, Seniority::token);
        push_group(&mut specs, "salary", &self.salary_filters, SalaryBand::token);
        push_group(&mut specs, "job_type", &self.job_types, JobType::token);
        push_group(&mut specs, "office_location", &self.office_locations, OfficeLocation::token);
        push_group(&mut specs, "company_type", &self.company_types, CompanyType::token);
        push_group(&mut specs, "skill", &self.skills, Skill::token);
        specs.extend(
            self.raw_filters
                .iter()
                .map(|raw| FilterSpec::new(raw.key.clone(), raw.token.clone())),
        );

        if is_remote && self.remote_work.is_empty() {
            let remote: Vec<RemoteWork> = RemoteWork::ALL
                .iter()
                .copied()
                .filter(|r| *r != RemoteWork::NoRemote)
                .collect();
            push_group(&mut specs, "remote_work", &remote, RemoteWork::token);
        }
        specs
    }
}

static CARD_LOCATORS: [Locator<'static>; 2] = [
    Locator::Css(".job-item"),
    Locator::Css(".top-jobs__job-item"),
];

static CARD_TITLE: [Locator<'static>; 2] = [
    Locator::Css(".job-item__title"),
    Locator::Css("a.title.link"),
];

const CARD_COMPANY: &[Lookup] = &[Lookup::css("img.company-logo__inner", Extract::Attr("alt"))];

const SUMMARY_SPANS: &str = "ul.job-detail__summary-list li span";

static DETAIL: DetailChains = DetailChains {
    title: &[Lookup::css("h1.job-detail__job-name", Extract::Text)],
    company: &[Lookup::css("a.job-logo__company-name", Extract::Text)],
    location: &[
        Lookup::css("div.job-logo__location", Extract::Text),
        Lookup::css(SUMMARY_SPANS, Extract::Text),
    ],
    salary: &[Lookup::css(
        "div.job-detail-tag-list__basic-tag:has(img[alt='yen-icon']) div.job-detail-tag-list__tag-desc",
        Extract::Text,
    )],
    apply_url: &[Lookup::xpath(
        "//a[contains(normalize-space(.), 'APPLY NOW')]",
        Extract::Attr("href"),
    )],
    description: &[
        Locator::Css("div.job-detail-main-content div.body"),
        Locator::Css("div.job-detail-main-content"),
    ],
    posted_date: &[Lookup::css(SUMMARY_SPANS, Extract::LastText)],
    remote: &[],
    language: &[],
};

static DEFAULTS: SiteDefaults = SiteDefaults {
    country: Country::Japan,
    location: "Japan",
    // Salary tags read like "10M 14M yr"; bare figures are millions of yen.
    salary: SalaryConvention {
        default_currency: "JPY",
        bare_unit: Some(1_000_000.0),
    },
    date_format: "%B %d, %Y",
};

/// japan-dev.com: a single listing page refined through toggle filters.
pub struct JapanDev;

#[async_trait]
impl SiteScraper for JapanDev {
    fn site(&self) -> Site {
        Site::JapanDev
    }

    fn listing_url(&self, _request: &ScrapeRequest) -> String {
        BASE_URL.to_string()
    }

    fn listing_ready(&self) -> Locator<'static> {
        Locator::Css(".filters")
    }

    fn search_box(&self) -> Option<Locator<'static>> {
        Some(Locator::Css(".ais-SearchBox-input"))
    }

    fn filter_specs(&self, request: &ScrapeRequest) -> Vec<FilterSpec> {
        match &request.options {
            SiteOptions::JapanDev(options) => options.filter_specs(request.is_remote),
            _ => JapanDevOptions::default().filter_specs(request.is_remote),
        }
    }

    fn card_locators(&self) -> &'static [Locator<'static>] {
        &CARD_LOCATORS
    }

    fn results_marker(&self) -> Locator<'static> {
        Locator::Css(".job-item, .top-jobs__job-item, .no-results")
    }

    async fn read_card(&self, card: &dyn Element) -> Result<Vec<Seed>, BrowserError> {
        let Some(link) = first_match(card, &CARD_TITLE).await? else {
            return Ok(Vec::new());
        };
        let Some(url) = link
            .attr("href")
            .await?
            .and_then(|href| absolute_url(BASE_URL, &href))
        else {
            return Ok(Vec::new());
        };
        let title = link.text().await?;

        Ok(vec![Seed {
            url,
            title_hint: Some(title.trim().to_string()).filter(|t| !t.is_empty()),
            company_hint: resolve(card, CARD_COMPANY).await?,
            ..Seed::default()
        }])
    }

    fn detail_chains(&self) -> &'static DetailChains {
        &DETAIL
    }

    fn defaults(&self) -> &'static SiteDefaults {
        &DEFAULTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeNode;
    use serde_json::json;

    fn ids(specs: &[FilterSpec]) -> Vec<String> {
        specs.iter().map(FilterSpec::id).collect()
    }

    #[test]
    fn options_parse_from_json() {
        let options: JapanDevOptions = serde_json::from_value(json!({
            "applicant_locations": ["anywhere"],
            "japanese_levels": ["not_required"],
            "seniorities": ["new_grad", "junior", "mid_level"],
            "raw_filters": [{ "key": "skill", "token": "elixir" }]
        }))
        .unwrap();

        assert_eq!(
            ids(&options.filter_specs(false)),
            vec![
                "applicant_location-anywhere",
                "japanese_level-not_required",
                "seniority-new_grad",
                "seniority-junior",
                "seniority-mid_level",
                "skill-elixir",
            ]
        );
    }

    #[test]
    fn unknown_values_and_keys_are_rejected() {
        assert!(serde_json::from_value::<JapanDevOptions>(json!({ "seniorities": ["wizard"] })).is_err());
        assert!(serde_json::from_value::<JapanDevOptions>(json!({ "colour": ["blue"] })).is_err());
    }

    #[test]
    fn remote_flag_expands_to_remote_options() {
        let specs = JapanDevOptions::default().filter_specs(true);
        assert_eq!(
            ids(&specs),
            vec![
                "remote_work-partial_remote",
                "remote_work-full_remote",
                "remote_work-anywhere_in_japan",
                "remote_work-worldwide",
            ]
        );
    }

    #[test]
    fn explicit_remote_options_win_over_flag() {
        let options = JapanDevOptions {
            remote_work: vec![RemoteWork::FullRemote],
            ..JapanDevOptions::default()
        };
        assert_eq!(ids(&options.filter_specs(true)), vec!["remote_work-full_remote"]);
    }

    #[tokio::test]
    async fn reads_primary_card_layout() {
        let card = FakeNode::new()
            .child(
                ".job-item__title",
                FakeNode::new()
                    .text(" Backend Engineer ")
                    .attr("href", "/jobs/acme/backend-engineer"),
            )
            .child("img.company-logo__inner", FakeNode::new().attr("alt", "Acme"));

        let seeds = JapanDev.read_card(&card).await.unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].url, "https://japan-dev.com/jobs/acme/backend-engineer");
        assert_eq!(seeds[0].title_hint.as_deref(), Some("Backend Engineer"));
        assert_eq!(seeds[0].company_hint.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn reads_secondary_card_layout() {
        let card = FakeNode::new().child(
            "a.title.link",
            FakeNode::new().text("QA Lead").attr("href", "https://japan-dev.com/jobs/b/qa"),
        );
        let seeds = JapanDev.read_card(&card).await.unwrap();
        assert_eq!(seeds[0].url, "https://japan-dev.com/jobs/b/qa");
        assert_eq!(seeds[0].company_hint, None);
    }

    #[tokio::test]
    async fn card_without_link_is_skipped() {
        let card = FakeNode::new().child(".job-item__title", FakeNode::new().text("No link"));
        assert!(JapanDev.read_card(&card).await.unwrap().is_empty());
    }
}
