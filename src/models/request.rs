use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::scrapers::japandev::JapanDevOptions;
use crate::scrapers::tokyodev::TokyoDevOptions;

/// Sites this service knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    JapanDev,
    TokyoDev,
}

impl Site {
    pub const ALL: [Site; 2] = [Site::JapanDev, Site::TokyoDev];

    pub fn name(self) -> &'static str {
        match self {
            Site::JapanDev => "japandev",
            Site::TokyoDev => "tokyodev",
        }
    }

    /// Case-insensitive lookup by site name.
    pub fn from_name(name: &str) -> Option<Site> {
        Self::ALL
            .into_iter()
            .find(|site| site.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionFormat {
    #[default]
    #[serde(alias = "markdown", alias = "text")]
    Plain,
    Html,
}

/// Per-site options, converted from the request's open option map.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteOptions {
    JapanDev(JapanDevOptions),
    TokyoDev(TokyoDevOptions),
}

impl SiteOptions {
    pub fn parse(site: Site, options: Option<Map<String, Value>>) -> Result<Self, AppError> {
        let value = Value::Object(options.unwrap_or_default());
        let invalid = |e: serde_json::Error| {
            AppError::BadRequest(format!("Invalid options for '{site}': {e}"))
        };
        match site {
            Site::JapanDev => serde_json::from_value(value)
                .map(SiteOptions::JapanDev)
                .map_err(invalid),
            Site::TokyoDev => serde_json::from_value(value)
                .map(SiteOptions::TokyoDev)
                .map_err(invalid),
        }
    }
}

/// Request body accepted by `POST /scrape`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitScrape {
    pub site_name: String,
    pub search_term: Option<String>,
    pub location: Option<String>,
    #[serde(default = "default_results_wanted")]
    pub results_wanted: usize,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub description_format: DescriptionFormat,
    /// Timeout budget in seconds.
    pub request_timeout: Option<u64>,
    pub options: Option<Map<String, Value>>,
}

fn default_results_wanted() -> usize {
    20
}

/// Limits applied while validating a submission.
#[derive(Debug, Clone, Copy)]
pub struct SubmitLimits {
    pub max_results: usize,
    pub default_timeout: Duration,
}

/// A validated scrape request. Built once at submission, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRequest {
    pub site: Site,
    pub search_term: Option<String>,
    pub location: Option<String>,
    pub is_remote: bool,
    pub results_wanted: usize,
    pub description_format: DescriptionFormat,
    pub request_timeout: Duration,
    pub options: SiteOptions,
}

impl ScrapeRequest {
    pub fn from_submission(input: SubmitScrape, limits: SubmitLimits) -> Result<Self, AppError> {
        let site = Site::from_name(&input.site_name).ok_or_else(|| {
            let valid: Vec<&str> = Site::ALL.iter().map(|s| s.name()).collect();
            AppError::BadRequest(format!(
                "Invalid site name: '{}'. Valid options: {valid:?}",
                input.site_name
            ))
        })?;

        if input.results_wanted > limits.max_results {
            return Err(AppError::BadRequest(format!(
                "results_wanted must be at most {}",
                limits.max_results
            )));
        }

        let request_timeout = match input.request_timeout {
            Some(0) => {
                return Err(AppError::BadRequest(
                    "request_timeout must be greater than zero".to_string(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => limits.default_timeout,
        };

        let options = SiteOptions::parse(site, input.options)?;

        Ok(ScrapeRequest {
            site,
            search_term: input
                .search_term
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            location: input.location,
            is_remote: input.is_remote,
            results_wanted: input.results_wanted,
            description_format: input.description_format,
            request_timeout,
            options,
        })
    }
}
