//! Turn noisy listing text into structured values. Nothing here fails:
//! text that cannot be read yields `None`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::job::{Compensation, CompensationInterval};

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:([KkMm])\b)?").expect("amount pattern is valid")
});

/// How a site writes salary amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryConvention {
    /// Currency assumed when the text carries no symbol or code.
    pub default_currency: &'static str,
    /// Multiplier for numbers written without a K/M suffix. `None` ignores them.
    pub bare_unit: Option<f64>,
}

fn detect_currency(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    if text.contains('¥') || text.contains('￥') || upper.contains("JPY") {
        Some("JPY")
    } else if text.contains('€') || upper.contains("EUR") {
        Some("EUR")
    } else if text.contains('$') || upper.contains("USD") {
        Some("USD")
    } else {
        None
    }
}

/// Parse yearly compensation from text like `"¥7.5M ~ ¥14M"` or `"10M 14M yr"`.
pub fn parse_compensation(text: &str, convention: SalaryConvention) -> Option<Compensation> {
    let cleaned = text.replace(',', "");

    let amounts: Vec<f64> = AMOUNT_RE
        .captures_iter(&cleaned)
        .filter_map(|caps| {
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            let unit = match caps.get(2).map(|m| m.as_str()) {
                Some("M" | "m") => 1_000_000.0,
                Some("K" | "k") => 1_000.0,
                _ => convention.bare_unit?,
            };
            let amount = value * unit;
            amount.is_finite().then_some(amount)
        })
        .take(2)
        .collect();

    let min_amount = *amounts.first()?;
    Some(Compensation {
        interval: CompensationInterval::Yearly,
        min_amount,
        max_amount: amounts.get(1).copied(),
        currency: detect_currency(&cleaned)
            .unwrap_or(convention.default_currency)
            .to_string(),
    })
}

/// Parse a posted date written in the site's `chrono` format.
pub fn parse_posted_date(text: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), format).ok()
}

/// Collapse runs of whitespace into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Readable title from the last path segment, e.g.
/// `/jobs/backend-engineer` → `Backend Engineer`.
pub fn title_from_slug(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let slug = path.trim_end_matches('/').rsplit('/').next()?;
    let words: Vec<String> = slug
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}
