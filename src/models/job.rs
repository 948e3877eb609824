use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    Japan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub country: Country,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationInterval {
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compensation {
    pub interval: CompensationInterval,
    pub min_amount: f64,
    pub max_amount: Option<f64>,
    pub currency: String,
}

/// Fields read from a detail page. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDetail {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location_text: Option<String>,
    pub salary_text: Option<String>,
    pub job_url_direct: Option<String>,
    pub description: Option<String>,
    pub date_posted: Option<NaiveDate>,
    pub is_remote: Option<bool>,
    pub language_requirements: Option<String>,
}

/// A finished posting as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub title: String,
    pub company_name: Option<String>,
    pub job_url: String,
    pub job_url_direct: Option<String>,
    pub location: Location,
    pub description: Option<String>,
    pub is_remote: Option<bool>,
    pub date_posted: NaiveDate,
    pub compensation: Option<Compensation>,
    pub skills: Vec<String>,
}
