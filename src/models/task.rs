use serde::Serialize;

use crate::models::job::JobRecord;

/// How a finished scrape ended. An unavailable listing yields no records
/// but is reported separately from a listing that simply had none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeOutcome {
    Scraped,
    ListingUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeResult {
    pub outcome: ScrapeOutcome,
    pub jobs: Vec<JobRecord>,
}

impl ScrapeResult {
    pub fn listing_unavailable() -> Self {
        Self {
            outcome: ScrapeOutcome::ListingUnavailable,
            jobs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Processing,
    Completed {
        count: usize,
        outcome: ScrapeOutcome,
        data: Vec<JobRecord>,
    },
    Failed {
        error: String,
    },
}

impl TaskStatus {
    pub fn completed(result: ScrapeResult) -> Self {
        TaskStatus::Completed {
            count: result.jobs.len(),
            outcome: result.outcome,
            data: result.jobs,
        }
    }
}
