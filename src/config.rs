use std::time::Duration;

use clap::Parser;

use crate::models::request::SubmitLimits;
use crate::pipeline::filters::RetryPolicy;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobscout", about = "Browser-driven job listing scraper")]
pub struct Config {
    /// Listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// WebDriver endpoint (chromedriver, selenium, ...)
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[arg(long, env = "HEADLESS", default_value = "true", action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Override the browser user agent
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy for browser traffic: host:port or user:pass@host:port
    #[arg(long, env = "SCRAPE_PROXY")]
    pub proxy: Option<String>,

    /// Default timeout in seconds for requests that do not set one
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "60")]
    pub request_timeout: u64,

    /// Largest results_wanted accepted
    #[arg(long, env = "MAX_RESULTS", default_value = "100")]
    pub max_results: usize,

    /// Clicks tried per filter toggle before giving up on it
    #[arg(long, env = "FILTER_ATTEMPTS", default_value = "3")]
    pub filter_attempts: u32,

    /// Finished tasks kept for polling; the oldest are dropped first
    #[arg(long, env = "RETAIN_TASKS", default_value = "1000")]
    pub retain_tasks: usize,
}

impl Config {
    pub fn submit_limits(&self) -> SubmitLimits {
        SubmitLimits {
            max_results: self.max_results,
            default_timeout: Duration::from_secs(self.request_timeout.max(1)),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.filter_attempts.max(1),
            ..RetryPolicy::default()
        }
    }
}
