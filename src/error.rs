use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failures reported by the browser automation layer.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Failed to start browser session: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser command failed: {0}")]
    Command(String),

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, String),
}

impl From<fantoccini::error::CmdError> for BrowserError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        BrowserError::Command(e.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for BrowserError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        BrowserError::Session(e.to_string())
    }
}

/// Errors that escape a scrape. Everything recoverable is handled inside
/// the pipeline, so these only mark a task as failed.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("{site}: could not open browser session: {source}")]
    Launch {
        site: &'static str,
        #[source]
        source: BrowserError,
    },

    #[error("{site}: listing scan failed: {source}")]
    Listing {
        site: &'static str,
        #[source]
        source: BrowserError,
    },

    #[error("{site}: scrape panicked: {message}")]
    Panicked { site: &'static str, message: String },
}
