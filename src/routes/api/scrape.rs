use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::error::AppError;
use crate::models::request::{ScrapeRequest, SubmitScrape};
use crate::scrapers::runner::spawn_scrape;

/// Validate the submission, register the task and start it in the background.
pub async fn submit(
    State(state): State<AppState>,
    input: Result<Json<SubmitScrape>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let Json(input) = input.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = ScrapeRequest::from_submission(input, state.limits)?;
    let site = request.site;
    let task_id = Uuid::new_v4();

    state.store.insert_processing(task_id).await;
    spawn_scrape(
        state.store.clone(),
        state.orchestrator.clone(),
        task_id,
        request,
    );
    tracing::info!("Queued {site} scrape as task {task_id}");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "task_id": task_id,
            "status": "processing",
            "message": format!("Scraping {site} in the background. Poll /status/{task_id} for results."),
        })),
    ))
}
