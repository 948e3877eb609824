use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::error::AppError;
use crate::models::task::TaskStatus;

pub async fn get(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let not_found = || AppError::NotFound(format!("Task '{task_id}' not found"));
    let id = Uuid::parse_str(&task_id).map_err(|_| not_found())?;
    let status = state.store.get(id).await.ok_or_else(not_found)?;

    let code = match &status {
        TaskStatus::Processing => StatusCode::ACCEPTED,
        TaskStatus::Completed { .. } => StatusCode::OK,
        TaskStatus::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut body = serde_json::to_value(&status)
        .map_err(|e| AppError::Internal(format!("Failed to serialize task status: {e}")))?;
    body["task_id"] = json!(id);

    Ok((code, Json(body)))
}
