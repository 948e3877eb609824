use axum::Json;
use axum::extract::State;
use serde_json::json;

use super::AppState;

pub async fn check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "jobs_in_memory": state.store.len().await,
    }))
}
