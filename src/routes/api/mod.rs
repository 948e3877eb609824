pub mod health;
pub mod scrape;
pub mod status;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::models::request::SubmitLimits;
use crate::pipeline::orchestrator::ScrapeOrchestrator;
use crate::store::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub orchestrator: ScrapeOrchestrator,
    pub limits: SubmitLimits,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/scrape", post(scrape::submit))
        .route("/status/{task_id}", get(status::get))
        .route("/health", get(health::check))
        .with_state(state)
}
