mod browser;
mod config;
mod error;
mod models;
mod pipeline;
mod routes;
mod scrapers;
mod store;

use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::browser::webdriver::WebDriverLauncher;
use crate::config::Config;
use crate::pipeline::orchestrator::ScrapeOrchestrator;
use crate::routes::api::AppState;
use crate::store::InMemoryJobStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobscout=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Using WebDriver at {}", config.webdriver_url);
    let launcher = WebDriverLauncher::from_config(&config);

    let state = AppState {
        store: Arc::new(InMemoryJobStore::bounded(config.retain_tasks)),
        orchestrator: ScrapeOrchestrator::new(Arc::new(launcher))
            .with_retry_policy(config.retry_policy()),
        limits: config.submit_limits(),
    };

    let app = routes::api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
