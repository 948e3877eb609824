use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::request::ScrapeRequest;
use crate::pipeline::orchestrator::ScrapeOrchestrator;
use crate::store::JobStore;

/// Run a scrape in the background and record its terminal status.
/// The task is expected to be marked processing already. A panicking
/// scrape is recorded as failed rather than left processing.
pub fn spawn_scrape(
    store: Arc<dyn JobStore>,
    orchestrator: ScrapeOrchestrator,
    task_id: Uuid,
    request: ScrapeRequest,
) -> JoinHandle<()> {
    let span = tracing::info_span!("scrape", %task_id, site = %request.site);
    tokio::spawn(
        async move {
            tracing::info!(
                search_term = request.search_term.as_deref(),
                location = request.location.as_deref(),
                "Task started: {} results wanted, timeout {:?}",
                request.results_wanted,
                request.request_timeout
            );
            let scrape = tokio::spawn(
                async move { orchestrator.scrape(&request).await }.in_current_span(),
            );

            match scrape.await {
                Ok(Ok(result)) => {
                    tracing::info!(
                        "Task completed: {} jobs ({:?})",
                        result.jobs.len(),
                        result.outcome
                    );
                    store.complete(task_id, result).await;
                }
                Ok(Err(e)) => {
                    let error = e.to_string();
                    tracing::error!("Task failed: {error}");
                    store.fail(task_id, error).await;
                }
                Err(e) => {
                    let error = format!("Scrape task aborted: {e}");
                    tracing::error!("{error}");
                    store.fail(task_id, error).await;
                }
            }
        }
        .instrument(span),
    )
}
