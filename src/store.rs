use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::task::{ScrapeResult, TaskStatus};

/// Where task statuses live between submission and polling.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_processing(&self, id: Uuid);

    async fn complete(&self, id: Uuid, result: ScrapeResult);

    async fn fail(&self, id: Uuid, error: String);

    async fn get(&self, id: Uuid) -> Option<TaskStatus>;

    async fn len(&self) -> usize;
}

#[derive(Default)]
struct Tasks {
    statuses: HashMap<Uuid, TaskStatus>,
    /// Finished task ids, oldest first.
    finished: VecDeque<Uuid>,
}

/// Process-local store. Statuses are lost on restart. Tasks still
/// processing are always kept; finished ones are dropped oldest first
/// once there are more than `retain`.
#[derive(Default)]
pub struct InMemoryJobStore {
    tasks: RwLock<Tasks>,
    retain: Option<usize>,
}

impl InMemoryJobStore {
    pub fn bounded(retain: usize) -> Self {
        Self {
            tasks: RwLock::default(),
            retain: Some(retain),
        }
    }

    async fn finish(&self, id: Uuid, status: TaskStatus) {
        let mut tasks = self.tasks.write().await;
        let was_finished = tasks
            .statuses
            .insert(id, status)
            .is_some_and(|old| old != TaskStatus::Processing);
        if !was_finished {
            tasks.finished.push_back(id);
        }

        let Some(retain) = self.retain else { return };
        while tasks.finished.len() > retain {
            if let Some(oldest) = tasks.finished.pop_front() {
                tasks.statuses.remove(&oldest);
                tracing::debug!("Evicted finished task {oldest}");
            }
        }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert_processing(&self, id: Uuid) {
        self.tasks
            .write()
            .await
            .statuses
            .insert(id, TaskStatus::Processing);
    }

    async fn complete(&self, id: Uuid, result: ScrapeResult) {
        self.finish(id, TaskStatus::completed(result)).await;
    }

    async fn fail(&self, id: Uuid, error: String) {
        self.finish(id, TaskStatus::Failed { error }).await;
    }

    async fn get(&self, id: Uuid) -> Option<TaskStatus> {
        self.tasks.read().await.statuses.get(&id).cloned()
    }

    async fn len(&self) -> usize {
        self.tasks.read().await.statuses.len()
    }
}
