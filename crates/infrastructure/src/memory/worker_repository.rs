use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crawler_core::{CrawlerError, CrawlerResult, WorkerRepository};
use crawler_domain::entities::{WorkerInfo, WorkerStatus};

/// 内存Worker仓储
pub struct MemoryWorkerRepository {
    workers: RwLock<HashMap<String, WorkerInfo>>,
}

impl MemoryWorkerRepository {
    pub fn new() -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryWorkerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerRepository for MemoryWorkerRepository {
    async fn register(&self, worker: &WorkerInfo) -> CrawlerResult<()> {
        let mut workers = self.workers.write().await;
        if workers.contains_key(&worker.id) {
            return Err(CrawlerError::WorkerAlreadyRegistered {
                id: worker.id.clone(),
            });
        }
        workers.insert(worker.id.clone(), worker.clone());
        Ok(())
    }

    async fn unregister(&self, worker_id: &str) -> CrawlerResult<()> {
        let mut workers = self.workers.write().await;
        workers
            .remove(worker_id)
            .map(|_| ())
            .ok_or_else(|| CrawlerError::WorkerNotFound {
                id: worker_id.to_string(),
            })
    }

    async fn get_by_id(&self, worker_id: &str) -> CrawlerResult<Option<WorkerInfo>> {
        let workers = self.workers.read().await;
        Ok(workers.get(worker_id).cloned())
    }

    async fn update(&self, worker: &WorkerInfo) -> CrawlerResult<()> {
        let mut workers = self.workers.write().await;
        let entry = workers
            .get_mut(&worker.id)
            .ok_or_else(|| CrawlerError::WorkerNotFound {
                id: worker.id.clone(),
            })?;
        *entry = worker.clone();
        Ok(())
    }

    async fn list(&self) -> CrawlerResult<Vec<WorkerInfo>> {
        let workers = self.workers.read().await;
        Ok(workers.values().cloned().collect())
    }

    async fn update_heartbeat(
        &self,
        worker_id: &str,
        heartbeat_time: DateTime<Utc>,
        current_load: i32,
    ) -> CrawlerResult<()> {
        let mut workers = self.workers.write().await;
        let worker = workers
            .get_mut(worker_id)
            .ok_or_else(|| CrawlerError::WorkerNotFound {
                id: worker_id.to_string(),
            })?;
        worker.apply_heartbeat(current_load, heartbeat_time);
        Ok(())
    }

    async fn update_status(&self, worker_id: &str, status: WorkerStatus) -> CrawlerResult<()> {
        let mut workers = self.workers.write().await;
        let worker = workers
            .get_mut(worker_id)
            .ok_or_else(|| CrawlerError::WorkerNotFound {
                id: worker_id.to_string(),
            })?;
        worker.status = status;
        Ok(())
    }

    async fn adjust_load(&self, worker_id: &str, delta: i32) -> CrawlerResult<()> {
        let mut workers = self.workers.write().await;
        let worker = workers
            .get_mut(worker_id)
            .ok_or_else(|| CrawlerError::WorkerNotFound {
                id: worker_id.to_string(),
            })?;
        worker.current_load = (worker.current_load + delta).max(0);
        Ok(())
    }

    async fn get_timeout_workers(&self, timeout_seconds: i64) -> CrawlerResult<Vec<WorkerInfo>> {
        let now = Utc::now();
        let workers = self.workers.read().await;
        Ok(workers
            .values()
            .filter(|w| {
                w.status != WorkerStatus::Offline && w.is_heartbeat_expired(now, timeout_seconds)
            })
            .cloned()
            .collect())
    }
}
