use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crawler_core::{CrawlerResult, HistoryRepository};
use crawler_domain::entities::ExecutionHistory;

/// 内存执行历史仓储，只追加
pub struct MemoryHistoryRepository {
    records: RwLock<Vec<ExecutionHistory>>,
    next_id: AtomicI64,
}

impl MemoryHistoryRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryHistoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    async fn append(&self, history: &ExecutionHistory) -> CrawlerResult<ExecutionHistory> {
        let mut record = history.clone();
        record.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.created_at = Utc::now();

        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(record)
    }

    async fn get_by_task_id(&self, task_id: i64) -> CrawlerResult<Vec<ExecutionHistory>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn get_by_worker_id(&self, worker_id: &str) -> CrawlerResult<Vec<ExecutionHistory>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.worker_id == worker_id)
            .cloned()
            .collect())
    }
}
