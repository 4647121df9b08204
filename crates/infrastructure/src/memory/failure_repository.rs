use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crawler_core::{CrawlerResult, FailureRepository};
use crawler_domain::entities::FailureRecord;

/// 内存失败记录仓储，只追加
pub struct MemoryFailureRepository {
    records: RwLock<Vec<FailureRecord>>,
    next_id: AtomicI64,
}

impl MemoryFailureRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryFailureRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FailureRepository for MemoryFailureRepository {
    async fn append(&self, record: &FailureRecord) -> CrawlerResult<FailureRecord> {
        let mut created = record.clone();
        created.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        created.created_at = Utc::now();

        let mut records = self.records.write().await;
        records.push(created.clone());
        Ok(created)
    }

    async fn get_by_task_id(&self, task_id: i64) -> CrawlerResult<Vec<FailureRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.task_id == task_id)
            .cloned()
            .collect())
    }
}
