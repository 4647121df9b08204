use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crawler_core::{CrawlerError, CrawlerResult, TaskRepository};
use crawler_domain::entities::{CrawlTask, TaskStatus};

/// 内存任务仓储
///
/// `try_claim` 在写锁内做"仍为 pending 才领取"的比较交换，
/// 这是并发拉取下不会重复分派的唯一保证点。
pub struct MemoryTaskRepository {
    tasks: RwLock<HashMap<i64, CrawlTask>>,
    next_id: AtomicI64,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn create(&self, task: &CrawlTask) -> CrawlerResult<CrawlTask> {
        let mut created = task.clone();
        created.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        created.created_at = Utc::now();
        created.updated_at = created.created_at;

        let mut tasks = self.tasks.write().await;
        tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CrawlerResult<Option<CrawlTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(&id).cloned())
    }

    async fn update(&self, task: &CrawlTask) -> CrawlerResult<()> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or(CrawlerError::TaskNotFound { id: task.id })?;
        *entry = task.clone();
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn list(&self) -> CrawlerResult<Vec<CrawlTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().cloned().collect())
    }

    async fn get_claimable_tasks(&self, now: DateTime<Utc>) -> CrawlerResult<Vec<CrawlTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| t.is_claimable(now))
            .cloned()
            .collect())
    }

    async fn try_claim(&self, task_id: i64, worker_id: &str) -> CrawlerResult<bool> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(CrawlerError::TaskNotFound { id: task_id })?;

        // 条件更新：写锁内再次检查状态，落败方拿到 false 而不是错误
        if !task.is_claimable(Utc::now()) {
            debug!("任务 {} 领取失败，当前状态: {:?}", task_id, task.status);
            return Ok(false);
        }

        task.status = TaskStatus::Assigned;
        task.assigned_worker_id = Some(worker_id.to_string());
        task.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_status(
        &self,
        id: i64,
        status: TaskStatus,
        worker_id: Option<&str>,
    ) -> CrawlerResult<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&id)
            .ok_or(CrawlerError::TaskNotFound { id })?;

        if !task.status.can_transition_to(status) {
            return Err(CrawlerError::InvalidStateTransition {
                from: format!("{:?}", task.status),
                to: format!("{status:?}"),
            });
        }

        // 不变式：assigned_worker_id 非空 当且仅当 assigned/running
        match status {
            TaskStatus::Assigned | TaskStatus::Running => {
                let worker_id = worker_id.ok_or_else(|| {
                    CrawlerError::InvalidTaskParams(format!(
                        "状态 {status:?} 必须绑定 worker_id"
                    ))
                })?;
                task.assigned_worker_id = Some(worker_id.to_string());
            }
            _ => {
                task.assigned_worker_id = None;
            }
        }

        task.status = status;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn get_by_worker_id(&self, worker_id: &str) -> CrawlerResult<Vec<CrawlTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| t.assigned_worker_id.as_deref() == Some(worker_id))
            .cloned()
            .collect())
    }
}
