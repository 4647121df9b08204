//! 任务分派引擎
//!
//! 拉取式分派：Worker 携能力与版本来拉，引擎过滤、排序，
//! 逐个原子领取。并发拉取由存储层的 try_claim 原语保证互斥。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crawler_core::{CrawlerError, CrawlerResult, TaskRepository, WorkerRepository};
use crawler_domain::entities::{CrawlTask, TaskStatus};
use crawler_domain::messages::TaskPollRequest;

use crate::version::check_version;

pub struct AssignmentEngine {
    task_repo: Arc<dyn TaskRepository>,
    worker_repo: Arc<dyn WorkerRepository>,
}

impl AssignmentEngine {
    pub fn new(task_repo: Arc<dyn TaskRepository>, worker_repo: Arc<dyn WorkerRepository>) -> Self {
        Self {
            task_repo,
            worker_repo,
        }
    }

    /// Worker 拉取任务。返回成功领取的任务集，可能为空。
    pub async fn request_tasks(
        &self,
        worker_id: &str,
        request: &TaskPollRequest,
    ) -> CrawlerResult<Vec<CrawlTask>> {
        let worker = self
            .worker_repo
            .get_by_id(worker_id)
            .await?
            .ok_or_else(|| CrawlerError::WorkerNotFound {
                id: worker_id.to_string(),
            })?;

        // 拉取量受 Worker 剩余容量约束
        let capacity = (worker.max_concurrent_tasks - worker.current_load).max(0);
        let limit = request.limit.min(capacity).max(0) as usize;
        if limit == 0 {
            debug!("Worker {worker_id} 无剩余容量，跳过分派");
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut candidates: Vec<CrawlTask> = self
            .task_repo
            .get_claimable_tasks(now)
            .await?
            .into_iter()
            .filter(|task| {
                request.supported_regions.contains(&task.region)
                    && request.supported_data_types.contains(&task.data_type)
                    && check_version(&request.worker_version, &task.version_constraints).compatible
            })
            .collect();

        // 优先级降序，再按创建时间升序，任务ID升序兜底保证稳定
        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        let mut claimed = Vec::with_capacity(limit);
        for task in candidates {
            if claimed.len() >= limit {
                break;
            }
            // 领取失败说明任务被并发拉取者抢走，继续尝试下一个
            if self.task_repo.try_claim(task.id, worker_id).await? {
                let mut task = task;
                task.status = TaskStatus::Assigned;
                task.assigned_worker_id = Some(worker_id.to_string());
                claimed.push(task);
            }
        }

        if !claimed.is_empty() {
            // 只做增量调整，避免用轮询开始时的快照覆盖期间到达的心跳
            self.worker_repo
                .adjust_load(worker_id, claimed.len() as i32)
                .await?;
            info!("Worker {worker_id} 领取 {} 个任务", claimed.len());
        }

        Ok(claimed)
    }
}
