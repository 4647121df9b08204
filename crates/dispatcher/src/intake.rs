//! 任务摄入：创建与取消

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crawler_core::{CrawlerError, CrawlerResult, TaskRepository};
use crawler_domain::entities::{CrawlTask, ScheduleKind, TaskStatus};
use crawler_domain::messages::TaskIntake;

use crate::cron_utils::next_run_from_schedule;

pub struct TaskIntakeService {
    task_repo: Arc<dyn TaskRepository>,
    default_max_retries: i32,
}

impl TaskIntakeService {
    pub fn new(task_repo: Arc<dyn TaskRepository>, default_max_retries: i32) -> Self {
        Self {
            task_repo,
            default_max_retries,
        }
    }

    /// 创建任务。带CRON表达式的为周期任务，首次执行排在下一个命中点。
    pub async fn create(&self, intake: TaskIntake) -> CrawlerResult<CrawlTask> {
        for (field, value) in [
            ("symbol", &intake.symbol),
            ("region", &intake.region),
            ("data_type", &intake.data_type),
            ("config_id", &intake.config_id),
        ] {
            if value.trim().is_empty() {
                return Err(CrawlerError::InvalidTaskParams(format!(
                    "{field} 不能为空"
                )));
            }
        }

        let mut task = CrawlTask::new(
            intake.symbol,
            intake.region,
            intake.data_type,
            intake.config_id,
        );
        task.priority = intake.priority;
        if let Some(max_retries) = intake.max_retries {
            if max_retries < 0 {
                return Err(CrawlerError::InvalidTaskParams(
                    "max_retries 不能为负数".to_string(),
                ));
            }
            task.max_retries = max_retries;
        } else {
            task.max_retries = self.default_max_retries;
        }
        if let Some(timeout) = intake.timeout_seconds {
            if timeout <= 0 {
                return Err(CrawlerError::InvalidTaskParams(
                    "timeout_seconds 必须为正数".to_string(),
                ));
            }
            task.timeout_seconds = timeout;
        }
        task.required_config_version = intake.required_config_version;
        task.version_constraints = intake.version_constraints;

        if let Some(expr) = intake.schedule {
            // 表达式非法在创建时就拒绝，而不是留到执行期
            task.next_run_at = next_run_from_schedule(&expr, Utc::now())?;
            task.schedule_kind = ScheduleKind::Recurring;
            task.schedule = Some(expr);
        }

        let created = self.task_repo.create(&task).await?;
        info!("{} 已创建", created.entity_description());
        Ok(created)
    }

    /// 取消任务，仅 pending/assigned 可取消
    pub async fn cancel(&self, task_id: i64) -> CrawlerResult<()> {
        self.task_repo
            .update_status(task_id, TaskStatus::Cancelled, None)
            .await?;
        info!("任务 {task_id} 已取消");
        Ok(())
    }

    pub async fn get(&self, task_id: i64) -> CrawlerResult<CrawlTask> {
        self.task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(CrawlerError::TaskNotFound { id: task_id })
    }

    pub async fn list(&self) -> CrawlerResult<Vec<CrawlTask>> {
        self.task_repo.list().await
    }
}
