//! 执行结果回报处理
//!
//! Worker 回报至少一次送达，重复的终态回报必须是无害的空操作。
//! 成功关闭任务并清除该标的全部重试条目；失败走分类器决定重试或终结。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crawler_core::{
    CrawlerError, CrawlerResult, FailureRepository, HistoryRepository, TaskRepository,
    WorkerRepository,
};
use crawler_domain::entities::{
    CrawlTask, ExecutionHistory, ExecutionStatus, FailureRecord, RetryKey, RetryReason,
    ScheduleKind, TaskStatus,
};
use crawler_domain::messages::{ExecutionReport, FailureSignal};

use crate::cron_utils::next_run_from_schedule;
use crate::failure::{classify, context_from_signal};
use crate::retry_queue::RetryQueueManager;

pub struct ExecutionReportHandler {
    task_repo: Arc<dyn TaskRepository>,
    worker_repo: Arc<dyn WorkerRepository>,
    history_repo: Arc<dyn HistoryRepository>,
    failure_repo: Arc<dyn FailureRepository>,
    retry_queue: Arc<RetryQueueManager>,
}

impl ExecutionReportHandler {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        worker_repo: Arc<dyn WorkerRepository>,
        history_repo: Arc<dyn HistoryRepository>,
        failure_repo: Arc<dyn FailureRepository>,
        retry_queue: Arc<RetryQueueManager>,
    ) -> Self {
        Self {
            task_repo,
            worker_repo,
            history_repo,
            failure_repo,
            retry_queue,
        }
    }

    /// 处理一次执行结果回报
    pub async fn report(&self, task_id: i64, report: ExecutionReport) -> CrawlerResult<()> {
        let task = self
            .task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(CrawlerError::TaskNotFound { id: task_id })?;

        // 送达语义是至少一次：对已终态任务的回报一律按空操作确认
        if task.status.is_terminal() {
            let duplicate = matches!(
                (task.status, report.status),
                (TaskStatus::Completed, ExecutionStatus::Success)
                    | (TaskStatus::Failed, ExecutionStatus::Failed)
            );
            if duplicate {
                info!("任务 {task_id} 已处于终态，忽略重复回报");
            } else {
                warn!(
                    "任务 {task_id} 已处于终态 {:?}，收到冲突回报 {:?}，忽略",
                    task.status, report.status
                );
            }
            return Ok(());
        }

        let worker_id = task.assigned_worker_id.clone();

        match report.status {
            ExecutionStatus::Success => self.on_success(&task, &report).await?,
            ExecutionStatus::Failed => self.on_failure(&task, &report).await?,
        }

        if let Some(worker_id) = worker_id {
            self.release_worker_slot(&worker_id).await?;
        }
        Ok(())
    }

    async fn on_success(&self, task: &CrawlTask, report: &ExecutionReport) -> CrawlerResult<()> {
        self.task_repo
            .update_status(task.id, TaskStatus::Completed, None)
            .await?;
        self.append_history(task, report).await?;

        // 一次成功证明目标可达，清掉该标的跨报表类型的全部重试条目
        self.retry_queue
            .remove_all_for_symbol(&task.symbol, &task.region)
            .await?;

        info!("{} 执行成功", task.entity_description());

        if task.schedule_kind == ScheduleKind::Recurring {
            self.spawn_next_occurrence(task).await?;
        }
        Ok(())
    }

    async fn on_failure(&self, task: &CrawlTask, report: &ExecutionReport) -> CrawlerResult<()> {
        let signal = report.error.clone().unwrap_or_else(|| FailureSignal {
            message: "Worker 未提供失败详情".to_string(),
            ..Default::default()
        });
        let classification = classify(&signal);

        // 未知信号收紧有效重试预算
        let effective_max = classification
            .retry_ceiling
            .map_or(task.max_retries, |c| c.min(task.max_retries));
        let will_retry = classification.should_retry && task.retry_count < effective_max;

        let next_attempt = task.retry_count + 1;
        let delay = self.retry_queue.delay(next_attempt);
        let next_retry_at = Utc::now() + delay;

        let record = FailureRecord {
            id: 0,
            task_id: task.id,
            history_id: None,
            category: classification.category,
            reason: classification.reason.clone(),
            error_code: classification.error_code.clone(),
            error_message: signal.message.clone(),
            retry_attempt: task.retry_count,
            // 记录分类器的原始判定；预算耗尽只体现在任务终态与空的重试排期上
            should_retry: classification.should_retry,
            next_retry_at: will_retry.then_some(next_retry_at),
            retry_delay_ms: will_retry.then_some(delay.num_milliseconds()),
            context: context_from_signal(&signal),
            created_at: Utc::now(),
        };
        self.failure_repo.append(&record).await?;
        self.append_history(task, report).await?;

        if will_retry {
            let mut updated = task.clone();
            updated.retry_count = next_attempt;
            updated.next_run_at = next_retry_at;
            updated.status = TaskStatus::Pending;
            updated.assigned_worker_id = None;
            updated.updated_at = Utc::now();
            self.task_repo.update(&updated).await?;

            self.retry_queue
                .add(
                    RetryKey::new(
                        task.config_id.clone(),
                        task.symbol.clone(),
                        task.data_type.clone(),
                    ),
                    task.region.clone(),
                    retry_reason(&signal),
                )
                .await?;

            warn!(
                "{} 失败（{}），第 {} 次重试定于 {}",
                task.entity_description(),
                classification.reason,
                next_attempt,
                next_retry_at
            );
        } else {
            self.task_repo
                .update_status(task.id, TaskStatus::Failed, None)
                .await?;
            warn!(
                "{} 终结失败: {}（重试 {}/{}）",
                task.entity_description(),
                classification.reason,
                task.retry_count,
                effective_max
            );
        }
        Ok(())
    }

    /// 周期任务成功后，按CRON表达式生成下一轮的全新任务
    async fn spawn_next_occurrence(&self, task: &CrawlTask) -> CrawlerResult<()> {
        let Some(expr) = task.schedule.as_deref() else {
            return Ok(());
        };
        let next_run_at = next_run_from_schedule(expr, Utc::now())?;

        let mut next = task.clone();
        next.id = 0;
        next.status = TaskStatus::Pending;
        next.retry_count = 0;
        next.assigned_worker_id = None;
        next.next_run_at = next_run_at;
        next.created_at = Utc::now();
        next.updated_at = next.created_at;

        let created = self.task_repo.create(&next).await?;
        info!(
            "{} 的下一轮已排期: 任务 {}，{}",
            task.entity_description(),
            created.id,
            next_run_at
        );
        Ok(())
    }

    async fn append_history(&self, task: &CrawlTask, report: &ExecutionReport) -> CrawlerResult<()> {
        let history = ExecutionHistory {
            id: 0,
            task_id: task.id,
            worker_id: task.assigned_worker_id.clone().unwrap_or_default(),
            status: report.status,
            started_at: report.crawled_from,
            completed_at: report.crawled_to,
            records_fetched: report.records_fetched.unwrap_or(0),
            records_saved: report.records_saved.unwrap_or(0),
            quality_score: report.quality_score,
            execution_time_ms: report.execution_time_ms,
            memory_usage_mb: report.memory_usage_mb,
            cpu_percent: report.cpu_percent,
            created_at: Utc::now(),
        };
        self.history_repo.append(&history).await?;
        Ok(())
    }

    async fn release_worker_slot(&self, worker_id: &str) -> CrawlerResult<()> {
        match self.worker_repo.adjust_load(worker_id, -1).await {
            Ok(()) => Ok(()),
            // Worker可能已注销，不影响回报处理
            Err(CrawlerError::WorkerNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn retry_reason(signal: &FailureSignal) -> RetryReason {
    if signal.timed_out {
        RetryReason::Timeout
    } else if signal.empty_result {
        RetryReason::EmptyData
    } else {
        RetryReason::ExecutionFailed
    }
}
