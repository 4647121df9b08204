//! Worker 存活监控与孤儿任务回收
//!
//! 周期扫描心跳超时的 Worker：标记离线，并把它持有的任务
//! 退回 pending、清除绑定，使其可被重新分派。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crawler_core::{CrawlerResult, TaskRepository, WorkerRepository};
use crawler_domain::entities::{TaskStatus, WorkerStatus};

#[derive(Debug, Clone)]
pub struct WorkerLivenessMonitorConfig {
    pub heartbeat_timeout_seconds: i64,
    pub sweep_interval_seconds: u64,
}

impl Default for WorkerLivenessMonitorConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_seconds: 90,
            sweep_interval_seconds: 30,
        }
    }
}

pub struct WorkerLivenessMonitor {
    worker_repo: Arc<dyn WorkerRepository>,
    task_repo: Arc<dyn TaskRepository>,
    config: WorkerLivenessMonitorConfig,
    running: AtomicBool,
}

impl WorkerLivenessMonitor {
    pub fn new(
        worker_repo: Arc<dyn WorkerRepository>,
        task_repo: Arc<dyn TaskRepository>,
        config: Option<WorkerLivenessMonitorConfig>,
    ) -> Self {
        Self {
            worker_repo,
            task_repo,
            config: config.unwrap_or_default(),
            running: AtomicBool::new(false),
        }
    }

    /// 后台扫描循环，直到 `stop` 被调用
    pub async fn run(self: Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.sweep_interval_seconds));
        info!(
            "存活监控启动，心跳阈值 {}s，扫描间隔 {}s",
            self.config.heartbeat_timeout_seconds, self.config.sweep_interval_seconds
        );

        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if let Err(e) = self.sweep_once().await {
                error!("存活扫描失败: {e}");
            }
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 单轮扫描，返回本轮标记离线的 Worker 数
    pub async fn sweep_once(&self) -> CrawlerResult<usize> {
        let expired = self
            .worker_repo
            .get_timeout_workers(self.config.heartbeat_timeout_seconds)
            .await?;

        for worker in &expired {
            warn!(
                "Worker {} 心跳超时（上次 {}），标记离线",
                worker.id, worker.last_heartbeat
            );
            self.worker_repo
                .update_status(&worker.id, WorkerStatus::Offline)
                .await?;
            self.recover_orphans(&worker.id).await?;
        }

        Ok(expired.len())
    }

    /// 把离线 Worker 持有的任务退回 pending
    async fn recover_orphans(&self, worker_id: &str) -> CrawlerResult<()> {
        let orphans = self.task_repo.get_by_worker_id(worker_id).await?;
        for task in orphans {
            if matches!(task.status, TaskStatus::Assigned | TaskStatus::Running) {
                self.task_repo
                    .update_status(task.id, TaskStatus::Pending, None)
                    .await?;
                info!("{} 从离线 Worker {worker_id} 回收", task.entity_description());
            }
        }
        Ok(())
    }
}
