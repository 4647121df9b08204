//! 系统运行统计，只读观测面

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crawler_core::{CrawlerResult, TaskRepository, WorkerRepository};
use crawler_domain::entities::WorkerStatus;

use crate::retry_queue::{RetryQueueManager, RetryStatistics};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemStats {
    pub tasks_total: usize,
    pub tasks_by_status: HashMap<String, usize>,
    pub tasks_by_region: HashMap<String, usize>,
    pub tasks_by_data_type: HashMap<String, usize>,
    pub workers_total: usize,
    pub workers_online: usize,
    pub workers_offline: usize,
    pub total_load: i32,
    pub total_capacity: i32,
    pub retry: RetryStatistics,
}

pub struct StatsCollector {
    task_repo: Arc<dyn TaskRepository>,
    worker_repo: Arc<dyn WorkerRepository>,
    retry_queue: Arc<RetryQueueManager>,
}

impl StatsCollector {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        worker_repo: Arc<dyn WorkerRepository>,
        retry_queue: Arc<RetryQueueManager>,
    ) -> Self {
        Self {
            task_repo,
            worker_repo,
            retry_queue,
        }
    }

    pub async fn collect(&self) -> CrawlerResult<SystemStats> {
        let tasks = self.task_repo.list().await?;
        let workers = self.worker_repo.list().await?;

        let mut stats = SystemStats {
            tasks_total: tasks.len(),
            workers_total: workers.len(),
            retry: self.retry_queue.statistics().await,
            ..Default::default()
        };

        for task in &tasks {
            *stats
                .tasks_by_status
                .entry(format!("{:?}", task.status).to_uppercase())
                .or_insert(0) += 1;
            *stats.tasks_by_region.entry(task.region.clone()).or_insert(0) += 1;
            *stats
                .tasks_by_data_type
                .entry(task.data_type.clone())
                .or_insert(0) += 1;
        }

        for worker in &workers {
            if worker.status == WorkerStatus::Offline {
                stats.workers_offline += 1;
            } else {
                stats.workers_online += 1;
            }
            stats.total_load += worker.current_load;
            stats.total_capacity += worker.max_concurrent_tasks;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pending_task, registered_worker};
    use crawler_infrastructure::{MemoryRetryStore, MemoryTaskRepository, MemoryWorkerRepository};

    #[tokio::test]
    async fn test_collect_aggregates_tasks_and_workers() {
        let task_repo = Arc::new(MemoryTaskRepository::new());
        let worker_repo = Arc::new(MemoryWorkerRepository::new());
        let retry_queue = Arc::new(
            RetryQueueManager::new(Arc::new(MemoryRetryStore::new()), None)
                .await
                .unwrap(),
        );

        task_repo
            .create(&pending_task("2330", "TPE", "income"))
            .await
            .unwrap();
        task_repo
            .create(&pending_task("AAPL", "US", "balance-sheet"))
            .await
            .unwrap();

        let mut worker = registered_worker("w-1", &["TPE"], &["income"], 4);
        worker.current_load = 1;
        worker_repo.register(&worker).await.unwrap();

        let collector = StatsCollector::new(task_repo, worker_repo, retry_queue);
        let stats = collector.collect().await.unwrap();

        assert_eq!(stats.tasks_total, 2);
        assert_eq!(stats.tasks_by_status.get("PENDING"), Some(&2));
        assert_eq!(stats.tasks_by_region.get("TPE"), Some(&1));
        assert_eq!(stats.workers_online, 1);
        assert_eq!(stats.total_load, 1);
        assert_eq!(stats.total_capacity, 4);
    }
}
