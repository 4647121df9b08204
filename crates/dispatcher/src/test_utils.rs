//! 测试夹具与Mock

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crawler_core::{CrawlerResult, OutputProbe, TaskRepository, WorkerRepository};
use crawler_domain::entities::{CrawlTask, ExecutionStatus, WorkerInfo, WorkerStatus};
use crawler_domain::messages::{
    ExecutionReport, FailureSignal, TaskIntake, TaskPollRequest, WorkerRegistration,
};
use crawler_infrastructure::{
    MemoryFailureRepository, MemoryHistoryRepository, MemoryRetryStore, MemoryTaskRepository,
    MemoryWorkerRepository,
};

use crate::report::ExecutionReportHandler;
use crate::retry_queue::RetryQueueManager;

pub fn pending_task(symbol: &str, region: &str, data_type: &str) -> CrawlTask {
    CrawlTask::new(
        symbol.to_string(),
        region.to_string(),
        data_type.to_string(),
        "cfgA".to_string(),
    )
}

pub fn registration(worker_id: &str) -> WorkerRegistration {
    WorkerRegistration {
        worker_id: worker_id.to_string(),
        name: format!("{worker_id}-node"),
        supported_regions: vec!["TPE".to_string()],
        supported_data_types: vec!["balance-sheet".to_string(), "income".to_string()],
        max_concurrent_tasks: 4,
        version: "1.5.0".to_string(),
    }
}

pub fn registered_worker(
    worker_id: &str,
    regions: &[&str],
    data_types: &[&str],
    max_concurrent_tasks: i32,
) -> WorkerInfo {
    let now = Utc::now();
    WorkerInfo {
        id: worker_id.to_string(),
        name: format!("{worker_id}-node"),
        status: WorkerStatus::Online,
        supported_regions: regions.iter().map(|s| s.to_string()).collect(),
        supported_data_types: data_types.iter().map(|s| s.to_string()).collect(),
        max_concurrent_tasks,
        current_load: 0,
        version: "1.5.0".to_string(),
        last_heartbeat: now,
        registered_at: now,
    }
}

pub fn poll_request(regions: &[&str], data_types: &[&str], limit: i32) -> TaskPollRequest {
    TaskPollRequest {
        supported_regions: regions.iter().map(|s| s.to_string()).collect(),
        supported_data_types: data_types.iter().map(|s| s.to_string()).collect(),
        worker_version: "1.5.0".to_string(),
        limit,
    }
}

pub fn intake(symbol: &str, region: &str, data_type: &str) -> TaskIntake {
    TaskIntake {
        symbol: symbol.to_string(),
        region: region.to_string(),
        data_type: data_type.to_string(),
        config_id: "cfgA".to_string(),
        schedule: None,
        priority: 0,
        max_retries: None,
        timeout_seconds: None,
        required_config_version: None,
        version_constraints: Default::default(),
    }
}

pub fn success_report() -> ExecutionReport {
    ExecutionReport {
        status: ExecutionStatus::Success,
        crawled_from: Some(Utc::now()),
        crawled_to: Some(Utc::now()),
        records_fetched: Some(120),
        records_saved: Some(120),
        quality_score: Some(0.98),
        execution_time_ms: Some(1_500),
        memory_usage_mb: Some(256),
        cpu_percent: Some(35.0),
        error: None,
    }
}

pub fn failed_report(signal: FailureSignal) -> ExecutionReport {
    ExecutionReport {
        status: ExecutionStatus::Failed,
        crawled_from: Some(Utc::now()),
        crawled_to: None,
        records_fetched: Some(0),
        records_saved: Some(0),
        quality_score: None,
        execution_time_ms: Some(800),
        memory_usage_mb: None,
        cpu_percent: None,
        error: Some(signal),
    }
}

/// 产出探测Mock：只对预置的 (symbol, region) 返回存在
pub struct MockOutputProbe {
    existing: Mutex<Vec<(String, String)>>,
}

impl MockOutputProbe {
    pub fn with_existing(pairs: &[(&str, &str)]) -> Self {
        Self {
            existing: Mutex::new(
                pairs
                    .iter()
                    .map(|(s, r)| (s.to_string(), r.to_string()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl OutputProbe for MockOutputProbe {
    async fn output_exists(
        &self,
        _location: &str,
        symbol: &str,
        region: &str,
        _report_type: &str,
    ) -> CrawlerResult<bool> {
        let existing = self.existing.lock().await;
        Ok(existing
            .iter()
            .any(|(s, r)| s == symbol && r == region))
    }
}

/// 回报处理测试的完整装配
pub struct Harness {
    pub handler: ExecutionReportHandler,
    pub task_repo: Arc<MemoryTaskRepository>,
    pub worker_repo: Arc<MemoryWorkerRepository>,
    pub history_repo: Arc<MemoryHistoryRepository>,
    pub failure_repo: Arc<MemoryFailureRepository>,
    pub retry_queue: Arc<RetryQueueManager>,
}

impl Harness {
    pub async fn new() -> Self {
        let task_repo = Arc::new(MemoryTaskRepository::new());
        let worker_repo = Arc::new(MemoryWorkerRepository::new());
        let history_repo = Arc::new(MemoryHistoryRepository::new());
        let failure_repo = Arc::new(MemoryFailureRepository::new());
        let retry_queue = Arc::new(
            RetryQueueManager::new(Arc::new(MemoryRetryStore::new()), None)
                .await
                .unwrap(),
        );

        let handler = ExecutionReportHandler::new(
            task_repo.clone(),
            worker_repo.clone(),
            history_repo.clone(),
            failure_repo.clone(),
            retry_queue.clone(),
        );

        Self {
            handler,
            task_repo,
            worker_repo,
            history_repo,
            failure_repo,
            retry_queue,
        }
    }

    /// 注册 Worker、创建任务并让该 Worker 领取
    pub async fn assigned_task(
        &self,
        symbol: &str,
        region: &str,
        data_type: &str,
        worker_id: &str,
    ) -> CrawlTask {
        let mut worker = registered_worker(worker_id, &[region], &[data_type], 4);
        worker.current_load = 1;
        self.worker_repo.register(&worker).await.unwrap();

        let created = self
            .task_repo
            .create(&pending_task(symbol, region, data_type))
            .await
            .unwrap();
        assert!(self.task_repo.try_claim(created.id, worker_id).await.unwrap());

        self.task_repo
            .get_by_id(created.id)
            .await
            .unwrap()
            .unwrap()
    }
}
