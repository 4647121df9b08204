//! 端到端集成测试
//!
//! 覆盖完整流程：Worker注册 -> 任务摄入 -> 拉取领取 -> 结果回报，
//! 以及心跳失效后的孤儿任务回收和重试退避。

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use crawler_core::{HistoryRepository, TaskRepository, WorkerRepository};
use crawler_dispatcher::{
    AssignmentEngine, ExecutionReportHandler, RetryQueueConfig, RetryQueueManager,
    TaskIntakeService, WorkerLivenessMonitor, WorkerLivenessMonitorConfig, WorkerRegistryService,
};
use crawler_domain::entities::{TaskStatus, WorkerStatus};
use crawler_domain::messages::{
    ExecutionReport, FailureSignal, TaskIntake, TaskPollRequest, WorkerHeartbeat,
    WorkerRegistration,
};
use crawler_infrastructure::{
    JsonFileRetryStore, MemoryFailureRepository, MemoryHistoryRepository, MemoryRetryStore,
    MemoryTaskRepository, MemoryWorkerRepository,
};

struct Coordinator {
    task_repo: Arc<MemoryTaskRepository>,
    worker_repo: Arc<MemoryWorkerRepository>,
    history_repo: Arc<MemoryHistoryRepository>,
    registry: WorkerRegistryService,
    assignment: AssignmentEngine,
    reports: ExecutionReportHandler,
    intake: TaskIntakeService,
    liveness: WorkerLivenessMonitor,
    retry_queue: Arc<RetryQueueManager>,
}

impl Coordinator {
    async fn new() -> Self {
        let task_repo = Arc::new(MemoryTaskRepository::new());
        let worker_repo = Arc::new(MemoryWorkerRepository::new());
        let history_repo = Arc::new(MemoryHistoryRepository::new());
        let failure_repo = Arc::new(MemoryFailureRepository::new());
        let retry_queue = Arc::new(
            RetryQueueManager::new(
                Arc::new(MemoryRetryStore::new()),
                Some(RetryQueueConfig {
                    base_delay_ms: 1_000,
                    default_max_retries: 3,
                    retention_days: 7,
                }),
            )
            .await
            .unwrap(),
        );

        Self {
            registry: WorkerRegistryService::new(worker_repo.clone()),
            assignment: AssignmentEngine::new(task_repo.clone(), worker_repo.clone()),
            reports: ExecutionReportHandler::new(
                task_repo.clone(),
                worker_repo.clone(),
                history_repo.clone(),
                failure_repo,
                retry_queue.clone(),
            ),
            intake: TaskIntakeService::new(task_repo.clone(), 3),
            liveness: WorkerLivenessMonitor::new(
                worker_repo.clone(),
                task_repo.clone(),
                Some(WorkerLivenessMonitorConfig {
                    heartbeat_timeout_seconds: 60,
                    sweep_interval_seconds: 1,
                }),
            ),
            task_repo,
            worker_repo,
            history_repo,
            retry_queue,
        }
    }

    async fn register_worker(&self, worker_id: &str) {
        self.registry
            .register(WorkerRegistration {
                worker_id: worker_id.to_string(),
                name: format!("{worker_id}-node"),
                supported_regions: vec!["TPE".to_string(), "US".to_string()],
                supported_data_types: vec!["income".to_string(), "balance-sheet".to_string()],
                max_concurrent_tasks: 10,
                version: "1.5.0".to_string(),
            })
            .await
            .unwrap();
    }

    async fn submit_task(&self, symbol: &str, region: &str, data_type: &str) -> i64 {
        self.intake
            .create(TaskIntake {
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
            })
            .await
            .unwrap()
            .id
    }

    fn poll(&self, limit: i32) -> TaskPollRequest {
        TaskPollRequest {
            supported_regions: vec!["TPE".to_string(), "US".to_string()],
            supported_data_types: vec!["income".to_string(), "balance-sheet".to_string()],
            worker_version: "1.5.0".to_string(),
            limit,
        }
    }
}

fn success() -> ExecutionReport {
    ExecutionReport {
        status: crawler_domain::entities::ExecutionStatus::Success,
        crawled_from: Some(Utc::now()),
        crawled_to: Some(Utc::now()),
        records_fetched: Some(50),
        records_saved: Some(50),
        quality_score: Some(1.0),
        execution_time_ms: Some(900),
        memory_usage_mb: None,
        cpu_percent: None,
        error: None,
    }
}

fn timeout_failure() -> ExecutionReport {
    ExecutionReport {
        status: crawler_domain::entities::ExecutionStatus::Failed,
        crawled_from: Some(Utc::now()),
        crawled_to: None,
        records_fetched: Some(0),
        records_saved: Some(0),
        quality_score: None,
        execution_time_ms: Some(30_000),
        memory_usage_mb: None,
        cpu_percent: None,
        error: Some(FailureSignal {
            timed_out: true,
            ..Default::default()
        }),
    }
}

#[tokio::test]
async fn test_full_lifecycle_register_poll_report() {
    let c = Coordinator::new().await;
    c.register_worker("w-1").await;
    let task_id = c.submit_task("2330", "TPE", "income").await;

    let claimed = c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, task_id);
    assert_eq!(claimed[0].status, TaskStatus::Assigned);

    c.reports.report(task_id, success()).await.unwrap();

    let task = c.task_repo.get_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let history = c.history_repo.get_by_task_id(task_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].worker_id, "w-1");

    let worker = c.worker_repo.get_by_id("w-1").await.unwrap().unwrap();
    assert_eq!(worker.current_load, 0);
}

#[tokio::test]
async fn test_concurrent_polling_claims_are_disjoint() {
    let c = Arc::new(Coordinator::new().await);
    for id in ["w-1", "w-2", "w-3"] {
        c.register_worker(id).await;
    }
    for i in 0..12 {
        c.submit_task(&format!("s{i}"), "TPE", "income").await;
    }

    let mut handles = Vec::new();
    for id in ["w-1", "w-2", "w-3"] {
        let c = Arc::clone(&c);
        handles.push(tokio::spawn(async move {
            c.assignment.request_tasks(id, &c.poll(10)).await.unwrap()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for task in handle.await.unwrap() {
            assert!(seen.insert(task.id), "任务 {} 被多个Worker领取", task.id);
        }
    }
    assert_eq!(seen.len(), 12);
}

#[tokio::test]
async fn test_retryable_failure_backs_off_then_succeeds() {
    let c = Coordinator::new().await;
    c.register_worker("w-1").await;
    let task_id = c.submit_task("2330", "TPE", "income").await;

    let claimed = c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
    assert_eq!(claimed.len(), 1);

    c.reports.report(task_id, timeout_failure()).await.unwrap();

    // 退避生效：任务回到 pending 但 next_run_at 在未来，立即拉取拿不到
    let task = c.task_repo.get_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.retry_count, 1);
    assert!(task.next_run_at > Utc::now());

    let claimed = c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
    assert!(claimed.is_empty());

    // 到达重试时间后可再次领取并成功关闭
    let mut due = task.clone();
    due.next_run_at = Utc::now() - ChronoDuration::seconds(1);
    c.task_repo.update(&due).await.unwrap();

    let claimed = c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
    assert_eq!(claimed.len(), 1);

    c.reports.report(task_id, success()).await.unwrap();
    let task = c.task_repo.get_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(c.retry_queue.pending().await.is_empty());
}

#[tokio::test]
async fn test_exhausted_retries_terminate_task() {
    let c = Coordinator::new().await;
    c.register_worker("w-1").await;
    let task_id = c.submit_task("2330", "TPE", "income").await;

    for round in 0..4 {
        let mut task = c.task_repo.get_by_id(task_id).await.unwrap().unwrap();
        if task.status != TaskStatus::Pending {
            break;
        }
        task.next_run_at = Utc::now() - ChronoDuration::seconds(1);
        c.task_repo.update(&task).await.unwrap();

        let claimed = c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
        assert_eq!(claimed.len(), 1, "第 {round} 轮领取失败");
        c.reports.report(task_id, timeout_failure()).await.unwrap();
    }

    let task = c.task_repo.get_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.retry_count, 3);
}

#[tokio::test]
async fn test_dead_worker_tasks_return_to_pool() {
    let c = Coordinator::new().await;
    c.register_worker("w-1").await;
    c.register_worker("w-2").await;
    let task_id = c.submit_task("2330", "TPE", "income").await;

    let claimed = c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
    assert_eq!(claimed.len(), 1);

    // w-2 保持心跳，w-1 的心跳被拨回到阈值之外
    c.registry
        .heartbeat(
            "w-2",
            WorkerHeartbeat {
                current_load: 0,
                memory_usage_mb: None,
                cpu_percent: None,
            },
        )
        .await
        .unwrap();

    let mut dead = c.worker_repo.get_by_id("w-1").await.unwrap().unwrap();
    dead.last_heartbeat = Utc::now() - ChronoDuration::seconds(300);
    c.worker_repo.update(&dead).await.unwrap();

    assert_eq!(c.liveness.sweep_once().await.unwrap(), 1);

    let offline = c.worker_repo.get_by_id("w-1").await.unwrap().unwrap();
    assert_eq!(offline.status, WorkerStatus::Offline);

    // 孤儿任务回到 pending，另一个 Worker 能领取
    let task = c.task_repo.get_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.assigned_worker_id.is_none());

    let claimed = c.assignment.request_tasks("w-2", &c.poll(5)).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].assigned_worker_id.as_deref(), Some("w-2"));
}

#[tokio::test]
async fn test_success_clears_retry_entries_across_report_types() {
    let c = Coordinator::new().await;
    c.register_worker("w-1").await;

    // 同一标的两个报表类型都失败过
    for data_type in ["income", "balance-sheet"] {
        let task_id = c.submit_task("AAPL", "US", data_type).await;
        c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
        c.reports.report(task_id, timeout_failure()).await.unwrap();
    }
    assert_eq!(c.retry_queue.pending().await.len(), 2);

    // 其中一个成功即清空该标的全部重试条目
    let task_id = c.submit_task("AAPL", "US", "income").await;
    let mut task = c.task_repo.get_by_id(task_id).await.unwrap().unwrap();
    task.next_run_at = Utc::now() - ChronoDuration::seconds(1);
    c.task_repo.update(&task).await.unwrap();

    let claimed = c.assignment.request_tasks("w-1", &c.poll(5)).await.unwrap();
    assert!(claimed.iter().any(|t| t.id == task_id));
    c.reports.report(task_id, success()).await.unwrap();

    assert!(c.retry_queue.pending().await.is_empty());
}

#[tokio::test]
async fn test_retry_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retry_state.json");

    {
        let queue = RetryQueueManager::new(Arc::new(JsonFileRetryStore::new(&path)), None)
            .await
            .unwrap();
        queue
            .add(
                crawler_domain::entities::RetryKey::new("cfgA", "2330", "income"),
                "TPE".to_string(),
                crawler_domain::entities::RetryReason::Timeout,
            )
            .await
            .unwrap();
    }

    // 重启：从同一文件重新加载
    let queue = RetryQueueManager::new(Arc::new(JsonFileRetryStore::new(&path)), None)
        .await
        .unwrap();
    let pending = queue.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].symbol, "2330");
    assert_eq!(pending[0].retry_count, 1);
}
