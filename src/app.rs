use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use crawler_api::{create_routes, AppState};
use crawler_core::AppConfig;
use crawler_dispatcher::{
    AssignmentEngine, ExecutionReportHandler, RetryQueueConfig, RetryQueueManager,
    StatsCollector, TaskIntakeService, WorkerLivenessMonitor, WorkerLivenessMonitorConfig,
    WorkerRegistryService,
};
use crawler_infrastructure::{
    FsOutputProbe, JsonFileRetryStore, MemoryFailureRepository, MemoryHistoryRepository,
    MemoryTaskRepository, MemoryWorkerRepository,
};

/// 主应用：装配仓储、调度服务与HTTP接入层
pub struct Application {
    config: AppConfig,
    state: AppState,
    liveness: Arc<WorkerLivenessMonitor>,
    retry_queue: Arc<RetryQueueManager>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化应用程序");

        let task_repo = Arc::new(MemoryTaskRepository::new());
        let worker_repo = Arc::new(MemoryWorkerRepository::new());
        let history_repo = Arc::new(MemoryHistoryRepository::new());
        let failure_repo = Arc::new(MemoryFailureRepository::new());

        let retry_store = Arc::new(JsonFileRetryStore::new(&config.coordinator.retry_state_path));
        let retry_queue = Arc::new(
            RetryQueueManager::new(
                retry_store,
                Some(RetryQueueConfig {
                    base_delay_ms: config.coordinator.retry_base_delay_ms,
                    default_max_retries: config.coordinator.default_max_retries,
                    retention_days: config.coordinator.retry_retention_days,
                }),
            )
            .await
            .context("初始化重试队列失败")?,
        );

        let liveness = Arc::new(WorkerLivenessMonitor::new(
            worker_repo.clone(),
            task_repo.clone(),
            Some(WorkerLivenessMonitorConfig {
                heartbeat_timeout_seconds: config.coordinator.heartbeat_timeout_seconds,
                sweep_interval_seconds: config.coordinator.liveness_sweep_interval_seconds,
            }),
        ));

        let state = AppState {
            registry: Arc::new(WorkerRegistryService::new(worker_repo.clone())),
            assignment: Arc::new(AssignmentEngine::new(task_repo.clone(), worker_repo.clone())),
            reports: Arc::new(ExecutionReportHandler::new(
                task_repo.clone(),
                worker_repo.clone(),
                history_repo.clone(),
                failure_repo,
                retry_queue.clone(),
            )),
            intake: Arc::new(TaskIntakeService::new(
                task_repo.clone(),
                config.coordinator.default_max_retries,
            )),
            stats: Arc::new(StatsCollector::new(
                task_repo,
                worker_repo,
                retry_queue.clone(),
            )),
            history_repo,
        };

        Ok(Self {
            config,
            state,
            liveness,
            retry_queue,
        })
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        // 存活监控后台循环
        let liveness_handle = tokio::spawn(Arc::clone(&self.liveness).run());

        // 重试队列定期维护：过期清理 + 产出对账
        let maintenance_handle = {
            let retry_queue = Arc::clone(&self.retry_queue);
            let output_location = self.config.coordinator.output_location.clone();
            let interval = self.config.coordinator.retry_cleanup_interval_seconds;
            let mut maintenance_rx = shutdown_rx.resubscribe();

            tokio::spawn(async move {
                let probe = FsOutputProbe::new();
                let mut ticker = tokio::time::interval(Duration::from_secs(interval));
                // 启动时的首个tick跳过，避免和初始化竞争
                ticker.tick().await;

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if let Err(e) = retry_queue.cleanup_expired().await {
                                error!("重试队列过期清理失败: {e}");
                            }
                            if let Err(e) = retry_queue
                                .cleanup_successful(&probe, &output_location)
                                .await
                            {
                                error!("重试队列对账清理失败: {e}");
                            }
                        }
                        _ = maintenance_rx.recv() => break,
                    }
                }
            })
        };

        let bind_address = &self.config.server.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;
        info!("HTTP服务监听: {bind_address}");

        let router = create_routes(self.state.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .context("HTTP服务异常退出")?;

        self.liveness.stop();
        liveness_handle.abort();
        maintenance_handle.abort();
        info!("应用组件已停止");
        Ok(())
    }
}
