//! Worker 注册与心跳服务

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crawler_core::{CrawlerError, CrawlerResult, WorkerRepository};
use crawler_domain::entities::{WorkerInfo, WorkerStatus};
use crawler_domain::messages::{WorkerHeartbeat, WorkerRegistration};

pub struct WorkerRegistryService {
    worker_repo: Arc<dyn WorkerRepository>,
}

impl WorkerRegistryService {
    pub fn new(worker_repo: Arc<dyn WorkerRepository>) -> Self {
        Self { worker_repo }
    }

    /// 注册 Worker，能力集为空则拒绝
    pub async fn register(&self, registration: WorkerRegistration) -> CrawlerResult<WorkerInfo> {
        if registration.worker_id.trim().is_empty() {
            return Err(CrawlerError::InvalidWorkerRegistration(
                "worker_id 不能为空".to_string(),
            ));
        }
        if registration.supported_regions.is_empty() {
            return Err(CrawlerError::InvalidWorkerRegistration(
                "supported_regions 不能为空".to_string(),
            ));
        }
        if registration.supported_data_types.is_empty() {
            return Err(CrawlerError::InvalidWorkerRegistration(
                "supported_data_types 不能为空".to_string(),
            ));
        }
        if registration.max_concurrent_tasks <= 0 {
            return Err(CrawlerError::InvalidWorkerRegistration(
                "max_concurrent_tasks 必须为正数".to_string(),
            ));
        }

        let now = Utc::now();
        let worker = WorkerInfo {
            id: registration.worker_id,
            name: registration.name,
            status: WorkerStatus::Online,
            supported_regions: registration.supported_regions,
            supported_data_types: registration.supported_data_types,
            max_concurrent_tasks: registration.max_concurrent_tasks,
            current_load: 0,
            version: registration.version,
            last_heartbeat: now,
            registered_at: now,
        };

        self.worker_repo.register(&worker).await?;
        info!(
            "Worker 注册成功: {} ({}，版本 {})",
            worker.id, worker.name, worker.version
        );
        Ok(worker)
    }

    /// 心跳上报，未注册的 Worker 返回 `WorkerNotFound`
    pub async fn heartbeat(
        &self,
        worker_id: &str,
        heartbeat: WorkerHeartbeat,
    ) -> CrawlerResult<()> {
        self.worker_repo
            .update_heartbeat(worker_id, Utc::now(), heartbeat.current_load)
            .await
    }

    /// 注销 Worker
    pub async fn unregister(&self, worker_id: &str) -> CrawlerResult<()> {
        self.worker_repo.unregister(worker_id).await?;
        warn!("Worker 注销: {worker_id}");
        Ok(())
    }

    pub async fn get(&self, worker_id: &str) -> CrawlerResult<WorkerInfo> {
        self.worker_repo
            .get_by_id(worker_id)
            .await?
            .ok_or_else(|| CrawlerError::WorkerNotFound {
                id: worker_id.to_string(),
            })
    }

    pub async fn list(&self) -> CrawlerResult<Vec<WorkerInfo>> {
        self.worker_repo.list().await
    }
}
