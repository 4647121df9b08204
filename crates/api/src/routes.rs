use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crawler_core::HistoryRepository;
use crawler_dispatcher::{
    AssignmentEngine, ExecutionReportHandler, StatsCollector, TaskIntakeService,
    WorkerRegistryService,
};

use crate::handlers::{
    health::health_check,
    system::get_system_stats,
    tasks::{
        cancel_task, check_task_version, create_task, get_task, get_task_history, list_tasks,
        report_execution,
    },
    workers::{heartbeat, list_workers, poll_tasks, register_worker},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WorkerRegistryService>,
    pub assignment: Arc<AssignmentEngine>,
    pub reports: Arc<ExecutionReportHandler>,
    pub intake: Arc<TaskIntakeService>,
    pub stats: Arc<StatsCollector>,
    pub history_repo: Arc<dyn HistoryRepository>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // Worker协议
        .route("/api/workers", get(list_workers).post(register_worker))
        .route("/api/workers/{id}/heartbeat", post(heartbeat))
        .route("/api/workers/{id}/tasks/poll", post(poll_tasks))
        // 任务管理
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", get(get_task))
        .route("/api/tasks/{id}/cancel", post(cancel_task))
        .route("/api/tasks/{id}/report", post(report_execution))
        .route("/api/tasks/{id}/version-check", post(check_task_version))
        .route("/api/tasks/{id}/history", get(get_task_history))
        // 系统监控
        .route("/api/system/stats", get(get_system_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
