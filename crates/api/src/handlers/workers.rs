use axum::extract::{Path, State};
use axum::Json;

use crawler_domain::messages::{TaskPollRequest, WorkerHeartbeat, WorkerRegistration};

use crate::error::ApiResult;
use crate::response::{success, ApiResponse};
use crate::routes::AppState;

/// 注册Worker
pub async fn register_worker(
    State(state): State<AppState>,
    Json(registration): Json<WorkerRegistration>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let worker = state.registry.register(registration).await?;
    Ok(success(worker))
}

/// Worker列表
pub async fn list_workers(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workers = state.registry.list().await?;
    Ok(success(workers))
}

/// 心跳上报
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<WorkerHeartbeat>,
) -> ApiResult<impl axum::response::IntoResponse> {
    state.registry.heartbeat(&id, body).await?;
    Ok(ApiResponse::success_empty())
}

/// Worker拉取任务
pub async fn poll_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TaskPollRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let tasks = state.assignment.request_tasks(&id, &request).await?;
    Ok(success(tasks))
}
