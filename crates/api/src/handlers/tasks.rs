use axum::extract::{Path, State};
use axum::Json;

use crawler_dispatcher::check_version;
use crawler_domain::messages::{ExecutionReport, TaskIntake, VersionCheckRequest};

use crate::error::ApiResult;
use crate::response::{success, ApiResponse};
use crate::routes::AppState;

/// 创建任务
pub async fn create_task(
    State(state): State<AppState>,
    Json(intake): Json<TaskIntake>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.intake.create(intake).await?;
    Ok(success(task))
}

/// 任务列表
pub async fn list_tasks(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let tasks = state.intake.list().await?;
    Ok(success(tasks))
}

/// 单个任务
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.intake.get(id).await?;
    Ok(success(task))
}

/// 取消任务
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    state.intake.cancel(id).await?;
    Ok(ApiResponse::success_empty_with_message(format!(
        "任务 {id} 已取消"
    )))
}

/// 执行结果回报
pub async fn report_execution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(report): Json<ExecutionReport>,
) -> ApiResult<impl axum::response::IntoResponse> {
    state.reports.report(id, report).await?;
    Ok(ApiResponse::success_empty())
}

/// 按任务约束检查Worker版本
pub async fn check_task_version(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<VersionCheckRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.intake.get(id).await?;
    let check = check_version(&request.worker_version, &task.version_constraints);
    Ok(success(check))
}

/// 任务执行历史
pub async fn get_task_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    // 先确认任务存在，避免对不存在的任务返回空列表
    state.intake.get(id).await?;
    let history = state.history_repo.get_by_task_id(id).await?;
    Ok(success(history))
}
