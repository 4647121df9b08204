use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crawler_core::CrawlerError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度器错误: {0}")]
    Crawler(#[from] CrawlerError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type) = match &self {
            ApiError::Crawler(CrawlerError::TaskNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("任务 ID {id} 不存在"),
                "TASK_NOT_FOUND",
            ),
            ApiError::Crawler(CrawlerError::WorkerNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("Worker {id} 不存在"),
                "WORKER_NOT_FOUND",
            ),
            ApiError::Crawler(CrawlerError::WorkerAlreadyRegistered { id }) => (
                StatusCode::CONFLICT,
                format!("Worker {id} 已注册"),
                "WORKER_ALREADY_REGISTERED",
            ),
            ApiError::Crawler(CrawlerError::InvalidStateTransition { from, to }) => (
                StatusCode::CONFLICT,
                format!("非法状态转换: {from} -> {to}"),
                "INVALID_STATE_TRANSITION",
            ),
            ApiError::Crawler(CrawlerError::InvalidCron { expr, message }) => (
                StatusCode::BAD_REQUEST,
                format!("CRON表达式 '{expr}' 无效: {message}"),
                "INVALID_CRON",
            ),
            ApiError::Crawler(CrawlerError::InvalidTaskParams(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("任务参数错误: {msg}"),
                "INVALID_TASK_PARAMS",
            ),
            ApiError::Crawler(CrawlerError::InvalidWorkerRegistration(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("Worker注册参数错误: {msg}"),
                "INVALID_WORKER_REGISTRATION",
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "BAD_REQUEST")
            }
            ApiError::Crawler(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                "INTERNAL_ERROR",
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
                "INTERNAL_ERROR",
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
            "error_type": error_type,
            "timestamp": chrono::Utc::now(),
        }));

        (status, body).into_response()
    }
}
