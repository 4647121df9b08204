use axum::{response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 统一响应信封，所有接口都返回这四个字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    fn envelope(data: Option<T>, message: Option<String>) -> Self {
        Self {
            success: true,
            data,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn success(data: T) -> Self {
        Self::envelope(Some(data), None)
    }
}

impl ApiResponse<()> {
    pub fn success_empty() -> Self {
        Self::envelope(None, None)
    }

    pub fn success_empty_with_message(message: String) -> Self {
        Self::envelope(None, Some(message))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

/// 快捷构造成功响应
pub fn success<T: Serialize>(data: T) -> impl IntoResponse {
    ApiResponse::success(data)
}
