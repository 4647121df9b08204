use axum::extract::State;

use crate::error::ApiResult;
use crate::response::success;
use crate::routes::AppState;

/// 系统运行统计
pub async fn get_system_stats(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let stats = state.stats.collect().await?;
    Ok(success(stats))
}
