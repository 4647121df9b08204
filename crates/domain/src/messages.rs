use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{ExecutionStatus, VersionConstraints};

/// Worker 注册请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRegistration {
    pub worker_id: String,
    pub name: String,
    pub supported_regions: Vec<String>,
    pub supported_data_types: Vec<String>,
    pub max_concurrent_tasks: i32,
    pub version: String,
}

/// Worker 心跳上报
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHeartbeat {
    pub current_load: i32,
    pub memory_usage_mb: Option<u64>,
    pub cpu_percent: Option<f64>,
}

/// Worker 拉取任务请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPollRequest {
    pub supported_regions: Vec<String>,
    pub supported_data_types: Vec<String>,
    pub worker_version: String,
    pub limit: i32,
}

/// 执行结果上报
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: ExecutionStatus,
    pub crawled_from: Option<DateTime<Utc>>,
    pub crawled_to: Option<DateTime<Utc>>,
    pub records_fetched: Option<i64>,
    pub records_saved: Option<i64>,
    pub quality_score: Option<f64>,
    pub execution_time_ms: Option<i64>,
    pub memory_usage_mb: Option<u64>,
    pub cpu_percent: Option<f64>,
    pub error: Option<FailureSignal>,
}

/// 失败分类器的原始输入信号
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureSignal {
    pub http_status: Option<u16>,
    pub message: String,
    pub timed_out: bool,
    /// 抓取成功但解析结果为空
    pub empty_result: bool,
    pub request_url: Option<String>,
    pub selector: Option<String>,
}

/// 版本兼容性检查请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionCheckRequest {
    pub worker_version: String,
}

/// 版本兼容性检查结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionCheck {
    pub compatible: bool,
    pub current_version: String,
    pub required_version: Option<String>,
    pub action: Option<VersionAction>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VersionAction {
    #[serde(rename = "UPGRADE")]
    Upgrade,
    #[serde(rename = "DOWNGRADE")]
    Downgrade,
    #[serde(rename = "SWITCH")]
    Switch,
}

/// 任务创建请求（调度摄入）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIntake {
    pub symbol: String,
    pub region: String,
    pub data_type: String,
    pub config_id: String,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub priority: i32,
    pub max_retries: Option<i32>,
    pub timeout_seconds: Option<i32>,
    pub required_config_version: Option<String>,
    #[serde(default)]
    pub version_constraints: VersionConstraints,
}
