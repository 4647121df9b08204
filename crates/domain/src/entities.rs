use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 采集任务：一个 (股票代码, 市场, 报表类型) 的最小调度单元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTask {
    pub id: i64,
    /// 股票代码，例如 "2330"、"AAPL"
    pub symbol: String,
    /// 市场区域，例如 "TPE"、"US"
    pub region: String,
    /// 报表类型，例如 "balance-sheet"、"cashflow"
    pub data_type: String,
    pub schedule_kind: ScheduleKind,
    /// cron 表达式，仅周期任务使用
    pub schedule: Option<String>,
    /// 数值越大越先被领取
    pub priority: i32,
    pub status: TaskStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub timeout_seconds: i32,
    pub assigned_worker_id: Option<String>,
    /// 采集配置标识，构成重试队列键的一部分
    pub config_id: String,
    pub required_config_version: Option<String>,
    pub version_constraints: VersionConstraints,
    /// 最早可被领取的时间，重试退避也通过它生效
    pub next_run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "ASSIGNED")]
    Assigned,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// 任务状态机：pending → assigned → running → {completed | pending | failed}；
    /// cancelled 只能从 pending 或 assigned 进入
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Pending, Cancelled)
                | (Assigned, Running)
                | (Assigned, Pending)
                | (Assigned, Cancelled)
                | (Assigned, Completed)
                | (Assigned, Failed)
                | (Running, Completed)
                | (Running, Pending)
                | (Running, Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScheduleKind {
    #[serde(rename = "RECURRING")]
    Recurring,
    #[serde(rename = "ONE_SHOT")]
    OneShot,
}

/// Worker 版本约束：区间、黑名单与首选版本
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionConstraints {
    pub min_version: Option<String>,
    pub max_version: Option<String>,
    /// 非空且 mandatory 时，worker 版本必须命中其中之一
    pub preferred_versions: Vec<String>,
    pub preferred_mandatory: bool,
    pub blacklist: Vec<String>,
}

impl CrawlTask {
    pub fn new(symbol: String, region: String, data_type: String, config_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 由存储层生成
            symbol,
            region,
            data_type,
            schedule_kind: ScheduleKind::OneShot,
            schedule: None,
            priority: 0,
            status: TaskStatus::Pending,
            retry_count: 0,
            max_retries: 3,
            timeout_seconds: 300,
            assigned_worker_id: None,
            config_id,
            required_config_version: None,
            version_constraints: VersionConstraints::default(),
            next_run_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// 任务当前是否可被领取（状态、时间窗与重试预算）
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending
            && now >= self.next_run_at
            && self.retry_count <= self.max_retries
    }

    pub fn entity_description(&self) -> String {
        format!(
            "任务 '{}/{}/{}' (ID: {})",
            self.symbol, self.region, self.data_type, self.id
        )
    }
}

/// Worker 节点信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub id: String,
    pub name: String,
    pub status: WorkerStatus,
    pub supported_regions: Vec<String>,
    pub supported_data_types: Vec<String>,
    pub max_concurrent_tasks: i32,
    pub current_load: i32,
    pub version: String,
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkerStatus {
    #[serde(rename = "ONLINE")]
    Online,
    #[serde(rename = "BUSY")]
    Busy,
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "OFFLINE")]
    Offline,
}

impl WorkerInfo {
    pub fn is_available(&self) -> bool {
        !matches!(self.status, WorkerStatus::Offline)
            && self.current_load < self.max_concurrent_tasks
    }

    /// 能力匹配：区域与报表类型都必须在声明的能力集内
    pub fn can_accept_task(&self, region: &str, data_type: &str) -> bool {
        self.is_available()
            && self.supported_regions.iter().any(|r| r == region)
            && self.supported_data_types.iter().any(|d| d == data_type)
    }

    pub fn load_percentage(&self) -> f64 {
        if self.max_concurrent_tasks == 0 {
            0.0
        } else {
            (self.current_load as f64 / self.max_concurrent_tasks as f64) * 100.0
        }
    }

    pub fn apply_heartbeat(&mut self, current_load: i32, timestamp: DateTime<Utc>) {
        self.current_load = current_load;
        self.last_heartbeat = timestamp;
        self.status = if current_load >= self.max_concurrent_tasks {
            WorkerStatus::Busy
        } else if current_load == 0 {
            WorkerStatus::Idle
        } else {
            WorkerStatus::Online
        };
    }

    /// 心跳是否超过存活阈值，超过则无论上报状态如何都视为离线
    pub fn is_heartbeat_expired(&self, now: DateTime<Utc>, timeout_seconds: i64) -> bool {
        (now - self.last_heartbeat).num_seconds() > timeout_seconds
    }
}

/// 一次执行尝试的不可变记录，只追加不修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionHistory {
    pub id: i64,
    pub task_id: i64,
    pub worker_id: String,
    pub status: ExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_fetched: i64,
    pub records_saved: i64,
    pub quality_score: Option<f64>,
    pub execution_time_ms: Option<i64>,
    pub memory_usage_mb: Option<u64>,
    pub cpu_percent: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

/// 失败分类结果的归档记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: i64,
    pub task_id: i64,
    pub history_id: Option<i64>,
    pub category: FailureCategory,
    pub reason: String,
    pub error_code: Option<String>,
    pub error_message: String,
    pub retry_attempt: i32,
    pub should_retry: bool,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub retry_delay_ms: Option<i64>,
    pub context: FailureContext,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureCategory {
    /// 瞬时故障：网络、超时、限流
    #[serde(rename = "TRANSIENT")]
    Transient,
    /// 瞬时数据故障：抓到了但内容为空
    #[serde(rename = "TRANSIENT_DATA")]
    TransientData,
    /// 永久故障：404、鉴权失败、配置错误、版本黑名单
    #[serde(rename = "PERMANENT")]
    Permanent,
}

/// 失败现场的诊断上下文
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureContext {
    pub request_url: Option<String>,
    pub http_status: Option<u16>,
    pub selector: Option<String>,
}

/// 重试队列自己的轻量记录，与 FailureRecord 独立。
/// 不变式：同一个键任意时刻至多存在一条记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRecord {
    pub config_id: String,
    pub symbol: String,
    pub report_type: String,
    pub region: String,
    pub reason: RetryReason,
    pub retry_count: i32,
    pub max_retries: i32,
    /// 首次入队时间，过期清理以它为准
    pub timestamp: DateTime<Utc>,
    pub last_retry_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetryKey {
    pub config_id: String,
    pub symbol: String,
    pub report_type: String,
}

impl RetryKey {
    pub fn new(
        config_id: impl Into<String>,
        symbol: impl Into<String>,
        report_type: impl Into<String>,
    ) -> Self {
        Self {
            config_id: config_id.into(),
            symbol: symbol.into(),
            report_type: report_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RetryReason {
    #[serde(rename = "EMPTY_DATA")]
    EmptyData,
    #[serde(rename = "EXECUTION_FAILED")]
    ExecutionFailed,
    #[serde(rename = "TIMEOUT")]
    Timeout,
}

impl RetryRecord {
    pub fn new(key: RetryKey, region: String, reason: RetryReason, max_retries: i32) -> Self {
        Self {
            config_id: key.config_id,
            symbol: key.symbol,
            report_type: key.report_type,
            region,
            reason,
            retry_count: 1,
            max_retries,
            timestamp: Utc::now(),
            last_retry_at: None,
        }
    }

    pub fn key(&self) -> RetryKey {
        RetryKey::new(
            self.config_id.clone(),
            self.symbol.clone(),
            self.report_type.clone(),
        )
    }

    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}
