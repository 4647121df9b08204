use thiserror::Error;

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("任务未找到: {id}")]
    TaskNotFound { id: i64 },

    #[error("Worker未找到: {id}")]
    WorkerNotFound { id: String },

    #[error("Worker已注册: {id}")]
    WorkerAlreadyRegistered { id: String },

    #[error("无效的任务状态转换: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },

    #[error("无效的任务参数: {0}")]
    InvalidTaskParams(String),

    #[error("无效的Worker注册信息: {0}")]
    InvalidWorkerRegistration(String),

    #[error("存储IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type CrawlerResult<T> = std::result::Result<T, CrawlerError>;
