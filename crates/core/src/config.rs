//! 应用配置模型与加载
//!
//! 配置来源分层：TOML 文件（可选）叠加 `CRAWLER__` 前缀的环境变量，
//! 例如 `CRAWLER__COORDINATOR__HEARTBEAT_TIMEOUT_SECONDS=120`。

use serde::{Deserialize, Serialize};

use crate::{CrawlerError, CrawlerResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub coordinator: CoordinatorConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// 心跳存活阈值（秒），超过即视为离线
    pub heartbeat_timeout_seconds: i64,
    /// 失效检测扫描间隔（秒）
    pub liveness_sweep_interval_seconds: u64,
    /// 重试退避基础延迟（毫秒）
    pub retry_base_delay_ms: i64,
    /// 任务与重试记录的默认最大重试次数
    pub default_max_retries: i32,
    /// 重试记录保留天数，超过即被过期清理
    pub retry_retention_days: i64,
    /// 重试清理扫描间隔（秒）
    pub retry_cleanup_interval_seconds: u64,
    /// 重试状态文件路径
    pub retry_state_path: String,
    /// 对账探测的产出位置
    pub output_location: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_seconds: 90,
            liveness_sweep_interval_seconds: 30,
            retry_base_delay_ms: 60_000, // 1分钟起步
            default_max_retries: 3,
            retry_retention_days: 7,
            retry_cleanup_interval_seconds: 3600,
            retry_state_path: "data/retry_state.json".to_string(),
            output_location: "data/output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 加载配置：文件可缺省，环境变量覆盖文件
    pub fn load(path: Option<&str>) -> CrawlerResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("CRAWLER").separator("__"))
            .build()
            .map_err(|e| CrawlerError::Configuration(e.to_string()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| CrawlerError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CrawlerResult<()> {
        if self.coordinator.heartbeat_timeout_seconds <= 0 {
            return Err(CrawlerError::Configuration(
                "heartbeat_timeout_seconds 必须大于0".to_string(),
            ));
        }
        if self.coordinator.retry_base_delay_ms <= 0 {
            return Err(CrawlerError::Configuration(
                "retry_base_delay_ms 必须大于0".to_string(),
            ));
        }
        if self.coordinator.default_max_retries < 0 {
            return Err(CrawlerError::Configuration(
                "default_max_retries 不能为负数".to_string(),
            ));
        }
        Ok(())
    }
}
