//! 调度核心：Worker 注册、任务分派、结果回报、失败分类与重试队列。

pub mod assignment;
pub mod cron_utils;
pub mod failure;
pub mod intake;
pub mod liveness;
pub mod registry;
pub mod report;
pub mod retry_queue;
pub mod stats;
pub mod version;

#[cfg(test)]
pub mod test_utils;

pub use assignment::AssignmentEngine;
pub use failure::{classify, FailureClassification};
pub use intake::TaskIntakeService;
pub use liveness::{WorkerLivenessMonitor, WorkerLivenessMonitorConfig};
pub use registry::WorkerRegistryService;
pub use report::ExecutionReportHandler;
pub use retry_queue::{RetryQueueConfig, RetryQueueManager, RetryStatistics};
pub use stats::{StatsCollector, SystemStats};
pub use version::check_version;
