pub mod config;
pub mod errors;
pub mod traits;

pub use config::{AppConfig, CoordinatorConfig, LogConfig, ServerConfig};
pub use errors::{CrawlerError, CrawlerResult};
pub use traits::{
    FailureRepository, HistoryRepository, OutputProbe, RetryStateStore, TaskRepository,
    WorkerRepository,
};
