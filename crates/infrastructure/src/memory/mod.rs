//! 内存仓储实现
//!
//! 嵌入式部署与测试共用的存储后端。所有可变操作都在同一把
//! `RwLock` 写锁内完成，`try_claim` 的比较交换因此是原子的。

pub mod failure_repository;
pub mod history_repository;
pub mod task_repository;
pub mod worker_repository;

pub use failure_repository::MemoryFailureRepository;
pub use history_repository::MemoryHistoryRepository;
pub use task_repository::MemoryTaskRepository;
pub use worker_repository::MemoryWorkerRepository;
