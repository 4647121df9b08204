pub mod memory;
pub mod output_probe;
pub mod retry_store;

pub use memory::{
    MemoryFailureRepository, MemoryHistoryRepository, MemoryTaskRepository,
    MemoryWorkerRepository,
};
pub use output_probe::FsOutputProbe;
pub use retry_store::{JsonFileRetryStore, MemoryRetryStore};
