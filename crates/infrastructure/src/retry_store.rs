//! 重试状态的持久化后端
//!
//! JSON 文件实现：整集合读出、整集合写回，没有部分更新原语。
//! 写入顺序由上层（重试队列管理器的单写者锁）保证。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crawler_core::{CrawlerError, CrawlerResult, RetryStateStore};
use crawler_domain::entities::RetryRecord;

/// JSON 文件重试状态存储
pub struct JsonFileRetryStore {
    path: PathBuf,
}

impl JsonFileRetryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RetryStateStore for JsonFileRetryStore {
    async fn load(&self) -> CrawlerResult<Vec<RetryRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let records: Vec<RetryRecord> = serde_json::from_slice(&bytes)?;
                debug!("加载了 {} 条重试记录: {}", records.len(), self.path.display());
                Ok(records)
            }
            // 首次读取文件不存在视为空集合
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CrawlerError::Io(e)),
        }
    }

    async fn persist(&self, records: &[RetryRecord]) -> CrawlerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(records)?;

        // 先写临时文件再改名，避免崩溃留下半截文件
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

/// 内存重试状态存储，测试用
pub struct MemoryRetryStore {
    records: Mutex<Vec<RetryRecord>>,
}

impl MemoryRetryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryRetryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RetryStateStore for MemoryRetryStore {
    async fn load(&self) -> CrawlerResult<Vec<RetryRecord>> {
        Ok(self.records.lock().await.clone())
    }

    async fn persist(&self, records: &[RetryRecord]) -> CrawlerResult<()> {
        *self.records.lock().await = records.to_vec();
        Ok(())
    }
}
