//! 重试队列管理器
//!
//! 持久化的按键去重队列：同一个 (config, symbol, report_type) 键任意时刻
//! 至多一条记录，重复失败只递增计数。所有写操作持同一把锁串行执行，
//! 变更后整集合写回存储层。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crawler_core::{CrawlerResult, OutputProbe, RetryStateStore};
use crawler_domain::entities::{RetryKey, RetryReason, RetryRecord};

/// 重试队列配置
#[derive(Debug, Clone)]
pub struct RetryQueueConfig {
    /// 首次重试的基础延迟
    pub base_delay_ms: i64,
    pub default_max_retries: i32,
    pub retention_days: i64,
}

impl Default for RetryQueueConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 60_000,
            default_max_retries: 3,
            retention_days: 7,
        }
    }
}

/// 重试统计，只读观测面
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RetryStatistics {
    pub total: usize,
    pub by_region: HashMap<String, usize>,
    pub by_report_type: HashMap<String, usize>,
    pub by_reason: HashMap<String, usize>,
    pub oldest_timestamp: Option<DateTime<Utc>>,
}

pub struct RetryQueueManager {
    records: Mutex<HashMap<RetryKey, RetryRecord>>,
    store: Arc<dyn RetryStateStore>,
    config: RetryQueueConfig,
}

impl RetryQueueManager {
    /// 从存储层加载既有记录并构建管理器
    pub async fn new(
        store: Arc<dyn RetryStateStore>,
        config: Option<RetryQueueConfig>,
    ) -> CrawlerResult<Self> {
        let config = config.unwrap_or_default();
        let loaded = store.load().await?;
        let mut records = HashMap::with_capacity(loaded.len());
        for record in loaded {
            records.insert(record.key(), record);
        }
        info!("重试队列就绪，载入 {} 条记录", records.len());

        Ok(Self {
            records: Mutex::new(records),
            store,
            config,
        })
    }

    /// 记录一次可重试失败。
    ///
    /// 键已存在时递增计数，不存在时以 retry_count=1 新建；
    /// 最后统一走 `admit` 做耗尽裁决，任何时刻同一个键至多一条记录。
    pub async fn add(
        &self,
        key: RetryKey,
        region: String,
        reason: RetryReason,
    ) -> CrawlerResult<()> {
        let mut records = self.records.lock().await;

        match records.get_mut(&key) {
            Some(existing) => {
                existing.retry_count += 1;
                existing.reason = reason;
                existing.last_retry_at = Some(Utc::now());
                debug!(
                    "重试计数递增: {}/{}/{} -> {}",
                    key.config_id, key.symbol, key.report_type, existing.retry_count
                );
            }
            None => {
                let record = RetryRecord::new(
                    key.clone(),
                    region,
                    reason,
                    self.config.default_max_retries,
                );
                debug!(
                    "新建重试记录: {}/{}/{}",
                    key.config_id, key.symbol, key.report_type
                );
                records.insert(key.clone(), record);
            }
        }

        Self::admit(&mut records, &key);
        self.persist(&records).await
    }

    /// 耗尽裁决的唯一出口：计数到达上限即删除，绝不留下超限记录
    fn admit(records: &mut HashMap<RetryKey, RetryRecord>, key: &RetryKey) {
        if let Some(record) = records.get(key) {
            if record.is_exhausted() {
                warn!(
                    "重试已耗尽，移除记录: {}/{}/{} ({}/{})",
                    key.config_id,
                    key.symbol,
                    key.report_type,
                    record.retry_count,
                    record.max_retries
                );
                records.remove(key);
            }
        }
    }

    /// 尚未耗尽的待重试记录
    pub async fn pending(&self) -> Vec<RetryRecord> {
        self.records
            .lock()
            .await
            .values()
            .filter(|r| r.retry_count <= r.max_retries)
            .cloned()
            .collect()
    }

    /// 精确移除一条记录，确认成功后调用
    pub async fn remove(&self, key: &RetryKey) -> CrawlerResult<bool> {
        let mut records = self.records.lock().await;
        let removed = records.remove(key).is_some();
        if removed {
            self.persist(&records).await?;
        }
        Ok(removed)
    }

    /// 移除某个标的在某地区的全部记录，跨 report_type。
    ///
    /// 一次成功抓取证明目标当前可达，该标的残留的重试条目
    /// 多半来自已消失的瞬时故障。
    pub async fn remove_all_for_symbol(
        &self,
        symbol: &str,
        region: &str,
    ) -> CrawlerResult<usize> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, r| !(r.symbol == symbol && r.region == region));
        let removed = before - records.len();

        if removed > 0 {
            info!("清除标的 {symbol}@{region} 的 {removed} 条重试记录");
            self.persist(&records).await?;
        }
        Ok(removed)
    }

    /// 按首次入队时间清理过期记录，与计数无关
    pub async fn cleanup_expired(&self) -> CrawlerResult<usize> {
        let cutoff = Utc::now() - Duration::days(self.config.retention_days);
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, r| r.timestamp >= cutoff);
        let removed = before - records.len();

        if removed > 0 {
            info!("过期清理移除 {removed} 条重试记录");
            self.persist(&records).await?;
        }
        Ok(removed)
    }

    /// 对账清理：产出已存在的记录视为已成功。
    ///
    /// 覆盖 Worker 产出了有效数据但成功回报丢失的崩溃场景。
    pub async fn cleanup_successful(
        &self,
        probe: &dyn OutputProbe,
        output_location: &str,
    ) -> CrawlerResult<usize> {
        let pending = self.pending().await;

        // 先探测再成组清除，探测期间不持锁
        let mut resolved: Vec<(String, String)> = Vec::new();
        for record in &pending {
            let exists = probe
                .output_exists(
                    output_location,
                    &record.symbol,
                    &record.region,
                    &record.report_type,
                )
                .await?;
            if exists {
                let pair = (record.symbol.clone(), record.region.clone());
                if !resolved.contains(&pair) {
                    resolved.push(pair);
                }
            }
        }

        let mut removed = 0;
        for (symbol, region) in resolved {
            removed += self.remove_all_for_symbol(&symbol, &region).await?;
        }

        if removed > 0 {
            info!("对账清理移除 {removed} 条已有产出的重试记录");
        }
        Ok(removed)
    }

    /// 指数退避：delay(n) = base × 2^(n−1)
    pub fn delay(&self, retry_count: i32) -> Duration {
        let exponent = (retry_count - 1).max(0).min(30) as u32;
        Duration::milliseconds(self.config.base_delay_ms.saturating_mul(1i64 << exponent))
    }

    /// 聚合统计，无副作用
    pub async fn statistics(&self) -> RetryStatistics {
        let records = self.records.lock().await;
        let mut stats = RetryStatistics {
            total: records.len(),
            ..Default::default()
        };

        for record in records.values() {
            *stats.by_region.entry(record.region.clone()).or_insert(0) += 1;
            *stats
                .by_report_type
                .entry(record.report_type.clone())
                .or_insert(0) += 1;
            let reason = match record.reason {
                RetryReason::EmptyData => "EMPTY_DATA",
                RetryReason::ExecutionFailed => "EXECUTION_FAILED",
                RetryReason::Timeout => "TIMEOUT",
            };
            *stats.by_reason.entry(reason.to_string()).or_insert(0) += 1;

            stats.oldest_timestamp = match stats.oldest_timestamp {
                Some(oldest) if oldest <= record.timestamp => Some(oldest),
                _ => Some(record.timestamp),
            };
        }

        stats
    }

    async fn persist(&self, records: &HashMap<RetryKey, RetryRecord>) -> CrawlerResult<()> {
        let snapshot: Vec<RetryRecord> = records.values().cloned().collect();
        self.store.persist(&snapshot).await
    }
}
