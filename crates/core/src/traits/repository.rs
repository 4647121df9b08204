//! 数据仓储层接口定义
//!
//! 此模块定义了数据持久化层的核心抽象接口：
//! - 任务仓储接口 (TaskRepository)，包含原子领取原语 try_claim
//! - Worker仓储接口 (WorkerRepository)
//! - 执行历史仓储接口 (HistoryRepository)，只追加
//! - 失败记录仓储接口 (FailureRepository)，只追加
//! - 重试状态存储接口 (RetryStateStore)，整集合读写
//! - 外部产出探测接口 (OutputProbe)，仅供对账清理使用
//!
//! 所有操作都是异步的，返回统一的 `CrawlerResult<T>`，实现必须
//! `Send + Sync`。接口与具体实现分离，内存实现位于 infrastructure crate。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::CrawlerResult;
use crawler_domain::entities::{
    CrawlTask, ExecutionHistory, FailureRecord, RetryRecord, TaskStatus, WorkerInfo, WorkerStatus,
};

/// 任务仓储接口
///
/// 除基础CRUD外，核心是 `try_claim`：一次条件更新，只有任务在更新时刻
/// 仍为 pending 才会成功，用来保证并发拉取下同一任务至多被领取一次。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 创建新任务，返回带存储层生成ID的任务
    async fn create(&self, task: &CrawlTask) -> CrawlerResult<CrawlTask>;

    /// 根据ID获取任务
    async fn get_by_id(&self, id: i64) -> CrawlerResult<Option<CrawlTask>>;

    /// 整体更新任务
    async fn update(&self, task: &CrawlTask) -> CrawlerResult<()>;

    /// 列出全部任务（统计与后台扫描用）
    async fn list(&self) -> CrawlerResult<Vec<CrawlTask>>;

    /// 获取当前可领取的任务：pending、到达 next_run_at、重试预算内
    async fn get_claimable_tasks(&self, now: DateTime<Utc>) -> CrawlerResult<Vec<CrawlTask>>;

    /// 原子领取：仅当任务状态仍为 pending 时置为 assigned 并绑定 worker。
    /// 返回 false 表示任务已被他人领走或状态已变化，不是错误。
    async fn try_claim(&self, task_id: i64, worker_id: &str) -> CrawlerResult<bool>;

    /// 更新任务状态；assigned/running 必须携带 worker_id，其余状态会清除绑定。
    /// 非法的状态机转换返回 `InvalidStateTransition`。
    async fn update_status(
        &self,
        id: i64,
        status: TaskStatus,
        worker_id: Option<&str>,
    ) -> CrawlerResult<()>;

    /// 获取指定Worker当前持有的任务
    async fn get_by_worker_id(&self, worker_id: &str) -> CrawlerResult<Vec<CrawlTask>>;
}

/// Worker仓储接口
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// 注册新Worker；ID重复返回 `WorkerAlreadyRegistered`
    async fn register(&self, worker: &WorkerInfo) -> CrawlerResult<()>;

    /// 注销Worker
    async fn unregister(&self, worker_id: &str) -> CrawlerResult<()>;

    /// 根据ID获取Worker
    async fn get_by_id(&self, worker_id: &str) -> CrawlerResult<Option<WorkerInfo>>;

    /// 整体更新Worker信息
    async fn update(&self, worker: &WorkerInfo) -> CrawlerResult<()>;

    /// 列出全部Worker
    async fn list(&self) -> CrawlerResult<Vec<WorkerInfo>>;

    /// 更新心跳与负载；Worker不存在返回 `WorkerNotFound`
    async fn update_heartbeat(
        &self,
        worker_id: &str,
        heartbeat_time: DateTime<Utc>,
        current_load: i32,
    ) -> CrawlerResult<()>;

    /// 更新Worker状态
    async fn update_status(&self, worker_id: &str, status: WorkerStatus) -> CrawlerResult<()>;

    /// 原子调整当前负载（领取 +N、释放 -1），在仓储写锁内对最新实体执行，
    /// 不触碰心跳等其他字段；结果下限为0。Worker不存在返回 `WorkerNotFound`
    async fn adjust_load(&self, worker_id: &str, delta: i32) -> CrawlerResult<()>;

    /// 获取心跳超过阈值的Worker（不含已标记离线的）
    async fn get_timeout_workers(&self, timeout_seconds: i64) -> CrawlerResult<Vec<WorkerInfo>>;
}

/// 执行历史仓储接口，记录只追加不修改
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(&self, history: &ExecutionHistory) -> CrawlerResult<ExecutionHistory>;

    async fn get_by_task_id(&self, task_id: i64) -> CrawlerResult<Vec<ExecutionHistory>>;

    async fn get_by_worker_id(&self, worker_id: &str) -> CrawlerResult<Vec<ExecutionHistory>>;
}

/// 失败记录仓储接口，记录只追加不修改
#[async_trait]
pub trait FailureRepository: Send + Sync {
    async fn append(&self, record: &FailureRecord) -> CrawlerResult<FailureRecord>;

    async fn get_by_task_id(&self, task_id: i64) -> CrawlerResult<Vec<FailureRecord>>;
}

/// 重试状态的持久化接口
///
/// 存储层没有部分更新原语：读出整个集合、修改、再整体写回。
/// 序列化由重试队列管理器的单写者锁保证。
#[async_trait]
pub trait RetryStateStore: Send + Sync {
    /// 加载全部重试记录；存储文件不存在视为空集合，不是错误
    async fn load(&self) -> CrawlerResult<Vec<RetryRecord>>;

    /// 整体写回全部重试记录
    async fn persist(&self, records: &[RetryRecord]) -> CrawlerResult<()>;
}

/// 外部产出探测接口
///
/// 对账清理通过它询问指定 symbol/report 是否已有有效产出，
/// 用于恢复"Worker成功但成功上报丢失"的场景。探测逻辑不属于本系统。
#[async_trait]
pub trait OutputProbe: Send + Sync {
    async fn output_exists(
        &self,
        location: &str,
        symbol: &str,
        region: &str,
        report_type: &str,
    ) -> CrawlerResult<bool>;
}
