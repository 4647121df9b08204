use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{debug, info};

/// 优雅关闭管理器：广播一次性的关闭信号
pub struct ShutdownManager {
    tx: broadcast::Sender<()>,
    fired: AtomicBool,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            fired: AtomicBool::new(false),
        }
    }

    /// 订阅关闭信号；若已触发过关闭则立即可收
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        let rx = self.tx.subscribe();
        if self.fired.load(Ordering::Acquire) {
            // 晚到的订阅者补发一次信号
            let _ = self.tx.send(());
        }
        rx
    }

    /// 触发关闭，幂等
    pub fn shutdown(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            debug!("关闭已经触发过");
            return;
        }
        debug!("发送关闭信号给 {} 个订阅者", self.tx.receiver_count());
        let _ = self.tx.send(());
        info!("关闭信号已发送");
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
