use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crawler_core::{CrawlerError, CrawlerResult};

/// CRON表达式解析和调度工具
pub struct CronScheduler {
    schedule: Schedule,
}

impl CronScheduler {
    /// 创建新的CRON调度器，表达式非法时返回 `InvalidCron`
    pub fn new(cron_expr: &str) -> CrawlerResult<Self> {
        let schedule = Schedule::from_str(cron_expr).map_err(|e| CrawlerError::InvalidCron {
            expr: cron_expr.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self { schedule })
    }

    /// 计算给定时间之后的下一次执行时间
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

/// 校验表达式并返回下一次执行时间
pub fn next_run_from_schedule(
    cron_expr: &str,
    after: DateTime<Utc>,
) -> CrawlerResult<DateTime<Utc>> {
    let scheduler = CronScheduler::new(cron_expr)?;
    scheduler
        .next_occurrence(after)
        .ok_or_else(|| CrawlerError::InvalidCron {
            expr: cron_expr.to_string(),
            message: "表达式没有未来的执行时间".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_occurrence_is_in_future() {
        let now = Utc::now();
        // 每天凌晨2点
        let next = next_run_from_schedule("0 0 2 * * *", now).unwrap();
        assert!(next > now);
    }

    #[test]
    fn test_invalid_expression_rejected() {
        let err = next_run_from_schedule("not-a-cron", Utc::now()).unwrap_err();
        assert!(matches!(err, CrawlerError::InvalidCron { .. }));
    }
}
