//! 版本兼容性判定
//!
//! 分派引擎在筛选阶段就排除不兼容的 Worker，而不是先分派再失败。

use std::cmp::Ordering;

use crawler_domain::entities::VersionConstraints;
use crawler_domain::messages::{VersionAction, VersionCheck};

/// 检查 Worker 版本是否满足任务的版本约束
pub fn check_version(worker_version: &str, constraints: &VersionConstraints) -> VersionCheck {
    if constraints
        .blacklist
        .iter()
        .any(|v| v == worker_version)
    {
        return VersionCheck {
            compatible: false,
            current_version: worker_version.to_string(),
            required_version: preferred_or_min(constraints),
            action: Some(VersionAction::Switch),
            reason: Some(format!("版本 {worker_version} 在黑名单中")),
        };
    }

    if let Some(min) = &constraints.min_version {
        if compare_versions(worker_version, min) == Ordering::Less {
            return VersionCheck {
                compatible: false,
                current_version: worker_version.to_string(),
                required_version: Some(min.clone()),
                action: Some(VersionAction::Upgrade),
                reason: Some(format!("版本 {worker_version} 低于最低要求 {min}")),
            };
        }
    }

    if let Some(max) = &constraints.max_version {
        if compare_versions(worker_version, max) == Ordering::Greater {
            return VersionCheck {
                compatible: false,
                current_version: worker_version.to_string(),
                required_version: Some(max.clone()),
                action: Some(VersionAction::Downgrade),
                reason: Some(format!("版本 {worker_version} 高于最高允许 {max}")),
            };
        }
    }

    if constraints.preferred_mandatory
        && !constraints.preferred_versions.is_empty()
        && !constraints
            .preferred_versions
            .iter()
            .any(|v| v == worker_version)
    {
        return VersionCheck {
            compatible: false,
            current_version: worker_version.to_string(),
            required_version: constraints.preferred_versions.first().cloned(),
            action: Some(VersionAction::Switch),
            reason: Some("未命中强制首选版本".to_string()),
        };
    }

    VersionCheck {
        compatible: true,
        current_version: worker_version.to_string(),
        required_version: None,
        action: None,
        reason: None,
    }
}

fn preferred_or_min(constraints: &VersionConstraints) -> Option<String> {
    constraints
        .preferred_versions
        .first()
        .cloned()
        .or_else(|| constraints.min_version.clone())
}

/// 点分数字版本比较，例如 "1.10.0" > "1.9.3"；非数字段按字符串比较
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
