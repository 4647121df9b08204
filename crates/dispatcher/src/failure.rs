//! 失败分类器
//!
//! 纯函数：原始失败信号 -> (类别, 原因, 是否可重试)。
//! 未知信号按瞬时处理但压低重试上限，绝不静默丢弃。

use crawler_domain::entities::{FailureCategory, FailureContext};
use crawler_domain::messages::FailureSignal;

/// 未知信号的重试上限，低于任务本身的 max_retries
pub const UNKNOWN_SIGNAL_RETRY_CEILING: i32 = 2;

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureClassification {
    pub category: FailureCategory,
    pub reason: String,
    pub error_code: Option<String>,
    pub should_retry: bool,
    /// 未知信号时为 Some，收紧该任务的有效重试次数
    pub retry_ceiling: Option<i32>,
}

/// 按决策表对失败信号分类
pub fn classify(signal: &FailureSignal) -> FailureClassification {
    if signal.timed_out {
        return FailureClassification {
            category: FailureCategory::Transient,
            reason: "请求超时".to_string(),
            error_code: Some("TIMEOUT".to_string()),
            should_retry: true,
            retry_ceiling: None,
        };
    }

    if signal.empty_result {
        return FailureClassification {
            category: FailureCategory::TransientData,
            reason: "抓取结果为空".to_string(),
            error_code: Some("EMPTY_DATA".to_string()),
            should_retry: true,
            retry_ceiling: None,
        };
    }

    if let Some(status) = signal.http_status {
        return classify_http(status);
    }

    let message = signal.message.to_lowercase();

    if is_network_error(&message) {
        return FailureClassification {
            category: FailureCategory::Transient,
            reason: "网络错误".to_string(),
            error_code: Some("NETWORK".to_string()),
            should_retry: true,
            retry_ceiling: None,
        };
    }

    if is_parse_or_config_error(&message) {
        return FailureClassification {
            category: FailureCategory::Permanent,
            reason: "配置或解析错误".to_string(),
            error_code: Some("PARSE_ERROR".to_string()),
            should_retry: false,
            retry_ceiling: None,
        };
    }

    if message.contains("blacklist") || (message.contains("版本") && message.contains("黑名单")) {
        return FailureClassification {
            category: FailureCategory::Permanent,
            reason: "版本被列入黑名单".to_string(),
            error_code: Some("VERSION_BLACKLISTED".to_string()),
            should_retry: false,
            retry_ceiling: None,
        };
    }

    // 未知信号：瞬时、可重试，但压低上限
    FailureClassification {
        category: FailureCategory::Transient,
        reason: format!("未知失败信号: {}", signal.message),
        error_code: Some("UNKNOWN".to_string()),
        should_retry: true,
        retry_ceiling: Some(UNKNOWN_SIGNAL_RETRY_CEILING),
    }
}

fn classify_http(status: u16) -> FailureClassification {
    match status {
        429 => FailureClassification {
            category: FailureCategory::Transient,
            reason: "请求被限流".to_string(),
            error_code: Some("HTTP_429".to_string()),
            should_retry: true,
            retry_ceiling: None,
        },
        404 => FailureClassification {
            category: FailureCategory::Permanent,
            reason: "目标不存在".to_string(),
            error_code: Some("HTTP_404".to_string()),
            should_retry: false,
            retry_ceiling: None,
        },
        401 | 403 => FailureClassification {
            category: FailureCategory::Permanent,
            reason: "鉴权失败".to_string(),
            error_code: Some(format!("HTTP_{status}")),
            should_retry: false,
            retry_ceiling: None,
        },
        500..=599 => FailureClassification {
            category: FailureCategory::Transient,
            reason: "上游服务器错误".to_string(),
            error_code: Some(format!("HTTP_{status}")),
            should_retry: true,
            retry_ceiling: None,
        },
        other => FailureClassification {
            category: FailureCategory::Transient,
            reason: format!("未预期的 HTTP 状态 {other}"),
            error_code: Some(format!("HTTP_{other}")),
            should_retry: true,
            retry_ceiling: Some(UNKNOWN_SIGNAL_RETRY_CEILING),
        },
    }
}

fn is_network_error(message: &str) -> bool {
    const NEEDLES: &[&str] = &[
        "connection refused",
        "connection reset",
        "dns",
        "network",
        "unreachable",
        "broken pipe",
        "tls",
    ];
    NEEDLES.iter().any(|n| message.contains(n))
}

fn is_parse_or_config_error(message: &str) -> bool {
    const NEEDLES: &[&str] = &[
        "parse error",
        "malformed",
        "invalid config",
        "missing field",
        "selector not found",
    ];
    NEEDLES.iter().any(|n| message.contains(n))
}

/// 从信号提取诊断上下文，随 FailureRecord 落库
pub fn context_from_signal(signal: &FailureSignal) -> FailureContext {
    FailureContext {
        request_url: signal.request_url.clone(),
        http_status: signal.http_status,
        selector: signal.selector.clone(),
    }
}
