// ==========================================
// 贝类加工追溯系统 - 引擎层规则违反类型
// ==========================================
// 职责: 纯规则校验的失败原因（不含任何存储错误）
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 生命周期规则违反
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("缺少必填字段: {field}")]
    MissingField { field: String },

    #[error("字段值无效 (field={field}): {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidTransition { from: String, to: String },

    #[error("批次 {lot_number} 净化未完成 (status={status})，不能开始加工")]
    DepurationIncomplete { lot_number: String, status: String },

    #[error("数据不一致: {0}")]
    DataIntegrity(String),
}

impl RuleViolation {
    pub fn missing(field: &str) -> Self {
        RuleViolation::MissingField {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        RuleViolation::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        RuleViolation::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// 规则层 Result 别名
pub type RuleResult<T> = Result<T, RuleViolation>;

/// 读取必填的正数重量（None / 非有限值 / <=0 均视为无效）
pub fn require_positive(field: &str, value: Option<f64>) -> RuleResult<f64> {
    match value {
        None => Err(RuleViolation::missing(field)),
        Some(v) if !v.is_finite() => Err(RuleViolation::invalid(field, "不是有效数字")),
        Some(v) if v <= 0.0 => Err(RuleViolation::invalid(field, format!("必须大于0，实际={}", v))),
        Some(v) => Ok(v),
    }
}

/// 读取必填的有限数值（允许 0 与负数，如水温）
pub fn require_finite(field: &str, value: Option<f64>) -> RuleResult<f64> {
    match value {
        None => Err(RuleViolation::missing(field)),
        Some(v) if !v.is_finite() => Err(RuleViolation::invalid(field, "不是有效数字")),
        Some(v) => Ok(v),
    }
}

/// 读取必填文本（去除首尾空白后非空）
pub fn require_text(field: &str, value: &str) -> RuleResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RuleViolation::missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}
