// ==========================================
// 贝类加工追溯系统 - 操作提示
// ==========================================
// 职责: 每个写操作在返回值中携带提示（成功/警告/错误），由展示层决定如何呈现
// ==========================================

use crate::api::error::{ApiError, ErrorCategory};
use crate::i18n::t_with_args;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// 失败操作的提示
    pub fn from_error(err: &ApiError) -> Self {
        let key = match err.category() {
            ErrorCategory::Validation => "error.validation",
            ErrorCategory::NotFound => "error.not_found",
            ErrorCategory::Persistence => "error.persistence",
        };
        Self::error(t_with_args(key, &[("detail", &err.to_string())]))
    }

    pub fn is_warning(&self) -> bool {
        self.level == NoticeLevel::Warning
    }
}
