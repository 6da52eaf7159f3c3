// ==========================================
// 贝类加工追溯系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/引擎错误为用户可读的错误消息
// 分类: 所有错误最终归入 校验 / 未找到 / 持久化 三类
// ==========================================

use crate::engine::error::RuleViolation;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 校验错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据错误
    // ==========================================
    /// 已存储数据自相矛盾（如批次总重为 0）
    #[error("数据不一致: {0}")]
    DataIntegrity(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 错误大类（展示层据此选择提示方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Validation,  // 输入或状态不满足规则
    NotFound,    // 引用的记录不存在
    Persistence, // 读写失败
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::ValidationError(_)
            | ApiError::InvalidInput(_)
            | ApiError::InvalidStateTransition { .. }
            | ApiError::BusinessRuleViolation(_)
            | ApiError::DataIntegrity(_) => ErrorCategory::Validation,
            ApiError::NotFound(_) => ErrorCategory::NotFound,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => ErrorCategory::Persistence,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DataIntegrity(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::SerializationError(msg) => ApiError::DataIntegrity(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 RuleViolation 转换
// ==========================================
impl From<RuleViolation> for ApiError {
    fn from(err: RuleViolation) -> Self {
        match err {
            RuleViolation::MissingField { .. } | RuleViolation::InvalidValue { .. } => {
                ApiError::ValidationError(err.to_string())
            }
            RuleViolation::InvalidTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RuleViolation::DepurationIncomplete { .. } => {
                ApiError::BusinessRuleViolation(err.to_string())
            }
            RuleViolation::DataIntegrity(msg) => ApiError::DataIntegrity(msg),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
