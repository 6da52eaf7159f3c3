// ==========================================
// 贝类加工追溯系统 - 核心库
// ==========================================
// 链路: 原料收货 -> 组批 -> 净化 -> 加工装箱 -> 包装质检
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问与实时订阅
pub mod repository;

// 引擎层 - 生命周期规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, DepurationStatus, LotStatus, ProductType, RawMaterialStatus};

// 领域实体
pub use domain::{
    DepurationData, Lot, PackagingQc, PackedBox, ProcessingBatch, ProductGrade, QcCriterion,
    RawMaterial, Supplier, WaterReadings,
};

// 引擎
pub use engine::{DepurationEngine, LotAssemblyEngine, PackagingQcEngine, ProcessingEngine};

// API
pub use api::{
    ApiError, ApiResult, DepurationApi, LotApi, Notice, NoticeLevel, ProcessingApi, QualityApi,
};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "贝类加工追溯系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
