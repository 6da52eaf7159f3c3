// ==========================================
// 贝类加工追溯系统 - 引擎层
// ==========================================
// 职责: 批次生命周期规则（原料 -> 批次 -> 净化 -> 加工 -> 包装质检）
// 红线: Engine 不拼 SQL, 不读时钟（时间由调用方传入）
// ==========================================

pub mod depuration;
pub mod error;
pub mod identifiers;
pub mod lot_assembly;
pub mod packaging_qc;
pub mod processing;

// 重导出核心引擎
pub use depuration::{elapsed_between, readings_from, DepurationEngine, ElapsedTime};
pub use error::{RuleResult, RuleViolation};
pub use identifiers::{disambiguate_lot_number, generate_box_number, generate_lot_number};
pub use lot_assembly::LotAssemblyEngine;
pub use packaging_qc::{PackagingQcEngine, QcChecklistEntry};
pub use processing::{
    yield_percentage, BoxDraft, ProcessingEngine, ProcessingSummary,
    DEFAULT_MASS_BALANCE_TOLERANCE_KG,
};
