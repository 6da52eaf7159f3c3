// ==========================================
// 贝类加工追溯系统 - 领域模型层
// ==========================================
// 职责: 定义追溯链路实体与状态类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod grade;
pub mod lot;
pub mod processing;
pub mod raw_material;
pub mod supplier;
pub mod types;

// 重导出核心类型
pub use grade::{NewProductGrade, ProductGrade};
pub use lot::{DepurationData, Lot, NewLot, WaterReadings};
pub use processing::{
    NewProcessingBatch, PackagingQc, PackedBox, ProcessingBatch, QcCheckResult, QcCriterion,
};
pub use raw_material::{NewRawMaterial, RawMaterial};
pub use supplier::{NewSupplier, Supplier};
pub use types::{BatchStatus, DepurationStatus, LotStatus, ProductType, RawMaterialStatus};
