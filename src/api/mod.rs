// ==========================================
// 贝类加工追溯系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供展示层调用
// 约束: 校验 + 编排；规则在 engine，数据访问在 repository
// ==========================================

pub mod depuration_api;
pub mod error;
pub mod grade_api;
pub mod lot_api;
pub mod notice;
pub mod processing_api;
pub mod quality_api;
pub mod raw_material_api;
pub mod supplier_api;

// 重导出核心类型
pub use depuration_api::{
    CompleteDepurationRequest, DepurationApi, DepurationOutcome, DepurationView,
    StartDepurationRequest,
};
pub use error::{ApiError, ApiResult, ErrorCategory};
pub use grade_api::{GradeApi, DEFAULT_GRADES};
pub use lot_api::{CreateLotRequest, LotApi, LotOutcome};
pub use notice::{Notice, NoticeLevel};
pub use processing_api::{ProcessingApi, ProcessingOutcome, SubmitProcessingRequest};
pub use quality_api::{PackagingQcRequest, QcOutcome, QualityApi};
pub use raw_material_api::{IntakeOutcome, RawMaterialApi, RecordIntakeRequest};
pub use supplier_api::{SupplierApi, SupplierOutcome};
