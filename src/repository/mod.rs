// ==========================================
// 贝类加工追溯系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供各集合的数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 写入提交后再发布变更，发布时不持有连接锁
// ==========================================

pub mod error;
pub mod lot_repo;
pub mod processing_batch_repo;
pub mod product_grade_repo;
pub mod query;
pub mod raw_material_repo;
pub mod subscription;
pub mod supplier_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use lot_repo::{LotPatch, LotRepository};
pub use processing_batch_repo::ProcessingBatchRepository;
pub use product_grade_repo::ProductGradeRepository;
pub use query::{ListOrder, LotFilter, ProcessingBatchFilter, ProductGradeFilter, RawMaterialFilter};
pub use raw_material_repo::{RawMaterialPatch, RawMaterialRepository};
pub use subscription::{ChangeHub, Collection, Subscription};
pub use supplier_repo::SupplierRepository;
