// ==========================================
// 贝类加工追溯系统 - 产品等级 API
// ==========================================
// 职责: 等级参考数据查询、维护与默认数据初始化
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::error::ApiResult;
use crate::domain::grade::{NewProductGrade, ProductGrade};
use crate::domain::types::ProductType;
use crate::engine::error::require_text;
use crate::repository::product_grade_repo::ProductGradeRepository;
use crate::repository::query::{ListOrder, ProductGradeFilter};

/// 默认等级: (产品类型, 代码, 名称, 描述)
pub const DEFAULT_GRADES: [(ProductType, &str, &str, &str); 5] = [
    (ProductType::ShellOn, "A", "Premium", "Large, uniform, fully closed shells"),
    (ProductType::ShellOn, "B", "Standard", "Medium size, minor shell blemishes"),
    (ProductType::ShellOn, "C", "Commercial", "Mixed size, for food service"),
    (ProductType::Meat, "A", "Premium Meat", "Whole meats, no shell fragments"),
    (ProductType::Meat, "B", "Standard Meat", "Pieces allowed"),
];

pub struct GradeApi {
    grade_repo: Arc<ProductGradeRepository>,
}

impl GradeApi {
    pub fn new(grade_repo: Arc<ProductGradeRepository>) -> Self {
        Self { grade_repo }
    }

    /// 等级列表（按创建顺序）；product_type 为 None 时返回全部
    pub fn list_grades(&self, product_type: Option<ProductType>) -> ApiResult<Vec<ProductGrade>> {
        Ok(self
            .grade_repo
            .list(&ProductGradeFilter { product_type }, ListOrder::OldestFirst)?)
    }

    /// 新增等级（代码、名称必填；同类型下代码重复由唯一约束拒绝）
    pub fn create_grade(&self, new_grade: &NewProductGrade) -> ApiResult<ProductGrade> {
        let normalized = NewProductGrade {
            code: require_text("code", &new_grade.code)?,
            name: require_text("name", &new_grade.name)?,
            description: new_grade
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            product_type: new_grade.product_type,
        };
        let grade = self.grade_repo.insert(&normalized)?;
        info!(product_type = %grade.product_type, code = %grade.code, "等级已新增");
        Ok(grade)
    }

    /// 写入默认等级（按代码幂等）
    ///
    /// # 返回
    /// - Ok(usize): 本次新增的等级数
    pub fn ensure_default_grades(&self) -> ApiResult<usize> {
        let mut inserted = 0;
        for (product_type, code, name, description) in DEFAULT_GRADES {
            let created = self.grade_repo.upsert(&NewProductGrade {
                code: code.to_string(),
                name: name.to_string(),
                description: Some(description.to_string()),
                product_type,
            })?;
            if created {
                inserted += 1;
            }
        }
        info!(inserted, total = DEFAULT_GRADES.len(), "默认等级已就绪");
        Ok(inserted)
    }
}
