// ==========================================
// 贝类加工追溯系统 - 产品等级参考数据
// ==========================================
// 只读查找表，按产品类型过滤后供装箱选择
// ==========================================

use crate::domain::types::ProductType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductGrade {
    pub id: String,
    pub code: String, // 等级代码（箱子上引用的值）
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductGrade {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
}
