// ==========================================
// 贝类加工追溯系统 - 供应商领域模型
// ==========================================
// 用途: 原料入库时引用；创建后在本系统内只读
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 供应商
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub license_number: String, // 捕捞/养殖许可证号
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建供应商（id 与时间戳由仓储分配）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    pub name: String,
    pub contact: String,
    pub license_number: String,
}
