// ==========================================
// 贝类加工追溯系统 - 原料入库领域模型
// ==========================================
// 红线: 原料只在组批时变更一次（pending -> assigned）
// 用途: 组批的输入；组批后作为批次总重的不可变来源
// ==========================================

use crate::domain::types::RawMaterialStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 原料入库记录（收货单）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterial {
    pub id: String,
    pub supplier_id: String,
    pub weight: f64,                // 过磅重量（kg）
    pub date: NaiveDate,            // 收货日期
    pub status: RawMaterialStatus,
    pub lot_number: Option<String>, // 组批后回写
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawMaterial {
    pub fn is_pending(&self) -> bool {
        self.status == RawMaterialStatus::Pending
    }
}

/// 新建入库记录，状态固定为 pending
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRawMaterial {
    pub supplier_id: String,
    pub weight: f64,
    pub date: NaiveDate,
}
