// ==========================================
// 贝类加工追溯系统 - 批次领域模型
// ==========================================
// 红线: total_weight 在组批时一次性计算，之后不重算
// 红线: depuration_data 在净化开始前不存在
// ==========================================

use crate::domain::types::{DepurationStatus, LotStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Lot - 生产批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: String,
    pub lot_number: String,  // 批次号（唯一）
    pub total_weight: f64,   // 原料总重（kg）
    pub status: LotStatus,
    pub notes: Option<String>,
    pub depuration_data: Option<DepurationData>,
    pub receipt_ids: Vec<String>, // 组成本批次的原料记录 id
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// 当前净化状态（None 表示尚未开始）
    pub fn depuration_status(&self) -> Option<DepurationStatus> {
        self.depuration_data.as_ref().map(|d| d.status)
    }
}

/// 新建批次（组批引擎产出，仓储写入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLot {
    pub lot_number: String,
    pub total_weight: f64,
    pub notes: Option<String>,
    pub receipt_ids: Vec<String>,
}

// ==========================================
// DepurationData - 净化记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepurationData {
    pub status: DepurationStatus,
    pub tank_number: String,
    pub start_time: DateTime<Utc>,
    pub start_readings: WaterReadings,
    pub completed_at: Option<DateTime<Utc>>,
    pub end_readings: Option<WaterReadings>,
}

/// 水质读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterReadings {
    pub temperature_c: f64, // 水温（°C）
    pub salinity_ppt: f64,  // 盐度（ppt）
}
