// ==========================================
// 贝类加工追溯系统 - 加工批与包装质检领域模型
// ==========================================
// 红线: 每个批次号最多一个加工批
// 红线: 包装质检记录挂在已有加工批上，不单独建实体
// ==========================================

use crate::domain::types::{BatchStatus, ProductType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ProcessingBatch - 加工批
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingBatch {
    pub id: String,
    pub lot_number: String,
    pub shell_on_weight: f64, // 带壳箱合计（kg）
    pub meat_weight: f64,     // 肉箱合计（kg）
    pub shell_weight: f64,    // 壳/废料过磅（kg）
    pub boxes: Vec<PackedBox>,
    pub yield_percentage: f64,
    pub status: BatchStatus,
    pub packaging_qc: Option<PackagingQc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingBatch {
    pub fn has_box(&self, box_number: &str) -> bool {
        self.boxes.iter().any(|b| b.box_number == box_number)
    }
}

/// 新建加工批（加工引擎产出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProcessingBatch {
    pub lot_number: String,
    pub shell_on_weight: f64,
    pub meat_weight: f64,
    pub shell_weight: f64,
    pub boxes: Vec<PackedBox>,
    pub yield_percentage: f64,
    pub status: BatchStatus,
}

/// 已装箱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedBox {
    #[serde(rename = "type")]
    pub box_type: ProductType,
    pub weight: f64,
    pub box_number: String,
    pub grade: String, // ProductGrade.code
}

// ==========================================
// 包装质检
// ==========================================

/// 固定的六项检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QcCriterion {
    PackageIntegrity,   // 包装完整性
    LabelAccuracy,      // 标签准确性
    WeightVerification, // 重量复核
    ProductTemperature, // 产品温度
    QrReadability,      // 二维码可读性
    GradeVerification,  // 等级复核
}

impl QcCriterion {
    pub const ALL: [QcCriterion; 6] = [
        QcCriterion::PackageIntegrity,
        QcCriterion::LabelAccuracy,
        QcCriterion::WeightVerification,
        QcCriterion::ProductTemperature,
        QcCriterion::QrReadability,
        QcCriterion::GradeVerification,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QcCriterion::PackageIntegrity => "Package Integrity",
            QcCriterion::LabelAccuracy => "Label Accuracy",
            QcCriterion::WeightVerification => "Weight Verification",
            QcCriterion::ProductTemperature => "Product Temperature",
            QcCriterion::QrReadability => "QR Code Readability",
            QcCriterion::GradeVerification => "Product Grade Verification",
        }
    }
}

impl fmt::Display for QcCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 已判定的检查项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcCheckResult {
    pub criterion: QcCriterion,
    pub passed: bool,
    pub notes: String,
}

/// 包装质检记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingQc {
    pub checklist: Vec<QcCheckResult>,
    pub inspected_boxes: Vec<String>,
    pub passed: bool, // 所有检查项均通过
    pub completed_at: DateTime<Utc>,
}
