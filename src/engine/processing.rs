// ==========================================
// 贝类加工追溯系统 - 加工引擎
// ==========================================
// 职责: 装箱校验、重量汇总、得率与物料平衡计算
// 输入: 批次 + 装箱草稿 + 等级参考数据 + 壳重
// 输出: NewProcessingBatch + ProcessingSummary
// 红线: 净化未完成一律拒绝；总重为 0 时报数据错误，不产生 inf/NaN
// ==========================================

use crate::domain::grade::ProductGrade;
use crate::domain::lot::Lot;
use crate::domain::processing::{NewProcessingBatch, PackedBox};
use crate::domain::types::{BatchStatus, ProductType};
use crate::engine::depuration::DepurationEngine;
use crate::engine::error::{require_positive, RuleResult, RuleViolation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

/// 物料平衡默认容差（kg）
pub const DEFAULT_MASS_BALANCE_TOLERANCE_KG: f64 = 0.1;

// ==========================================
// BoxDraft - 装箱草稿（表单输入）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxDraft {
    #[serde(rename = "type")]
    pub box_type: ProductType,
    pub box_number: String,
    pub weight: Option<f64>, // 未填为 None
    pub grade: String,       // 未选为空串
}

// ==========================================
// ProcessingSummary - 加工汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummary {
    pub shell_on_total: f64,
    pub meat_total: f64,
    pub shell_weight: f64,
    pub total_input: f64,  // 批次原料总重
    pub total_output: f64, // 带壳 + 肉 + 壳
    pub yield_percentage: f64,
    pub mass_balance_warning: bool, // |产出 - 投入| 超过容差（仅提示）
}

/// 得率 = 100 × 成品 / 投入；投入非正数时报数据错误
pub fn yield_percentage(product_output: f64, total_input: f64) -> RuleResult<f64> {
    if !total_input.is_finite() || total_input <= 0.0 {
        return Err(RuleViolation::DataIntegrity(format!(
            "批次总重无效({})，无法计算得率",
            total_input
        )));
    }
    Ok(100.0 * product_output / total_input)
}

// ==========================================
// ProcessingEngine - 加工引擎
// ==========================================
#[derive(Debug, Clone)]
pub struct ProcessingEngine {
    tolerance_kg: f64,
}

impl Default for ProcessingEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MASS_BALANCE_TOLERANCE_KG)
    }
}

impl ProcessingEngine {
    /// # 参数
    /// - tolerance_kg: 物料平衡容差
    pub fn new(tolerance_kg: f64) -> Self {
        Self { tolerance_kg }
    }

    pub fn tolerance_kg(&self) -> f64 {
        self.tolerance_kg
    }

    /// 按类型合计箱重
    pub fn total_for(boxes: &[PackedBox], box_type: ProductType) -> f64 {
        boxes
            .iter()
            .filter(|b| b.box_type == box_type)
            .map(|b| b.weight)
            .sum()
    }

    /// 校验装箱草稿并转换为已装箱
    ///
    /// 规则（顺序执行，命中即返回）:
    /// 1) 至少一箱
    /// 2) 每箱重量 > 0 且已选等级
    /// 3) 等级代码须属于该箱类型的参考等级
    /// 4) 箱号批内唯一
    #[instrument(skip(self, drafts, grades), fields(boxes = drafts.len()))]
    pub fn validate_boxes(
        &self,
        drafts: &[BoxDraft],
        grades: &[ProductGrade],
    ) -> RuleResult<Vec<PackedBox>> {
        if drafts.is_empty() {
            return Err(RuleViolation::invalid("boxes", "至少添加一箱"));
        }

        let mut packed = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let weight = require_positive(&format!("boxes[{}].weight", draft.box_number), draft.weight)?;
            let grade = draft.grade.trim();
            if grade.is_empty() {
                return Err(RuleViolation::missing(&format!("boxes[{}].grade", draft.box_number)));
            }
            packed.push(PackedBox {
                box_type: draft.box_type,
                weight,
                box_number: draft.box_number.trim().to_string(),
                grade: grade.to_string(),
            });
        }

        for b in &packed {
            let known = grades
                .iter()
                .any(|g| g.product_type == b.box_type && g.code == b.grade);
            if !known {
                return Err(RuleViolation::invalid(
                    &format!("boxes[{}].grade", b.box_number),
                    format!("等级 {} 不适用于 {} 箱", b.grade, b.box_type),
                ));
            }
        }

        let mut seen = HashSet::new();
        for b in &packed {
            if b.box_number.is_empty() {
                return Err(RuleViolation::missing("boxNumber"));
            }
            if !seen.insert(b.box_number.as_str()) {
                return Err(RuleViolation::invalid(
                    "boxNumber",
                    format!("箱号 {} 在本批内重复", b.box_number),
                ));
            }
        }

        Ok(packed)
    }

    /// 汇总（得率 + 物料平衡提示）
    pub fn summarize(
        &self,
        boxes: &[PackedBox],
        shell_weight: f64,
        total_input: f64,
    ) -> RuleResult<ProcessingSummary> {
        let shell_on_total = Self::total_for(boxes, ProductType::ShellOn);
        let meat_total = Self::total_for(boxes, ProductType::Meat);
        let yield_pct = yield_percentage(shell_on_total + meat_total, total_input)?;
        let total_output = shell_on_total + meat_total + shell_weight;

        Ok(ProcessingSummary {
            shell_on_total,
            meat_total,
            shell_weight,
            total_input,
            total_output,
            yield_percentage: yield_pct,
            mass_balance_warning: (total_output - total_input).abs() > self.tolerance_kg,
        })
    }

    /// 表单实时汇总: 未填重量/壳重按 0 计，不做必填校验
    pub fn preview(
        &self,
        drafts: &[BoxDraft],
        shell_weight: Option<f64>,
        total_input: f64,
    ) -> RuleResult<ProcessingSummary> {
        let boxes: Vec<PackedBox> = drafts
            .iter()
            .map(|d| PackedBox {
                box_type: d.box_type,
                weight: d.weight.filter(|w| w.is_finite()).unwrap_or(0.0),
                box_number: d.box_number.clone(),
                grade: d.grade.clone(),
            })
            .collect();
        let shell = shell_weight.filter(|w| w.is_finite()).unwrap_or(0.0);
        self.summarize(&boxes, shell, total_input)
    }

    /// 组装加工批（闸门 + 全部校验 + 汇总）
    ///
    /// # 返回
    /// - Ok((NewProcessingBatch, ProcessingSummary)): status=completed 的加工批
    /// - Err(RuleViolation): 任一校验失败，不产生部分结果
    pub fn build_batch(
        &self,
        lot: &Lot,
        drafts: &[BoxDraft],
        grades: &[ProductGrade],
        shell_weight: Option<f64>,
    ) -> RuleResult<(NewProcessingBatch, ProcessingSummary)> {
        DepurationEngine::ensure_processing_unlocked(lot)?;

        let boxes = self.validate_boxes(drafts, grades)?;
        let shell_weight = require_positive("shellWeight", shell_weight)?;
        let summary = self.summarize(&boxes, shell_weight, lot.total_weight)?;

        let batch = NewProcessingBatch {
            lot_number: lot.lot_number.clone(),
            shell_on_weight: summary.shell_on_total,
            meat_weight: summary.meat_total,
            shell_weight,
            boxes,
            yield_percentage: summary.yield_percentage,
            status: BatchStatus::Completed,
        };

        Ok((batch, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lot::{DepurationData, WaterReadings};
    use crate::domain::types::{DepurationStatus, LotStatus};
    use chrono::Utc;

    fn grade(code: &str, product_type: ProductType) -> ProductGrade {
        ProductGrade {
            id: format!("g-{}", code),
            code: code.to_string(),
            name: format!("Grade {}", code),
            description: None,
            product_type,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn grades() -> Vec<ProductGrade> {
        vec![
            grade("A", ProductType::ShellOn),
            grade("B", ProductType::ShellOn),
            grade("MA", ProductType::Meat),
        ]
    }

    fn draft(box_type: ProductType, number: &str, weight: Option<f64>, grade: &str) -> BoxDraft {
        BoxDraft {
            box_type,
            box_number: number.to_string(),
            weight,
            grade: grade.to_string(),
        }
    }

    fn lot(total_weight: f64, depuration: Option<DepurationStatus>) -> Lot {
        let readings = WaterReadings {
            temperature_c: 12.0,
            salinity_ppt: 32.0,
        };
        Lot {
            id: "lot-1".to_string(),
            lot_number: "L2405171230".to_string(),
            total_weight,
            status: LotStatus::Pending,
            notes: None,
            depuration_data: depuration.map(|status| DepurationData {
                status,
                tank_number: "T-01".to_string(),
                start_time: Utc::now(),
                start_readings: readings,
                completed_at: None,
                end_readings: None,
            }),
            receipt_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_yield_and_mass_balance_example() {
        let engine = ProcessingEngine::default();
        let drafts = vec![
            draft(ProductType::ShellOn, "SO000001", Some(5.0), "A"),
            draft(ProductType::Meat, "CM000002", Some(3.0), "MA"),
        ];

        let (batch, summary) = engine
            .build_batch(&lot(10.0, Some(DepurationStatus::Completed)), &drafts, &grades(), Some(1.0))
            .unwrap();

        assert_eq!(summary.yield_percentage, 80.0);
        assert_eq!(summary.total_output, 9.0);
        assert!(summary.mass_balance_warning);
        assert_eq!(batch.shell_on_weight, 5.0);
        assert_eq!(batch.meat_weight, 3.0);
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(batch.boxes.len(), 2);
    }

    #[test]
    fn test_balanced_output_has_no_warning() {
        let engine = ProcessingEngine::default();
        let boxes = vec![PackedBox {
            box_type: ProductType::ShellOn,
            weight: 7.95,
            box_number: "SO1".to_string(),
            grade: "A".to_string(),
        }];
        let summary = engine.summarize(&boxes, 2.0, 10.0).unwrap();
        assert!(!summary.mass_balance_warning);
    }

    #[test]
    fn test_rejected_when_depuration_not_completed() {
        let engine = ProcessingEngine::default();
        let drafts = vec![draft(ProductType::ShellOn, "SO000001", Some(5.0), "A")];

        for status in [None, Some(DepurationStatus::Pending), Some(DepurationStatus::InProgress)] {
            let result = engine.build_batch(&lot(10.0, status), &drafts, &grades(), Some(1.0));
            assert!(
                matches!(result, Err(RuleViolation::DepurationIncomplete { .. })),
                "status {:?} should be gated",
                status
            );
        }

        // 即使没有任何箱子，也先报闸门
        let result = engine.build_batch(&lot(10.0, None), &[], &grades(), None);
        assert!(matches!(result, Err(RuleViolation::DepurationIncomplete { .. })));
    }

    #[test]
    fn test_rejects_empty_boxes_and_missing_fields() {
        let engine = ProcessingEngine::default();
        let lot = lot(10.0, Some(DepurationStatus::Completed));

        assert!(engine.build_batch(&lot, &[], &grades(), Some(1.0)).is_err());

        let no_weight = vec![draft(ProductType::ShellOn, "SO1", None, "A")];
        assert!(matches!(
            engine.build_batch(&lot, &no_weight, &grades(), Some(1.0)),
            Err(RuleViolation::MissingField { .. })
        ));

        let no_grade = vec![draft(ProductType::ShellOn, "SO1", Some(2.0), "")];
        assert!(matches!(
            engine.build_batch(&lot, &no_grade, &grades(), Some(1.0)),
            Err(RuleViolation::MissingField { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_or_zero_shell_weight() {
        let engine = ProcessingEngine::default();
        let lot = lot(10.0, Some(DepurationStatus::Completed));
        let drafts = vec![draft(ProductType::ShellOn, "SO1", Some(5.0), "A")];

        assert_eq!(
            engine.build_batch(&lot, &drafts, &grades(), None).unwrap_err(),
            RuleViolation::missing("shellWeight")
        );
        assert!(engine.build_batch(&lot, &drafts, &grades(), Some(0.0)).is_err());
    }

    #[test]
    fn test_grade_must_match_box_type() {
        let engine = ProcessingEngine::default();
        let drafts = vec![draft(ProductType::Meat, "CM1", Some(3.0), "A")];
        let result = engine.validate_boxes(&drafts, &grades());
        assert!(matches!(result, Err(RuleViolation::InvalidValue { .. })));
    }

    #[test]
    fn test_duplicate_box_numbers_rejected() {
        let engine = ProcessingEngine::default();
        let drafts = vec![
            draft(ProductType::ShellOn, "SO1", Some(3.0), "A"),
            draft(ProductType::ShellOn, "SO1", Some(4.0), "B"),
        ];
        assert!(engine.validate_boxes(&drafts, &grades()).is_err());
    }

    #[test]
    fn test_zero_total_weight_is_data_error() {
        let engine = ProcessingEngine::default();
        let drafts = vec![draft(ProductType::ShellOn, "SO1", Some(5.0), "A")];
        let result = engine.build_batch(
            &lot(0.0, Some(DepurationStatus::Completed)),
            &drafts,
            &grades(),
            Some(1.0),
        );
        assert!(matches!(result, Err(RuleViolation::DataIntegrity(_))));
    }

    #[test]
    fn test_preview_treats_blank_as_zero() {
        let engine = ProcessingEngine::new(0.5);
        let drafts = vec![
            draft(ProductType::ShellOn, "SO1", Some(4.0), ""),
            draft(ProductType::Meat, "CM1", None, ""),
        ];
        let summary = engine.preview(&drafts, None, 8.0).unwrap();
        assert_eq!(summary.shell_on_total, 4.0);
        assert_eq!(summary.meat_total, 0.0);
        assert_eq!(summary.yield_percentage, 50.0);
        assert!(summary.mass_balance_warning);
    }
}
