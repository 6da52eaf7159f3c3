// ==========================================
// 贝类加工追溯系统 - 包装质检引擎
// ==========================================
// 职责: 六项检查表完整性校验 + 抽检箱校验 + 合格判定
// 红线: 任一检查项未判定即拒绝；至少抽检一箱
// 说明: 存在不合格项时仅提示补充说明，不阻断提交
// ==========================================

use crate::domain::processing::{PackagingQc, ProcessingBatch, QcCheckResult, QcCriterion};
use crate::engine::error::{RuleResult, RuleViolation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 检查表输入项（passed=None 表示未判定）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcChecklistEntry {
    pub criterion: QcCriterion,
    pub passed: Option<bool>,
    #[serde(default)]
    pub notes: String,
}

impl QcChecklistEntry {
    pub fn new(criterion: QcCriterion, passed: Option<bool>, notes: &str) -> Self {
        Self {
            criterion,
            passed,
            notes: notes.to_string(),
        }
    }
}

// ==========================================
// PackagingQcEngine - 包装质检引擎
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct PackagingQcEngine;

impl PackagingQcEngine {
    pub fn new() -> Self {
        Self
    }

    /// 空白检查表（六项均未判定）
    pub fn blank_checklist() -> Vec<QcChecklistEntry> {
        QcCriterion::ALL
            .iter()
            .map(|c| QcChecklistEntry::new(*c, None, ""))
            .collect()
    }

    /// 校验检查表: 六项齐全、无重复、均已判定
    ///
    /// 输出按固定顺序排列
    pub fn validate_checklist(&self, entries: &[QcChecklistEntry]) -> RuleResult<Vec<QcCheckResult>> {
        let mut by_criterion: HashMap<QcCriterion, &QcChecklistEntry> = HashMap::new();
        for entry in entries {
            if by_criterion.insert(entry.criterion, entry).is_some() {
                return Err(RuleViolation::invalid(
                    "checklist",
                    format!("检查项重复: {}", entry.criterion),
                ));
            }
        }

        QcCriterion::ALL
            .iter()
            .map(|criterion| {
                let entry = by_criterion
                    .get(criterion)
                    .ok_or_else(|| RuleViolation::missing(&format!("checklist[{}]", criterion)))?;
                let passed = entry
                    .passed
                    .ok_or_else(|| RuleViolation::missing(&format!("checklist[{}]", criterion)))?;
                Ok(QcCheckResult {
                    criterion: *criterion,
                    passed,
                    notes: entry.notes.trim().to_string(),
                })
            })
            .collect()
    }

    /// 校验抽检箱号: 至少一箱，且都属于该加工批；去重保序
    pub fn validate_inspected_boxes(
        &self,
        batch: &ProcessingBatch,
        selected: &[String],
    ) -> RuleResult<Vec<String>> {
        let mut seen = HashSet::new();
        let boxes: Vec<String> = selected
            .iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .filter(|b| seen.insert(b.clone()))
            .collect();

        if boxes.is_empty() {
            return Err(RuleViolation::invalid("inspectedBoxes", "至少选择一箱进行质检"));
        }

        if let Some(unknown) = boxes.iter().find(|b| !batch.has_box(b)) {
            return Err(RuleViolation::invalid(
                "inspectedBoxes",
                format!("箱号 {} 不属于批次 {}", unknown, batch.lot_number),
            ));
        }

        Ok(boxes)
    }

    /// 评定包装质检
    ///
    /// # 返回
    /// - Ok(PackagingQc): passed = 所有检查项合格
    /// - Err: 检查表不完整或抽检箱无效
    pub fn evaluate(
        &self,
        batch: &ProcessingBatch,
        entries: &[QcChecklistEntry],
        selected_boxes: &[String],
        now: DateTime<Utc>,
    ) -> RuleResult<PackagingQc> {
        let checklist = self.validate_checklist(entries)?;
        let inspected_boxes = self.validate_inspected_boxes(batch, selected_boxes)?;
        let passed = checklist.iter().all(|c| c.passed);

        Ok(PackagingQc {
            checklist,
            inspected_boxes,
            passed,
            completed_at: now,
        })
    }

    /// 不合格项（用于提示补充说明）
    pub fn failed_items(qc: &PackagingQc) -> Vec<QcCriterion> {
        qc.checklist
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.criterion)
            .collect()
    }
}
