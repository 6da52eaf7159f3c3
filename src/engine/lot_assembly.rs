// ==========================================
// 贝类加工追溯系统 - 组批引擎
// ==========================================
// 职责: 由若干待组批原料组成新批次（只算不写）
// 输入: 选中的原料记录 + 备注 + 批次号
// 输出: NewLot（总重 = 各原料重量之和）
// 红线: 空选择拒绝；只接受 pending 原料
// ==========================================

use crate::domain::lot::NewLot;
use crate::domain::raw_material::RawMaterial;
use crate::engine::error::{RuleResult, RuleViolation};
use std::collections::HashSet;
use tracing::instrument;

// ==========================================
// LotAssemblyEngine - 组批引擎
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct LotAssemblyEngine;

impl LotAssemblyEngine {
    pub fn new() -> Self {
        Self
    }

    /// 去重并保持原始顺序
    pub fn normalize_selection(receipt_ids: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        receipt_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(id.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// 合计重量（非有限值按 0 计）
    pub fn total_weight(materials: &[RawMaterial]) -> f64 {
        materials
            .iter()
            .map(|m| if m.weight.is_finite() { m.weight } else { 0.0 })
            .sum()
    }

    /// 备注清洗: 去空白，空串视为无备注
    pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
        notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    /// 校验选择非空
    pub fn ensure_selection(receipt_ids: &[String]) -> RuleResult<()> {
        if receipt_ids.is_empty() {
            return Err(RuleViolation::invalid("receiptIds", "至少选择一条原料记录"));
        }
        Ok(())
    }

    /// 组装新批次
    ///
    /// # 参数
    /// - selected: 已按 id 加载的原料记录（调用方保证已去重）
    /// - notes: 可选备注
    /// - lot_number: 预生成的批次号
    ///
    /// # 返回
    /// - Ok(NewLot): 待写入的新批次
    /// - Err(RuleViolation): 选择为空或含非 pending 原料
    #[instrument(skip(self, selected, notes), fields(count = selected.len()))]
    pub fn assemble(
        &self,
        selected: &[RawMaterial],
        notes: Option<&str>,
        lot_number: String,
    ) -> RuleResult<NewLot> {
        if selected.is_empty() {
            return Err(RuleViolation::invalid("receiptIds", "至少选择一条原料记录"));
        }

        if let Some(assigned) = selected.iter().find(|m| !m.is_pending()) {
            return Err(RuleViolation::invalid(
                "receiptIds",
                format!(
                    "原料 {} 已组入批次 {}",
                    assigned.id,
                    assigned.lot_number.as_deref().unwrap_or("-")
                ),
            ));
        }

        Ok(NewLot {
            lot_number,
            total_weight: Self::total_weight(selected),
            notes: Self::normalize_notes(notes),
            receipt_ids: selected.iter().map(|m| m.id.clone()).collect(),
        })
    }
}
