// ==========================================
// 贝类加工追溯系统 - 加工 API
// ==========================================
// 职责: 装箱草稿、实时汇总、加工批提交
// 红线: 净化未完成不得加工；每个批次只有一个加工批
// 说明: 质量平衡偏差只提示，不阻断提交
// ==========================================

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::notice::Notice;
use crate::config::config_manager::ConfigManager;
use crate::domain::lot::Lot;
use crate::domain::processing::ProcessingBatch;
use crate::domain::types::ProductType;
use crate::engine::depuration::DepurationEngine;
use crate::engine::identifiers::generate_box_number;
use crate::engine::processing::{BoxDraft, ProcessingEngine, ProcessingSummary};
use crate::i18n::{format_number, t_with_args};
use crate::repository::lot_repo::LotRepository;
use crate::repository::processing_batch_repo::ProcessingBatchRepository;
use crate::repository::product_grade_repo::ProductGradeRepository;
use crate::repository::query::{ListOrder, ProcessingBatchFilter, ProductGradeFilter};
use crate::repository::subscription::Subscription;

/// 加工提交请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProcessingRequest {
    pub lot_number: String,
    pub boxes: Vec<BoxDraft>,
    pub shell_weight: Option<f64>, // kg
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub batch: ProcessingBatch,
    pub summary: ProcessingSummary,
    pub notices: Vec<Notice>,
}

// ==========================================
// ProcessingApi - 加工 API
// ==========================================
pub struct ProcessingApi {
    lot_repo: Arc<LotRepository>,
    batch_repo: Arc<ProcessingBatchRepository>,
    grade_repo: Arc<ProductGradeRepository>,
    config_manager: Arc<ConfigManager>,
}

impl ProcessingApi {
    pub fn new(
        lot_repo: Arc<LotRepository>,
        batch_repo: Arc<ProcessingBatchRepository>,
        grade_repo: Arc<ProductGradeRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            lot_repo,
            batch_repo,
            grade_repo,
            config_manager,
        }
    }

    fn engine(&self) -> ApiResult<ProcessingEngine> {
        Ok(ProcessingEngine::new(
            self.config_manager.get_mass_balance_tolerance_kg()?,
        ))
    }

    fn load_lot(&self, lot_number: &str) -> ApiResult<Lot> {
        self.lot_repo
            .find_by_lot_number(lot_number.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("批次{}不存在", lot_number.trim())))
    }

    /// 新建装箱草稿（分配箱号）
    ///
    /// # 参数
    /// - box_type: 带壳/肉
    /// - existing: 表单中已有的草稿（同一毫秒内生成的箱号顺延，保证批内唯一）
    pub fn new_box_draft(&self, box_type: ProductType, existing: &[BoxDraft]) -> BoxDraft {
        let mut at = Utc::now();
        let mut box_number = generate_box_number(box_type, at);
        while existing.iter().any(|d| d.box_number == box_number) {
            at += Duration::milliseconds(1);
            box_number = generate_box_number(box_type, at);
        }
        BoxDraft {
            box_type,
            box_number,
            weight: None,
            grade: String::new(),
        }
    }

    /// 表单实时汇总（不写入）
    pub fn preview_summary(
        &self,
        lot_number: &str,
        boxes: &[BoxDraft],
        shell_weight: Option<f64>,
    ) -> ApiResult<ProcessingSummary> {
        let lot = self.load_lot(lot_number)?;
        Ok(self.engine()?.preview(boxes, shell_weight, lot.total_weight)?)
    }

    /// 提交加工批
    ///
    /// 校验顺序: 批次存在 -> 净化完成 -> 尚无加工批 -> 箱/等级/箱号 -> 壳重 -> 批次总重
    ///
    /// # 返回
    /// - Ok(ProcessingOutcome): 已提交的加工批、汇总与提示（质量平衡偏差为 Warning）
    /// - Err: 任一校验失败，不写入任何数据
    pub fn submit(&self, request: &SubmitProcessingRequest) -> ApiResult<ProcessingOutcome> {
        self.try_submit(request).inspect_err(|e| {
            warn!(
                lot_number = %request.lot_number,
                boxes = request.boxes.len(),
                error = %e,
                "加工提交被拒绝"
            );
        })
    }

    fn try_submit(&self, request: &SubmitProcessingRequest) -> ApiResult<ProcessingOutcome> {
        let lot = self.load_lot(&request.lot_number)?;
        DepurationEngine::ensure_processing_unlocked(&lot)?;

        if self.batch_repo.find_by_lot_number(&lot.lot_number)?.is_some() {
            return Err(ApiError::ValidationError(format!(
                "批次{}已有加工记录",
                lot.lot_number
            )));
        }

        let grades = self
            .grade_repo
            .list(&ProductGradeFilter::default(), ListOrder::OldestFirst)?;
        let engine = self.engine()?;
        let (new_batch, summary) =
            engine.build_batch(&lot, &request.boxes, &grades, request.shell_weight)?;

        let batch = self.batch_repo.insert_and_mark_lot_processing(&new_batch)?;
        info!(
            lot_number = %batch.lot_number,
            boxes = batch.boxes.len(),
            yield_percentage = summary.yield_percentage,
            "加工批已提交"
        );

        let mut notices = vec![Notice::success(t_with_args(
            "processing.submitted",
            &[
                ("lot_number", &batch.lot_number),
                ("yield", &format_number(summary.yield_percentage, 1)),
            ],
        ))];
        if summary.mass_balance_warning {
            let diff = summary.total_output - summary.total_input;
            warn!(
                lot_number = %batch.lot_number,
                total_input = summary.total_input,
                total_output = summary.total_output,
                tolerance_kg = engine.tolerance_kg(),
                "质量平衡偏差超出容差"
            );
            notices.push(Notice::warning(t_with_args(
                "processing.mass_balance_warning",
                &[
                    ("diff", &format_number(diff, 2)),
                    ("input", &format_number(summary.total_input, 2)),
                    ("output", &format_number(summary.total_output, 2)),
                ],
            )));
        }

        Ok(ProcessingOutcome {
            batch,
            summary,
            notices,
        })
    }

    /// 批次的加工批
    pub fn get_batch(&self, lot_number: &str) -> ApiResult<Option<ProcessingBatch>> {
        Ok(self.batch_repo.find_by_lot_number(lot_number.trim())?)
    }

    /// 实时订阅某批次的加工批
    pub fn subscribe_processing_batches(
        &self,
        lot_number: &str,
    ) -> ApiResult<Subscription<ProcessingBatch>> {
        Ok(self
            .batch_repo
            .subscribe(ProcessingBatchFilter::by_lot(lot_number.trim()))?)
    }
}
