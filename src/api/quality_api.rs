// ==========================================
// 贝类加工追溯系统 - 包装质检 API
// ==========================================
// 职责: 记录加工批的包装质检（六项检查 + 抽检箱）
// 说明: 重复记录会覆盖上一次结果；不合格项只提示补充说明
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::notice::Notice;
use crate::domain::processing::{ProcessingBatch, QcCriterion};
use crate::engine::packaging_qc::{PackagingQcEngine, QcChecklistEntry};
use crate::i18n::{t, t_with_args};
use crate::repository::processing_batch_repo::ProcessingBatchRepository;

/// 包装质检请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingQcRequest {
    pub lot_number: String,
    pub checklist: Vec<QcChecklistEntry>,
    pub inspected_boxes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcOutcome {
    pub batch: ProcessingBatch,
    pub passed: bool,
    pub failed_items: Vec<QcCriterion>,
    pub notices: Vec<Notice>,
}

pub struct QualityApi {
    batch_repo: Arc<ProcessingBatchRepository>,
    engine: PackagingQcEngine,
}

impl QualityApi {
    pub fn new(batch_repo: Arc<ProcessingBatchRepository>) -> Self {
        Self {
            batch_repo,
            engine: PackagingQcEngine::new(),
        }
    }

    /// 空白检查表
    pub fn blank_checklist(&self) -> Vec<QcChecklistEntry> {
        PackagingQcEngine::blank_checklist()
    }

    /// 记录包装质检
    ///
    /// # 返回
    /// - Err(NotFound): 批次尚无加工批
    /// - Err(ValidationError): 检查表不完整 / 未判定 / 抽检箱无效
    pub fn record_packaging_qc(&self, request: &PackagingQcRequest) -> ApiResult<QcOutcome> {
        self.try_record(request).inspect_err(|e| {
            warn!(lot_number = %request.lot_number, error = %e, "包装质检被拒绝");
        })
    }

    fn try_record(&self, request: &PackagingQcRequest) -> ApiResult<QcOutcome> {
        let lot_number = request.lot_number.trim();
        let batch = self
            .batch_repo
            .find_by_lot_number(lot_number)?
            .ok_or_else(|| ApiError::NotFound(format!("批次{}的加工批不存在", lot_number)))?;

        let qc = self
            .engine
            .evaluate(&batch, &request.checklist, &request.inspected_boxes, Utc::now())?;

        let mut notices = Vec::new();
        if batch.packaging_qc.is_some() {
            warn!(lot_number = %batch.lot_number, batch_id = %batch.id, "覆盖已有的包装质检记录");
            notices.push(Notice::warning(t_with_args(
                "qc.replaced",
                &[("lot_number", &batch.lot_number)],
            )));
        }

        let batch = self.batch_repo.update_packaging_qc(&batch.id, &qc)?;
        let failed_items = PackagingQcEngine::failed_items(&qc);
        info!(
            lot_number = %batch.lot_number,
            passed = qc.passed,
            inspected = qc.inspected_boxes.len(),
            failed = failed_items.len(),
            "包装质检已记录"
        );

        if qc.passed {
            notices.push(Notice::success(t_with_args(
                "qc.passed",
                &[("lot_number", &batch.lot_number)],
            )));
        } else {
            notices.push(Notice::warning(t_with_args(
                "qc.failed",
                &[
                    ("lot_number", &batch.lot_number),
                    ("count", &failed_items.len().to_string()),
                ],
            )));
            notices.push(Notice::warning(t("qc.add_notes")));
        }

        Ok(QcOutcome {
            passed: qc.passed,
            batch,
            failed_items,
            notices,
        })
    }
}
