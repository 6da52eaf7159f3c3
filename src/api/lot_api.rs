// ==========================================
// 贝类加工追溯系统 - 批次 API
// ==========================================
// 职责: 原料组批、批次查询与订阅
// 约束: 批次写入与原料回写为同一事务，失败时不留部分结果
// ==========================================

use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::notice::Notice;
use crate::domain::lot::Lot;
use crate::engine::identifiers::generate_lot_number;
use crate::engine::lot_assembly::LotAssemblyEngine;
use crate::i18n::{format_number, t_with_args};
use crate::repository::lot_repo::LotRepository;
use crate::repository::query::{ListOrder, LotFilter};
use crate::repository::raw_material_repo::RawMaterialRepository;
use crate::repository::subscription::Subscription;

/// 组批请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotRequest {
    pub receipt_ids: Vec<String>,
    pub notes: Option<String>,
}

/// 组批结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotOutcome {
    pub lot: Lot,
    pub notices: Vec<Notice>,
}

// ==========================================
// LotApi - 批次 API
// ==========================================
pub struct LotApi {
    lot_repo: Arc<LotRepository>,
    raw_material_repo: Arc<RawMaterialRepository>,
    engine: LotAssemblyEngine,
}

impl LotApi {
    pub fn new(lot_repo: Arc<LotRepository>, raw_material_repo: Arc<RawMaterialRepository>) -> Self {
        Self {
            lot_repo,
            raw_material_repo,
            engine: LotAssemblyEngine::new(),
        }
    }

    /// 由待组批原料创建批次
    ///
    /// # 参数
    /// - request: 原料 id 列表（重复 id 只计一次）与可选备注
    ///
    /// # 返回
    /// - Ok(LotOutcome): 新批次（status=pending）与成功提示
    /// - Err(ValidationError): 未选择原料，或原料已组批
    /// - Err(NotFound): 原料不存在
    pub fn create_lot(&self, request: &CreateLotRequest) -> ApiResult<LotOutcome> {
        self.try_create_lot(request).inspect_err(|e| {
            warn!(receipts = request.receipt_ids.len(), error = %e, "组批被拒绝");
        })
    }

    fn try_create_lot(&self, request: &CreateLotRequest) -> ApiResult<LotOutcome> {
        let receipt_ids = LotAssemblyEngine::normalize_selection(&request.receipt_ids);
        LotAssemblyEngine::ensure_selection(&receipt_ids)?;

        let selected = self.raw_material_repo.find_by_ids(&receipt_ids)?;
        let base_number = generate_lot_number(Local::now().naive_local());
        let new_lot = self
            .engine
            .assemble(&selected, request.notes.as_deref(), base_number)?;

        let lot = self.lot_repo.insert_with_assignments(&new_lot)?;

        info!(
            lot_number = %lot.lot_number,
            receipts = lot.receipt_ids.len(),
            total_weight = lot.total_weight,
            "组批完成"
        );
        let message = t_with_args(
            "lot.created",
            &[
                ("lot_number", &lot.lot_number),
                ("count", &lot.receipt_ids.len().to_string()),
                ("weight", &format_number(lot.total_weight, 2)),
            ],
        );
        Ok(LotOutcome {
            lot,
            notices: vec![Notice::success(message)],
        })
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按批次号查询
    pub fn get_lot(&self, lot_number: &str) -> ApiResult<Lot> {
        let lot_number = lot_number.trim();
        if lot_number.is_empty() {
            return Err(ApiError::InvalidInput("批次号不能为空".to_string()));
        }
        self.lot_repo
            .find_by_lot_number(lot_number)?
            .ok_or_else(|| ApiError::NotFound(format!("批次{}不存在", lot_number)))
    }

    /// 批次列表（最新在前）
    pub fn list_lots(&self, filter: &LotFilter) -> ApiResult<Vec<Lot>> {
        Ok(self.lot_repo.list(filter, ListOrder::NewestFirst)?)
    }

    /// 净化已完成、可进入加工的批次
    pub fn list_depurated_lots(&self) -> ApiResult<Vec<Lot>> {
        Ok(self.lot_repo.list(&LotFilter::depurated(), ListOrder::NewestFirst)?)
    }

    /// 实时订阅批次列表
    pub fn subscribe_lots(&self, filter: LotFilter) -> ApiResult<Subscription<Lot>> {
        Ok(self.lot_repo.subscribe(filter)?)
    }
}
