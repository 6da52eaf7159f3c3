// ==========================================
// 贝类加工追溯系统 - 净化 API
// ==========================================
// 职责: 开始/完成净化，净化状态视图
// 红线: 只有净化完成的批次才能进入加工
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::notice::Notice;
use crate::domain::lot::Lot;
use crate::domain::types::DepurationStatus;
use crate::engine::depuration::{readings_from, DepurationEngine, ElapsedTime};
use crate::i18n::t_with_args;
use crate::repository::lot_repo::LotRepository;

/// 开始净化请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDepurationRequest {
    pub lot_number: String,
    pub tank_number: String,
    pub temperature: Option<f64>, // °C
    pub salinity: Option<f64>,    // ppt
}

/// 完成净化请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDepurationRequest {
    pub lot_number: String,
    pub temperature: Option<f64>,
    pub salinity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepurationOutcome {
    pub lot: Lot,
    pub notices: Vec<Notice>,
}

/// 净化状态视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepurationView {
    pub lot_number: String,
    pub status: Option<DepurationStatus>, // None: 尚未开始
    pub tank_number: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub elapsed: Option<ElapsedTime>, // 仅净化中
    pub processing_unlocked: bool,
}

// ==========================================
// DepurationApi - 净化 API
// ==========================================
pub struct DepurationApi {
    lot_repo: Arc<LotRepository>,
    engine: DepurationEngine,
}

impl DepurationApi {
    pub fn new(lot_repo: Arc<LotRepository>) -> Self {
        Self {
            lot_repo,
            engine: DepurationEngine::new(),
        }
    }

    fn load_lot(&self, lot_number: &str) -> ApiResult<Lot> {
        self.lot_repo
            .find_by_lot_number(lot_number.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("批次{}不存在", lot_number.trim())))
    }

    /// 开始净化
    ///
    /// # 返回
    /// - Err(NotFound): 批次不存在
    /// - Err(ValidationError): 池号为空或读数缺失
    /// - Err(InvalidStateTransition): 已开始或已完成
    pub fn start(&self, request: &StartDepurationRequest) -> ApiResult<DepurationOutcome> {
        self.try_start(request).inspect_err(|e| {
            warn!(lot_number = %request.lot_number, error = %e, "开始净化被拒绝");
        })
    }

    fn try_start(&self, request: &StartDepurationRequest) -> ApiResult<DepurationOutcome> {
        let lot = self.load_lot(&request.lot_number)?;
        let readings = readings_from(request.temperature, request.salinity)?;
        let data = self.engine.start(
            lot.depuration_data.as_ref(),
            &request.tank_number,
            readings,
            Utc::now(),
        )?;

        let lot = self
            .lot_repo
            .update_depuration(&lot.lot_number, lot.depuration_status(), &data)?;
        info!(lot_number = %lot.lot_number, tank_number = %data.tank_number, "净化已开始");

        let message = t_with_args(
            "depuration.started",
            &[("lot_number", &lot.lot_number), ("tank", &data.tank_number)],
        );
        Ok(DepurationOutcome {
            lot,
            notices: vec![Notice::success(message)],
        })
    }

    /// 完成净化（仅 in-progress 可完成）
    pub fn complete(&self, request: &CompleteDepurationRequest) -> ApiResult<DepurationOutcome> {
        self.try_complete(request).inspect_err(|e| {
            warn!(lot_number = %request.lot_number, error = %e, "完成净化被拒绝");
        })
    }

    fn try_complete(&self, request: &CompleteDepurationRequest) -> ApiResult<DepurationOutcome> {
        let lot = self.load_lot(&request.lot_number)?;
        let readings = readings_from(request.temperature, request.salinity)?;
        let data = self
            .engine
            .complete(lot.depuration_data.as_ref(), readings, Utc::now())?;

        let lot = self
            .lot_repo
            .update_depuration(&lot.lot_number, lot.depuration_status(), &data)?;
        info!(lot_number = %lot.lot_number, "净化已完成");

        let message = t_with_args("depuration.completed", &[("lot_number", &lot.lot_number)]);
        Ok(DepurationOutcome {
            lot,
            notices: vec![Notice::success(message)],
        })
    }

    /// 净化状态视图（已用时长按当前时间计算）
    pub fn status_view(&self, lot_number: &str) -> ApiResult<DepurationView> {
        self.status_view_at(lot_number, Utc::now())
    }

    /// 净化状态视图（指定观察时间）
    pub fn status_view_at(&self, lot_number: &str, now: DateTime<Utc>) -> ApiResult<DepurationView> {
        let lot = self.load_lot(lot_number)?;
        let data = lot.depuration_data.as_ref();
        Ok(DepurationView {
            lot_number: lot.lot_number.clone(),
            status: data.map(|d| d.status),
            tank_number: data.map(|d| d.tank_number.clone()),
            started_at: data.map(|d| d.start_time),
            completed_at: data.and_then(|d| d.completed_at),
            elapsed: data.and_then(|d| self.engine.elapsed(d, now)),
            processing_unlocked: DepurationEngine::is_processing_unlocked(&lot),
        })
    }
}
