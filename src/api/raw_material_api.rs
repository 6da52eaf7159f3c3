// ==========================================
// 贝类加工追溯系统 - 原料收货 API
// ==========================================
// 职责: 收货登记、待组批原料查询、按批次回溯原料
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::notice::Notice;
use crate::domain::raw_material::{NewRawMaterial, RawMaterial};
use crate::engine::error::{require_positive, require_text};
use crate::i18n::{format_number, t_with_args};
use crate::repository::query::{ListOrder, RawMaterialFilter};
use crate::repository::raw_material_repo::RawMaterialRepository;
use crate::repository::subscription::Subscription;
use crate::repository::supplier_repo::SupplierRepository;

/// 收货登记请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordIntakeRequest {
    pub supplier_id: String,
    pub weight: Option<f64>, // kg
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeOutcome {
    pub material: RawMaterial,
    pub notices: Vec<Notice>,
}

pub struct RawMaterialApi {
    raw_material_repo: Arc<RawMaterialRepository>,
    supplier_repo: Arc<SupplierRepository>,
}

impl RawMaterialApi {
    pub fn new(
        raw_material_repo: Arc<RawMaterialRepository>,
        supplier_repo: Arc<SupplierRepository>,
    ) -> Self {
        Self {
            raw_material_repo,
            supplier_repo,
        }
    }

    /// 登记收货
    ///
    /// # 返回
    /// - Err(ValidationError): 供应商为空或重量无效
    /// - Err(NotFound): 供应商不存在
    pub fn record_intake(&self, request: &RecordIntakeRequest) -> ApiResult<IntakeOutcome> {
        let supplier_id = require_text("supplierId", &request.supplier_id)?;
        let weight = require_positive("weight", request.weight)?;

        if self.supplier_repo.find_by_id(&supplier_id)?.is_none() {
            warn!(supplier_id = %supplier_id, "收货登记被拒绝: 供应商不存在");
            return Err(ApiError::NotFound(format!("供应商{}不存在", supplier_id)));
        }

        let material = self.raw_material_repo.insert(&NewRawMaterial {
            supplier_id,
            weight,
            date: request.date,
        })?;
        info!(material_id = %material.id, weight = material.weight, "收货已登记");

        let message = t_with_args("raw_material.recorded", &[("weight", &format_number(weight, 2))]);
        Ok(IntakeOutcome {
            material,
            notices: vec![Notice::success(message)],
        })
    }

    /// 收货记录列表（最新在前）
    pub fn list_raw_materials(&self, filter: &RawMaterialFilter) -> ApiResult<Vec<RawMaterial>> {
        Ok(self.raw_material_repo.list(filter, ListOrder::NewestFirst)?)
    }

    /// 待组批原料（最新在前）
    pub fn list_pending(&self) -> ApiResult<Vec<RawMaterial>> {
        Ok(self
            .raw_material_repo
            .list(&RawMaterialFilter::pending(), ListOrder::NewestFirst)?)
    }

    /// 组成某批次的原料
    pub fn list_by_lot(&self, lot_number: &str) -> ApiResult<Vec<RawMaterial>> {
        Ok(self
            .raw_material_repo
            .list(&RawMaterialFilter::by_lot(lot_number), ListOrder::OldestFirst)?)
    }

    pub fn subscribe_raw_materials(&self, filter: RawMaterialFilter) -> ApiResult<Subscription<RawMaterial>> {
        Ok(self.raw_material_repo.subscribe(filter)?)
    }
}
