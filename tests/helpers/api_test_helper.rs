// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用环境与数据准备
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use tempfile::NamedTempFile;

use seafood_trace::api::{
    ApiError, CompleteDepurationRequest, CreateLotRequest, StartDepurationRequest,
};
use seafood_trace::app::AppState;
use seafood_trace::domain::{Lot, RawMaterial, Supplier};

use super::test_data_builder::IntakeBuilder;

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 每个环境独占一个临时数据库文件
pub struct ApiTestEnv {
    pub db_path: String,
    pub state: AppState,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境（已写入默认产品等级）
    pub fn new() -> Result<Self, String> {
        let env = Self::without_grades()?;
        env.state
            .grade_api
            .ensure_default_grades()
            .map_err(|e| format!("写入默认等级失败: {}", e))?;
        Ok(env)
    }

    /// 不写入任何参考数据的测试环境
    pub fn without_grades() -> Result<Self, String> {
        seafood_trace::logging::init_test();

        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let state = AppState::new(db_path.clone())
            .map_err(|e| format!("无法创建AppState: {}", e))?;

        Ok(Self {
            db_path,
            state,
            _temp_file: temp_file,
        })
    }

    // ==========================================
    // 数据准备
    // ==========================================

    pub fn seed_supplier(&self, name: &str) -> Supplier {
        self.state
            .supplier_api
            .create_supplier(name, "+61 400 000 000", &format!("LIC-{}", name))
            .expect("登记供应商失败")
            .supplier
    }

    /// 登记一组收货记录（同一供应商）
    pub fn seed_receipts(&self, supplier_id: &str, weights: &[f64]) -> Vec<RawMaterial> {
        weights
            .iter()
            .map(|w| {
                self.state
                    .raw_material_api
                    .record_intake(&IntakeBuilder::new(supplier_id).weight(*w).build())
                    .expect("登记收货失败")
                    .material
            })
            .collect()
    }

    /// 由新登记的收货记录组成一个批次
    pub fn seed_lot(&self, weights: &[f64]) -> Lot {
        let supplier = self.seed_supplier("Coffin Bay Oysters");
        let receipts = self.seed_receipts(&supplier.id, weights);
        self.create_lot(&receipts).expect("组批失败")
    }

    pub fn create_lot(&self, receipts: &[RawMaterial]) -> Result<Lot, ApiError> {
        let request = CreateLotRequest {
            receipt_ids: receipts.iter().map(|r| r.id.clone()).collect(),
            notes: None,
        };
        Ok(self.state.lot_api.create_lot(&request)?.lot)
    }

    /// 开始净化（默认池号 T1，18.5°C，35ppt）
    pub fn start_depuration(&self, lot_number: &str) -> Result<Lot, ApiError> {
        let request = StartDepurationRequest {
            lot_number: lot_number.to_string(),
            tank_number: "T1".to_string(),
            temperature: Some(18.5),
            salinity: Some(35.0),
        };
        Ok(self.state.depuration_api.start(&request)?.lot)
    }

    pub fn complete_depuration(&self, lot_number: &str) -> Result<Lot, ApiError> {
        let request = CompleteDepurationRequest {
            lot_number: lot_number.to_string(),
            temperature: Some(17.0),
            salinity: Some(34.5),
        };
        Ok(self.state.depuration_api.complete(&request)?.lot)
    }

    /// 组批并完成净化，返回可加工的批次
    pub fn seed_depurated_lot(&self, weights: &[f64]) -> Lot {
        let lot = self.seed_lot(weights);
        self.start_depuration(&lot.lot_number).expect("开始净化失败");
        self.complete_depuration(&lot.lot_number).expect("完成净化失败")
    }
}
