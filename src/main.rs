// ==========================================
// 贝类加工追溯系统 - 命令行入口
// ==========================================
// 职责: 初始化日志与数据库，输出各集合概况
// ==========================================

use anyhow::Context;
use seafood_trace::app::{get_default_db_path, AppState};
use seafood_trace::repository::{LotFilter, RawMaterialFilter};
use seafood_trace::LotStatus;

fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    seafood_trace::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", seafood_trace::APP_NAME);
    tracing::info!("系统版本: {}", seafood_trace::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径（可传入第一个参数覆盖）
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).context("无法初始化AppState")?;
    let locale = state.apply_configured_locale().context("读取语言配置失败")?;
    tracing::info!(locale = %locale, "界面语言");

    let suppliers = state.supplier_api.list_suppliers()?;
    let pending = state.raw_material_api.list_pending()?;
    let all_materials = state
        .raw_material_api
        .list_raw_materials(&RawMaterialFilter::default())?;
    let lots = state.lot_api.list_lots(&LotFilter::default())?;
    let depurated = state.lot_api.list_depurated_lots()?;
    let awaiting_processing = depurated
        .iter()
        .filter(|lot| lot.status == LotStatus::Pending)
        .count();
    let grades = state.grade_api.list_grades(None)?;

    tracing::info!(
        suppliers = suppliers.len(),
        raw_materials = all_materials.len(),
        pending_receipts = pending.len(),
        lots = lots.len(),
        awaiting_processing,
        product_grades = grades.len(),
        "数据概况"
    );

    if grades.is_empty() {
        tracing::warn!("尚无产品等级参考数据，可运行 seed_reference_data 初始化");
    }

    let snapshot = state.config_manager.get_config_snapshot()?;
    tracing::debug!(config = %snapshot, "配置快照");

    Ok(())
}
