// ==========================================
// 贝类加工追溯系统 - 参考数据初始化
// ==========================================
// 用法: seed_reference_data [db_path]
// 内容: 产品等级（带壳 A/B/C、肉 A/B）+ 演示供应商
// 幂等: 等级按 (产品类型, 代码) 去重；演示供应商按名称去重
// ==========================================

use anyhow::Context;
use seafood_trace::app::{get_default_db_path, AppState};

const DEMO_SUPPLIER_NAME: &str = "Demo Shellfish Co.";
const DEMO_SUPPLIER_CONTACT: &str = "+61 8 0000 0000";
const DEMO_SUPPLIER_LICENSE: &str = "AQ-DEMO-0001";

fn main() -> anyhow::Result<()> {
    seafood_trace::logging::init();

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("初始化参考数据，数据库: {}", db_path);

    let state = AppState::new(db_path).context("无法打开数据库")?;

    let inserted = state
        .grade_api
        .ensure_default_grades()
        .context("写入默认等级失败")?;

    let has_demo_supplier = state
        .supplier_api
        .list_suppliers()?
        .iter()
        .any(|s| s.name == DEMO_SUPPLIER_NAME);
    if has_demo_supplier {
        tracing::info!("演示供应商已存在，跳过");
    } else {
        let outcome = state
            .supplier_api
            .create_supplier(DEMO_SUPPLIER_NAME, DEMO_SUPPLIER_CONTACT, DEMO_SUPPLIER_LICENSE)
            .context("写入演示供应商失败")?;
        tracing::info!(supplier_id = %outcome.supplier.id, "演示供应商已创建");
    }

    let grades = state.grade_api.list_grades(None)?;
    println!("product grades: {} ({} new)", grades.len(), inserted);
    for grade in &grades {
        println!("  {:<8} {:<2} {}", grade.product_type, grade.code, grade.name);
    }
    Ok(())
}
