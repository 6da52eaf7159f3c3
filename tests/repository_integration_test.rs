// ==========================================
// Repository 层集成测试
// ==========================================
// 测试范围:
// 1. 实时订阅: 初始结果、写入后推送、取消订阅后清理
// 2. 多文档写入的原子性（组批、删除批次、加工提交）
// 3. 重新打开数据库后数据完整
// ==========================================

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use helpers::api_test_helper::ApiTestEnv;
use helpers::test_data_builder::{BoxDraftBuilder, IntakeBuilder};
use seafood_trace::api::SubmitProcessingRequest;
use seafood_trace::app::AppState;
use seafood_trace::db::open_shared_connection;
use seafood_trace::domain::types::{LotStatus, RawMaterialStatus};
use seafood_trace::domain::{NewLot, NewRawMaterial, NewSupplier};
use seafood_trace::repository::{
    ChangeHub, Collection, LotFilter, LotRepository, RawMaterialFilter, RawMaterialRepository,
    RepositoryError, SupplierRepository,
};

// ==========================================
// 实时订阅
// ==========================================

#[test]
fn test_subscription_收货与组批推送() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.seed_supplier("Smoky Bay");

    let mut pending = env
        .state
        .raw_material_api
        .subscribe_raw_materials(RawMaterialFilter::pending())
        .unwrap();
    let mut lots = env.state.lot_api.subscribe_lots(LotFilter::default()).unwrap();
    assert!(pending.latest().is_empty());
    assert!(lots.latest().is_empty());

    let receipts = env.seed_receipts(&supplier.id, &[3.0, 4.0]);
    assert!(pending.has_changed());
    let snapshot = pending.latest();
    assert_eq!(snapshot.len(), 2);
    // 最新在前
    assert_eq!(snapshot[0].id, receipts[1].id);
    assert!(!lots.has_changed());

    let lot = env.create_lot(&receipts).unwrap();
    assert!(pending.has_changed());
    assert!(pending.latest().is_empty());
    assert!(lots.has_changed());
    let lot_snapshot = lots.latest();
    assert_eq!(lot_snapshot.len(), 1);
    assert_eq!(lot_snapshot[0].lot_number, lot.lot_number);
}

#[test]
fn test_subscription_净化与加工推送() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let lot = env.seed_lot(&[10.0]);

    let mut depurated = env.state.lot_api.subscribe_lots(LotFilter::depurated()).unwrap();
    let mut batches = env
        .state
        .processing_api
        .subscribe_processing_batches(&lot.lot_number)
        .unwrap();
    assert!(depurated.latest().is_empty());
    assert!(batches.latest().is_empty());

    env.start_depuration(&lot.lot_number).unwrap();
    assert!(depurated.latest().is_empty());

    env.complete_depuration(&lot.lot_number).unwrap();
    let ready = depurated.latest();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].lot_number, lot.lot_number);

    assert!(!batches.has_changed());
}

#[test]
fn test_subscription_取消后清理() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let hub = &env.state.change_hub;
    let supplier = env.seed_supplier("Smoky Bay");

    let baseline = hub.watcher_count(Collection::RawMaterials);
    let subscription = env
        .state
        .raw_material_api
        .subscribe_raw_materials(RawMaterialFilter::default())
        .unwrap();
    assert_eq!(hub.watcher_count(Collection::RawMaterials), baseline + 1);

    subscription.unsubscribe();
    // 下一次发布时清理
    env.seed_receipts(&supplier.id, &[1.0]);
    assert_eq!(hub.watcher_count(Collection::RawMaterials), baseline);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subscription_异步等待变更() {
    let env = Arc::new(ApiTestEnv::new().expect("无法创建测试环境"));
    let supplier = env.seed_supplier("Smoky Bay");
    let mut subscription = env.state.supplier_api.subscribe_suppliers().unwrap();
    assert_eq!(subscription.latest().len(), 1);

    let writer = {
        let env = env.clone();
        tokio::task::spawn_blocking(move || {
            env.state
                .supplier_api
                .create_supplier("Streaky Bay", "+61 8 1111 1111", "AQ-0002")
                .unwrap();
        })
    };

    let changed = tokio::time::timeout(Duration::from_secs(5), subscription.changed())
        .await
        .expect("等待推送超时");
    assert!(changed);
    writer.await.unwrap();

    let names: Vec<String> = subscription.latest().into_iter().map(|s| s.name).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&supplier.name));
    assert!(names.contains(&"Streaky Bay".to_string()));
}

// ==========================================
// 原子性
// ==========================================

fn repositories(db_path: &str) -> (SupplierRepository, RawMaterialRepository, LotRepository) {
    let conn = open_shared_connection(db_path).expect("无法打开数据库");
    let hub = ChangeHub::shared();
    (
        SupplierRepository::new(conn.clone(), hub.clone()),
        RawMaterialRepository::new(conn.clone(), hub.clone()),
        LotRepository::new(conn, hub),
    )
}

#[test]
fn test_insert_with_assignments_失败整体回滚() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let (supplier_repo, raw_repo, lot_repo) = repositories(&db_path);

    let supplier = supplier_repo
        .insert(&NewSupplier {
            name: "Smoky Bay".to_string(),
            contact: "+61 8 0000 0000".to_string(),
            license_number: "AQ-0001".to_string(),
        })
        .unwrap();
    let receipt = raw_repo
        .insert(&NewRawMaterial {
            supplier_id: supplier.id.clone(),
            weight: 4.0,
            date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        })
        .unwrap();

    let result = lot_repo.insert_with_assignments(&NewLot {
        lot_number: "L2405171230".to_string(),
        total_weight: 9.0,
        notes: None,
        receipt_ids: vec![receipt.id.clone(), "ghost".to_string()],
    });
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));

    assert!(lot_repo.find_by_lot_number("L2405171230").unwrap().is_none());
    let reloaded = raw_repo.find_by_id(&receipt.id).unwrap().unwrap();
    assert_eq!(reloaded.status, RawMaterialStatus::Pending);
    assert!(reloaded.lot_number.is_none());
}

#[test]
fn test_delete_lot_已组批原料不可释放() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let lot = env.seed_lot(&[10.0]);
    let lot_repo = LotRepository::new(
        open_shared_connection(&env.db_path).expect("无法打开数据库"),
        ChangeHub::shared(),
    );

    let result = lot_repo.delete(&lot.id);
    assert!(matches!(result, Err(RepositoryError::InvalidStateTransition { .. })));

    // 批次与原料均保持不变
    assert!(lot_repo.find_by_id(&lot.id).unwrap().is_some());
    let members = env.state.raw_material_api.list_by_lot(&lot.lot_number).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].status, RawMaterialStatus::Assigned);
    assert_eq!(members[0].lot_number.as_deref(), Some(lot.lot_number.as_str()));
}

#[test]
fn test_收货引用不存在的供应商被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let result = env
        .state
        .raw_material_api
        .record_intake(&IntakeBuilder::new("no-such-supplier").weight(2.0).build());
    assert!(result.is_err());
    assert!(env
        .state
        .raw_material_api
        .list_raw_materials(&RawMaterialFilter::default())
        .unwrap()
        .is_empty());
}

// ==========================================
// 持久化
// ==========================================

#[test]
fn test_写入返回的记录与读回一致() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let supplier = env.seed_supplier("Smoky Bay");
    assert_eq!(env.state.supplier_api.list_suppliers().unwrap(), vec![supplier.clone()]);

    let receipts = env.seed_receipts(&supplier.id, &[4.0]);
    let stored = env.state.raw_material_api.list_pending().unwrap();
    assert_eq!(stored, receipts);

    let lot = env.create_lot(&receipts).unwrap();
    assert_eq!(env.state.lot_api.get_lot(&lot.lot_number).unwrap(), lot);

    let lot = env.seed_depurated_lot(&[10.0]);
    let batch = env
        .state
        .processing_api
        .submit(&SubmitProcessingRequest {
            lot_number: lot.lot_number.clone(),
            boxes: vec![BoxDraftBuilder::shell_on("SO000001").weight(8.0).build()],
            shell_weight: Some(2.0),
        })
        .unwrap()
        .batch;
    assert_eq!(
        env.state.processing_api.get_batch(&lot.lot_number).unwrap(),
        Some(batch)
    );
}

#[test]
fn test_重新打开数据库数据完整() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let lot = env.seed_depurated_lot(&[2.0, 3.0]);

    let reopened = AppState::new(env.db_path.clone()).expect("重新打开数据库失败");
    let reloaded = reopened.lot_api.get_lot(&lot.lot_number).unwrap();

    assert_eq!(reloaded.id, lot.id);
    assert_eq!(reloaded.status, LotStatus::Pending);
    assert_eq!(reloaded.total_weight, 5.0);
    assert_eq!(reloaded.receipt_ids, lot.receipt_ids);
    assert_eq!(reloaded.depuration_data, lot.depuration_data);
    assert_eq!(reopened.grade_api.list_grades(None).unwrap().len(), 5);

    // 默认等级幂等
    assert_eq!(reopened.grade_api.ensure_default_grades().unwrap(), 0);
}
