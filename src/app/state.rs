// ==========================================
// 贝类加工追溯系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约束: 所有仓储共用同一个数据库连接与同一个变更中心
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{
    DepurationApi, GradeApi, LotApi, ProcessingApi, QualityApi, RawMaterialApi, SupplierApi,
};
use crate::config::config_manager::ConfigManager;
use crate::db::{configure_sqlite_connection, ensure_schema, open_shared_connection};
use crate::repository::{
    ChangeHub, LotRepository, ProcessingBatchRepository, ProductGradeRepository,
    RawMaterialRepository, RepositoryError, RepositoryResult, SupplierRepository,
};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "SEAFOOD_TRACE_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub supplier_api: Arc<SupplierApi>,
    pub raw_material_api: Arc<RawMaterialApi>,
    pub lot_api: Arc<LotApi>,
    pub depuration_api: Arc<DepurationApi>,
    pub processing_api: Arc<ProcessingApi>,
    pub quality_api: Arc<QualityApi>,
    pub grade_api: Arc<GradeApi>,

    pub config_manager: Arc<ConfigManager>,

    /// 变更中心（实时订阅）
    pub change_hub: Arc<ChangeHub>,
}

impl AppState {
    /// 打开数据库并创建 AppState
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并统一 PRAGMA
    /// 2. 建表（幂等）
    /// 3. 初始化所有Repository与API实例
    pub fn new(db_path: String) -> RepositoryResult<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);
        let conn = open_shared_connection(&db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(format!("无法打开数据库: {}", e)))?;
        Ok(Self::from_connection(db_path, conn))
    }

    /// 从已打开的连接创建（测试与内存库使用）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Self {
        let change_hub = ChangeHub::shared();

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let supplier_repo = Arc::new(SupplierRepository::new(conn.clone(), change_hub.clone()));
        let raw_material_repo = Arc::new(RawMaterialRepository::new(conn.clone(), change_hub.clone()));
        let lot_repo = Arc::new(LotRepository::new(conn.clone(), change_hub.clone()));
        let batch_repo = Arc::new(ProcessingBatchRepository::new(conn.clone(), change_hub.clone()));
        let grade_repo = Arc::new(ProductGradeRepository::new(conn.clone(), change_hub.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let supplier_api = Arc::new(SupplierApi::new(supplier_repo.clone()));
        let raw_material_api = Arc::new(RawMaterialApi::new(raw_material_repo.clone(), supplier_repo));
        let lot_api = Arc::new(LotApi::new(lot_repo.clone(), raw_material_repo));
        let depuration_api = Arc::new(DepurationApi::new(lot_repo.clone()));
        let processing_api = Arc::new(ProcessingApi::new(
            lot_repo,
            batch_repo.clone(),
            grade_repo.clone(),
            config_manager.clone(),
        ));
        let quality_api = Arc::new(QualityApi::new(batch_repo));
        let grade_api = Arc::new(GradeApi::new(grade_repo));

        tracing::info!("AppState初始化完成");
        Self {
            db_path,
            supplier_api,
            raw_material_api,
            lot_api,
            depuration_api,
            processing_api,
            quality_api,
            grade_api,
            config_manager,
            change_hub,
        }
    }

    /// 内存库（不落盘）
    pub fn in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure_sqlite_connection(&conn)?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(
            ":memory:".to_string(),
            Arc::new(Mutex::new(conn)),
        ))
    }

    /// 按配置切换界面语言
    pub fn apply_configured_locale(&self) -> RepositoryResult<String> {
        let locale = self.config_manager.get_locale()?;
        crate::i18n::set_locale(&locale);
        Ok(locale)
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 SEAFOOD_TRACE_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./seafood_trace.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("seafood-trace-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("seafood-trace");
        }

        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!("无法创建数据目录 {}: {}，改用当前目录", path.display(), e);
            return "./seafood_trace.db".to_string();
        }
        path = path.join("seafood_trace.db");
    }

    path.to_string_lossy().to_string()
}
