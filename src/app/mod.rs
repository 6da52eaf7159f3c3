// ==========================================
// 贝类加工追溯系统 - 应用层
// ==========================================
// 职责: 组装仓储/API，提供给展示层或命令行入口
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
