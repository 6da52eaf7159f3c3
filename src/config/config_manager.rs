// ==========================================
// 贝类加工追溯系统 - 配置管理器
// ==========================================
// 职责: 配置查询、覆写、快照
// 存储: config_kv 表 (key-value + scope)
// 约束: 缺失或无法解析的值一律回退默认值
// ==========================================

use crate::engine::processing::DEFAULT_MASS_BALANCE_TOLERANCE_KG;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// 默认界面语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 支持的界面语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![ConfigScope::Global.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![ConfigScope::Global.scope_id(), key, value],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON，键有序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![ConfigScope::Global.scope_id()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(serde_json::to_string(&config_map)?)
    }

    // ===== 加工 =====

    /// 质量平衡容差（kg）
    pub fn get_mass_balance_tolerance_kg(&self) -> RepositoryResult<f64> {
        let default = DEFAULT_MASS_BALANCE_TOLERANCE_KG.to_string();
        let value = self.get_config_or_default(config_keys::MASS_BALANCE_TOLERANCE_KG, &default)?;
        match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::MASS_BALANCE_TOLERANCE_KG,
                    value = %value,
                    "配置值无效，使用默认值"
                );
                Ok(DEFAULT_MASS_BALANCE_TOLERANCE_KG)
            }
        }
    }

    // ===== 国际化 =====

    /// 界面语言（不支持的值回退 zh-CN）
    pub fn get_locale(&self) -> RepositoryResult<String> {
        let value = self.get_config_or_default(config_keys::LOCALE, DEFAULT_LOCALE)?;
        if SUPPORTED_LOCALES.contains(&value.as_str()) {
            Ok(value)
        } else {
            tracing::warn!(config_key = config_keys::LOCALE, value = %value, "不支持的语言，使用默认值");
            Ok(DEFAULT_LOCALE.to_string())
        }
    }
}

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Global, // 全局
}

impl ConfigScope {
    pub fn scope_id(&self) -> &'static str {
        match self {
            ConfigScope::Global => "global",
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 加工
    pub const MASS_BALANCE_TOLERANCE_KG: &str = "processing.mass_balance_tolerance_kg";

    // 国际化
    pub const LOCALE: &str = "i18n.locale";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_missing() {
        let cfg = setup();
        assert_eq!(cfg.get_mass_balance_tolerance_kg().unwrap(), 0.1);
        assert_eq!(cfg.get_locale().unwrap(), "zh-CN");
    }

    #[test]
    fn test_override_and_fallback() {
        let cfg = setup();
        cfg.set_global_config_value(config_keys::MASS_BALANCE_TOLERANCE_KG, "0.25")
            .unwrap();
        assert_eq!(cfg.get_mass_balance_tolerance_kg().unwrap(), 0.25);

        cfg.set_global_config_value(config_keys::MASS_BALANCE_TOLERANCE_KG, "abc")
            .unwrap();
        assert_eq!(cfg.get_mass_balance_tolerance_kg().unwrap(), 0.1);

        cfg.set_global_config_value(config_keys::LOCALE, "fr").unwrap();
        assert_eq!(cfg.get_locale().unwrap(), "zh-CN");
        cfg.set_global_config_value(config_keys::LOCALE, "en").unwrap();
        assert_eq!(cfg.get_locale().unwrap(), "en");
    }

    #[test]
    fn test_snapshot_contains_global_keys() {
        let cfg = setup();
        cfg.set_global_config_value(config_keys::LOCALE, "en").unwrap();
        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&cfg.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.get("i18n.locale").map(String::as_str), Some("en"));
    }
}
