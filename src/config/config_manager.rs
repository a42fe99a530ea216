// ==========================================
// PIM 商品导入系统 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表读取导入配置,支持整份 JSON 档案 + 单项覆写
// 存储: config_kv 表 (scope_id + key → value)
// 优先级: 单项覆写 > JSON 档案 > 内置默认值
// ==========================================

use crate::config::import_config::ImportConfig;
use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use crate::domain::types::ImportMode;
use crate::importer::error::{ImportError, ImportResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// 默认作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let guard = lock(&conn)?;
            configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = lock(&self.conn)?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = lock(&self.conn)?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;

        Ok(())
    }

    /// 保存整份导入配置档案
    pub fn save_import_profile(&self, config: &ImportConfig) -> ImportResult<()> {
        config.validate()?;
        let raw = serde_json::to_string(config).map_err(|e| ImportError::ConfigValueError {
            key: config_keys::IMPORT_PROFILE.to_string(),
            value: String::new(),
            message: e.to_string(),
        })?;
        self.set_config_value(config_keys::IMPORT_PROFILE, &raw)
    }

    /// 读取导入配置
    ///
    /// # 逻辑
    /// 1. 读取 import/profile（整份 JSON）,不存在则用默认值
    /// 2. 逐项应用标量覆写
    /// 3. 校验取值范围
    pub fn get_import_config(&self) -> ImportResult<ImportConfig> {
        let mut config = match self.get_config_value(config_keys::IMPORT_PROFILE)? {
            Some(raw) => ImportConfig::from_json_str(&raw)?,
            None => ImportConfig::default(),
        };

        if let Some(v) = self.get_config_value(config_keys::IMPORT_MODE)? {
            config.import_mode = ImportMode::from_str(&v).map_err(|message| {
                ImportError::ConfigValueError {
                    key: config_keys::IMPORT_MODE.to_string(),
                    value: v.clone(),
                    message,
                }
            })?;
        }
        if let Some(v) = self.get_config_value(config_keys::HANDLE_CONFLICTS)? {
            config.handle_conflicts = parse_bool(config_keys::HANDLE_CONFLICTS, &v)?;
        }
        if let Some(v) = self.get_config_value(config_keys::CONFLICT_MAX_RETRIES)? {
            config.conflict_max_retries = parse_number(config_keys::CONFLICT_MAX_RETRIES, &v)?;
        }
        if let Some(v) = self.get_config_value(config_keys::HALT_ON_UNRESOLVABLE)? {
            config.halt_on_unresolvable_conflicts = parse_bool(config_keys::HALT_ON_UNRESOLVABLE, &v)?;
        }
        if let Some(v) = self.get_config_value(config_keys::TIMEOUT_SECONDS)? {
            config.timeout_seconds = parse_number(config_keys::TIMEOUT_SECONDS, &v)?;
        }

        config.validate()?;
        debug!(
            import_mode = %config.import_mode,
            conflict_max_retries = config.conflict_max_retries,
            "导入配置加载完成"
        );
        Ok(config)
    }
}

fn lock(conn: &Arc<Mutex<Connection>>) -> ImportResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))
}

fn parse_bool(key: &str, value: &str) -> ImportResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(ImportError::ConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            message: "期望布尔值".to_string(),
        }),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> ImportResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ImportError::ConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
}

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const IMPORT_PROFILE: &str = "import/profile";
    pub const IMPORT_MODE: &str = "import/import_mode";
    pub const HANDLE_CONFLICTS: &str = "import/handle_conflicts";
    pub const CONFLICT_MAX_RETRIES: &str = "import/conflict_max_retries";
    pub const HALT_ON_UNRESOLVABLE: &str = "import/halt_on_unresolvable_conflicts";
    pub const TIMEOUT_SECONDS: &str = "import/timeout_seconds";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkuStrategy;
    use crate::db::init_catalog_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_catalog_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = manager().get_import_config().unwrap();
        assert_eq!(config, ImportConfig::default());
    }

    #[test]
    fn test_scalar_overrides_win_over_profile() {
        let manager = manager();
        let mut profile = ImportConfig::default();
        profile.conflict_max_retries = 5;
        profile.conflict_resolution.sku_resolution.strategy = SkuStrategy::UseExisting;
        manager.save_import_profile(&profile).unwrap();

        manager.set_config_value(config_keys::CONFLICT_MAX_RETRIES, "1").unwrap();
        manager.set_config_value(config_keys::IMPORT_MODE, "create_only").unwrap();
        manager.set_config_value(config_keys::HALT_ON_UNRESOLVABLE, "yes").unwrap();

        let config = manager.get_import_config().unwrap();
        assert_eq!(config.conflict_max_retries, 1);
        assert_eq!(config.import_mode, ImportMode::CreateOnly);
        assert!(config.halt_on_unresolvable_conflicts);
        assert_eq!(config.conflict_resolution.sku_resolution.strategy, SkuStrategy::UseExisting);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let manager = manager();
        manager.set_config_value(config_keys::HANDLE_CONFLICTS, "maybe").unwrap();
        assert!(matches!(
            manager.get_import_config(),
            Err(ImportError::ConfigValueError { .. })
        ));
    }
}
