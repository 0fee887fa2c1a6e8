// ==========================================
// 个人数据导入管道 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::time_parser::LocalZone;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 默认账户 ID
pub const DEFAULT_ACCOUNT_ID: i64 = 1;

/// 默认消息语言
pub const DEFAULT_LOCALE: &str = "en";

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

    fn lock_error(key: &str, e: impl std::fmt::Display) -> ImportError {
        ImportError::ConfigRead {
            key: key.to_string(),
            message: format!("锁获取失败: {}", e),
        }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| Self::lock_error(key, e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ImportError::ConfigRead {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self.conn.lock().map_err(|e| Self::lock_error(key, e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )
        .map_err(|e| ImportError::ConfigRead {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

// ==========================================
// ImportConfigReader 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_default_account_id(&self) -> ImportResult<i64> {
        let Some(value) = self.get_global_config_value(config_keys::DEFAULT_ACCOUNT_ID)? else {
            return Ok(DEFAULT_ACCOUNT_ID);
        };
        Ok(value.trim().parse::<i64>().unwrap_or_else(|_| {
            warn!(
                config_key = config_keys::DEFAULT_ACCOUNT_ID,
                raw_value = %value,
                "默认账户配置格式错误，使用默认值"
            );
            DEFAULT_ACCOUNT_ID
        }))
    }

    async fn get_local_zone(&self) -> ImportResult<LocalZone> {
        let Some(value) = self.get_global_config_value(config_keys::UTC_OFFSET_MINUTES)? else {
            return Ok(LocalZone::System);
        };
        let zone = value
            .trim()
            .parse::<i32>()
            .ok()
            .and_then(LocalZone::from_offset_minutes);
        Ok(zone.unwrap_or_else(|| {
            warn!(
                config_key = config_keys::UTC_OFFSET_MINUTES,
                raw_value = %value,
                "UTC 偏移配置无效，使用系统时区"
            );
            LocalZone::System
        }))
    }

    async fn get_locale(&self) -> ImportResult<String> {
        Ok(self
            .get_global_config_value(config_keys::LOCALE)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string()))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// 交易默认账户
    pub const DEFAULT_ACCOUNT_ID: &str = "import.default_account_id";
    /// 无偏移时间的固定 UTC 偏移（分钟，东正西负）
    pub const UTC_OFFSET_MINUTES: &str = "import.utc_offset_minutes";
    /// 结果消息语言
    pub const LOCALE: &str = "import.locale";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = manager();
        assert_eq!(config.get_default_account_id().await.unwrap(), 1);
        assert_eq!(config.get_local_zone().await.unwrap(), LocalZone::System);
        assert_eq!(config.get_locale().await.unwrap(), "en");
    }

    #[tokio::test]
    async fn test_configured_values() {
        let config = manager();
        config.set_global_config_value(config_keys::DEFAULT_ACCOUNT_ID, "7").unwrap();
        config.set_global_config_value(config_keys::UTC_OFFSET_MINUTES, "-480").unwrap();
        config.set_global_config_value(config_keys::LOCALE, "zh-CN").unwrap();

        assert_eq!(config.get_default_account_id().await.unwrap(), 7);
        assert_eq!(
            config.get_local_zone().await.unwrap(),
            LocalZone::Fixed(FixedOffset::west_opt(8 * 3600).unwrap())
        );
        assert_eq!(config.get_locale().await.unwrap(), "zh-CN");
    }

    #[tokio::test]
    async fn test_invalid_values_fall_back() {
        let config = manager();
        config.set_global_config_value(config_keys::DEFAULT_ACCOUNT_ID, "abc").unwrap();
        config.set_global_config_value(config_keys::UTC_OFFSET_MINUTES, "99999").unwrap();

        assert_eq!(config.get_default_account_id().await.unwrap(), 1);
        assert_eq!(config.get_local_zone().await.unwrap(), LocalZone::System);
    }

    #[test]
    fn test_set_overwrites() {
        let config = manager();
        config.set_global_config_value(config_keys::LOCALE, "en").unwrap();
        config.set_global_config_value(config_keys::LOCALE, "zh-CN").unwrap();
        assert_eq!(
            config.get_global_config_value(config_keys::LOCALE).unwrap().as_deref(),
            Some("zh-CN")
        );
    }
}
