// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、导入器构造、结果查询
// ==========================================

#![allow(dead_code)]

use personal_data_import::config::config_keys;
use personal_data_import::db::{ensure_schema, open_sqlite_connection};
use personal_data_import::{ConfigManager, DataImporterImpl};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 测试统一使用 UTC-8（分钟）
pub const TEST_UTC_OFFSET_MINUTES: &str = "-480";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开共享连接
pub fn open_shared(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()))
}

/// 创建测试用导入器（固定 UTC-8，保证时间戳可断言）
pub fn create_test_importer(db_path: &str) -> DataImporterImpl<ConfigManager> {
    let conn = open_shared(db_path);
    ensure_schema(&conn.lock().unwrap()).unwrap();
    let config = ConfigManager::from_connection(conn.clone());
    config
        .set_global_config_value(config_keys::UTC_OFFSET_MINUTES, TEST_UTC_OFFSET_MINUTES)
        .unwrap();
    DataImporterImpl::new(conn, config).unwrap()
}

/// 写入 global 配置
pub fn set_config(db_path: &str, key: &str, value: &str) {
    ConfigManager::from_connection(open_shared(db_path))
        .set_global_config_value(key, value)
        .unwrap();
}

/// 表行数
pub fn count_rows(db_path: &str, table: &str) -> i64 {
    let conn = Connection::open(db_path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

/// 按时间戳读取单列
pub fn value_at(db_path: &str, table: &str, column: &str, timestamp: i64) -> Value {
    let conn = Connection::open(db_path).unwrap();
    conn.query_row(
        &format!("SELECT {} FROM {} WHERE timestamp = ?1", column, table),
        [timestamp],
        |row| row.get(0),
    )
    .unwrap()
}
