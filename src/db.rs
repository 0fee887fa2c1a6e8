// ==========================================
// 个人数据导入管道 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表: 规范表 + 身份键索引 + config_kv + import_batch
// ==========================================

use crate::domain::types::Table;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PDI_DB_PATH";

/// 默认数据库文件名
pub const DEFAULT_DB_FILE: &str = "personal_data.db";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 规范表建表语句
fn create_table_sql(table: Table) -> String {
    let columns = table
        .columns()
        .iter()
        .map(|(name, sql_type)| format!("{} {}", name, sql_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY, {});",
        table, columns
    )
}

/// 身份键索引（非唯一，去重由对账流程保证）
fn create_identity_index_sql(table: Table) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{}_identity ON {} ({});",
        table,
        table,
        table.identity_key().join(", ")
    )
}

/// 幂等建表
///
/// 已存在的表保持原样（包括调用方预先建立的约束）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    let mut sql = String::new();
    for table in Table::ALL {
        sql.push_str(&create_table_sql(table));
        sql.push('\n');
        sql.push_str(&create_identity_index_sql(table));
        sql.push('\n');
    }

    sql.push_str(
        r#"
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS import_batch (
            batch_id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            provider TEXT,
            outcome TEXT NOT NULL,
            success_rows INTEGER NOT NULL DEFAULT 0,
            error_rows INTEGER NOT NULL DEFAULT 0,
            skipped_rows INTEGER NOT NULL DEFAULT 0,
            updated_rows INTEGER NOT NULL DEFAULT 0,
            elapsed_ms INTEGER NOT NULL DEFAULT 0,
            imported_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    );

    conn.execute_batch(&sql)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// # 优先级
/// 1. 环境变量 PDI_DB_PATH
/// 2. 用户数据目录/personal-data-import/personal_data.db
/// 3. ./personal_data.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        if !path.trim().is_empty() {
            return path;
        }
    }

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join("personal-data-import");
        if std::fs::create_dir_all(&app_dir).is_ok() {
            return app_dir.join(DEFAULT_DB_FILE).to_string_lossy().to_string();
        }
    }

    PathBuf::from(DEFAULT_DB_FILE).to_string_lossy().to_string()
}
