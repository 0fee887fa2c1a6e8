use crate::domain::import::{ImportBatch, ImportOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ImportBatchRepository - 导入批次仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入批次记录
    ///
    /// # 返回
    /// - `Ok(batch_id)`
    pub fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, file_name, provider, outcome,
                success_rows, error_rows, skipped_rows, updated_rows,
                elapsed_ms, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.provider,
                batch.outcome.as_str(),
                batch.success_rows,
                batch.error_rows,
                batch.skipped_rows,
                batch.updated_rows,
                batch.elapsed_ms,
                batch.imported_at.to_rfc3339(),
            ],
        )?;
        Ok(batch.batch_id.clone())
    }

    /// 最近的批次记录（按导入时间倒序）
    pub fn get_recent_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, provider, outcome,
                   success_rows, error_rows, skipped_rows, updated_rows,
                   elapsed_ms, imported_at
            FROM import_batch
            ORDER BY imported_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let batches = stmt
            .query_map(params![limit as i64], map_batch_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    /// 按批次 ID 查询
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, provider, outcome,
                   success_rows, error_rows, skipped_rows, updated_rows,
                   elapsed_ms, imported_at
            FROM import_batch
            WHERE batch_id = ?1
            "#,
        )?;

        match stmt.query_row(params![batch_id], map_batch_row) {
            Ok(batch) => Ok(Some(batch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn map_batch_row(row: &Row) -> SqliteResult<ImportBatch> {
    let outcome: String = row.get(3)?;
    let imported_at: String = row.get(9)?;
    Ok(ImportBatch {
        batch_id: row.get(0)?,
        file_name: row.get(1)?,
        provider: row.get(2)?,
        // 未知取值按 Completed 兜底
        outcome: ImportOutcome::parse(&outcome).unwrap_or(ImportOutcome::Completed),
        success_rows: row.get(4)?,
        error_rows: row.get(5)?,
        skipped_rows: row.get(6)?,
        updated_rows: row.get(7)?,
        elapsed_ms: row.get(8)?,
        imported_at: DateTime::parse_from_rfc3339(&imported_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
