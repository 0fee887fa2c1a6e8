// ==========================================
// 个人数据导入管道 - 规范表存取
// ==========================================
// 职责: 面向规范表的参数化 查询 / 插入 / 更新 原语
// 约束:
// - 表名来自 Table 枚举，列名必须出现在 Table::columns 中
// - 值一律走参数绑定
// - 身份键比较使用 IS（NULL 与 NULL 视为相同）
// ==========================================

use crate::domain::types::Table;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

// ==========================================
// RecordStore Trait
// ==========================================
// 实现者: SqliteRecordStore（测试中另有失败注入实现）
pub trait RecordStore {
    /// 按身份键查找已有行，返回代理键 id
    fn find_row_id(&self, table: Table, key: &[(&str, &Value)]) -> RepositoryResult<Option<i64>>;

    /// 插入一行，返回新行 id
    fn insert_row(&self, table: Table, fields: &[(&str, Value)]) -> RepositoryResult<i64>;

    /// 按 id 部分更新，返回受影响行数
    fn update_row(&self, table: Table, id: i64, fields: &[(&str, Value)]) -> RepositoryResult<usize>;

    /// 表内行数
    fn count_rows(&self, table: Table) -> RepositoryResult<i64>;
}

fn check_columns<'a>(table: Table, columns: impl IntoIterator<Item = &'a str>) -> RepositoryResult<()> {
    for column in columns {
        if !table.has_column(column) {
            return Err(RepositoryError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

// ==========================================
// SqliteRecordStore
// ==========================================
// 借用连接（或事务，Transaction 解引用为 Connection）
pub struct SqliteRecordStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRecordStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// 通用只读查询
    ///
    /// # 参数
    /// - sql: 带占位符的 SQL
    /// - params: 位置参数
    ///
    /// # 返回
    /// - 每行按列顺序的值
    pub fn query(&self, sql: &str, params: &[Value]) -> RepositoryResult<Vec<Vec<Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..column_count)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

impl<'c> RecordStore for SqliteRecordStore<'c> {
    fn find_row_id(&self, table: Table, key: &[(&str, &Value)]) -> RepositoryResult<Option<i64>> {
        if key.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "identity_key".to_string(),
                message: format!("{} 身份键为空", table),
            });
        }
        check_columns(table, key.iter().map(|(c, _)| *c))?;

        let predicate = key
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} IS ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!("SELECT id FROM {} WHERE {} LIMIT 1", table, predicate);

        let id = self
            .conn
            .query_row(&sql, params_from_iter(key.iter().map(|(_, v)| *v)), |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(id)
    }

    fn insert_row(&self, table: Table, fields: &[(&str, Value)]) -> RepositoryResult<i64> {
        if fields.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "fields".to_string(),
                message: format!("{} 插入字段为空", table),
            });
        }
        check_columns(table, fields.iter().map(|(c, _)| *c))?;

        let columns = fields.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ");
        let placeholders = (1..=fields.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, columns, placeholders);

        self.conn
            .execute(&sql, params_from_iter(fields.iter().map(|(_, v)| v)))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_row(&self, table: Table, id: i64, fields: &[(&str, Value)]) -> RepositoryResult<usize> {
        if fields.is_empty() {
            return Ok(0);
        }
        check_columns(table, fields.iter().map(|(c, _)| *c))?;

        let assignments = fields
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            assignments,
            fields.len() + 1
        );

        let mut values: Vec<&Value> = fields.iter().map(|(_, v)| v).collect();
        let id_value = Value::Integer(id);
        values.push(&id_value);

        let affected = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(affected)
    }

    fn count_rows(&self, table: Table) -> RepositoryResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }
}
