// ==========================================
// 个人数据导入管道 - 对账（身份键 Upsert）
// ==========================================
// 流程: find_existing → 命中则部分更新，否则插入
// 规则:
// - 更新只写入非 NULL 的非键字段，从不以 NULL 覆盖已存值
// - 更新字段集为空时不发出语句
// - 插入时缺失 / NULL 的字段用 Provider 声明的默认值补齐
// ==========================================

use crate::domain::record::CanonicalRecord;
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::RecordStore;
use rusqlite::types::Value;
use tracing::trace;

static NULL_VALUE: Value = Value::Null;

/// 单条记录的对账结果（携带行 id）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Inserted(i64),
    Updated(i64),
    /// 命中已有行，但没有可更新的字段
    Unchanged(i64),
}

pub struct Reconciler<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 按身份键查找已有行
    ///
    /// 记录中缺失的键字段按 NULL 参与比较
    pub fn find_existing(&self, record: &CanonicalRecord) -> RepositoryResult<Option<i64>> {
        let key: Vec<(&str, &Value)> = record
            .table
            .identity_key()
            .iter()
            .map(|column| (*column, record.get(column).unwrap_or(&NULL_VALUE)))
            .collect();
        self.store.find_row_id(record.table, &key)
    }

    /// 插入新行
    ///
    /// # 参数
    /// - defaults: 可选字段的默认值（字段缺失或为 NULL 时使用）
    pub fn insert(
        &self,
        record: &CanonicalRecord,
        defaults: &[(&'static str, Value)],
    ) -> RepositoryResult<i64> {
        let mut fields: Vec<(&str, Value)> = Vec::with_capacity(record.data.len() + defaults.len());
        for (field, value) in &record.data {
            let value = match value {
                Value::Null => defaults
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, default)| default.clone())
                    .unwrap_or(Value::Null),
                other => other.clone(),
            };
            fields.push((*field, value));
        }
        for (name, default) in defaults {
            if record.get(name).is_none() {
                fields.push((*name, default.clone()));
            }
        }
        self.store.insert_row(record.table, &fields)
    }

    /// 部分更新已有行
    ///
    /// # 返回
    /// - Ok(true): 发出了更新
    /// - Ok(false): 无可更新字段（no-op）
    pub fn update(&self, id: i64, record: &CanonicalRecord) -> RepositoryResult<bool> {
        let key = record.table.identity_key();
        let fields: Vec<(&str, Value)> = record
            .data
            .iter()
            .filter(|(field, value)| {
                *field != "id" && !key.contains(field) && !matches!(value, Value::Null)
            })
            .map(|(field, value)| (*field, value.clone()))
            .collect();

        if fields.is_empty() {
            return Ok(false);
        }
        self.store.update_row(record.table, id, &fields)?;
        Ok(true)
    }

    /// 对账单条记录
    pub fn reconcile(
        &self,
        record: &CanonicalRecord,
        defaults: &[(&'static str, Value)],
    ) -> RepositoryResult<ReconcileAction> {
        match self.find_existing(record)? {
            Some(id) => {
                let action = if self.update(id, record)? {
                    ReconcileAction::Updated(id)
                } else {
                    ReconcileAction::Unchanged(id)
                };
                trace!(table = %record.table, id, ?action, "已有记录");
                Ok(action)
            }
            None => {
                let id = self.insert(record, defaults)?;
                trace!(table = %record.table, id, "新增记录");
                Ok(ReconcileAction::Inserted(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Table;
    use crate::repository::error::RepositoryError;
    use std::cell::RefCell;

    /// 内存实现，记录每次调用
    #[derive(Default)]
    struct MemoryStore {
        rows: RefCell<Vec<(Table, Vec<(String, Value)>)>>,
        updates: RefCell<Vec<(i64, Vec<(String, Value)>)>>,
        fail_writes: bool,
    }

    impl RecordStore for MemoryStore {
        fn find_row_id(&self, table: Table, key: &[(&str, &Value)]) -> RepositoryResult<Option<i64>> {
            let rows = self.rows.borrow();
            Ok(rows
                .iter()
                .position(|(t, fields)| {
                    *t == table
                        && key.iter().all(|(column, value)| {
                            let stored = fields
                                .iter()
                                .find(|(c, _)| c == column)
                                .map(|(_, v)| v)
                                .unwrap_or(&NULL_VALUE);
                            stored == *value
                        })
                })
                .map(|i| i as i64 + 1))
        }

        fn insert_row(&self, table: Table, fields: &[(&str, Value)]) -> RepositoryResult<i64> {
            if self.fail_writes {
                return Err(RepositoryError::ConstraintViolation("CHECK constraint failed".into()));
            }
            let mut rows = self.rows.borrow_mut();
            rows.push((
                table,
                fields.iter().map(|(c, v)| (c.to_string(), v.clone())).collect(),
            ));
            Ok(rows.len() as i64)
        }

        fn update_row(&self, _table: Table, id: i64, fields: &[(&str, Value)]) -> RepositoryResult<usize> {
            self.updates.borrow_mut().push((
                id,
                fields.iter().map(|(c, v)| (c.to_string(), v.clone())).collect(),
            ));
            Ok(1)
        }

        fn count_rows(&self, table: Table) -> RepositoryResult<i64> {
            Ok(self.rows.borrow().iter().filter(|(t, _)| *t == table).count() as i64)
        }
    }

    fn weight(ts: i64, kg: Option<f64>) -> CanonicalRecord {
        CanonicalRecord::new(Table::Weight, ts).with("weight_kg", kg)
    }

    #[test]
    fn test_insert_then_update() {
        let reconciler = Reconciler::new(MemoryStore::default());

        let first = reconciler.reconcile(&weight(1, Some(75.5)), &[]).unwrap();
        assert_eq!(first, ReconcileAction::Inserted(1));

        let second = reconciler.reconcile(&weight(1, Some(76.0)), &[]).unwrap();
        assert_eq!(second, ReconcileAction::Updated(1));
        assert_eq!(reconciler.store().count_rows(Table::Weight).unwrap(), 1);

        let updates = reconciler.store().updates.borrow();
        assert_eq!(updates[0].1, vec![("weight_kg".to_string(), Value::Real(76.0))]);
    }

    #[test]
    fn test_null_fields_never_update() {
        let reconciler = Reconciler::new(MemoryStore::default());
        reconciler.reconcile(&weight(1, Some(75.5)), &[]).unwrap();

        let action = reconciler.reconcile(&weight(1, None), &[]).unwrap();
        assert_eq!(action, ReconcileAction::Unchanged(1));
        assert!(reconciler.store().updates.borrow().is_empty());
    }

    #[test]
    fn test_update_excludes_identity_columns() {
        let reconciler = Reconciler::new(MemoryStore::default());
        let tx = CanonicalRecord::new(Table::Transactions, 10)
            .with("description", "Coffee".to_string())
            .with("amount", -4.5)
            .with("account_id", 1_i64);
        reconciler.reconcile(&tx, &[]).unwrap();
        reconciler.reconcile(&tx.clone().with("account_id", 2_i64), &[]).unwrap();

        let updates = reconciler.store().updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1, vec![("account_id".to_string(), Value::Integer(2))]);
    }

    #[test]
    fn test_composite_key_distinguishes_amounts() {
        let reconciler = Reconciler::new(MemoryStore::default());
        let a = CanonicalRecord::new(Table::Transactions, 10)
            .with("description", "Coffee".to_string())
            .with("amount", -4.5);
        let b = a.clone().with("amount", -5.0);
        assert!(matches!(reconciler.reconcile(&a, &[]).unwrap(), ReconcileAction::Inserted(_)));
        assert!(matches!(reconciler.reconcile(&b, &[]).unwrap(), ReconcileAction::Inserted(_)));
        assert_eq!(reconciler.store().count_rows(Table::Transactions).unwrap(), 2);
    }

    #[test]
    fn test_insert_fills_defaults() {
        let reconciler = Reconciler::new(MemoryStore::default());
        let record = CanonicalRecord::new(Table::ElectricitySolarHourly, 1)
            .with("solar_kwh", Option::<f64>::None);
        let defaults = vec![
            ("solar_kwh", Value::Real(0.0)),
            ("from_grid_kwh", Value::Real(0.0)),
        ];
        reconciler.insert(&record, &defaults).unwrap();

        let rows = reconciler.store().rows.borrow();
        let fields = &rows[0].1;
        assert!(fields.contains(&("solar_kwh".to_string(), Value::Real(0.0))));
        assert!(fields.contains(&("from_grid_kwh".to_string(), Value::Real(0.0))));
    }

    #[test]
    fn test_store_errors_propagate() {
        let reconciler = Reconciler::new(MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        });
        let result = reconciler.reconcile(&weight(1, Some(1.0)), &[]);
        assert!(matches!(result, Err(RepositoryError::ConstraintViolation(_))));
    }
}
