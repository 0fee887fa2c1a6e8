// ==========================================
// 个人数据导入管道 - 记录结构
// ==========================================
// ParsedRow: 表头 → 字段值（保持文件列顺序）
// SourceItem: 交给 Mapper 的单个条目（表格行 / JSON 条目）
// CanonicalRecord: 规范记录 {table, data}
// ==========================================

use crate::domain::types::Table;
use rusqlite::types::Value;

// ==========================================
// ParsedRow - 解析后的行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRow {
    fields: Vec<(String, String)>,
}

impl ParsedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入字段；同名表头后写覆盖先写，位置保持首次出现的位置
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(h, _)| *h == header) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((header, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// 取第一个存在且非空（去空白后）的字段
    pub fn first_non_empty(&self, headers: &[&str]) -> Option<&str> {
        headers
            .iter()
            .filter_map(|h| self.get(h))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.fields.iter().any(|(h, _)| h == header)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParsedRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = ParsedRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

// ==========================================
// ParsedDocument - 解码后的整份文件
// ==========================================
#[derive(Debug, Clone)]
pub enum ParsedDocument {
    Rows(Vec<ParsedRow>),
    Json(serde_json::Value),
}

impl ParsedDocument {
    /// 表格文件的首行
    pub fn first_row(&self) -> Option<&ParsedRow> {
        match self {
            ParsedDocument::Rows(rows) => rows.first(),
            ParsedDocument::Json(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParsedDocument::Rows(rows) => rows.is_empty(),
            ParsedDocument::Json(serde_json::Value::Null) => true,
            ParsedDocument::Json(serde_json::Value::Array(items)) => items.is_empty(),
            ParsedDocument::Json(serde_json::Value::Object(map)) => map.is_empty(),
            ParsedDocument::Json(_) => false,
        }
    }
}

// ==========================================
// SourceItem - 单个待映射条目
// ==========================================
#[derive(Debug, Clone)]
pub enum SourceItem {
    Row(ParsedRow),
    Json(serde_json::Value),
}

impl SourceItem {
    pub fn as_row(&self) -> Option<&ParsedRow> {
        match self {
            SourceItem::Row(row) => Some(row),
            SourceItem::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            SourceItem::Json(value) => Some(value),
            SourceItem::Row(_) => None,
        }
    }
}

// ==========================================
// CanonicalRecord - 规范记录
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub table: Table,
    pub data: Vec<(&'static str, Value)>,
}

impl CanonicalRecord {
    /// 以 UTC 毫秒时间戳创建记录
    pub fn new(table: Table, timestamp_ms: i64) -> Self {
        Self {
            table,
            data: vec![("timestamp", Value::Integer(timestamp_ms))],
        }
    }

    /// 追加 / 覆盖字段
    pub fn with(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.data.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.data.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self.get("timestamp") {
            Some(Value::Integer(ts)) => Some(*ts),
            _ => None,
        }
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        match self.get(field) {
            Some(Value::Real(v)) => Some(*v),
            Some(Value::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        match self.get(field) {
            Some(Value::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, field: &str) -> Option<&str> {
        match self.get(field) {
            Some(Value::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_row_duplicate_header_overwrites_in_place() {
        let mut row = ParsedRow::new();
        row.insert("Date", "a");
        row.insert("Value", "1");
        row.insert("Date", "b");

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("Date"), Some("b"));
        assert_eq!(row.headers().collect::<Vec<_>>(), vec!["Date", "Value"]);
    }

    #[test]
    fn test_first_non_empty_skips_blank_values() {
        let row: ParsedRow = vec![("Usage", " "), ("USAGE (therms)", "5.19")]
            .into_iter()
            .collect();
        assert_eq!(row.first_non_empty(&["Usage", "USAGE (therms)"]), Some("5.19"));
        assert_eq!(row.first_non_empty(&["Missing"]), None);
    }

    #[test]
    fn test_canonical_record_builder() {
        let record = CanonicalRecord::new(Table::Weight, 1_000)
            .with("weight_kg", 75.5)
            .with("weight_kg", 76.0);

        assert_eq!(record.timestamp(), Some(1_000));
        assert_eq!(record.get_f64("weight_kg"), Some(76.0));
        assert_eq!(record.data.len(), 2);
    }

    #[test]
    fn test_canonical_record_option_becomes_null() {
        let record = CanonicalRecord::new(Table::BloodPressure, 1)
            .with("heart_rate_bpm", Option::<i64>::None);
        assert_eq!(record.get("heart_rate_bpm"), Some(&Value::Null));
    }
}
