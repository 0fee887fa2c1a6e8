// ==========================================
// 个人数据导入管道 - 领域类型定义
// ==========================================
// 职责: 规范表目录（表名 / 列 / 身份键）与内容类型枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Table - 规范表
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Weight,
    Sleep,
    Steps,
    BloodPressure,
    Height,
    BodyTemperature,
    Location,
    Transactions,
    ElectricityGridHourly,
    ElectricitySolarHourly,
    GasDaily,
}

/// 时间序列表的身份键
const TIMESTAMP_KEY: &[&str] = &["timestamp"];

/// 交易表的复合身份键
const TRANSACTION_KEY: &[&str] = &["timestamp", "description", "amount"];

impl Table {
    /// 全部规范表（建表顺序）
    pub const ALL: [Table; 11] = [
        Table::Weight,
        Table::Sleep,
        Table::Steps,
        Table::BloodPressure,
        Table::Height,
        Table::BodyTemperature,
        Table::Location,
        Table::Transactions,
        Table::ElectricityGridHourly,
        Table::ElectricitySolarHourly,
        Table::GasDaily,
    ];

    /// 物理表名
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Weight => "weight",
            Table::Sleep => "sleep",
            Table::Steps => "steps",
            Table::BloodPressure => "blood_pressure",
            Table::Height => "height",
            Table::BodyTemperature => "body_temperature",
            Table::Location => "location",
            Table::Transactions => "transactions",
            Table::ElectricityGridHourly => "electricity_grid_hourly",
            Table::ElectricitySolarHourly => "electricity_solar_hourly",
            Table::GasDaily => "gas_daily",
        }
    }

    /// 按表名解析
    pub fn parse(name: &str) -> Option<Table> {
        Table::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// 身份键列
    ///
    /// # 规则
    /// - transactions: (timestamp, description, amount)
    /// - 其余时间序列表: timestamp
    pub fn identity_key(&self) -> &'static [&'static str] {
        match self {
            Table::Transactions => TRANSACTION_KEY,
            _ => TIMESTAMP_KEY,
        }
    }

    /// 列定义（列名, SQLite 类型），不含代理键 id
    pub fn columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Table::Weight => &[("timestamp", "INTEGER"), ("weight_kg", "REAL")],
            Table::Sleep => &[
                ("timestamp", "INTEGER"),
                ("duration_hours", "REAL"),
                ("light_seconds", "INTEGER"),
                ("deep_seconds", "INTEGER"),
                ("rem_seconds", "INTEGER"),
                ("awake_seconds", "INTEGER"),
            ],
            Table::Steps => &[
                ("timestamp", "INTEGER"),
                ("count", "INTEGER"),
                ("type", "TEXT"),
                ("distance", "REAL"),
                ("calories", "REAL"),
            ],
            Table::BloodPressure => &[
                ("timestamp", "INTEGER"),
                ("systolic_mmhg", "INTEGER"),
                ("diastolic_mmhg", "INTEGER"),
                ("heart_rate_bpm", "INTEGER"),
            ],
            Table::Height => &[("timestamp", "INTEGER"), ("height_m", "REAL")],
            Table::BodyTemperature => &[("timestamp", "INTEGER"), ("temperature_c", "REAL")],
            Table::Location => &[("timestamp", "INTEGER"), ("lat", "REAL"), ("lng", "REAL")],
            Table::Transactions => &[
                ("timestamp", "INTEGER"),
                ("description", "TEXT"),
                ("amount", "REAL"),
                ("account_id", "INTEGER"),
            ],
            Table::ElectricityGridHourly => &[
                ("timestamp", "INTEGER"),
                ("import_kwh", "REAL"),
                ("export_kwh", "REAL"),
            ],
            Table::ElectricitySolarHourly => &[
                ("timestamp", "INTEGER"),
                ("solar_kwh", "REAL"),
                ("consumption_kwh", "REAL"),
                ("from_grid_kwh", "REAL"),
            ],
            Table::GasDaily => &[("timestamp", "INTEGER"), ("usage_therms", "REAL")],
        }
    }

    /// 是否包含指定列
    pub fn has_column(&self, column: &str) -> bool {
        self.columns().iter().any(|(name, _)| *name == column)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// ContentKind - 文件内容类型
// ==========================================
// 由调用方显式指定，不从内容嗅探
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// 分隔符文本（CSV）
    Tabular,
    /// JSON 文档
    Json,
}

impl ContentKind {
    /// 未显式指定时的默认规则：`.json` 后缀为 JSON，其余一律按表格处理
    pub fn from_filename(filename: &str) -> ContentKind {
        if filename.to_ascii_lowercase().ends_with(".json") {
            ContentKind::Json
        } else {
            ContentKind::Tabular
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_round_trip_through_parse() {
        for table in Table::ALL {
            assert_eq!(Table::parse(table.as_str()), Some(table));
        }
        assert_eq!(Table::parse("movies"), None);
    }

    #[test]
    fn test_identity_keys() {
        assert_eq!(Table::Weight.identity_key(), &["timestamp"]);
        assert_eq!(
            Table::Transactions.identity_key(),
            &["timestamp", "description", "amount"]
        );
    }

    #[test]
    fn test_every_table_has_timestamp_and_key_columns() {
        for table in Table::ALL {
            assert!(table.has_column("timestamp"), "{} 缺少 timestamp", table);
            for key in table.identity_key() {
                assert!(table.has_column(key));
            }
        }
    }

    #[test]
    fn test_content_kind_from_filename() {
        assert_eq!(ContentKind::from_filename("Timeline.JSON"), ContentKind::Json);
        assert_eq!(ContentKind::from_filename("weight.csv"), ContentKind::Tabular);
        assert_eq!(ContentKind::from_filename("data"), ContentKind::Tabular);
    }
}
