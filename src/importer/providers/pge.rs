// ==========================================
// PG&E 用电 / 用气区间数据
// ==========================================
// 文件结构: 若干行账户横幅 + 表头 TYPE,DATE,START TIME,END TIME,...
// TYPE 列决定目标表:
// - Electric usage    → electricity_grid_hourly
// - Natural gas usage → gas_daily
// ==========================================

use crate::domain::record::{CanonicalRecord, ParsedDocument, SourceItem};
use crate::domain::types::Table;
use crate::importer::data_cleaner::{f64_or_zero, first_non_zero};
use crate::importer::error::ImportResult;
use crate::importer::provider_trait::{MappingContext, ProviderMapper};
use crate::importer::time_parser::parse_date_and_time_millis;
use rusqlite::types::Value;

pub const ELECTRIC_USAGE: &str = "Electric usage";
pub const NATURAL_GAS_USAGE: &str = "Natural gas usage";

pub struct PgeMapper;

impl ProviderMapper for PgeMapper {
    fn name(&self) -> &'static str {
        "pge"
    }

    fn display_name(&self) -> &'static str {
        "PgeImporter"
    }

    fn detect(&self, document: &ParsedDocument) -> bool {
        let Some(first) = document.first_row() else {
            return false;
        };
        if first.contains("TYPE") && first.contains("START TIME") {
            return true;
        }
        // 横幅未剥离时类型值可能落在表头位置
        first.headers().any(|h| h == ELECTRIC_USAGE)
    }

    fn map_row(
        &self,
        item: &SourceItem,
        ctx: &MappingContext,
    ) -> ImportResult<Option<CanonicalRecord>> {
        let Some(row) = item.as_row() else {
            return Ok(None);
        };

        let kind = row.get("TYPE").or_else(|| row.get("Type")).map(str::trim);
        match kind {
            Some(ELECTRIC_USAGE) => {
                let (Some(date), Some(time)) = (row.get("DATE"), row.get("START TIME")) else {
                    return Ok(None);
                };
                let Some(timestamp) = parse_date_and_time_millis(date, time, &ctx.zone) else {
                    return Ok(None);
                };
                Ok(Some(
                    CanonicalRecord::new(Table::ElectricityGridHourly, timestamp)
                        .with("import_kwh", f64_or_zero(row.get("IMPORT (kWh)")))
                        .with("export_kwh", f64_or_zero(row.get("EXPORT (kWh)"))),
                ))
            }
            Some(NATURAL_GAS_USAGE) => {
                let date = row.first_non_empty(&["Date", "DATE"]);
                let time = row.first_non_empty(&["Start time", "START TIME"]);
                let (Some(date), Some(time)) = (date, time) else {
                    return Ok(None);
                };
                let Some(timestamp) = parse_date_and_time_millis(date, time, &ctx.zone) else {
                    return Ok(None);
                };
                let usage = first_non_zero(&[row.get("Usage"), row.get("USAGE (therms)")]);
                Ok(Some(
                    CanonicalRecord::new(Table::GasDaily, timestamp).with("usage_therms", usage),
                ))
            }
            _ => Ok(None),
        }
    }

    fn table(&self) -> Option<Table> {
        None
    }

    fn header_signature(&self) -> Option<&'static str> {
        Some("TYPE,DATE,START TIME")
    }

    fn insert_defaults(&self, table: Table) -> Vec<(&'static str, Value)> {
        match table {
            Table::ElectricityGridHourly => vec![
                ("import_kwh", Value::Real(0.0)),
                ("export_kwh", Value::Real(0.0)),
            ],
            Table::GasDaily => vec![("usage_therms", Value::Real(0.0))],
            _ => Vec::new(),
        }
    }
}
