// ==========================================
// Tesla 能源导出（光伏 / 家庭用电 / 电网取电）
// ==========================================
// 列: Date time,Home (kWh),Solar Energy (kWh),From Grid (kWh),...
// Date time 带时区偏移
// ==========================================

use crate::domain::record::{CanonicalRecord, ParsedDocument, SourceItem};
use crate::domain::types::Table;
use crate::importer::data_cleaner::f64_or_zero;
use crate::importer::error::ImportResult;
use crate::importer::provider_trait::{MappingContext, ProviderMapper};
use crate::importer::time_parser::parse_timestamp_millis;
use rusqlite::types::Value;

pub struct TeslaMapper;

impl ProviderMapper for TeslaMapper {
    fn name(&self) -> &'static str {
        "tesla"
    }

    fn display_name(&self) -> &'static str {
        "TeslaImporter"
    }

    fn detect(&self, document: &ParsedDocument) -> bool {
        document
            .first_row()
            .map(|row| row.headers().any(|h| h.contains("Solar Energy")))
            .unwrap_or(false)
    }

    fn map_row(
        &self,
        item: &SourceItem,
        ctx: &MappingContext,
    ) -> ImportResult<Option<CanonicalRecord>> {
        let Some(row) = item.as_row() else {
            return Ok(None);
        };
        let Some(timestamp) = row
            .get("Date time")
            .and_then(|v| parse_timestamp_millis(v, &ctx.zone))
        else {
            return Ok(None);
        };

        Ok(Some(
            CanonicalRecord::new(Table::ElectricitySolarHourly, timestamp)
                .with("solar_kwh", f64_or_zero(row.get("Solar Energy (kWh)")))
                .with("consumption_kwh", f64_or_zero(row.get("Home (kWh)")))
                .with("from_grid_kwh", f64_or_zero(row.get("From Grid (kWh)"))),
        ))
    }

    fn table(&self) -> Option<Table> {
        Some(Table::ElectricitySolarHourly)
    }

    fn insert_defaults(&self, _table: Table) -> Vec<(&'static str, Value)> {
        vec![
            ("solar_kwh", Value::Real(0.0)),
            ("consumption_kwh", Value::Real(0.0)),
            ("from_grid_kwh", Value::Real(0.0)),
        ]
    }
}
