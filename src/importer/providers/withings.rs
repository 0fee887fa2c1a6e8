// ==========================================
// Withings 健康数据导出
// ==========================================
// 同一容器格式下按已填充列区分测量类型:
// - activities.csv       Activity type + Data(JSON)  → steps
// - bp.csv               Systolic + Diastolic        → blood_pressure
// - height.csv           Height (m)                  → height
// - weight.csv           Weight (kg)                 → weight
// - sleep.csv            light (s) + deep (s)        → sleep
// - body_temperature.csv value (°C)                  → body_temperature
// 生命体征缺失时拒绝该行，不补 0
// ==========================================

use crate::domain::record::{CanonicalRecord, ParsedDocument, ParsedRow, SourceItem};
use crate::domain::types::Table;
use crate::importer::data_cleaner::{normalize_null, parse_f64, parse_i64, round2};
use crate::importer::error::ImportResult;
use crate::importer::provider_trait::{MappingContext, ProviderMapper};
use crate::importer::time_parser::parse_timestamp_millis;
use tracing::warn;

const TEMPERATURE_COLUMN: &str = "value (°C)";

pub struct WithingsMapper;

/// 测量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measurement {
    Activity,
    BloodPressure,
    Height,
    Weight,
    Sleep,
    Temperature,
}

impl Measurement {
    fn of(row: &ParsedRow) -> Option<Measurement> {
        if row.contains("Activity type") && row.contains("Data") {
            Some(Measurement::Activity)
        } else if row.contains("Systolic") && row.contains("Diastolic") {
            Some(Measurement::BloodPressure)
        } else if row.contains("Height (m)") {
            Some(Measurement::Height)
        } else if row.contains("Weight (kg)") {
            Some(Measurement::Weight)
        } else if row.contains("light (s)") && row.contains("deep (s)") {
            Some(Measurement::Sleep)
        } else if row.contains(TEMPERATURE_COLUMN) {
            Some(Measurement::Temperature)
        } else {
            None
        }
    }
}

impl ProviderMapper for WithingsMapper {
    fn name(&self) -> &'static str {
        "withings"
    }

    fn display_name(&self) -> &'static str {
        "WithingsImporter"
    }

    fn detect(&self, document: &ParsedDocument) -> bool {
        document.first_row().and_then(Measurement::of).is_some()
    }

    fn map_row(
        &self,
        item: &SourceItem,
        ctx: &MappingContext,
    ) -> ImportResult<Option<CanonicalRecord>> {
        let Some(row) = item.as_row() else {
            return Ok(None);
        };
        let timestamp = |column: &str| {
            row.get(column)
                .and_then(|v| parse_timestamp_millis(v, &ctx.zone))
        };

        let record = match Measurement::of(row) {
            Some(Measurement::Activity) => map_activity(row, timestamp("from")),
            Some(Measurement::BloodPressure) => {
                let systolic = parse_i64(row.get("Systolic"), "Systolic")?;
                let diastolic = parse_i64(row.get("Diastolic"), "Diastolic")?;
                match (timestamp("Date"), systolic, diastolic) {
                    (Some(ts), Some(systolic), Some(diastolic)) => Some(
                        CanonicalRecord::new(Table::BloodPressure, ts)
                            .with("systolic_mmhg", systolic)
                            .with("diastolic_mmhg", diastolic)
                            .with("heart_rate_bpm", parse_i64(row.get("Heart rate"), "Heart rate")?),
                    ),
                    _ => None,
                }
            }
            Some(Measurement::Height) => {
                vital(row, timestamp("Date"), Table::Height, "Height (m)", "height_m")?
            }
            Some(Measurement::Weight) => {
                vital(row, timestamp("Date"), Table::Weight, "Weight (kg)", "weight_kg")?
            }
            Some(Measurement::Sleep) => map_sleep(row, timestamp("to")),
            Some(Measurement::Temperature) => vital(
                row,
                timestamp("date"),
                Table::BodyTemperature,
                TEMPERATURE_COLUMN,
                "temperature_c",
            )?,
            None => None,
        };

        Ok(record)
    }

    fn table(&self) -> Option<Table> {
        None
    }
}

/// 单值生命体征：值缺失则跳过
fn vital(
    row: &ParsedRow,
    timestamp: Option<i64>,
    table: Table,
    column: &str,
    field: &'static str,
) -> ImportResult<Option<CanonicalRecord>> {
    let value = parse_f64(row.get(column), column)?;
    Ok(match (timestamp, value) {
        (Some(ts), Some(value)) => Some(CanonicalRecord::new(table, ts).with(field, value)),
        _ => None,
    })
}

/// 活动记录：Data 列为 JSON，仅导入 steps > 0 的活动
fn map_activity(row: &ParsedRow, timestamp: Option<i64>) -> Option<CanonicalRecord> {
    let raw = normalize_null(row.get("Data"))?;
    let data: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "活动 Data 列 JSON 解析失败");
            return None;
        }
    };

    let steps = data.get("steps").and_then(json_number).unwrap_or(0.0);
    if steps <= 0.0 {
        return None;
    }

    Some(
        CanonicalRecord::new(Table::Steps, timestamp?)
            .with("count", steps.trunc() as i64)
            .with("type", normalize_null(row.get("Activity type")).map(str::to_string))
            .with("distance", data.get("distance").and_then(serde_json::Value::as_f64))
            .with("calories", data.get("calories").and_then(serde_json::Value::as_f64)),
    )
}

/// JSON 数值；导出中偶有以字符串存放的数字
fn json_number(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|v| v.is_finite())
}

/// 睡眠记录：以醒来时间 `to` 为时间戳，总时长 = light + deep + rem
fn map_sleep(row: &ParsedRow, timestamp: Option<i64>) -> Option<CanonicalRecord> {
    let seconds = |column: &str| -> Option<i64> {
        match normalize_null(row.get(column)) {
            None => Some(0),
            Some(_) => parse_i64(row.get(column), column).ok().flatten(),
        }
    };
    let light = seconds("light (s)")?;
    let deep = seconds("deep (s)")?;
    let rem = seconds("rem (s)")?;
    let awake = seconds("awake (s)")?;

    let total = light + deep + rem;
    if total <= 0 {
        return None;
    }

    Some(
        CanonicalRecord::new(Table::Sleep, timestamp?)
            .with("duration_hours", round2(total as f64 / 3600.0))
            .with("light_seconds", light)
            .with("deep_seconds", deep)
            .with("rem_seconds", rem)
            .with("awake_seconds", awake),
    )
}
