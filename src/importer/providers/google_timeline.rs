// ==========================================
// Google 时间线导出（JSON）
// ==========================================
// 顶层: { "semanticSegments": [...] } 或 { "timelineObjects": [...] }
// 条目来源:
// - segment.timelinePath[]            { point, time }
// - segment.visit.topCandidate        placeLocation.latLng + segment.startTime
// 坐标格式: "45.75211°, 4.832149°"
// ==========================================

use crate::domain::record::{CanonicalRecord, ParsedDocument, SourceItem};
use crate::domain::types::Table;
use crate::importer::error::ImportResult;
use crate::importer::provider_trait::{MappingContext, ProviderMapper};
use crate::importer::time_parser::parse_timestamp_millis;
use serde_json::{json, Value as JsonValue};

const SEGMENT_KEYS: [&str; 2] = ["semanticSegments", "timelineObjects"];

pub struct GoogleTimelineMapper;

fn segments(document: &JsonValue) -> Option<&Vec<JsonValue>> {
    SEGMENT_KEYS
        .iter()
        .find_map(|key| document.get(*key).and_then(JsonValue::as_array))
}

/// 解析 "lat°, lng°"
fn parse_point(point: &str) -> Option<(f64, f64)> {
    let cleaned = point.replace('°', "");
    let mut parts = cleaned.split(',');
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    let lat = lat.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let lng = lng.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some((lat, lng))
}

impl ProviderMapper for GoogleTimelineMapper {
    fn name(&self) -> &'static str {
        "google_timeline"
    }

    fn display_name(&self) -> &'static str {
        "GoogleTimelineImporter"
    }

    fn detect(&self, document: &ParsedDocument) -> bool {
        match document {
            ParsedDocument::Json(value) => segments(value).is_some(),
            ParsedDocument::Rows(_) => false,
        }
    }

    fn extract_items(&self, document: ParsedDocument) -> Vec<SourceItem> {
        let ParsedDocument::Json(value) = document else {
            return Vec::new();
        };
        let Some(segments) = segments(&value) else {
            return Vec::new();
        };

        let mut items = Vec::new();
        for segment in segments {
            if let Some(path) = segment.get("timelinePath").and_then(JsonValue::as_array) {
                items.extend(path.iter().cloned().map(SourceItem::Json));
            } else if let Some(lat_lng) = segment
                .pointer("/visit/topCandidate/placeLocation")
                .and_then(|place| place.get("latLng"))
            {
                items.push(SourceItem::Json(json!({
                    "point": lat_lng,
                    "time": segment.get("startTime").cloned().unwrap_or(JsonValue::Null),
                })));
            }
        }
        items
    }

    fn map_row(
        &self,
        item: &SourceItem,
        ctx: &MappingContext,
    ) -> ImportResult<Option<CanonicalRecord>> {
        let Some(value) = item.as_json() else {
            return Ok(None);
        };
        let point = value.get("point").and_then(JsonValue::as_str);
        let time = value.get("time").and_then(JsonValue::as_str);
        let (Some(point), Some(time)) = (point, time) else {
            return Ok(None);
        };
        let Some((lat, lng)) = parse_point(point) else {
            return Ok(None);
        };
        let Some(timestamp) = parse_timestamp_millis(time, &ctx.zone) else {
            return Ok(None);
        };

        Ok(Some(
            CanonicalRecord::new(Table::Location, timestamp)
                .with("lat", lat)
                .with("lng", lng),
        ))
    }

    fn table(&self) -> Option<Table> {
        Some(Table::Location)
    }
}
