// ==========================================
// 个人数据导入管道 - 时间戳解析
// ==========================================
// 目标: 各来源的异构时间表达 → UTC 毫秒
// - 带偏移（RFC 3339）: 精确换算
// - 无偏移日期时间: 按本地时区解释（系统时区或配置的固定偏移）
// - 仅日期（YYYY-MM-DD）: UTC 零点
// 解析失败返回 None，由 Mapper 跳过该行
// ==========================================

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// 无偏移时间的解释时区
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalZone {
    /// 运行环境的系统时区
    #[default]
    System,
    /// 固定 UTC 偏移
    Fixed(FixedOffset),
}

impl LocalZone {
    /// 由分钟偏移构造；超出 ±24h 返回 None
    pub fn from_offset_minutes(minutes: i32) -> Option<LocalZone> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(LocalZone::Fixed)
    }

    /// 本地日期时间 → UTC 毫秒
    ///
    /// DST 重叠取较早时刻；不存在的本地时间返回 None
    pub fn to_utc_millis(&self, naive: &NaiveDateTime) -> Option<i64> {
        match self {
            LocalZone::System => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.timestamp_millis()),
            LocalZone::Fixed(offset) => offset
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.timestamp_millis()),
        }
    }
}

/// 无偏移日期时间格式（按顺序尝试）
const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// 本地日期格式（本地零点）
const LOCAL_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y/%m/%d"];

/// 解析任意支持的时间字符串
pub fn parse_timestamp_millis(value: &str, zone: &LocalZone) -> Option<i64> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(ms) = parse_with_offset(s) {
        return Some(ms);
    }

    for format in LOCAL_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return zone.to_utc_millis(&naive);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).timestamp_millis());
    }

    for format in LOCAL_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return zone.to_utc_millis(&date.and_hms_opt(0, 0, 0)?);
        }
    }

    None
}

/// 日期列 + 时刻列（如 "2025-11-14" + "07:00"）按本地时区合成
pub fn parse_date_and_time_millis(date: &str, time: &str, zone: &LocalZone) -> Option<i64> {
    let date = date.trim();
    let time = time.trim();
    if date.is_empty() || time.is_empty() {
        return None;
    }
    parse_timestamp_millis(&format!("{} {}", date, time), zone)
}

/// 仅解析带显式偏移的时间
pub fn parse_with_offset(value: &str) -> Option<i64> {
    let s = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    // 无秒 / 空格分隔的变体
    for format in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.timestamp_millis());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pst() -> LocalZone {
        LocalZone::from_offset_minutes(-8 * 60).unwrap()
    }

    #[test]
    fn test_rfc3339_with_offset_ignores_zone() {
        let ms = parse_timestamp_millis("2025-11-01T00:00:00-07:00", &pst()).unwrap();
        assert_eq!(ms, 1_761_980_400_000);

        let ms = parse_timestamp_millis("2023-01-01T12:00:00Z", &LocalZone::System).unwrap();
        assert_eq!(ms, 1_672_574_400_000);

        let ms = parse_timestamp_millis("2009-11-14T08:48:00.000-08:00", &LocalZone::System).unwrap();
        assert_eq!(ms, 1_258_217_280_000);
    }

    #[test]
    fn test_local_datetime_uses_configured_offset() {
        // 2026-01-10 08:00:00 -08:00 == 16:00:00Z
        let ms = parse_timestamp_millis("2026-01-10 08:00:00", &pst()).unwrap();
        assert_eq!(ms, 1_768_060_800_000);
    }

    #[test]
    fn test_local_datetime_with_system_zone_matches_chrono_local() {
        let naive = NaiveDateTime::parse_from_str("2026-01-10 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let expected = Local.from_local_datetime(&naive).earliest().unwrap().timestamp_millis();
        assert_eq!(
            parse_timestamp_millis("2026-01-10 08:00:00", &LocalZone::System),
            Some(expected)
        );
    }

    #[test]
    fn test_date_and_time_columns() {
        let ms = parse_date_and_time_millis("2025-11-14", "07:00", &pst()).unwrap();
        assert_eq!(ms, parse_timestamp_millis("2025-11-14 07:00:00", &pst()).unwrap());
        assert_eq!(parse_date_and_time_millis("", "07:00", &pst()), None);
        assert_eq!(parse_date_and_time_millis("2025-11-14", " ", &pst()), None);
    }

    #[test]
    fn test_us_date_is_local_midnight() {
        let ms = parse_timestamp_millis("11/28/2025", &pst()).unwrap();
        assert_eq!(ms, parse_timestamp_millis("2025-11-28 00:00", &pst()).unwrap());
    }

    #[test]
    fn test_iso_date_only_is_utc_midnight() {
        let ms = parse_timestamp_millis("2025-11-14", &pst()).unwrap();
        assert_eq!(ms, 1_763_078_400_000);
    }

    #[test]
    fn test_garbage_returns_none() {
        assert_eq!(parse_timestamp_millis("not a date", &pst()), None);
        assert_eq!(parse_timestamp_millis("", &pst()), None);
        assert_eq!(parse_timestamp_millis("2025-13-40 10:00", &pst()), None);
    }

    #[test]
    fn test_offset_bounds() {
        assert!(LocalZone::from_offset_minutes(24 * 60).is_none());
        assert!(LocalZone::from_offset_minutes(330).is_some());
    }
}
