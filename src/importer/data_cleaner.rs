// ==========================================
// 个人数据导入管道 - 字段清洗与数值解析
// ==========================================
// 职责: TRIM / NULL 标准化 / 数值解析
// 规则:
// - 空串或纯空白视为缺失（None）
// - 数值允许千分位逗号与前导货币符号 $
// - 非法数值返回 TypeConversion 错误，由调用方决定是否跳过
// ==========================================

use crate::importer::error::{ImportError, ImportResult};

/// 空白标准化为 None
pub fn normalize_null(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// 解析浮点数（缺失 → Ok(None)）
pub fn parse_f64(value: Option<&str>, field: &str) -> ImportResult<Option<f64>> {
    let Some(raw) = normalize_null(value) else {
        return Ok(None);
    };
    let cleaned: String = raw
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ImportError::TypeConversion {
            field: field.to_string(),
            message: format!("无法解析为浮点数: {}", raw),
        }),
    }
}

/// 解析整数；带小数的值截断（"70.0" → 70）
pub fn parse_i64(value: Option<&str>, field: &str) -> ImportResult<Option<i64>> {
    let Some(raw) = normalize_null(value) else {
        return Ok(None);
    };
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(Some(v));
    }
    match parse_f64(Some(raw), field)? {
        Some(v) if v.abs() < i64::MAX as f64 => Ok(Some(v.trunc() as i64)),
        _ => Err(ImportError::TypeConversion {
            field: field.to_string(),
            message: format!("无法解析为整数: {}", raw),
        }),
    }
}

/// "缺失即无事件" 的读数：缺失或非法一律按 0
pub fn f64_or_zero(value: Option<&str>) -> f64 {
    parse_f64(value, "").ok().flatten().unwrap_or(0.0)
}

/// 依次尝试多个候选值，取第一个非零读数，否则 0
pub fn first_non_zero(values: &[Option<&str>]) -> f64 {
    values
        .iter()
        .map(|v| f64_or_zero(*v))
        .find(|v| *v != 0.0)
        .unwrap_or(0.0)
}

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_null() {
        assert_eq!(normalize_null(Some("  ")), None);
        assert_eq!(normalize_null(Some(" x ")), Some("x"));
        assert_eq!(normalize_null(None), None);
    }

    #[test]
    fn test_parse_f64_variants() {
        assert_eq!(parse_f64(Some("75.5"), "w").unwrap(), Some(75.5));
        assert_eq!(parse_f64(Some(" 25,000.00 "), "w").unwrap(), Some(25000.0));
        assert_eq!(parse_f64(Some("$1.02"), "w").unwrap(), Some(1.02));
        assert_eq!(parse_f64(Some(""), "w").unwrap(), None);
        assert!(parse_f64(Some("abc"), "w").is_err());
        assert!(parse_f64(Some("NaN"), "w").is_err());
    }

    #[test]
    fn test_parse_i64_truncates() {
        assert_eq!(parse_i64(Some("120"), "s").unwrap(), Some(120));
        assert_eq!(parse_i64(Some("70.9"), "s").unwrap(), Some(70));
        assert!(parse_i64(Some("x"), "s").is_err());
    }

    #[test]
    fn test_zero_defaults() {
        assert_eq!(f64_or_zero(None), 0.0);
        assert_eq!(f64_or_zero(Some("bad")), 0.0);
        assert_eq!(first_non_zero(&[Some("0"), Some("5.19")]), 5.19);
        assert_eq!(first_non_zero(&[None, Some("")]), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(30600.0 / 3600.0), 8.5);
        assert_eq!(round2(1.0 / 3.0), 0.33);
    }
}
