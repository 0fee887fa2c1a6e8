// ==========================================
// 个人数据导入管道 - 分隔符文本分词器
// ==========================================
// 阶段 0: 原始文本 → 表头键控的行记录
// 规则:
// - CRLF / CR 统一为 LF 后按行切分
// - 引号可出现在字段任意位置，引号内分隔符无效，"" 表示一个字面引号
// - 仅含一个空字段的行视为空行丢弃
// - 首个非空行为表头（去首尾空白），其余行按位置对齐
// 已知边界: 引号字段内不支持换行（按行切分在解析引号之前）
// ==========================================

use crate::domain::record::ParsedRow;
use crate::importer::error::{ImportError, ImportResult};
use csv::{ReaderBuilder, StringRecord};

/// 分词选项
#[derive(Debug, Clone, Copy)]
pub struct TokenizeOptions {
    pub delimiter: char,
    pub headers: bool,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            headers: true,
        }
    }
}

/// 分词结果
#[derive(Debug, Clone, PartialEq)]
pub enum Tokenized {
    /// headers = true
    Rows(Vec<ParsedRow>),
    /// headers = false
    Fields(Vec<Vec<String>>),
}

impl Tokenized {
    pub fn into_rows(self) -> Vec<ParsedRow> {
        match self {
            Tokenized::Rows(rows) => rows,
            Tokenized::Fields(_) => Vec::new(),
        }
    }
}

/// 按选项解析整段文本
pub fn parse(text: &str, options: &TokenizeOptions) -> ImportResult<Tokenized> {
    let delimiter = delimiter_byte(options.delimiter)?;
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines = Vec::new();
    for line in normalized.split('\n') {
        let fields = split_line(line, delimiter)?;
        if is_blank(&fields) {
            continue;
        }
        lines.push(fields);
    }

    if !options.headers {
        return Ok(Tokenized::Fields(lines));
    }

    let mut lines = lines.into_iter();
    let headers: Vec<String> = match lines.next() {
        Some(header_row) => header_row.iter().map(|h| h.trim().to_string()).collect(),
        None => return Ok(Tokenized::Rows(Vec::new())),
    };

    let rows = lines
        .map(|fields| {
            headers
                .iter()
                .zip(fields)
                .map(|(header, value)| (header.clone(), value))
                .collect::<ParsedRow>()
        })
        .collect();

    Ok(Tokenized::Rows(rows))
}

/// 默认选项（逗号 + 表头）解析为行记录
pub fn parse_rows(text: &str) -> ImportResult<Vec<ParsedRow>> {
    parse(text, &TokenizeOptions::default()).map(Tokenized::into_rows)
}

/// 切分单行
///
/// csv 只负责按分隔符切片（关闭引号处理），引号状态在切片间延续:
/// 字段任意位置的 `"` 都会切换引号状态，引号内的 `""` 为一个字面引号，
/// 引号内的分隔符作为普通字符拼回字段
pub fn split_line(line: &str, delimiter: u8) -> ImportResult<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(vec![String::new()]);
    }

    let mut fields = Vec::with_capacity(record.len());
    let mut current = String::new();
    let mut in_quotes = false;
    for (idx, piece) in record.iter().enumerate() {
        if idx > 0 {
            if in_quotes {
                current.push(delimiter as char);
            } else {
                fields.push(std::mem::take(&mut current));
            }
        }
        in_quotes = unquote_into(piece, in_quotes, &mut current);
    }
    fields.push(current);
    Ok(fields)
}

/// 处理切片中的引号，返回切片结束时的引号状态
fn unquote_into(piece: &str, mut in_quotes: bool, out: &mut String) -> bool {
    let mut chars = piece.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            out.push(c);
        } else if in_quotes && chars.peek() == Some(&'"') {
            out.push('"');
            chars.next();
        } else {
            in_quotes = !in_quotes;
        }
    }
    in_quotes
}

fn is_blank(fields: &[String]) -> bool {
    fields.is_empty() || (fields.len() == 1 && fields[0].is_empty())
}

fn delimiter_byte(delimiter: char) -> ImportResult<u8> {
    if delimiter.is_ascii() && delimiter != '"' && delimiter != '\n' && delimiter != '\r' {
        Ok(delimiter as u8)
    } else {
        Err(ImportError::UnsupportedDelimiter(delimiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> Vec<Vec<String>> {
        let options = TokenizeOptions {
            headers: false,
            ..Default::default()
        };
        match parse(text, &options).unwrap() {
            Tokenized::Fields(lines) => lines,
            Tokenized::Rows(_) => panic!("expected raw fields"),
        }
    }

    #[test]
    fn test_quoted_field_with_delimiter_and_doubled_quote() {
        let lines = fields("a,\"b,c\"\"d\",e");
        assert_eq!(lines, vec![vec!["a", "b,c\"d", "e"]]);
    }

    #[test]
    fn test_line_endings_normalized() {
        let rows = parse_rows("Date,Value\r\n2026-01-01,1\r2026-01-02,2\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Value"), Some("1"));
        assert_eq!(rows[1].get("Date"), Some("2026-01-02"));
    }

    #[test]
    fn test_blank_lines_dropped_but_delimiter_only_lines_kept() {
        let lines = fields("a,b\n\n,\n\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], vec!["", ""]);
    }

    #[test]
    fn test_headers_trimmed_and_rows_zipped() {
        let rows = parse_rows(" Date , Weight (kg) \n2026-01-10 08:00:00,75.5").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Date"), Some("2026-01-10 08:00:00"));
        assert_eq!(rows[0].get("Weight (kg)"), Some("75.5"));
    }

    #[test]
    fn test_extra_fields_dropped_and_missing_fields_unset() {
        let rows = parse_rows("a,b,c\n1,2,3,4\n5").unwrap();
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0].get("c"), Some("3"));
        assert_eq!(rows[1].get("a"), Some("5"));
        assert!(!rows[1].contains("b"));
        assert!(!rows[1].contains("c"));
    }

    #[test]
    fn test_header_only_and_empty_input() {
        assert!(parse_rows("a,b\n").unwrap().is_empty());
        assert!(parse_rows("").unwrap().is_empty());
        assert!(parse_rows("\n\n\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_custom_delimiter() {
        let options = TokenizeOptions {
            delimiter: ';',
            headers: true,
        };
        let rows = parse("x;y\n\"1;2\";3", &options).unwrap().into_rows();
        assert_eq!(rows[0].get("x"), Some("1;2"));
        assert_eq!(rows[0].get("y"), Some("3"));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let options = TokenizeOptions {
            delimiter: '，',
            headers: true,
        };
        assert!(matches!(
            parse("a，b", &options),
            Err(ImportError::UnsupportedDelimiter('，'))
        ));
    }

    #[test]
    fn test_values_not_trimmed() {
        let rows = parse_rows("a,b\n x , y ").unwrap();
        assert_eq!(rows[0].get("a"), Some(" x "));
    }

    #[test]
    fn test_quote_after_leading_space_still_protects_delimiter() {
        let lines = fields("a, \"b,c\",d");
        assert_eq!(lines, vec![vec!["a", " b,c", "d"]]);
    }

    #[test]
    fn test_quote_in_mid_field_toggles_quoting() {
        let lines = fields("ab\"c,d\"e,f");
        assert_eq!(lines, vec![vec!["abc,de", "f"]]);
    }

    // 已知边界：引号字段内的换行会被拆成两行，第二行从引号内开始
    #[test]
    fn test_embedded_newline_in_quotes_is_split_into_two_lines() {
        let lines = fields("a,\"line1\nline2\",c");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], vec!["a", "line1"]);
        assert_eq!(lines[1], vec!["line2,c"]);
    }
}
