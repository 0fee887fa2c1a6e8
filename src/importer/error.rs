// ==========================================
// 个人数据导入管道 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 文件级（不识别 / 无法解码）与行级（映射 / 落库）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件级错误 =====
    #[error("无法识别的文件格式: {0}")]
    FormatUnrecognized(String),

    #[error("文件内容解析失败: {0}")]
    ContainerParse(String),

    #[error("文件读取失败: {0}")]
    FileRead(String),

    #[error("分隔符不受支持: {0:?}（仅支持单字节 ASCII）")]
    UnsupportedDelimiter(char),

    // ===== 行级错误 =====
    #[error("行映射失败 (行 {row}): {message}")]
    RowMapping { row: usize, message: String },

    #[error("类型转换失败 (字段 {field}): {message}")]
    TypeConversion { field: String, message: String },

    #[error("落库失败 (表 {table}): {source}")]
    Persistence {
        table: String,
        #[source]
        source: RepositoryError,
    },

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigRead { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ImportError {
    pub fn persistence(table: impl Into<String>, source: RepositoryError) -> Self {
        ImportError::Persistence {
            table: table.into(),
            source,
        }
    }
}

// 实现 From<std::str::Utf8Error>
impl From<std::str::Utf8Error> for ImportError {
    fn from(err: std::str::Utf8Error) -> Self {
        ImportError::ContainerParse(format!("非 UTF-8 文本: {}", err))
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileRead(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ContainerParse(format!("JSON 解码失败: {}", err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::ContainerParse(format!("CSV 解析失败: {}", err))
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Persistence {
            table: "unknown".to_string(),
            source: RepositoryError::from(err),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_container_parse() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let import_err: ImportError = err.into();
        assert!(matches!(import_err, ImportError::ContainerParse(_)));
    }
}
