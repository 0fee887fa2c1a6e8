// ==========================================
// 个人数据导入管道 - 导入 Trait
// ==========================================
// 职责: 定义 Provider Mapper 与导入协调器接口（不包含实现）
// ==========================================

use crate::domain::import::{ImportOptions, ImportSummary};
use crate::domain::record::{CanonicalRecord, ParsedDocument, SourceItem};
use crate::domain::types::Table;
use crate::importer::error::ImportResult;
use crate::importer::time_parser::LocalZone;
use async_trait::async_trait;
use rusqlite::types::Value;
use std::path::Path;

// ==========================================
// MappingContext - 映射上下文
// ==========================================
// 由配置派生，对单个文件保持不变
#[derive(Debug, Clone, Copy)]
pub struct MappingContext {
    /// 无偏移时间的解释时区
    pub zone: LocalZone,
    /// 交易记录默认账户
    pub default_account_id: i64,
}

impl Default for MappingContext {
    fn default() -> Self {
        Self {
            zone: LocalZone::System,
            default_account_id: 1,
        }
    }
}

// ==========================================
// ProviderMapper Trait
// ==========================================
// 用途: 单个数据来源的格式识别与行映射
// 实现者: PgeMapper, TeslaMapper, SfcuMapper, WithingsMapper, GoogleTimelineMapper
pub trait ProviderMapper: Send + Sync {
    /// Provider 名称（显式覆写时使用，如 "pge"）
    fn name(&self) -> &'static str;

    /// 展示名称（写入结果消息）
    fn display_name(&self) -> &'static str;

    /// 识别文件格式
    ///
    /// # 返回
    /// - true: 指纹唯一属于该 Provider
    fn detect(&self, document: &ParsedDocument) -> bool;

    /// 映射单个条目（纯函数）
    ///
    /// # 返回
    /// - Ok(Some(record)): 规范记录
    /// - Ok(None): 跳过该条目（零读数 / 时间无法解析等）
    /// - Err: 行级映射错误（计入 error_count）
    fn map_row(
        &self,
        item: &SourceItem,
        ctx: &MappingContext,
    ) -> ImportResult<Option<CanonicalRecord>>;

    /// 固定目标表；None 表示逐行决定
    fn table(&self) -> Option<Table>;

    /// 将解码后的文档展开为待映射条目
    ///
    /// 默认: 表格逐行；JSON 数组逐元素；其他 JSON 值作为单个条目
    fn extract_items(&self, document: ParsedDocument) -> Vec<SourceItem> {
        match document {
            ParsedDocument::Rows(rows) => rows.into_iter().map(SourceItem::Row).collect(),
            ParsedDocument::Json(serde_json::Value::Array(items)) => {
                items.into_iter().map(SourceItem::Json).collect()
            }
            ParsedDocument::Json(value) => vec![SourceItem::Json(value)],
        }
    }

    /// 真实表头之前可能存在横幅文本时，用于定位表头的签名
    fn header_signature(&self) -> Option<&'static str> {
        None
    }

    /// 插入时可选字段的默认值
    fn insert_defaults(&self, _table: Table) -> Vec<(&'static str, Value)> {
        Vec::new()
    }
}

// ==========================================
// DataImporter Trait
// ==========================================
// 用途: 单文件导入协调（解码 → 识别 → 映射 → 对账 → 汇总）
// 实现者: DataImporterImpl
#[async_trait]
pub trait DataImporter: Send + Sync {
    /// 导入单个文件内容
    ///
    /// # 参数
    /// - filename: 文件名（仅用于推断内容类型与日志）
    /// - content: 原始字节
    /// - options: Provider 覆写 / 内容类型
    ///
    /// # 返回
    /// - ImportSummary: 所有失败均体现在结果结构中，不返回错误
    async fn import(&self, filename: &str, content: &[u8], options: ImportOptions) -> ImportSummary;

    /// 从路径读取并导入
    async fn import_path<P: AsRef<Path> + Send>(
        &self,
        path: P,
        options: ImportOptions,
    ) -> ImportSummary;

    /// 依次导入多个文件
    ///
    /// # 说明
    /// - 严格串行，文件之间让出执行权
    /// - 单个文件失败不影响后续文件
    async fn import_files<P: AsRef<Path> + Send + Sync>(
        &self,
        paths: Vec<P>,
        options: ImportOptions,
    ) -> Vec<ImportSummary>;
}
