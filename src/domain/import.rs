// ==========================================
// 个人数据导入管道 - 导入请求与结果
// ==========================================
// 职责: 定义 Coordinator 的输入选项与返回给展示层的结果结构
// ==========================================

use crate::domain::types::ContentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单文件导入选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    /// 显式指定的 Provider 名称（跳过格式识别）
    pub provider: Option<String>,
    /// 内容类型；None 时按文件名后缀推断
    pub content_kind: Option<ContentKind>,
}

impl ImportOptions {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_content_kind(mut self, kind: ContentKind) -> Self {
        self.content_kind = Some(kind);
        self
    }

    /// 实际使用的内容类型
    pub fn resolve_content_kind(&self, filename: &str) -> ContentKind {
        self.content_kind
            .unwrap_or_else(|| ContentKind::from_filename(filename))
    }
}

/// 文件级结局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    /// 已逐行处理（行级错误计入 error_count）
    Completed,
    /// 无 Mapper 识别该文件
    UnknownFormat,
    /// 文本 / JSON 无法解码
    ContainerParseError,
    /// 文件为空
    Empty,
    /// 事务提交失败，整个文件已回滚
    Aborted,
}

impl ImportOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportOutcome::Completed => "completed",
            ImportOutcome::UnknownFormat => "unknown_format",
            ImportOutcome::ContainerParseError => "container_parse_error",
            ImportOutcome::Empty => "empty",
            ImportOutcome::Aborted => "aborted",
        }
    }

    pub fn parse(value: &str) -> Option<ImportOutcome> {
        [
            ImportOutcome::Completed,
            ImportOutcome::UnknownFormat,
            ImportOutcome::ContainerParseError,
            ImportOutcome::Empty,
            ImportOutcome::Aborted,
        ]
        .into_iter()
        .find(|o| o.as_str() == value)
    }
}

/// 单文件导入结果（展示层唯一消费的结构）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub message: String,
    pub outcome: ImportOutcome,
    /// 识别出的 Provider 名称
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// 导入批次 ID
    pub batch_id: String,
    pub elapsed_ms: u64,
}

impl ImportSummary {
    /// 零进度结果（文件级失败）
    pub fn zero_progress(
        batch_id: impl Into<String>,
        outcome: ImportOutcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            skipped_count: 0,
            message: message.into(),
            outcome,
            provider: None,
            batch_id: batch_id.into(),
            elapsed_ms: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == ImportOutcome::Completed
    }
}

/// 逐行计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowTally {
    pub success: usize,
    pub errors: usize,
    pub skipped: usize,
    /// 其中走更新分支的行数
    pub updated: usize,
}

impl RowTally {
    pub fn processed(&self) -> usize {
        self.success + self.errors + self.skipped
    }
}

/// 导入批次记录（import_batch 表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub file_name: String,
    pub provider: Option<String>,
    pub outcome: ImportOutcome,
    pub success_rows: i64,
    pub error_rows: i64,
    pub skipped_rows: i64,
    pub updated_rows: i64,
    pub elapsed_ms: i64,
    pub imported_at: DateTime<Utc>,
}
