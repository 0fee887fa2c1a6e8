// ==========================================
// 个人数据导入管道 - 领域模型层
// ==========================================
// 职责: 定义规范表、记录结构、导入结果
// 红线: 不含数据访问逻辑,不含解析逻辑
// ==========================================

pub mod import;
pub mod record;
pub mod types;

// 重导出核心类型
pub use import::{ImportBatch, ImportOptions, ImportOutcome, ImportSummary, RowTally};
pub use record::{CanonicalRecord, ParsedDocument, ParsedRow, SourceItem};
pub use types::{ContentKind, Table};
