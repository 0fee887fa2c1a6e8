// ==========================================
// 个人数据导入管道 - 导入层
// ==========================================
// 职责: 外部导出文件 → 规范记录 → 对账落库
// 组成: 分词器 / 时间解析 / Provider Mapper / 格式识别 / 对账 / 协调器
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod data_importer_impl;
pub mod error;
pub mod format_selector;
pub mod provider_trait;
pub mod providers;
pub mod reconciler;
pub mod time_parser;
pub mod tokenizer;

// 重导出核心类型
pub use data_importer_impl::DataImporterImpl;
pub use error::{ImportError, ImportResult};
pub use format_selector::select_mapper;
pub use providers::ProviderRegistry;
pub use reconciler::{ReconcileAction, Reconciler};
pub use time_parser::LocalZone;

// 重导出 Trait 接口
pub use provider_trait::{DataImporter, MappingContext, ProviderMapper};
