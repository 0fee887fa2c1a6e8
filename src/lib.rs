// ==========================================
// 个人数据导入管道 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 定位: 多来源个人数据导出文件的识别、归一化与幂等落库
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 规范表与导入结果
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigManager, ImportConfigReader};
pub use domain::{
    CanonicalRecord, ContentKind, ImportBatch, ImportOptions, ImportOutcome, ImportSummary,
    ParsedRow, Table,
};
pub use importer::{DataImporter, DataImporterImpl, ImportError, ImportResult, ProviderRegistry};
pub use repository::{RepositoryError, RepositoryResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "personal-data-import";
