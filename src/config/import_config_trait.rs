// ==========================================
// 个人数据导入管道 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入协调器所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::time_parser::LocalZone;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 交易记录默认账户 ID
    ///
    /// # 默认值
    /// - 1
    async fn get_default_account_id(&self) -> ImportResult<i64>;

    /// 无偏移时间的解释时区
    ///
    /// # 返回
    /// - LocalZone::Fixed: 配置了 import.utc_offset_minutes
    /// - LocalZone::System: 未配置
    async fn get_local_zone(&self) -> ImportResult<LocalZone>;

    /// 结果消息语言
    ///
    /// # 默认值
    /// - "en"
    async fn get_locale(&self) -> ImportResult<String>;
}
