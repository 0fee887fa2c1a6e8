// ==========================================
// 个人数据导入管道 - 格式识别
// ==========================================
// 规则:
// - 指定 Provider 时直接使用，不做识别
// - 否则按注册顺序逐个 detect，首个匹配生效
// - 无匹配 → FormatUnrecognized
// ==========================================

use crate::domain::record::ParsedDocument;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::provider_trait::ProviderMapper;
use crate::importer::providers::ProviderRegistry;
use tracing::debug;

/// 选择处理该文档的 Provider
///
/// # 参数
/// - registry: Provider 注册表
/// - document: 解码后的文档
/// - provider_override: 显式指定的 Provider 名称
pub fn select_mapper<'r>(
    registry: &'r ProviderRegistry,
    document: &ParsedDocument,
    provider_override: Option<&str>,
) -> ImportResult<&'r dyn ProviderMapper> {
    if let Some(name) = provider_override {
        return registry
            .get(name)
            .ok_or_else(|| ImportError::FormatUnrecognized(format!("未知 Provider: {}", name)));
    }

    let selected = registry.iter().find(|mapper| mapper.detect(document));
    match selected {
        Some(mapper) => {
            debug!(provider = mapper.name(), "格式识别完成");
            Ok(mapper)
        }
        None => Err(ImportError::FormatUnrecognized(
            "没有 Provider 识别该文件".to_string(),
        )),
    }
}
