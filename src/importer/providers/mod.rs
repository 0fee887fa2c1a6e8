// ==========================================
// 个人数据导入管道 - Provider 注册表
// ==========================================
// 注册顺序固定，格式识别按此顺序首个匹配生效
// ==========================================

pub mod google_timeline;
pub mod pge;
pub mod sfcu;
pub mod tesla;
pub mod withings;

pub use google_timeline::GoogleTimelineMapper;
pub use pge::PgeMapper;
pub use sfcu::SfcuMapper;
pub use tesla::TeslaMapper;
pub use withings::WithingsMapper;

use crate::importer::provider_trait::ProviderMapper;

// ==========================================
// ProviderRegistry
// ==========================================
pub struct ProviderRegistry {
    mappers: Vec<Box<dyn ProviderMapper>>,
}

impl ProviderRegistry {
    /// 空注册表（测试或自定义组合）
    pub fn empty() -> Self {
        Self {
            mappers: Vec::new(),
        }
    }

    /// 追加 Provider（排在已注册者之后）
    pub fn register(mut self, mapper: Box<dyn ProviderMapper>) -> Self {
        self.mappers.push(mapper);
        self
    }

    /// 按名称查找（显式覆写）
    pub fn get(&self, name: &str) -> Option<&dyn ProviderMapper> {
        self.mappers
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ProviderMapper> {
        self.mappers.iter().map(|m| m.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.mappers.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        ProviderRegistry::empty()
            .register(Box::new(PgeMapper))
            .register(Box::new(TeslaMapper))
            .register(Box::new(SfcuMapper))
            .register(Box::new(WithingsMapper))
            .register(Box::new(GoogleTimelineMapper))
    }
}
