mod direct;
mod identity;
mod relay;

pub use direct::DirectGenerate;
pub use identity::{IdentityBackend, IdentityPreservingEdit};
pub use relay::RelayEdit;

use async_trait::async_trait;

use crate::domain::error::GenerationResult;
use crate::domain::settings::ProviderConfig;

/// text-to-image 呼び出しの共通パラメータ
#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub model: String,
    pub size: String,
    pub quality: String,
}

impl ImageOptions {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            model: config.openai.image_model.clone(),
            size: config.image_size.clone(),
            quality: config.image_quality.clone(),
        }
    }
}

/// 生成戦略 trait（直接生成 / 本人性保持編集 / リレー編集）
#[async_trait]
pub trait ProviderStrategy: Send + Sync {
    async fn execute(&self, prompt: &str, reference: Option<&[u8]>) -> GenerationResult;

    fn name(&self) -> &str;
}
