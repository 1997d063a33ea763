use std::sync::Arc;

use async_trait::async_trait;

use super::{ImageOptions, ProviderStrategy};
use crate::domain::error::GenerationResult;
use crate::infra::provider::{ImageGeneration, ImageRequest};

/// プロンプトのみから画像を生成する（参照画像なし、1往復）
pub struct DirectGenerate {
    images: Arc<dyn ImageGeneration>,
    options: ImageOptions,
}

impl DirectGenerate {
    pub fn new(images: Arc<dyn ImageGeneration>, options: ImageOptions) -> Self {
        Self { images, options }
    }
}

#[async_trait]
impl ProviderStrategy for DirectGenerate {
    async fn execute(&self, prompt: &str, reference: Option<&[u8]>) -> GenerationResult {
        if reference.is_some() {
            log::debug!("DirectGenerate ignores the reference image");
        }
        let request = ImageRequest {
            model: self.options.model.clone(),
            prompt: prompt.to_string(),
            size: self.options.size.clone(),
            quality: self.options.quality.clone(),
        };
        self.images.generate(&request).await.map_err(|e| e.classify())
    }

    fn name(&self) -> &str {
        "direct"
    }
}
