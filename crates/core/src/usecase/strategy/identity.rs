use std::sync::Arc;

use async_trait::async_trait;

use super::{ImageOptions, ProviderStrategy};
use crate::domain::error::{ErrorKind, GenerationError, GenerationResult};
use crate::infra::provider::{prompts, ImageGeneration, ImageRequest, MultimodalImage};

/// 本人性保持編集のバックエンド
pub enum IdentityBackend {
    /// プロンプト + インライン参照画像 → 画像 を1回で行う
    Multimodal(Arc<dyn MultimodalImage>),
    /// 参照画像を顔の特徴記述に変換し、記述を連結したプロンプトで text-to-image
    DescribeThenGenerate {
        vision: Arc<dyn MultimodalImage>,
        images: Arc<dyn ImageGeneration>,
        options: ImageOptions,
    },
}

/// 参照写真の人物の顔を保ったまま編集する
pub struct IdentityPreservingEdit {
    backend: IdentityBackend,
}

impl IdentityPreservingEdit {
    pub fn new(backend: IdentityBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ProviderStrategy for IdentityPreservingEdit {
    async fn execute(&self, prompt: &str, reference: Option<&[u8]>) -> GenerationResult {
        let reference = reference.ok_or_else(|| {
            GenerationError::new(ErrorKind::Unclassified, "identity edit requires a reference image")
        })?;

        match &self.backend {
            IdentityBackend::Multimodal(provider) => {
                let wrapped = prompts::wrap_identity(prompt);
                provider
                    .edit(&wrapped, reference)
                    .await
                    .map_err(|e| e.classify())
            }
            IdentityBackend::DescribeThenGenerate {
                vision,
                images,
                options,
            } => {
                let description = vision
                    .describe(prompts::DESCRIBE_FACE, reference)
                    .await
                    .map_err(|e| e.classify())?;
                log::debug!("Face description: {} chars", description.len());

                let request = ImageRequest {
                    model: options.model.clone(),
                    prompt: prompts::compose_with_description(prompt, &description),
                    size: options.size.clone(),
                    quality: options.quality.clone(),
                };
                images.generate(&request).await.map_err(|e| e.classify())
            }
        }
    }

    fn name(&self) -> &str {
        match self.backend {
            IdentityBackend::Multimodal(_) => "identity-multimodal",
            IdentityBackend::DescribeThenGenerate { .. } => "identity-describe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::provider::ProviderError;
    use crate::usecase::mocks::{MockImages, MockMultimodal};

    fn options() -> ImageOptions {
        ImageOptions {
            model: "gpt-image-1".into(),
            size: "1024x1024".into(),
            quality: "high".into(),
        }
    }

    #[tokio::test]
    async fn test_multimodal_wraps_prompt_with_directive() {
        let provider = Arc::new(MockMultimodal::new(Ok(vec![7, 7]), Ok(String::new())));
        let strategy = IdentityPreservingEdit::new(IdentityBackend::Multimodal(provider.clone()));

        let out = strategy.execute("add a hat", Some(&[1, 2, 3])).await.unwrap();
        assert_eq!(out, vec![7, 7]);

        let edits = provider.edits.lock();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].0.starts_with(prompts::IDENTITY_DIRECTIVE));
        assert!(edits[0].0.ends_with("add a hat"));
        assert_eq!(edits[0].1, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_describe_then_generate() {
        let vision = Arc::new(MockMultimodal::new(Ok(vec![]), Ok("Face shape: round".into())));
        let images = Arc::new(MockImages::ok(&[5]));
        let strategy = IdentityPreservingEdit::new(IdentityBackend::DescribeThenGenerate {
            vision: vision.clone(),
            images: images.clone(),
            options: options(),
        });

        assert_eq!(strategy.execute("as a knight", Some(&[1])).await.unwrap(), vec![5]);
        assert_eq!(*vision.describes.lock(), 1);
        let prompts_seen = images.prompts.lock();
        assert!(prompts_seen[0].contains("as a knight"));
        assert!(prompts_seen[0].contains("Face shape: round"));
    }

    #[tokio::test]
    async fn test_describe_failure_stops_pipeline() {
        let vision = Arc::new(MockMultimodal::new(Ok(vec![]), Err(ProviderError::Timeout)));
        let images = Arc::new(MockImages::ok(&[5]));
        let strategy = IdentityPreservingEdit::new(IdentityBackend::DescribeThenGenerate {
            vision,
            images: images.clone(),
            options: options(),
        });

        let err = strategy.execute("x", Some(&[1])).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamUnavailable);
        assert!(images.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reference_is_error() {
        let provider = Arc::new(MockMultimodal::new(Ok(vec![1]), Ok(String::new())));
        let strategy = IdentityPreservingEdit::new(IdentityBackend::Multimodal(provider.clone()));

        assert!(strategy.execute("x", None).await.is_err());
        assert!(provider.edits.lock().is_empty());
        assert_eq!(strategy.name(), "identity-multimodal");
    }
}
