use std::sync::Arc;

use async_trait::async_trait;

use super::ProviderStrategy;
use crate::domain::error::{ErrorKind, GenerationError, GenerationResult};
use crate::domain::settings::RelayTuning;
use crate::infra::provider::RelayService;
use crate::usecase::enhancer::PromptEnhancer;

/// 二次サービス経由の編集（アップロード → 生成 → 取得 の3往復）。
/// どの段階の失敗もパイプライン全体の失敗として扱い、部分的な画像は返さない。
pub struct RelayEdit {
    relay: Arc<dyn RelayService>,
    enhancer: Arc<PromptEnhancer>,
    tuning: RelayTuning,
    size: (u32, u32),
}

impl RelayEdit {
    pub fn new(
        relay: Arc<dyn RelayService>,
        enhancer: Arc<PromptEnhancer>,
        tuning: RelayTuning,
        size: (u32, u32),
    ) -> Self {
        Self {
            relay,
            enhancer,
            tuning,
            size,
        }
    }
}

#[async_trait]
impl ProviderStrategy for RelayEdit {
    async fn execute(&self, prompt: &str, reference: Option<&[u8]>) -> GenerationResult {
        let reference = reference.ok_or_else(|| {
            GenerationError::new(ErrorKind::Unclassified, "relay edit requires a reference image")
        })?;

        let reference_url = self.relay.upload(reference).await.map_err(|e| e.classify())?;
        log::debug!("Relay upload done: {reference_url}");

        let enhanced = self.enhancer.enhance(prompt).await;
        let result_url = self
            .relay
            .generate(&enhanced, &reference_url, &self.tuning, self.size)
            .await
            .map_err(|e| e.classify())?;

        self.relay.fetch(&result_url).await.map_err(|e| e.classify())
    }

    fn name(&self) -> &str {
        "relay"
    }
}
