use std::sync::Arc;
use std::time::Instant;

use crate::domain::error::GenerationResult;
use crate::domain::session::SessionStore;
use crate::domain::types::{PromptRequest, UserId};
use crate::infra::metrics::Metrics;

use super::enhancer::PromptEnhancer;
use super::strategy::ProviderStrategy;

/// 生成オーケストレーター: セッション状態から戦略を選び、結果を画像バイト列に正規化する
pub struct GenerationOrchestrator {
    store: Arc<SessionStore>,
    enhancer: Arc<PromptEnhancer>,
    direct: Arc<dyn ProviderStrategy>,
    edit: Arc<dyn ProviderStrategy>,
    metrics: Arc<Metrics>,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        enhancer: Arc<PromptEnhancer>,
        direct: Arc<dyn ProviderStrategy>,
        edit: Arc<dyn ProviderStrategy>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            enhancer,
            direct,
            edit,
            metrics,
        }
    }

    /// セッションを消費して生成する。
    ///
    /// セッションは呼び出し前に破棄される。編集が失敗してもセッションは復元されず、
    /// 再試行には写真の再送が必要になる。
    pub async fn generate(&self, user_id: UserId, raw_prompt: &str) -> GenerationResult {
        let request = PromptRequest::new(user_id, raw_prompt, self.store.take_if_present(user_id));
        self.metrics.inc_generations_requested();

        let start = Instant::now();
        let (phase, result) = match request.reference_image.as_deref() {
            Some(reference) => {
                log::info!(
                    "Generating for user {} via {} ({} byte reference)",
                    user_id,
                    self.edit.name(),
                    reference.len()
                );
                ("edit", self.edit.execute(&request.text, Some(reference)).await)
            }
            None => {
                log::info!("Generating for user {} via {}", user_id, self.direct.name());
                let enhanced = self.enhancer.enhance(&request.text).await;
                ("generate", self.direct.execute(&enhanced, None).await)
            }
        };
        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics.record_latency(phase, elapsed);

        match &result {
            Ok(image) => {
                self.metrics.inc_generations_succeeded();
                log::info!("Generation for user {} done in {elapsed} ms ({} bytes)", user_id, image.len());
            }
            Err(e) => {
                self.metrics.inc_error(e.kind);
                log::warn!("Generation for user {} failed after {elapsed} ms: {e}", user_id);
            }
        }
        result
    }
}
