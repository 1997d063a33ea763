use std::sync::Arc;
use std::time::Instant;

use crate::domain::settings::ProviderConfig;
use crate::infra::metrics::Metrics;
use crate::infra::provider::{prompts, CompletionRequest, TextCompletion};

/// プロンプト補正の設定
#[derive(Debug, Clone)]
pub struct EnhancerOptions {
    pub enabled: bool,
    pub model: String,
    pub target_language: String,
    pub max_tokens: u32,
}

impl EnhancerOptions {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            enabled: config.enhance_prompts,
            model: config.openai.completion_model.clone(),
            target_language: config.target_language.clone(),
            max_tokens: config.enhancer_max_tokens,
        }
    }
}

/// プロンプト補正（翻訳 + 描写の追加）。
///
/// 補正は最適化であって必須の依存ではない。上流が失敗した場合は警告を残して
/// 元のプロンプトをそのまま返し、パイプラインを止めない。
pub struct PromptEnhancer {
    completion: Arc<dyn TextCompletion>,
    options: EnhancerOptions,
    system_prompt: String,
    metrics: Arc<Metrics>,
}

impl PromptEnhancer {
    pub fn new(completion: Arc<dyn TextCompletion>, options: EnhancerOptions, metrics: Arc<Metrics>) -> Self {
        let system_prompt = prompts::enhance_system_prompt(&options.target_language);
        Self {
            completion,
            options,
            system_prompt,
            metrics,
        }
    }

    pub async fn enhance(&self, raw: &str) -> String {
        if !self.options.enabled {
            return raw.to_string();
        }

        let request = CompletionRequest {
            model: self.options.model.clone(),
            system: self.system_prompt.clone(),
            user: raw.to_string(),
            max_tokens: self.options.max_tokens,
        };

        let start = Instant::now();
        let result = self.completion.complete(&request).await;
        self.metrics
            .record_latency("enhance", start.elapsed().as_millis() as u64);

        match result {
            Ok(enhanced) if !enhanced.trim().is_empty() => {
                log::debug!("Prompt enhanced via {}: {} -> {} chars", self.completion.name(), raw.len(), enhanced.len());
                enhanced
            }
            Ok(_) => {
                log::warn!("Prompt enhancer returned empty text, using raw prompt");
                self.metrics.inc_enhancer_fallbacks();
                raw.to_string()
            }
            Err(e) => {
                log::warn!("Prompt enhancer failed, using raw prompt: {e}");
                self.metrics.inc_enhancer_fallbacks();
                raw.to_string()
            }
        }
    }
}
