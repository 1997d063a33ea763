mod intake;
mod runtime;
mod telegram;

use std::sync::Arc;

use anyhow::Context;

use ib_core::domain::session::SessionStore;
use ib_core::domain::settings::{parse_dims, BotSettings, EditBackend, ProviderConfig};
use ib_core::infra::metrics::Metrics;
use ib_core::infra::provider::gemini::GeminiClient;
use ib_core::infra::provider::openai::OpenAiClient;
use ib_core::infra::provider::relay::RelayClient;
use ib_core::usecase::controller::SessionController;
use ib_core::usecase::enhancer::{EnhancerOptions, PromptEnhancer};
use ib_core::usecase::job_queue::JobQueue;
use ib_core::usecase::orchestrator::GenerationOrchestrator;
use ib_core::usecase::strategy::{
    DirectGenerate, IdentityBackend, IdentityPreservingEdit, ImageOptions, ProviderStrategy, RelayEdit,
};

use crate::telegram::TelegramClient;

/// Gemini クライアントを構築する（multimodal / describe バックエンド用）
fn create_gemini(provider: &ProviderConfig) -> anyhow::Result<Arc<GeminiClient>> {
    let config = provider
        .gemini
        .as_ref()
        .context("GEMINI_API_KEY is required for the selected edit backend")?;
    Ok(Arc::new(GeminiClient::new(config, provider.generation_timeout)?))
}

/// 参照写真付き編集の戦略を設定に応じて構築する
fn create_edit_strategy(
    settings: &BotSettings,
    openai: Arc<OpenAiClient>,
    enhancer: Arc<PromptEnhancer>,
) -> anyhow::Result<Arc<dyn ProviderStrategy>> {
    let provider = &settings.provider;
    let strategy: Arc<dyn ProviderStrategy> = match settings.edit_backend {
        EditBackend::Multimodal => Arc::new(IdentityPreservingEdit::new(IdentityBackend::Multimodal(
            create_gemini(provider)?,
        ))),
        EditBackend::Describe => Arc::new(IdentityPreservingEdit::new(
            IdentityBackend::DescribeThenGenerate {
                vision: create_gemini(provider)?,
                images: openai,
                options: ImageOptions::from_config(provider),
            },
        )),
        EditBackend::Relay => {
            let config = provider
                .relay
                .as_ref()
                .context("RELAY_* settings are required for the relay edit backend")?;
            let size = parse_dims(&provider.image_size)
                .with_context(|| format!("invalid IMAGE_SIZE {:?}", provider.image_size))?;
            let relay = RelayClient::new(config, provider.upload_timeout, provider.generation_timeout)?;
            Arc::new(RelayEdit::new(Arc::new(relay), enhancer, config.tuning, size))
        }
    };
    log::info!("Edit backend: {:?} ({})", settings.edit_backend, strategy.name());
    Ok(strategy)
}

/// 設定からコントローラー一式を組み立てる
pub fn build_controller(settings: &BotSettings) -> anyhow::Result<SessionController> {
    let provider = &settings.provider;
    let metrics = Arc::new(Metrics::new());
    let store = Arc::new(SessionStore::new());

    let openai = Arc::new(OpenAiClient::new(
        &provider.openai,
        provider.completion_timeout,
        provider.generation_timeout,
    )?);
    let enhancer = Arc::new(PromptEnhancer::new(
        openai.clone(),
        EnhancerOptions::from_config(provider),
        metrics.clone(),
    ));
    let direct = Arc::new(DirectGenerate::new(openai.clone(), ImageOptions::from_config(provider)));
    let edit = create_edit_strategy(settings, openai, enhancer.clone())?;

    let orchestrator = Arc::new(GenerationOrchestrator::new(
        store.clone(),
        enhancer,
        direct,
        edit,
        metrics.clone(),
    ));

    Ok(SessionController::new(
        store,
        orchestrator,
        Arc::new(JobQueue::new()),
        metrics,
        settings.max_prompt_length,
    ))
}

/// 設定を読み込み、Ctrl-C までロングポーリングを続ける
pub async fn run() -> anyhow::Result<()> {
    let settings = BotSettings::from_env().context("failed to load configuration")?;
    log::info!(
        "Starting bot (image model {}, max prompt {} chars, enhancer {})",
        settings.provider.openai.image_model,
        settings.max_prompt_length,
        if settings.provider.enhance_prompts { "on" } else { "off" }
    );

    let controller = Arc::new(build_controller(&settings)?);
    let telegram = Arc::new(TelegramClient::new(
        &settings.telegram_token,
        settings.poll_timeout_secs,
    )?);

    tokio::select! {
        result = runtime::poll_loop(controller.clone(), telegram) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            log::info!("Shutdown requested");
        }
    }

    let summary = controller.metrics().summary();
    match serde_json::to_string(&summary) {
        Ok(json) => log::info!("Metrics summary: {json}"),
        Err(e) => log::warn!("メトリクスのシリアライズ失敗: {e}"),
    }
    Ok(())
}
