//! 統合テスト用の組み立てヘルパー。モックはクレート内と共有する。

#![allow(dead_code)]

#[path = "../../src/usecase/mocks.rs"]
pub mod mocks;

use std::sync::Arc;

use ib_core::domain::session::SessionStore;
use ib_core::infra::metrics::Metrics;
use ib_core::infra::provider::ProviderError;
use ib_core::usecase::controller::SessionController;
use ib_core::usecase::enhancer::{EnhancerOptions, PromptEnhancer};
use ib_core::usecase::job_queue::JobQueue;
use ib_core::usecase::orchestrator::GenerationOrchestrator;
use ib_core::usecase::strategy::{DirectGenerate, IdentityBackend, IdentityPreservingEdit, ImageOptions};

use mocks::{MockCompletion, MockImages, MockMultimodal};

pub struct Harness {
    pub controller: SessionController,
    pub store: Arc<SessionStore>,
    pub completion: Arc<MockCompletion>,
    pub images: Arc<MockImages>,
    pub edit: Arc<MockMultimodal>,
}

impl Harness {
    pub fn provider_calls(&self) -> usize {
        self.completion.calls.lock().len() + self.images.prompts.lock().len() + self.edit.edits.lock().len()
    }

    /// 編集プロバイダに渡された参照画像（呼び出し順）
    pub fn edit_references(&self) -> Vec<Vec<u8>> {
        self.edit.edits.lock().iter().map(|(_, image)| image.clone()).collect()
    }

    pub fn image_prompts(&self) -> Vec<String> {
        self.images.prompts.lock().clone()
    }
}

pub struct HarnessBuilder {
    pub enhance_reply: Result<String, ProviderError>,
    pub image_reply: Result<Vec<u8>, ProviderError>,
    pub edit_reply: Result<Vec<u8>, ProviderError>,
    pub max_prompt_length: usize,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            enhance_reply: Ok("enhanced prompt".to_string()),
            image_reply: Ok(b"generated".to_vec()),
            edit_reply: Ok(b"edited".to_vec()),
            max_prompt_length: 1000,
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let store = Arc::new(SessionStore::new());
        let metrics = Arc::new(Metrics::new());
        let completion = Arc::new(match self.enhance_reply {
            Ok(reply) => MockCompletion::ok(&reply),
            Err(e) => MockCompletion::failing(e),
        });
        let images = Arc::new(match self.image_reply {
            Ok(bytes) => MockImages::ok(&bytes),
            Err(e) => MockImages::failing(e),
        });
        let edit = Arc::new(MockMultimodal::new(self.edit_reply, Ok(String::new())));

        let enhancer = Arc::new(PromptEnhancer::new(
            completion.clone(),
            EnhancerOptions {
                enabled: true,
                model: "gpt-4o-mini".into(),
                target_language: "English".into(),
                max_tokens: 300,
            },
            metrics.clone(),
        ));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            store.clone(),
            enhancer,
            Arc::new(DirectGenerate::new(
                images.clone(),
                ImageOptions {
                    model: "gpt-image-1".into(),
                    size: "1024x1024".into(),
                    quality: "medium".into(),
                },
            )),
            Arc::new(IdentityPreservingEdit::new(IdentityBackend::Multimodal(edit.clone()))),
            metrics.clone(),
        ));
        let controller = SessionController::new(
            store.clone(),
            orchestrator,
            Arc::new(JobQueue::new()),
            metrics,
            self.max_prompt_length,
        );

        Harness {
            controller,
            store,
            completion,
            images,
            edit,
        }
    }
}
