//! テスト用の記録型モックプロバイダ。
//!
//! 統合テスト (`tests/common`) からも `#[path]` で取り込むため、クレート内パスは
//! `crate::` ではなく `ib_core::` で書く。

use async_trait::async_trait;
use parking_lot::Mutex;

use ib_core::domain::settings::RelayTuning;
use ib_core::infra::provider::{
    CompletionRequest, ImageGeneration, ImageRequest, MultimodalImage, ProviderError,
    RelayService, TextCompletion,
};

pub struct MockCompletion {
    pub reply: Result<String, ProviderError>,
    pub calls: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn ok(reply: &str) -> Self {
        Self { reply: Ok(reply.to_string()), calls: Mutex::new(vec![]) }
    }

    pub fn failing(err: ProviderError) -> Self {
        Self { reply: Err(err), calls: Mutex::new(vec![]) }
    }
}

#[async_trait]
impl TextCompletion for MockCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls.lock().push(request.clone());
        self.reply.clone()
    }

    fn name(&self) -> &str {
        "mock-completion"
    }
}

pub struct MockImages {
    pub reply: Result<Vec<u8>, ProviderError>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockImages {
    pub fn ok(bytes: &[u8]) -> Self {
        Self { reply: Ok(bytes.to_vec()), prompts: Mutex::new(vec![]) }
    }

    pub fn failing(err: ProviderError) -> Self {
        Self { reply: Err(err), prompts: Mutex::new(vec![]) }
    }
}

#[async_trait]
impl ImageGeneration for MockImages {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>, ProviderError> {
        self.prompts.lock().push(request.prompt.clone());
        self.reply.clone()
    }

    fn name(&self) -> &str {
        "mock-images"
    }
}

pub struct MockMultimodal {
    pub edit_reply: Result<Vec<u8>, ProviderError>,
    pub describe_reply: Result<String, ProviderError>,
    pub edits: Mutex<Vec<(String, Vec<u8>)>>,
    pub describes: Mutex<usize>,
}

impl MockMultimodal {
    pub fn new(edit_reply: Result<Vec<u8>, ProviderError>, describe_reply: Result<String, ProviderError>) -> Self {
        Self {
            edit_reply,
            describe_reply,
            edits: Mutex::new(vec![]),
            describes: Mutex::new(0),
        }
    }
}

#[async_trait]
impl MultimodalImage for MockMultimodal {
    async fn edit(&self, prompt: &str, reference: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.edits.lock().push((prompt.to_string(), reference.to_vec()));
        self.edit_reply.clone()
    }

    async fn describe(&self, _instruction: &str, _reference: &[u8]) -> Result<String, ProviderError> {
        *self.describes.lock() += 1;
        self.describe_reply.clone()
    }

    fn name(&self) -> &str {
        "mock-multimodal"
    }
}

pub struct MockRelay {
    pub upload_reply: Result<String, ProviderError>,
    pub generate_reply: Result<String, ProviderError>,
    pub fetch_reply: Result<Vec<u8>, ProviderError>,
    pub stages: Mutex<Vec<String>>,
}

impl MockRelay {
    pub fn ok(bytes: &[u8]) -> Self {
        Self {
            upload_reply: Ok("https://relay.test/ref.jpg".into()),
            generate_reply: Ok("https://relay.test/out.png".into()),
            fetch_reply: Ok(bytes.to_vec()),
            stages: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl RelayService for MockRelay {
    async fn upload(&self, _image: &[u8]) -> Result<String, ProviderError> {
        self.stages.lock().push("upload".into());
        self.upload_reply.clone()
    }

    async fn generate(
        &self,
        prompt: &str,
        reference_url: &str,
        _tuning: &RelayTuning,
        _size: (u32, u32),
    ) -> Result<String, ProviderError> {
        self.stages.lock().push(format!("generate:{reference_url}:{prompt}"));
        self.generate_reply.clone()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.stages.lock().push(format!("fetch:{url}"));
        self.fetch_reply.clone()
    }

    fn name(&self) -> &str {
        "mock-relay"
    }
}
