use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{check_status, CompletionRequest, ImageGeneration, ImageRequest, ProviderError, TextCompletion};
use crate::domain::settings::OpenAiConfig;

/// OpenAI API クライアント（chat completions + images/generations）
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    completion_timeout: Duration,
    generation_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'static str>,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

/// レスポンス内の画像の所在
#[derive(Debug, PartialEq, Eq)]
enum ImagePayload {
    Inline(Vec<u8>),
    Remote(String),
}

impl OpenAiClient {
    pub fn new(
        config: &OpenAiConfig,
        completion_timeout: Duration,
        generation_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            completion_timeout,
            generation_timeout,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(self.generation_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn completion_text(response: ChatResponse) -> Result<String, ProviderError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "completion has no choices[0].message.content".to_string(),
        ));
    }
    Ok(text)
}

fn image_payload(response: ImagesResponse) -> Result<ImagePayload, ProviderError> {
    let datum = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("images response has no data".to_string()))?;

    if let Some(b64) = datum.b64_json.filter(|s| !s.is_empty()) {
        let bytes = BASE64
            .decode(b64.as_bytes())
            .map_err(|e| ProviderError::Decode(format!("image base64: {e}")))?;
        return Ok(ImagePayload::Inline(bytes));
    }
    if let Some(url) = datum.url.filter(|s| !s.is_empty()) {
        return Ok(ImagePayload::Remote(url));
    }
    Err(ProviderError::MalformedResponse(
        "data[0] has neither b64_json nor url".to_string(),
    ))
}

/// gpt-image 系は常に base64 を返すが、dall-e 系は明示が必要
fn response_format_for(model: &str) -> Option<&'static str> {
    model.starts_with("dall-e").then_some("b64_json")
}

#[async_trait]
impl TextCompletion for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(self.completion_timeout)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: ChatResponse = response.json().await?;
        completion_text(parsed)
    }

    fn name(&self) -> &str {
        "openai-chat"
    }
}

#[async_trait]
impl ImageGeneration for OpenAiClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>, ProviderError> {
        let body = ImagesRequest {
            model: &request.model,
            prompt: &request.prompt,
            n: 1,
            size: &request.size,
            quality: &request.quality,
            response_format: response_format_for(&request.model),
        };

        log::debug!("OpenAI images/generations model={} size={}", request.model, request.size);
        let response = self
            .client
            .post(format!("{}/images/generations", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(self.generation_timeout)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: ImagesResponse = response.json().await?;

        match image_payload(parsed)? {
            ImagePayload::Inline(bytes) => Ok(bytes),
            ImagePayload::Remote(url) => self.download(&url).await,
        }
    }

    fn name(&self) -> &str {
        "openai-images"
    }
}
