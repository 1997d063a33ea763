use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{check_status, sniff_mime, MultimodalImage, ProviderError};
use crate::domain::settings::GeminiConfig;

/// Gemini generateContent クライアント（参照画像をインラインで渡す）
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    image_model: String,
    vision_model: String,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    #[serde(alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            image_model: config.image_model.clone(),
            vision_model: config.vision_model.clone(),
            timeout,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ProviderError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

fn build_request(prompt: &str, reference: &[u8], want_image: bool) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::Inline {
                    inline_data: InlineData {
                        mime_type: sniff_mime(reference).to_string(),
                        data: BASE64.encode(reference),
                    },
                },
                RequestPart::Text {
                    text: prompt.to_string(),
                },
            ],
        }],
        generation_config: want_image.then(|| GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
        }),
    }
}

/// 安全性ブロックは分類器が拾えるメッセージに変換する
fn check_blocked(response: &GenerateResponse) -> Result<(), ProviderError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(ProviderError::Status {
            status: 400,
            body: format!("prompt blocked due to safety: {reason}"),
        });
    }
    let blocked = response.candidates.iter().find_map(|c| {
        c.finish_reason
            .as_deref()
            .filter(|r| matches!(*r, "SAFETY" | "PROHIBITED_CONTENT" | "IMAGE_SAFETY"))
    });
    if let Some(reason) = blocked {
        return Err(ProviderError::Status {
            status: 400,
            body: format!("candidate blocked due to safety: {reason}"),
        });
    }
    Ok(())
}

fn extract_image(response: GenerateResponse) -> Result<Vec<u8>, ProviderError> {
    check_blocked(&response)?;
    let inline = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.inline_data.filter(|d| !d.data.is_empty()))
        .ok_or_else(|| {
            ProviderError::MalformedResponse("no inlineData image part in candidates".to_string())
        })?;

    BASE64
        .decode(inline.data.as_bytes())
        .map_err(|e| ProviderError::Decode(format!("Gemini image base64: {e}")))
}

fn extract_text(response: GenerateResponse) -> Result<String, ProviderError> {
    check_blocked(&response)?;
    let text = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(ProviderError::MalformedResponse(
            "no text part in candidates".to_string(),
        ));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl MultimodalImage for GeminiClient {
    async fn edit(&self, prompt: &str, reference: &[u8]) -> Result<Vec<u8>, ProviderError> {
        log::debug!("Gemini edit model={} reference={} bytes", self.image_model, reference.len());
        let request = build_request(prompt, reference, true);
        let response = self.generate_content(&self.image_model, &request).await?;
        extract_image(response)
    }

    async fn describe(&self, instruction: &str, reference: &[u8]) -> Result<String, ProviderError> {
        log::debug!("Gemini describe model={}", self.vision_model);
        let request = build_request(instruction, reference, false);
        let response = self.generate_content(&self.vision_model, &request).await?;
        extract_text(response)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
