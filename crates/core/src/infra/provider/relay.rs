use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, sniff_mime, ProviderError, RelayService};
use crate::domain::settings::{RelayConfig, RelayTuning};

/// 二次生成サービスのクライアント。
///
/// 参照画像をアップロードしてURLを得て、そのURLで生成を依頼し、
/// 結果URLから画像を取得する。
pub struct RelayClient {
    client: reqwest::Client,
    api_key: String,
    upload_url: String,
    generate_url: String,
    upload_timeout: Duration,
    generation_timeout: Duration,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(alias = "file_url", alias = "access_url")]
    url: Option<String>,
}

#[derive(Serialize)]
struct RelayGenerateRequest<'a> {
    prompt: &'a str,
    reference_image_url: &'a str,
    num_inference_steps: u32,
    guidance_scale: f32,
    id_weight: f32,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct RelayGenerateResponse {
    #[serde(default)]
    images: Vec<RelayImage>,
}

#[derive(Deserialize)]
struct RelayImage {
    url: Option<String>,
}

impl RelayClient {
    pub fn new(
        config: &RelayConfig,
        upload_timeout: Duration,
        generation_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            upload_url: config.upload_url.clone(),
            generate_url: config.generate_url.clone(),
            upload_timeout,
            generation_timeout,
        })
    }
}

fn uploaded_url(response: UploadResponse) -> Result<String, ProviderError> {
    response
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ProviderError::MalformedResponse("upload response has no url".to_string()))
}

fn result_url(response: RelayGenerateResponse) -> Result<String, ProviderError> {
    response
        .images
        .into_iter()
        .find_map(|image| image.url.filter(|u| !u.is_empty()))
        .ok_or_else(|| ProviderError::MalformedResponse("relay response has no images[].url".to_string()))
}

fn upload_filename(mime: &str) -> &'static str {
    match mime {
        "image/png" => "reference.png",
        "image/webp" => "reference.webp",
        _ => "reference.jpg",
    }
}

#[async_trait]
impl RelayService for RelayClient {
    async fn upload(&self, image: &[u8]) -> Result<String, ProviderError> {
        let mime = sniff_mime(image);
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name(upload_filename(mime))
            .mime_str(mime)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.api_key)
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        uploaded_url(response.json().await?)
    }

    async fn generate(
        &self,
        prompt: &str,
        reference_url: &str,
        tuning: &RelayTuning,
        size: (u32, u32),
    ) -> Result<String, ProviderError> {
        let body = RelayGenerateRequest {
            prompt,
            reference_image_url: reference_url,
            num_inference_steps: tuning.num_inference_steps,
            guidance_scale: tuning.guidance_scale,
            id_weight: tuning.id_weight,
            width: size.0,
            height: size.1,
        };

        let response = self
            .client
            .post(&self.generate_url)
            .bearer_auth(&self.api_key)
            .timeout(self.generation_timeout)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        result_url(response.json().await?)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(self.upload_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::MalformedResponse("relay result is empty".to_string()));
        }
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "relay"
    }
}
