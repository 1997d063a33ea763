pub mod gemini;
pub mod openai;
pub mod prompts;
pub mod relay;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::classifier::ErrorClassifier;
use crate::domain::error::{ErrorKind, GenerationError};
use crate::domain::settings::RelayTuning;

/// プロバイダ呼び出しエラー
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// メッセージ以外から判断できる種別
    fn structural_kind(&self) -> ErrorKind {
        match self {
            Self::Timeout | Self::Transport(_) => ErrorKind::UpstreamUnavailable,
            Self::Status { status, .. } if *status >= 500 => ErrorKind::UpstreamUnavailable,
            Self::MalformedResponse(_) | Self::Decode(_) => ErrorKind::MalformedUpstreamResponse,
            Self::Status { .. } | Self::NotConfigured(_) => ErrorKind::Unclassified,
        }
    }

    /// 分類済みの生成エラーに変換する
    pub fn classify(&self) -> GenerationError {
        let detail = self.to_string();
        let kind = ErrorClassifier::classify_with_fallback(&detail, self.structural_kind());
        GenerationError::new(kind, detail)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// 非2xxレスポンスを `ProviderError::Status` に変換し、成功時はそのまま返す
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status,
        body: crate::domain::error::excerpt(&body, 1024),
    })
}

/// テキスト補完リクエスト
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// text-to-image リクエスト
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
}

/// テキスト補完プロバイダ
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// text-to-image プロバイダ
#[async_trait]
pub trait ImageGeneration: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>, ProviderError>;

    fn name(&self) -> &str;
}

/// 参照画像を受け取るマルチモーダルプロバイダ
#[async_trait]
pub trait MultimodalImage: Send + Sync {
    /// プロンプト + 参照画像 → 画像
    async fn edit(&self, prompt: &str, reference: &[u8]) -> Result<Vec<u8>, ProviderError>;

    /// 参照画像 + 指示 → テキスト
    async fn describe(&self, instruction: &str, reference: &[u8]) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// アップロードが必要な二次生成サービス
#[async_trait]
pub trait RelayService: Send + Sync {
    /// バイナリをアップロードし、取得可能なURLを返す
    async fn upload(&self, image: &[u8]) -> Result<String, ProviderError>;

    /// プロンプト + 参照URL → 結果画像のURL
    async fn generate(
        &self,
        prompt: &str,
        reference_url: &str,
        tuning: &RelayTuning,
        size: (u32, u32),
    ) -> Result<String, ProviderError>;

    /// 結果URLから画像バイト列を取得する
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError>;

    fn name(&self) -> &str;
}

/// 画像バイト列から MIME タイプを推定する（マジックバイト）
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}
