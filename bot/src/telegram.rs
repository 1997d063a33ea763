use std::time::Duration;

use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use ib_core::infra::provider::sniff_mime;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram 呼び出しエラー
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Bot API error {method}: {description}")]
    Api { method: &'static str, description: String },
    #[error("file {0} has no download path")]
    NoFilePath(String),
}

/// Bot API の共通レスポンス封筒
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct File {
    file_path: Option<String>,
}

/// Telegram Bot API クライアント（ロングポーリング）
pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(token: &str, poll_timeout_secs: u64) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            token: token.to_string(),
            poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TelegramError> {
        let envelope: ApiResponse<T> = request.send().await?.json().await?;
        unwrap_envelope(method, envelope)
    }

    /// 新着アップデートを取得する（ロングポーリング）
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let request = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .timeout(Duration::from_secs(self.poll_timeout_secs + 10));
        self.call("getUpdates", request).await
    }

    /// file_id から実ファイルをダウンロードする
    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        let request = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", file_id)])
            .timeout(Duration::from_secs(30));
        let file: File = self.call("getFile", request).await?;
        let path = file
            .file_path
            .ok_or_else(|| TelegramError::NoFilePath(file_id.to_string()))?;

        let bytes = self
            .client
            .get(format!("{API_BASE}/file/bot{}/{path}", self.token))
            .timeout(Duration::from_secs(60))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        log::debug!("Downloaded {} ({} bytes)", path, bytes.len());
        Ok(bytes.to_vec())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let request = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .timeout(Duration::from_secs(30));
        let _: serde_json::Value = self.call("sendMessage", request).await?;
        Ok(())
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        image: Vec<u8>,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let (mime, ext) = match sniff_mime(&image) {
            "image/jpeg" => ("image/jpeg", "jpg"),
            "image/webp" => ("image/webp", "webp"),
            _ => ("image/png", "png"),
        };
        let photo = multipart::Part::bytes(image)
            .file_name(format!("image.{ext}"))
            .mime_str(mime)?;
        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", photo);
        let request = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .timeout(Duration::from_secs(60));
        let _: serde_json::Value = self.call("sendPhoto", request).await?;
        Ok(())
    }
}

fn unwrap_envelope<T>(method: &'static str, envelope: ApiResponse<T>) -> Result<T, TelegramError> {
    match envelope {
        ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
        ApiResponse { description, .. } => Err(TelegramError::Api {
            method,
            description: description.unwrap_or_else(|| "no result".to_string()),
        }),
    }
}
