use serde::Serialize;

/// 分類済みエラー種別（ユーザー向け結果の閉じた集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "E_CONTENT_POLICY")]
    ContentPolicyViolation,
    #[serde(rename = "E_QUOTA")]
    QuotaExceeded,
    #[serde(rename = "E_UPSTREAM_UNAVAILABLE")]
    UpstreamUnavailable,
    #[serde(rename = "E_MALFORMED_RESPONSE")]
    MalformedUpstreamResponse,
    #[serde(rename = "E_PROMPT_TOO_LONG")]
    PromptTooLong,
    #[serde(rename = "E_UNCLASSIFIED")]
    Unclassified,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContentPolicyViolation => "E_CONTENT_POLICY",
            Self::QuotaExceeded => "E_QUOTA",
            Self::UpstreamUnavailable => "E_UPSTREAM_UNAVAILABLE",
            Self::MalformedUpstreamResponse => "E_MALFORMED_RESPONSE",
            Self::PromptTooLong => "E_PROMPT_TOO_LONG",
            Self::Unclassified => "E_UNCLASSIFIED",
        }
    }
}

/// `Unclassified` の表示に残す元メッセージの最大文字数
pub const EXCERPT_MAX_CHARS: usize = 250;

pub const MSG_CONTENT_POLICY: &str =
    "リクエストがコンテンツポリシーに抵触したため生成できませんでした。内容を変えて再度お試しください。";
pub const MSG_QUOTA: &str =
    "画像生成サービスの利用上限に達しました。しばらくしてから再度お試しください。";
pub const MSG_UPSTREAM_UNAVAILABLE: &str =
    "画像生成サービスに接続できませんでした。しばらくしてから再度お試しください。";
pub const MSG_MALFORMED: &str =
    "画像生成サービスから画像を受け取れませんでした。もう一度お試しください。";

/// 生成パイプラインのエラー（種別 + 診断用詳細）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn prompt_too_long(len: usize, max: usize) -> Self {
        Self::new(
            ErrorKind::PromptTooLong,
            format!("prompt length {len} exceeds limit {max}"),
        )
    }

    /// ユーザーに表示する固定メッセージ。`Unclassified` のみ元メッセージの抜粋を含む。
    pub fn user_message(&self, max_prompt_length: usize) -> String {
        match self.kind {
            ErrorKind::ContentPolicyViolation => MSG_CONTENT_POLICY.to_string(),
            ErrorKind::QuotaExceeded => MSG_QUOTA.to_string(),
            ErrorKind::UpstreamUnavailable => MSG_UPSTREAM_UNAVAILABLE.to_string(),
            ErrorKind::MalformedUpstreamResponse => MSG_MALFORMED.to_string(),
            ErrorKind::PromptTooLong => format!(
                "説明が長すぎます（最大 {max_prompt_length} 文字）。短くしてもう一度送ってください。"
            ),
            ErrorKind::Unclassified => format!(
                "画像の生成中にエラーが発生しました: {}",
                excerpt(&self.detail, EXCERPT_MAX_CHARS)
            ),
        }
    }
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.detail)
    }
}

impl std::error::Error for GenerationError {}

/// 生成結果: 生の画像バイト列、または分類済みエラー
pub type GenerationResult = Result<Vec<u8>, GenerationError>;

/// 文字境界を壊さずに先頭 `max_chars` 文字を切り出す
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
