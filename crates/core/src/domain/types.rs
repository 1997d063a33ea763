use serde::{Deserialize, Serialize};

/// ユーザー識別子（トランスポート側の不透明ID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// 受信イベント（トランスポートから供給される）
#[derive(Debug, Clone)]
pub enum InboundEvent {
    PhotoReceived { user_id: UserId, image: Vec<u8> },
    TextReceived { user_id: UserId, text: String },
}

impl InboundEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::PhotoReceived { user_id, .. } | Self::TextReceived { user_id, .. } => *user_id,
        }
    }

    /// プロバイダ呼び出しに至る可能性のあるイベントか
    pub fn is_generation_request(&self) -> bool {
        match self {
            Self::TextReceived { text, .. } => {
                Command::parse(text).is_none() && !text.trim().is_empty()
            }
            Self::PhotoReceived { .. } => false,
        }
    }
}

/// 送信イベント（トランスポートが配信する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    ReplyText {
        user_id: UserId,
        text: String,
    },
    ReplyPhoto {
        user_id: UserId,
        image: Vec<u8>,
        caption: String,
    },
}

impl OutboundEvent {
    pub fn text(user_id: UserId, text: impl Into<String>) -> Self {
        Self::ReplyText {
            user_id,
            text: text.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            Self::ReplyText { user_id, .. } | Self::ReplyPhoto { user_id, .. } => *user_id,
        }
    }
}

/// チャットコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Help,
    Reset,
    Cancel,
    /// 未知の `/xxx`。プロバイダには送らず使い方を返す。
    Unknown,
}

impl Command {
    /// `/` で始まるテキストをコマンドとして解釈する。`/reset@my_bot` 形式も受け付ける。
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim_start();
        let rest = trimmed.strip_prefix('/')?;
        let word = rest.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default();

        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "reset" => Self::Reset,
            "cancel" => Self::Cancel,
            _ => Self::Unknown,
        };
        Some(command)
    }
}

/// 生成リクエスト（不変値）
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub user_id: UserId,
    pub text: String,
    /// 消費されたセッションの参照画像
    pub reference_image: Option<Vec<u8>>,
}

impl PromptRequest {
    pub fn new(user_id: UserId, text: impl Into<String>, reference_image: Option<Vec<u8>>) -> Self {
        Self {
            user_id,
            text: text.into(),
            reference_image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/reset"), Some(Command::Reset));
        assert_eq!(Command::parse("/cancel"), Some(Command::Cancel));
    }

    #[test]
    fn test_parse_command_with_bot_suffix_and_args() {
        assert_eq!(Command::parse("/reset@imagine_bot"), Some(Command::Reset));
        assert_eq!(Command::parse("  /HELP me please"), Some(Command::Help));
    }

    #[test]
    fn test_parse_unknown_and_plain_text() {
        assert_eq!(Command::parse("/paint"), Some(Command::Unknown));
        assert_eq!(Command::parse("a red fox in snow"), None);
        assert_eq!(Command::parse("50/50 split"), None);
    }

    #[test]
    fn test_is_generation_request() {
        let user_id = UserId(1);
        let text = |t: &str| InboundEvent::TextReceived {
            user_id,
            text: t.to_string(),
        };
        assert!(text("add a hat").is_generation_request());
        assert!(!text("/reset").is_generation_request());
        assert!(!text("   ").is_generation_request());
        assert!(!InboundEvent::PhotoReceived {
            user_id,
            image: vec![1]
        }
        .is_generation_request());
    }

    #[test]
    fn test_events_report_their_user() {
        let user_id = UserId::from(-100123);
        let photo = InboundEvent::PhotoReceived { user_id, image: vec![1] };
        assert_eq!(photo.user_id(), UserId(-100123));

        let reply = OutboundEvent::ReplyPhoto {
            user_id,
            image: vec![2],
            caption: "hat".into(),
        };
        assert_eq!(reply.user_id(), user_id);
        assert_eq!(OutboundEvent::text(user_id, "ok").user_id(), user_id);
    }
}
