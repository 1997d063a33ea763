use std::sync::Arc;

use crate::domain::error::{excerpt, GenerationError};
use crate::domain::session::{SessionState, SessionStore};
use crate::domain::types::{Command, InboundEvent, OutboundEvent, UserId};
use crate::infra::metrics::Metrics;

use super::job_queue::JobQueue;
use super::orchestrator::GenerationOrchestrator;

pub const MSG_USAGE: &str = "\
画像生成ボットです。
・作りたい画像の説明を送ると、その画像を生成します。
・先に写真を送り、続けて説明を送ると、写真の人物の顔を保ったまま編集します。
/reset : 送った写真を破棄します
/cancel : 生成中のリクエストを中止します
/help : この説明を表示します";

pub const MSG_PHOTO_RECEIVED: &str =
    "写真を受け取りました。この写真をどう変えたいか、説明を送ってください。";
pub const MSG_PHOTO_UNREADABLE: &str = "写真を取得できませんでした。もう一度送ってください。";
pub const MSG_RESET: &str = "リセットしました。写真は破棄されました。";
pub const MSG_GENERATING: &str = "画像を生成しています。少々お待ちください…";
pub const MSG_NOTHING_TO_CANCEL: &str = "中止できる生成はありません。";

/// キャプションに載せるプロンプトの最大文字数
const CAPTION_MAX_CHARS: usize = 200;

/// セッション状態機械のエントリポイント。
///
/// 受信イベントを1件ずつ処理し、セッションストアを更新し、必要なら生成を呼び出して
/// 送信イベントを返す。状態は Idle と AwaitingPrompt のみで終端状態はない。
pub struct SessionController {
    store: Arc<SessionStore>,
    orchestrator: Arc<GenerationOrchestrator>,
    jobs: Arc<JobQueue>,
    metrics: Arc<Metrics>,
    max_prompt_length: usize,
}

impl SessionController {
    pub fn new(
        store: Arc<SessionStore>,
        orchestrator: Arc<GenerationOrchestrator>,
        jobs: Arc<JobQueue>,
        metrics: Arc<Metrics>,
        max_prompt_length: usize,
    ) -> Self {
        Self {
            store,
            orchestrator,
            jobs,
            metrics,
            max_prompt_length,
        }
    }

    pub fn jobs(&self) -> &Arc<JobQueue> {
        &self.jobs
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// 診断用の状態参照。参照画像は返さない。
    pub fn state(&self, user_id: UserId) -> SessionState {
        self.store.state(user_id)
    }

    /// 時間のかかる生成の前に送る途中経過メッセージ。生成に進まないイベントでは None。
    pub fn acknowledgement(&self, event: &InboundEvent) -> Option<OutboundEvent> {
        match event {
            InboundEvent::TextReceived { user_id, text }
                if event.is_generation_request() && !self.exceeds_limit(text) =>
            {
                Some(OutboundEvent::text(*user_id, MSG_GENERATING))
            }
            _ => None,
        }
    }

    pub async fn handle(&self, event: InboundEvent) -> OutboundEvent {
        log::debug!("Handling event for user {}", event.user_id());
        match event {
            InboundEvent::PhotoReceived { user_id, image } => self.on_photo(user_id, image),
            InboundEvent::TextReceived { user_id, text } => match Command::parse(&text) {
                Some(command) => self.on_command(user_id, command).await,
                None => self.on_text(user_id, &text).await,
            },
        }
    }

    fn on_photo(&self, user_id: UserId, image: Vec<u8>) -> OutboundEvent {
        // 空の参照画像ではセッションを作らない（既存の写真もそのまま残す）
        if image.is_empty() {
            log::warn!("Empty photo from user {}, session unchanged", user_id);
            return OutboundEvent::text(user_id, MSG_PHOTO_UNREADABLE);
        }

        log::info!("Photo stored for user {} ({} bytes)", user_id, image.len());
        self.store.put(user_id, image);
        self.metrics.inc_photos_received();
        OutboundEvent::text(user_id, MSG_PHOTO_RECEIVED)
    }

    async fn on_command(&self, user_id: UserId, command: Command) -> OutboundEvent {
        match command {
            Command::Start | Command::Help | Command::Unknown => OutboundEvent::text(user_id, MSG_USAGE),
            Command::Reset => {
                self.store.clear(user_id);
                log::info!("Session reset for user {}", user_id);
                OutboundEvent::text(user_id, MSG_RESET)
            }
            Command::Cancel => {
                let canceled = self.jobs.cancel_user(user_id).await;
                if canceled.is_empty() {
                    OutboundEvent::text(user_id, MSG_NOTHING_TO_CANCEL)
                } else {
                    log::info!("Canceled {} job(s) for user {}", canceled.len(), user_id);
                    OutboundEvent::text(user_id, format!("生成を {} 件中止しました。", canceled.len()))
                }
            }
        }
    }

    async fn on_text(&self, user_id: UserId, text: &str) -> OutboundEvent {
        let prompt = text.trim();
        if prompt.is_empty() {
            return OutboundEvent::text(user_id, MSG_USAGE);
        }

        if self.exceeds_limit(prompt) {
            let err = GenerationError::prompt_too_long(prompt.chars().count(), self.max_prompt_length);
            self.metrics.inc_error(err.kind);
            log::info!("Rejected prompt from user {}: {err}", user_id);
            return OutboundEvent::text(user_id, err.user_message(self.max_prompt_length));
        }

        match self.orchestrator.generate(user_id, prompt).await {
            Ok(image) => OutboundEvent::ReplyPhoto {
                user_id,
                image,
                caption: excerpt(prompt, CAPTION_MAX_CHARS),
            },
            Err(e) => OutboundEvent::text(user_id, e.user_message(self.max_prompt_length)),
        }
    }

    fn exceeds_limit(&self, text: &str) -> bool {
        text.trim().chars().count() > self.max_prompt_length
    }
}
