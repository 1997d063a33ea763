use std::sync::Arc;
use std::time::Duration;

use ib_core::domain::types::{InboundEvent, OutboundEvent, UserId};
use ib_core::usecase::controller::{SessionController, MSG_PHOTO_UNREADABLE};

use crate::intake::{self, Intake};
use crate::telegram::{TelegramClient, TelegramError};

const MAX_POLL_BACKOFF: Duration = Duration::from_secs(60);

/// getUpdates のロングポーリングを続け、メッセージごとに処理タスクを起動する
pub(crate) async fn poll_loop(
    controller: Arc<SessionController>,
    telegram: Arc<TelegramClient>,
) -> anyhow::Result<()> {
    let mut offset = 0;
    let mut backoff = Duration::from_secs(1);

    loop {
        let updates = match telegram.get_updates(offset).await {
            Ok(updates) => {
                backoff = Duration::from_secs(1);
                updates
            }
            Err(e) => {
                log::warn!("getUpdates failed: {e}; retrying in {}s", backoff.as_secs());
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_POLL_BACKOFF);
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let items = intake::from_message(&message);
            if items.is_empty() {
                log::debug!("Ignoring unsupported message in chat {}", message.chat.id);
                continue;
            }
            dispatch(controller.clone(), telegram.clone(), UserId::from(message.chat.id), items).await;
        }

        controller.jobs().cleanup_completed().await;
    }
}

/// 1メッセージ分の処理をジョブとして登録し、独立したタスクで実行する
async fn dispatch(
    controller: Arc<SessionController>,
    telegram: Arc<TelegramClient>,
    user_id: UserId,
    items: Vec<Intake>,
) {
    let jobs = controller.jobs().clone();
    let job_id = jobs.enqueue(user_id, intake::job_kind(user_id, &items)).await;

    let task_jobs = jobs.clone();
    let task_job_id = job_id.clone();
    let handle = tokio::spawn(async move {
        task_jobs.mark_running(&task_job_id).await;
        match process(&controller, &telegram, user_id, items).await {
            Ok(()) => task_jobs.mark_done(&task_job_id).await,
            Err(e) => {
                log::error!("Failed to reply to user {}: {e}", user_id);
                task_jobs.mark_failed(&task_job_id, e.to_string()).await;
            }
        }
    });
    jobs.set_handle(&job_id, handle).await;
}

async fn process(
    controller: &SessionController,
    telegram: &TelegramClient,
    user_id: UserId,
    items: Vec<Intake>,
) -> Result<(), TelegramError> {
    let mut items = items.into_iter().peekable();

    while let Some(item) = items.next() {
        let event = match item {
            Intake::Photo { file_id } => match telegram.download_file(&file_id).await {
                Ok(image) => InboundEvent::PhotoReceived { user_id, image },
                Err(e) => {
                    log::warn!("Photo download failed for user {}: {e}", user_id);
                    return telegram.send_message(user_id.0, MSG_PHOTO_UNREADABLE).await;
                }
            },
            Intake::Text(text) => InboundEvent::TextReceived { user_id, text },
        };

        if let Some(ack) = controller.acknowledgement(&event) {
            if let Err(e) = deliver(telegram, ack).await {
                log::warn!("途中経過メッセージ送信失敗: {e}");
            }
        }

        let is_photo = matches!(event, InboundEvent::PhotoReceived { .. });
        let reply = controller.handle(event).await;

        // キャプション付き写真では続けて生成するので受領メッセージは省く
        if is_photo && items.peek().is_some() {
            continue;
        }
        deliver(telegram, reply).await?;
    }
    Ok(())
}

async fn deliver(telegram: &TelegramClient, event: OutboundEvent) -> Result<(), TelegramError> {
    let chat_id = event.user_id().0;
    match event {
        OutboundEvent::ReplyText { text, .. } => telegram.send_message(chat_id, &text).await,
        OutboundEvent::ReplyPhoto { image, caption, .. } => telegram.send_photo(chat_id, image, &caption).await,
    }
}
