use ib_core::domain::job::JobKind;
use ib_core::domain::types::{InboundEvent, UserId};
use ib_core::usecase::job_queue::JobQueue;

use crate::telegram::{Message, PhotoSize};

/// 1件の Telegram メッセージから取り出した処理単位。
/// 写真は file_id のまま保持し、ダウンロードは処理タスク内で行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    Photo { file_id: String },
    Text(String),
}

/// メッセージを処理順の Intake 列に変換する。
/// キャプション付き写真は「写真 → キャプション文」の順になる。
pub fn from_message(message: &Message) -> Vec<Intake> {
    let mut items = vec![];

    let photo_id = message
        .photo
        .as_deref()
        .and_then(largest_photo)
        .map(|p| p.file_id.clone())
        .or_else(|| {
            message
                .document
                .as_ref()
                .filter(|d| d.mime_type.as_deref().is_some_and(|m| m.starts_with("image/")))
                .map(|d| d.file_id.clone())
        });

    if let Some(file_id) = photo_id {
        items.push(Intake::Photo { file_id });
        if let Some(caption) = message.caption.as_ref().filter(|c| !c.trim().is_empty()) {
            items.push(Intake::Text(caption.clone()));
        }
    } else if let Some(text) = &message.text {
        items.push(Intake::Text(text.clone()));
    }

    items
}

/// 一番大きいサイズの写真を選ぶ
fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes
        .iter()
        .max_by_key(|p| (p.file_size.unwrap_or(0), u64::from(p.width) * u64::from(p.height)))
}

/// 処理単位全体のジョブ種別。生成を含むなら Generate。
pub fn job_kind(user_id: UserId, items: &[Intake]) -> JobKind {
    let kinds = items.iter().map(|item| match item {
        Intake::Photo { .. } => JobKind::Photo,
        Intake::Text(text) => JobQueue::kind_for(&InboundEvent::TextReceived {
            user_id,
            text: text.clone(),
        }),
    });

    let mut result = JobKind::Command;
    for kind in kinds {
        match kind {
            JobKind::Generate => return JobKind::Generate,
            JobKind::Photo => result = JobKind::Photo,
            JobKind::Command => {}
        }
    }
    result
}
