use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::UserId;

/// 処理タスクの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
    Canceled,
}

/// 1メッセージ分の処理の種類。/cancel の対象は Generate のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Photo,
    Command,
    Generate,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub job_id: String,
    pub user_id: UserId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl JobInfo {
    pub fn queued(user_id: UserId, kind: JobKind, now: DateTime<Utc>) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            kind,
            status: JobStatus::Queued,
            created_at: now,
            error: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, JobStatus::Queued | JobStatus::Running)
    }

    /// 指定ユーザーの /cancel で中断できるか
    pub fn is_cancelable_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id && self.kind == JobKind::Generate && self.is_active()
    }
}
