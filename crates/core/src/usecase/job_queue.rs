use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::job::{JobInfo, JobKind, JobStatus};
use crate::domain::types::{InboundEvent, UserId};

/// ジョブキュー: イベント処理タスクの登録・追跡・キャンセル
pub struct JobQueue {
    jobs: Arc<Mutex<HashMap<String, JobEntry>>>,
}

struct JobEntry {
    info: JobInfo,
    handle: Option<JoinHandle<()>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 受信イベントに対応するジョブ種別
    pub fn kind_for(event: &InboundEvent) -> JobKind {
        match event {
            InboundEvent::PhotoReceived { .. } => JobKind::Photo,
            e if e.is_generation_request() => JobKind::Generate,
            InboundEvent::TextReceived { .. } => JobKind::Command,
        }
    }

    /// ジョブを登録し、ジョブIDを返す
    pub async fn enqueue(&self, user_id: UserId, kind: JobKind) -> String {
        let info = JobInfo::queued(user_id, kind, chrono::Utc::now());
        let job_id = info.job_id.clone();

        let mut jobs = self.jobs.lock().await;
        jobs.insert(job_id.clone(), JobEntry { info, handle: None });
        job_id
    }

    /// ジョブのJoinHandleを設定（spawn後に呼ぶ）。
    /// 既にキャンセル済みならその場で abort する。
    pub async fn set_handle(&self, job_id: &str, handle: JoinHandle<()>) {
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(job_id) {
            Some(entry) if entry.info.is_active() => entry.handle = Some(handle),
            Some(entry) if entry.info.status == JobStatus::Canceled => handle.abort(),
            _ => {}
        }
    }

    pub async fn mark_running(&self, job_id: &str) {
        let mut jobs = self.jobs.lock().await;
        if let Some(entry) = jobs.get_mut(job_id) {
            if entry.info.status == JobStatus::Queued {
                entry.info.status = JobStatus::Running;
            }
        }
    }

    pub async fn mark_done(&self, job_id: &str) {
        let mut jobs = self.jobs.lock().await;
        if let Some(entry) = jobs.get_mut(job_id) {
            if entry.info.is_active() {
                entry.info.status = JobStatus::Done;
            }
            entry.handle = None;
        }
    }

    pub async fn mark_failed(&self, job_id: &str, error: String) {
        let mut jobs = self.jobs.lock().await;
        if let Some(entry) = jobs.get_mut(job_id) {
            if entry.info.is_active() {
                entry.info.status = JobStatus::Failed;
                entry.info.error = Some(error);
            }
            entry.handle = None;
        }
    }

    /// ユーザーの実行中の生成ジョブをキャンセルし、キャンセルしたジョブIDを返す。
    /// 中断された呼び出しでアップロード済みの画像は後始末しない。
    pub async fn cancel_user(&self, user_id: UserId) -> Vec<String> {
        let mut jobs = self.jobs.lock().await;
        let mut canceled = vec![];

        for (job_id, entry) in jobs.iter_mut() {
            if entry.info.is_cancelable_by(user_id) {
                entry.info.status = JobStatus::Canceled;
                if let Some(handle) = entry.handle.take() {
                    handle.abort();
                }
                canceled.push(job_id.clone());
            }
        }

        canceled
    }

    pub async fn get_job(&self, job_id: &str) -> Option<JobInfo> {
        let jobs = self.jobs.lock().await;
        jobs.get(job_id).map(|e| e.info.clone())
    }

    /// 完了済みジョブを削除（メモリ解放）
    pub async fn cleanup_completed(&self) {
        let mut jobs = self.jobs.lock().await;
        jobs.retain(|_, entry| entry.info.is_active());
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
