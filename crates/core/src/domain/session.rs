use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::types::UserId;

/// セッション状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingPrompt,
}

/// 参照写真を保持するユーザー単位のセッション
#[derive(Debug, Clone)]
pub struct Session {
    pub reference_image: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
}

impl Session {
    pub fn awaiting_prompt(reference_image: Vec<u8>, now: DateTime<Utc>) -> Self {
        Self {
            reference_image,
            created_at: now,
            state: SessionState::AwaitingPrompt,
        }
    }
}

const SHARD_COUNT: usize = 16;

/// セッションストア。
///
/// ユーザーIDのハッシュでシャードを選び、シャード単位のロックで同一ユーザーへの
/// アクセスを直列化する。ロックはマップ操作の間だけ保持され、ネットワーク待ちの間は
/// 保持されない。外部から他ユーザーのセッションを列挙する手段は持たない。
pub struct SessionStore {
    shards: Vec<Mutex<HashMap<UserId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, user_id: UserId) -> &Mutex<HashMap<UserId, Session>> {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// 参照画像を保存する（既存セッションは上書き）
    pub fn put(&self, user_id: UserId, image: Vec<u8>) {
        let session = Session::awaiting_prompt(image, Utc::now());
        self.shard(user_id).lock().insert(user_id, session);
    }

    /// セッションがあれば取り出して削除する。セッションを観測できる唯一の読み取り経路。
    pub fn take_if_present(&self, user_id: UserId) -> Option<Vec<u8>> {
        self.shard(user_id)
            .lock()
            .remove(&user_id)
            .map(|session| session.reference_image)
    }

    /// セッションを無条件に削除する（冪等）
    pub fn clear(&self, user_id: UserId) {
        self.shard(user_id).lock().remove(&user_id);
    }

    /// 診断用: 現在の状態（セッションがなければ Idle）。
    ///
    /// Idle か AwaitingPrompt かだけを返し、参照画像は返さない。生成経路の判断には
    /// 使わず、参照画像の取り出しは常に [`take_if_present`](Self::take_if_present) を通す。
    pub fn state(&self, user_id: UserId) -> SessionState {
        self.shard(user_id)
            .lock()
            .get(&user_id)
            .map(|session| session.state)
            .unwrap_or(SessionState::Idle)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_take_is_exactly_once() {
        let store = SessionStore::new();
        store.put(UserId(1), vec![1, 2, 3]);
        assert_eq!(store.take_if_present(UserId(1)), Some(vec![1, 2, 3]));
        assert_eq!(store.take_if_present(UserId(1)), None);
    }

    #[test]
    fn test_put_overwrites() {
        let store = SessionStore::new();
        store.put(UserId(1), vec![1]);
        store.put(UserId(1), vec![2, 2]);
        assert_eq!(store.take_if_present(UserId(1)), Some(vec![2, 2]));
    }

    #[test]
    fn test_state_transitions() {
        let store = SessionStore::new();
        assert_eq!(store.state(UserId(5)), SessionState::Idle);
        store.put(UserId(5), vec![9]);
        assert_eq!(store.state(UserId(5)), SessionState::AwaitingPrompt);
        store.clear(UserId(5));
        assert_eq!(store.state(UserId(5)), SessionState::Idle);
    }

    #[test]
    fn test_state_does_not_consume_session() {
        let store = SessionStore::new();
        store.put(UserId(6), vec![4, 5]);
        assert_eq!(store.state(UserId(6)), SessionState::AwaitingPrompt);
        assert_eq!(store.state(UserId(6)), SessionState::AwaitingPrompt);
        assert_eq!(store.take_if_present(UserId(6)), Some(vec![4, 5]));
        assert_eq!(store.state(UserId(6)), SessionState::Idle);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::new();
        store.clear(UserId(3));
        store.put(UserId(3), vec![1]);
        store.clear(UserId(3));
        store.clear(UserId(3));
        assert_eq!(store.take_if_present(UserId(3)), None);
    }

    #[test]
    fn test_users_are_isolated() {
        let store = SessionStore::new();
        store.put(UserId(1), vec![1]);
        store.put(UserId(2), vec![2]);
        store.clear(UserId(1));
        assert_eq!(store.take_if_present(UserId(2)), Some(vec![2]));
    }

    #[test]
    fn test_concurrent_take_has_single_winner() {
        let store = Arc::new(SessionStore::new());
        store.put(UserId(42), vec![7]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.take_if_present(UserId(42)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();
        assert_eq!(winners, 1);
    }
}
