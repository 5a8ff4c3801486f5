//! Process-local [`HubStore`] used by tests and by `STORAGE_BACKEND=memory`.

use std::{cmp::Ordering, sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::dao::{
    hub_store::HubStore,
    models::{ProfileChanges, ScoreEntity, UserEntity},
    storage::{StorageError, StorageResult},
};

#[derive(Clone, Default)]
pub struct MemoryHubStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    /// Append-only score log; insertion order breaks exact timestamp ties.
    scores: RwLock<Vec<ScoreEntity>>,
    users: DashMap<Uuid, UserEntity>,
    /// Serializes user writes so uniqueness checks and inserts are atomic.
    user_writes: Mutex<()>,
}

impl MemoryHubStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> bool {
        self.inner
            .users
            .iter()
            .any(|entry| entry.email == email && Some(entry.id) != exclude)
    }

    fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> bool {
        self.inner.users.iter().any(|entry| {
            entry.username.as_deref() == Some(username) && Some(entry.id) != exclude
        })
    }

    async fn top_scores(&self, game_key: &str, limit: usize) -> Vec<ScoreEntity> {
        let scores = self.inner.scores.read().await;
        let mut matching: Vec<ScoreEntity> = scores
            .iter()
            .filter(|score| score.game_key == game_key)
            .cloned()
            .collect();
        // Stable sort: equal (value, created_at) pairs keep insertion order.
        matching.sort_by(|a, b| by_value_desc(a, b).then(a.created_at.cmp(&b.created_at)));
        matching.truncate(limit);
        matching
    }

    async fn player_scores(&self, player_id: &str, game_key: &str, limit: usize) -> Vec<ScoreEntity> {
        let scores = self.inner.scores.read().await;
        let mut matching: Vec<ScoreEntity> = scores
            .iter()
            .rev()
            .filter(|score| {
                score.game_key == game_key && score.user_id.as_deref() == Some(player_id)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| by_value_desc(a, b).then(b.created_at.cmp(&a.created_at)));
        matching.truncate(limit);
        matching
    }

    async fn insert_user(&self, user: UserEntity) -> StorageResult<()> {
        let _gate = self.inner.user_writes.lock().await;
        if self.email_taken(&user.email, None) {
            return Err(StorageError::conflict("email already registered"));
        }
        if let Some(username) = user.username.as_deref() {
            if self.username_taken(username, None) {
                return Err(StorageError::conflict("username already taken"));
            }
        }
        self.inner.users.insert(user.id, user);
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> StorageResult<Option<UserEntity>> {
        let _gate = self.inner.user_writes.lock().await;
        if let Some(Some(username)) = changes.username.as_ref() {
            if self.username_taken(username, Some(id)) {
                return Err(StorageError::conflict("username already taken"));
            }
        }
        Ok(self.inner.users.get_mut(&id).map(|mut user| {
            changes.apply_to(&mut *user);
            user.value().clone()
        }))
    }

    async fn modify_user(
        &self,
        id: Uuid,
        modify: impl FnOnce(&mut UserEntity),
    ) -> Option<UserEntity> {
        let _gate = self.inner.user_writes.lock().await;
        self.inner.users.get_mut(&id).map(|mut user| {
            modify(&mut *user);
            user.updated_at = SystemTime::now();
            user.value().clone()
        })
    }
}

fn by_value_desc(a: &ScoreEntity, b: &ScoreEntity) -> Ordering {
    b.value.total_cmp(&a.value)
}

impl HubStore for MemoryHubStore {
    fn insert_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.scores.write().await.push(score);
            Ok(())
        })
    }

    fn top_scores(
        &self,
        game_key: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.top_scores(&game_key, limit).await) })
    }

    fn player_scores(
        &self,
        player_id: String,
        game_key: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.player_scores(&player_id, &game_key, limit).await) })
    }

    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_user(user).await })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.users.get(&id).map(|user| user.value().clone())) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .users
                .iter()
                .find(|entry| entry.email == email)
                .map(|entry| entry.value().clone()))
        })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .users
                .iter()
                .find(|entry| entry.username.as_deref() == Some(username.as_str()))
                .map(|entry| entry.value().clone()))
        })
    }

    fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_profile(id, changes).await })
    }

    fn set_avatar(
        &self,
        id: Uuid,
        avatar: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .modify_user(id, move |user| user.avatar = Some(avatar))
                .await)
        })
    }

    fn set_online(&self, id: Uuid, online: bool) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.modify_user(id, |user| user.is_online = online).await;
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
