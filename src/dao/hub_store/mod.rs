pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::sync::Arc;

use crate::config::{AppConfig, StorageBackend};
use crate::dao::models::{ProfileChanges, ScoreEntity, UserEntity};
use crate::dao::storage::{StorageError, StorageResult};
use futures::future::BoxFuture;
use tracing::info;
use uuid::Uuid;

/// Abstraction over the persistence layer for scores and user accounts.
///
/// Score ordering contract shared by every backend:
/// - [`HubStore::top_scores`] sorts by `value` descending, ties by `created_at` ascending;
/// - [`HubStore::player_scores`] sorts by `value` descending, ties by `created_at` descending.
pub trait HubStore: Send + Sync {
    fn insert_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn top_scores(
        &self,
        game_key: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    fn player_scores(
        &self,
        player_id: String,
        game_key: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;

    /// Insert a new user; fails with [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
    /// when the email or username is already taken.
    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn set_avatar(
        &self,
        id: Uuid,
        avatar: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn set_online(&self, id: Uuid, online: bool) -> BoxFuture<'static, StorageResult<()>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Open the backend selected by the configuration.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn HubStore>, StorageError> {
    match config.storage {
        StorageBackend::Memory => {
            info!("using in-memory storage; data will not survive a restart");
            Ok(Arc::new(memory::MemoryHubStore::new()))
        }
        #[cfg(feature = "mongo-store")]
        StorageBackend::Mongo => {
            let mongo_config =
                mongodb::MongoConfig::from_uri(&config.mongo_uri, config.mongo_db.as_deref())
                    .await?;
            let store = mongodb::MongoHubStore::connect(mongo_config).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo-store"))]
        StorageBackend::Mongo => Err(StorageError::unavailable(
            "mongo backend requested".into(),
            std::io::Error::other("built without the `mongo-store` feature"),
        )),
    }
}
