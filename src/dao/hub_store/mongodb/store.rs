use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoScoreDocument, MongoUserDocument, doc_id},
};
use crate::dao::{
    hub_store::HubStore,
    models::{ProfileChanges, ScoreEntity, UserEntity},
    storage::StorageResult,
};

const SCORE_COLLECTION_NAME: &str = "scores";
const USER_COLLECTION_NAME: &str = "users";

#[derive(Clone)]
pub struct MongoHubStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoHubStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let users = self.user_collection().await;
        let user_indexes = [
            (
                "email",
                IndexModel::builder()
                    .keys(doc! {"email": 1})
                    .options(
                        IndexOptions::builder()
                            .name(Some("user_email_idx".to_owned()))
                            .unique(Some(true))
                            .build(),
                    )
                    .build(),
            ),
            (
                "username",
                IndexModel::builder()
                    .keys(doc! {"username": 1})
                    .options(
                        IndexOptions::builder()
                            .name(Some("user_username_idx".to_owned()))
                            .unique(Some(true))
                            .sparse(Some(true))
                            .build(),
                    )
                    .build(),
            ),
        ];
        for (index, model) in user_indexes {
            users
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: USER_COLLECTION_NAME,
                    index,
                    source,
                })?;
        }

        let scores = self.score_collection().await;
        let score_indexes = [
            (
                "gameKey,value,createdAt",
                IndexModel::builder()
                    .keys(doc! {"gameKey": 1, "value": -1, "createdAt": 1})
                    .options(
                        IndexOptions::builder()
                            .name(Some("score_leaderboard_idx".to_owned()))
                            .build(),
                    )
                    .build(),
            ),
            (
                "userId,gameKey",
                IndexModel::builder()
                    .keys(doc! {"userId": 1, "gameKey": 1})
                    .options(
                        IndexOptions::builder()
                            .name(Some("score_player_idx".to_owned()))
                            .build(),
                    )
                    .build(),
            ),
        ];
        for (index, model) in score_indexes {
            scores
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: SCORE_COLLECTION_NAME,
                    index,
                    source,
                })?;
        }

        Ok(())
    }

    async fn score_collection(&self) -> Collection<MongoScoreDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoScoreDocument>(SCORE_COLLECTION_NAME)
    }

    async fn user_collection(&self) -> Collection<MongoUserDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoUserDocument>(USER_COLLECTION_NAME)
    }

    async fn insert_score(&self, score: ScoreEntity) -> MongoResult<()> {
        let game_key = score.game_key.clone();
        let document: MongoScoreDocument = score.into();
        self.score_collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertScore { game_key, source })?;
        Ok(())
    }

    async fn query_scores(
        &self,
        game_key: String,
        filter: Document,
        sort: Document,
        limit: usize,
    ) -> MongoResult<Vec<ScoreEntity>> {
        let documents: Vec<MongoScoreDocument> = self
            .score_collection()
            .await
            .find(filter)
            .sort(sort)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(|source| MongoDaoError::QueryScores {
                game_key: game_key.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryScores { game_key, source })?;

        documents.into_iter().map(ScoreEntity::try_from).collect()
    }

    async fn top_scores(&self, game_key: String, limit: usize) -> MongoResult<Vec<ScoreEntity>> {
        let filter = doc! {"gameKey": game_key.as_str()};
        self.query_scores(game_key, filter, leaderboard_sort(), limit).await
    }

    async fn player_scores(
        &self,
        player_id: String,
        game_key: String,
        limit: usize,
    ) -> MongoResult<Vec<ScoreEntity>> {
        let filter = doc! {"userId": player_id, "gameKey": game_key.as_str()};
        self.query_scores(game_key, filter, player_history_sort(), limit).await
    }

    async fn insert_user(&self, user: UserEntity) -> MongoResult<()> {
        let id = user.id;
        let document: MongoUserDocument = user.into();
        self.user_collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::from_user_write(id, source))?;
        Ok(())
    }

    async fn find_user_by(&self, filter: Document) -> MongoResult<Option<UserEntity>> {
        self.user_collection()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadUser { source })?
            .map(UserEntity::try_from)
            .transpose()
    }

    async fn update_user(&self, id: Uuid, update: Document) -> MongoResult<Option<UserEntity>> {
        self.user_collection()
            .await
            .find_one_and_update(doc_id(id), update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::from_user_write(id, source))?
            .map(UserEntity::try_from)
            .transpose()
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> MongoResult<Option<UserEntity>> {
        self.update_user(id, profile_update(changes)).await
    }
}

/// Leaderboard order: best value first, earliest submission on ties.
///
/// `createdAt` only has millisecond precision, so `_id` settles rows stored in the same
/// millisecond.
fn leaderboard_sort() -> Document {
    doc! {"value": -1, "createdAt": 1, "_id": 1}
}

/// Personal history order: best value first, most recent submission on ties.
fn player_history_sort() -> Document {
    doc! {"value": -1, "createdAt": -1, "_id": 1}
}

/// Translate partial profile changes into a `$set`/`$unset` update document.
fn profile_update(changes: ProfileChanges) -> Document {
    let mut set = doc! {"updatedAt": DateTime::now()};
    let mut unset = Document::new();

    if let Some(name) = changes.name {
        set.insert("name", name);
    }
    match changes.username {
        Some(Some(username)) => {
            set.insert("username", username);
        }
        Some(None) => {
            unset.insert("username", "");
        }
        None => {}
    }
    if let Some(bio) = changes.bio {
        set.insert("bio", bio);
    }
    if let Some(country) = changes.country {
        set.insert("country", country);
    }

    let mut update = doc! {"$set": set};
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    update
}

impl HubStore for MongoHubStore {
    fn insert_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_score(score).await.map_err(Into::into) })
    }

    fn top_scores(
        &self,
        game_key: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.top_scores(game_key, limit).await.map_err(Into::into) })
    }

    fn player_scores(
        &self,
        player_id: String,
        game_key: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .player_scores(player_id, game_key, limit)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user_by(doc_id(id)).await.map_err(Into::into) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user_by(doc! {"email": email})
                .await
                .map_err(Into::into)
        })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user_by(doc! {"username": username})
                .await
                .map_err(Into::into)
        })
    }

    fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_profile(id, changes).await.map_err(Into::into) })
    }

    fn set_avatar(
        &self,
        id: Uuid,
        avatar: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let update = doc! {"$set": {"avatar": avatar, "updatedAt": DateTime::now()}};
            store.update_user(id, update).await.map_err(Into::into)
        })
    }

    fn set_online(&self, id: Uuid, online: bool) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let update = doc! {"$set": {"isOnline": online, "updatedAt": DateTime::now()}};
            store.update_user(id, update).await?;
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_sets_only_provided_fields() {
        let update = profile_update(ProfileChanges {
            bio: Some("hello".into()),
            ..ProfileChanges::default()
        });
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("bio").unwrap(), "hello");
        assert!(set.get("name").is_none());
        assert!(set.get("updatedAt").is_some());
        assert!(update.get("$unset").is_none());
    }

    #[test]
    fn score_sorts_end_with_id_tie_break() {
        let keys = |sort: Document| sort.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys(leaderboard_sort()), ["value", "createdAt", "_id"]);
        assert_eq!(keys(player_history_sort()), ["value", "createdAt", "_id"]);
        assert_eq!(leaderboard_sort().get_i32("createdAt").unwrap(), 1);
        assert_eq!(player_history_sort().get_i32("createdAt").unwrap(), -1);
    }

    #[test]
    fn profile_update_unsets_cleared_username() {
        let update = profile_update(ProfileChanges {
            username: Some(None),
            ..ProfileChanges::default()
        });
        let unset = update.get_document("$unset").unwrap();
        assert!(unset.contains_key("username"));
        let set = update.get_document("$set").unwrap();
        assert!(set.get("username").is_none());
    }
}
