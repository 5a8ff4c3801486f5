use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{ScoreEntity, UserEntity};

/// Score row as laid out in the `scores` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoScoreDocument {
    #[serde(rename = "_id")]
    id: String,
    game_key: String,
    value: f64,
    #[serde(default)]
    user_id: Option<String>,
    username: String,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<ScoreEntity> for MongoScoreDocument {
    fn from(value: ScoreEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_key: value.game_key,
            value: value.value,
            user_id: value.user_id,
            username: value.username,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoScoreDocument> for ScoreEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoScoreDocument) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|_| MongoDaoError::MalformedScore { id: value.id.clone() })?;
        Ok(Self {
            id,
            game_key: value.game_key,
            value: value.value,
            user_id: value.user_id,
            username: value.username,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

/// Account row as laid out in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    password: String,
    name: String,
    /// Omitted when unset so the sparse unique index ignores the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    #[serde(default)]
    is_online: bool,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            email: value.email,
            password: value.password_hash,
            name: value.name,
            username: value.username,
            bio: value.bio,
            country: value.country,
            avatar: value.avatar,
            is_online: value.is_online,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoUserDocument) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|_| MongoDaoError::MalformedUser { id: value.id.clone() })?;
        Ok(Self {
            id,
            email: value.email,
            password_hash: value.password,
            name: value.name,
            username: value.username,
            bio: value.bio,
            country: value.country,
            avatar: value.avatar,
            is_online: value.is_online,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}
