use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed attempt at one game by one player. Never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntity {
    /// Primary key of the score row.
    pub id: Uuid,
    /// Free-text identifier of the game that produced the score.
    pub game_key: String,
    /// Opaque signed score value.
    pub value: f64,
    /// Registered user id or guest id; `None` when the submitter sent neither.
    pub user_id: Option<String>,
    /// Display name captured at submission time.
    pub username: String,
    /// Server-assigned insertion time.
    pub created_at: SystemTime,
    /// Equal to `created_at`, kept for wire compatibility.
    pub updated_at: SystemTime,
}

impl ScoreEntity {
    /// Build a fresh score row stamped with the current time.
    pub fn new(game_key: String, value: f64, user_id: Option<String>, username: String) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            game_key,
            value,
            user_id,
            username,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Registered account with its profile fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Unique, lowercased login email.
    pub email: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Optional unique gamer tag.
    pub username: Option<String>,
    /// Free-form profile text (at most 200 characters).
    pub bio: String,
    /// Free-form country label.
    pub country: String,
    /// Public path of the uploaded avatar, when one exists.
    pub avatar: Option<String>,
    /// Set on login.
    pub is_online: bool,
    /// Registration time.
    pub created_at: SystemTime,
    /// Last profile mutation time.
    pub updated_at: SystemTime,
}

impl UserEntity {
    /// Build a freshly registered user.
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            username: None,
            bio: String::new(),
            country: String::new(),
            avatar: None,
            is_online: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    /// New display name.
    pub name: Option<String>,
    /// `Some(None)` clears the gamer tag, `Some(Some(tag))` sets it.
    pub username: Option<Option<String>>,
    /// New bio text.
    pub bio: Option<String>,
    /// New country label.
    pub country: Option<String>,
}

impl ProfileChanges {
    /// True when the update would not modify anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.username.is_none() && self.bio.is_none() && self.country.is_none()
    }

    /// Apply the changes to an in-memory user record.
    pub fn apply_to(&self, user: &mut UserEntity) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(bio) = &self.bio {
            user.bio = bio.clone();
        }
        if let Some(country) = &self.country {
            user.country = country.clone();
        }
        user.updated_at = SystemTime::now();
    }
}
