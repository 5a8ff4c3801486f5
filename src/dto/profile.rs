//! DTO definitions for the authenticated profile endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ProfileChanges, UserEntity},
    dto::{
        format_system_time,
        validation::{validate_display_name, validate_username},
    },
};

/// Full profile of the authenticated user.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub bio: String,
    pub country: String,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserEntity> for ProfileResponse {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
            bio: user.bio,
            country: user.country,
            avatar_url: user.avatar,
            is_online: user.is_online,
            created_at: format_system_time(user.created_at),
            updated_at: format_system_time(user.updated_at),
        }
    }
}

/// Partial update accepted by `PUT /api/profile`. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: Option<String>,
    /// Gamer tag; an empty string clears it.
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
    #[validate(length(max = 200, message = "bio must be at most 200 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 60, message = "country must be at most 60 characters"))]
    pub country: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            name: request.name.map(|name| name.trim().to_owned()),
            username: request.username.map(|username| {
                let trimmed = username.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }),
            bio: request.bio.map(|bio| bio.trim().to_owned()),
            country: request.country.map(|country| country.trim().to_owned()),
        }
    }
}

/// Response of a successful avatar upload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    /// Public path of the stored avatar.
    pub avatar_url: String,
}

/// Multipart form accepted by `PUT /api/profile/avatar`; documentation only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AvatarUploadForm {
    /// PNG, JPEG, GIF or WebP file, at most 2 MiB.
    #[schema(value_type = String, format = Binary)]
    pub avatar: Vec<u8>,
}
