//! DTO definitions for registration and login.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::UserEntity,
    dto::validation::{validate_display_name, validate_email_address},
};

/// Payload of `POST /api/auth/register`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
    /// Stored trimmed and lowercased.
    #[validate(custom(function = "validate_email_address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

/// Payload of `POST /api/auth/login`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Minimal user projection returned alongside a token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&UserEntity> for AuthUser {
    fn from(user: &UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Response of both register and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token valid for seven days.
    pub token: String,
    pub user: AuthUser,
}
