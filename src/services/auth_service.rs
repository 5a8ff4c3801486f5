//! Registration, login and bearer-token authentication.

use tokio::task::spawn_blocking;
use tracing::{debug, info};
use validator::Validate;

use crate::{
    dao::models::UserEntity,
    dto::{
        auth::{AuthResponse, AuthUser, LoginRequest, RegisterRequest},
        validation::normalize_email,
    },
    error::ServiceError,
    services::token_service::TokenError,
    state::SharedState,
};

const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Create an account and return a token for it.
pub async fn register(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<AuthResponse, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let email = normalize_email(&request.email);
    if store.find_user_by_email(email.clone()).await?.is_some() {
        return Err(ServiceError::InvalidInput("email already registered".into()));
    }

    let password_hash = hash_password(request.password, state.config().bcrypt_cost).await?;
    let user = UserEntity::new(request.name.trim().to_owned(), email, password_hash);
    // The unique index still rejects a concurrent registration of the same email.
    store.insert_user(user.clone()).await?;
    info!(user_id = %user.id, "registered user");

    issue_response(state, &user)
}

/// Check credentials, flag the user online and return a fresh token.
///
/// Unknown emails and wrong passwords yield the same client error.
pub async fn login(state: &SharedState, request: LoginRequest) -> Result<AuthResponse, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let Some(user) = store
        .find_user_by_email(normalize_email(&request.email))
        .await?
    else {
        debug!("login attempt for unknown email");
        return Err(ServiceError::InvalidInput(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(request.password, user.password_hash.clone()).await? {
        debug!(user_id = %user.id, "login attempt with wrong password");
        return Err(ServiceError::InvalidInput(INVALID_CREDENTIALS.into()));
    }

    store.set_online(user.id, true).await?;
    info!(user_id = %user.id, "user logged in");

    issue_response(state, &user)
}

/// Resolve the user behind a bearer token. Fails closed on any verification problem.
pub async fn authenticate(state: &SharedState, token: &str) -> Result<UserEntity, ServiceError> {
    let user_id = state.tokens().verify(token).map_err(|err| match err {
        TokenError::Expired => ServiceError::Unauthorized("token expired".into()),
        _ => ServiceError::Unauthorized("invalid token".into()),
    })?;

    let store = state.require_store().await?;
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("user not found".into()))
}

fn issue_response(state: &SharedState, user: &UserEntity) -> Result<AuthResponse, ServiceError> {
    let token = state
        .tokens()
        .issue(user.id)
        .map_err(|err| ServiceError::Internal(err.to_string()))?;
    Ok(AuthResponse {
        token,
        user: AuthUser::from(user),
    })
}

async fn hash_password(password: String, cost: u32) -> Result<String, ServiceError> {
    spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|err| ServiceError::Internal(format!("password hashing task failed: {err}")))?
        .map_err(|err| ServiceError::Internal(format!("password hashing failed: {err}")))
}

async fn verify_password(password: String, hash: String) -> Result<bool, ServiceError> {
    spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| ServiceError::Internal(format!("password check task failed: {err}")))?
        .map_err(|err| ServiceError::Internal(format!("password check failed: {err}")))
}
