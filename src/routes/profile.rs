use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{Request, header::AUTHORIZATION},
    middleware::{self, Next},
    response::Response,
    routing::{get, put},
};

use crate::{
    dao::models::UserEntity,
    dto::profile::{AvatarResponse, AvatarUploadForm, ProfileResponse, UpdateProfileRequest},
    error::AppError,
    routes::extract::ApiJson,
    services::{
        auth_service,
        profile_service::{self, AvatarUpload, MAX_AVATAR_BYTES},
    },
    state::SharedState,
};

const AVATAR_FIELD: &str = "avatar";
/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// User resolved from the bearer token by [`require_bearer`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub UserEntity);

/// Endpoints operating on the authenticated user's profile.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/profile/me", get(get_me))
        .route("/profile", put(update_profile))
        .route(
            "/profile/avatar",
            put(upload_avatar)
                .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(state, require_bearer))
}

/// Return the full profile of the authenticated user.
#[utoipa::path(
    get,
    path = "/api/profile/me",
    tag = "profile",
    params(("Authorization" = String, Header, description = "`Bearer <token>` issued by register or login")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn get_me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<ProfileResponse> {
    Json(profile_service::me(user))
}

/// Partially update name, gamer tag, bio and country.
#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "profile",
    params(("Authorization" = String, Header, description = "`Bearer <token>` issued by register or login")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid field or username already taken"),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn update_profile(
    State(state): State<SharedState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(
        profile_service::update_profile(&state, &user, payload).await?,
    ))
}

/// Replace the avatar image of the authenticated user.
#[utoipa::path(
    put,
    path = "/api/profile/avatar",
    tag = "profile",
    params(("Authorization" = String, Header, description = "`Bearer <token>` issued by register or login")),
    request_body(content = AvatarUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar stored", body = AvatarResponse),
        (status = 400, description = "Missing field or not an accepted image"),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn upload_avatar(
    State(state): State<SharedState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AvatarResponse>, AppError> {
    let mut multipart = multipart
        .map_err(|rejection| AppError::BadRequest(format!("invalid multipart body: {}", rejection.body_text())))?;
    let upload = read_avatar_field(&mut multipart).await?;
    Ok(Json(
        profile_service::replace_avatar(&state, &user, upload).await?,
    ))
}

/// Pull the `avatar` file out of the form, ignoring any other fields.
async fn read_avatar_field(multipart: &mut Multipart) -> Result<AvatarUpload, AppError> {
    let invalid = |err: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("invalid multipart body: {}", err.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(invalid)?;
        return Ok(AvatarUpload {
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::BadRequest(format!(
        "multipart field `{AVATAR_FIELD}` is required"
    )))
}

/// Resolve the `Authorization: Bearer` token into a [`CurrentUser`] extension. Fails closed.
async fn require_bearer(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let user = auth_service::authenticate(&state, &token).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
