use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the game hub backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::scores::submit_score,
        crate::routes::scores::leaderboard,
        crate::routes::scores::my_scores,
        crate::routes::profile::get_me,
        crate::routes::profile::update_profile,
        crate::routes::profile::upload_avatar,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::auth::RegisterRequest,
            crate::dto::auth::LoginRequest,
            crate::dto::auth::AuthUser,
            crate::dto::auth::AuthResponse,
            crate::dto::score::ScoreSubmission,
            crate::dto::score::ScoreResponse,
            crate::dto::profile::ProfileResponse,
            crate::dto::profile::UpdateProfileRequest,
            crate::dto::profile::AvatarResponse,
            crate::dto::profile::AvatarUploadForm,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Account registration and login"),
        (name = "scores", description = "Score ingestion and leaderboards"),
        (name = "profile", description = "Authenticated profile and avatar management"),
    )
)]
pub struct ApiDoc;
