use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::score::{LeaderboardQuery, MyScoresQuery, ScoreResponse, ScoreSubmission},
    error::AppError,
    routes::extract::{ApiJson, ApiQuery},
    services::score_service,
    state::SharedState,
};

/// Public score ingestion and leaderboard endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/scores", post(submit_score))
        .route("/scores/leaderboard", get(leaderboard))
        .route("/scores/my-scores", get(my_scores))
}

/// Record one completed game attempt.
#[utoipa::path(
    post,
    path = "/api/scores",
    tag = "scores",
    request_body = ScoreSubmission,
    responses(
        (status = 201, description = "Score recorded", body = ScoreResponse),
        (status = 400, description = "Missing gameKey/username or non-numeric value")
    )
)]
pub async fn submit_score(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<ScoreSubmission>,
) -> Result<(StatusCode, Json<ScoreResponse>), AppError> {
    let score = score_service::submit(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(score)))
}

/// Top scores of a game, best first; ties go to the earliest submission.
#[utoipa::path(
    get,
    path = "/api/scores/leaderboard",
    tag = "scores",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Leaderboard rows", body = [ScoreResponse]),
        (status = 400, description = "Missing game parameter")
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Json<Vec<ScoreResponse>>, AppError> {
    Ok(Json(score_service::leaderboard(&state, query).await?))
}

/// A player's ten best scores for a game; ties go to the most recent submission.
#[utoipa::path(
    get,
    path = "/api/scores/my-scores",
    tag = "scores",
    params(MyScoresQuery),
    responses(
        (status = 200, description = "Personal history rows", body = [ScoreResponse]),
        (status = 400, description = "Missing playerId or game parameter")
    )
)]
pub async fn my_scores(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<MyScoresQuery>,
) -> Result<Json<Vec<ScoreResponse>>, AppError> {
    Ok(Json(score_service::my_scores(&state, query).await?))
}
