//! Score ingestion and leaderboard queries.
//!
//! Scores are append-only: there is no update or delete path. Duplicate submissions are
//! stored as separate rows since the wire format carries no idempotency key.

use tracing::{debug, info};

use crate::{
    dao::models::ScoreEntity,
    dto::score::{LeaderboardQuery, MyScoresQuery, NewScore, ScoreResponse, ScoreSubmission},
    error::ServiceError,
    state::SharedState,
};

/// Rows returned by the leaderboard when `limit` is absent or unusable.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
/// Upper bound on the leaderboard `limit` parameter.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;
/// Rows returned by the personal history query.
pub const MY_SCORES_LIMIT: usize = 10;

/// Validate and persist one score.
pub async fn submit(
    state: &SharedState,
    submission: ScoreSubmission,
) -> Result<ScoreResponse, ServiceError> {
    let NewScore {
        game_key,
        value,
        user_id,
        username,
    } = NewScore::try_from(submission)?;

    let store = state.require_store().await?;
    let score = ScoreEntity::new(game_key, value, user_id, username);
    store.insert_score(score.clone()).await?;
    info!(
        score_id = %score.id,
        game_key = %score.game_key,
        value = score.value,
        guest_or_anonymous = score.user_id.is_none(),
        "score recorded"
    );

    Ok(score.into())
}

/// Top rows for one game: value descending, earliest submission first on ties.
pub async fn leaderboard(
    state: &SharedState,
    query: LeaderboardQuery,
) -> Result<Vec<ScoreResponse>, ServiceError> {
    let game = required_param(query.game, "game")?;
    let limit = parse_limit(query.limit.as_deref());
    debug!(%game, limit, "leaderboard query");

    let store = state.require_store().await?;
    let rows = store.top_scores(game, limit).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// A player's best rows for one game: value descending, most recent first on ties.
pub async fn my_scores(
    state: &SharedState,
    query: MyScoresQuery,
) -> Result<Vec<ScoreResponse>, ServiceError> {
    let player_id = required_param(query.player_id, "playerId")?;
    let game = required_param(query.game, "game")?;
    debug!(%player_id, %game, "personal history query");

    let store = state.require_store().await?;
    let rows = store.player_scores(player_id, game, MY_SCORES_LIMIT).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

fn required_param(value: Option<String>, name: &str) -> Result<String, ServiceError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput(format!("{name} query parameter is required")))
}

/// Parse the `limit` parameter: non-numeric or non-positive values fall back to the default.
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|limit| *limit > 0)
        .map(|limit| usize::try_from(limit).unwrap_or(MAX_LEADERBOARD_LIMIT))
        .map(|limit| limit.min(MAX_LEADERBOARD_LIMIT))
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
}
