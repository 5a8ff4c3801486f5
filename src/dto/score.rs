//! DTO definitions for score submission and leaderboard queries.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::ScoreEntity,
    dto::{format_system_time, validation::required},
};

/// Body of `POST /api/scores`.
///
/// Fields are optional at the type level so that missing values produce a `400` with a
/// readable message instead of a deserialization failure.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub game_key: Option<String>,
    /// Must be a JSON number; strings such as `"42"` are rejected.
    #[schema(value_type = f64)]
    pub value: Option<Value>,
    /// Registered user id, guest id, or null.
    pub user_id: Option<String>,
    pub username: Option<String>,
}

impl Validate for ScoreSubmission {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if is_blank(self.game_key.as_deref()) {
            errors.add("gameKey", required("gameKey"));
        }
        if is_blank(self.username.as_deref()) {
            errors.add("username", required("username"));
        }
        match &self.value {
            None => errors.add("value", required("value")),
            Some(value) if value.as_f64().is_none() => {
                let mut err = ValidationError::new("value_type");
                err.message = Some("value must be a number".into());
                errors.add("value", err);
            }
            Some(_) => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validated submission ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub game_key: String,
    pub value: f64,
    pub user_id: Option<String>,
    pub username: String,
}

impl TryFrom<ScoreSubmission> for NewScore {
    type Error = ValidationErrors;

    fn try_from(submission: ScoreSubmission) -> Result<Self, Self::Error> {
        submission.validate()?;
        let ScoreSubmission {
            game_key,
            value,
            user_id,
            username,
        } = submission;

        Ok(Self {
            game_key: game_key.unwrap_or_default().trim().to_owned(),
            value: value.and_then(|v| v.as_f64()).unwrap_or_default(),
            user_id: user_id
                .map(|id| id.trim().to_owned())
                .filter(|id| !id.is_empty()),
            username: username.unwrap_or_default().trim().to_owned(),
        })
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Score row exposed over the wire.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub game_key: String,
    #[serde(serialize_with = "serialize_score_value")]
    pub value: f64,
    pub user_id: Option<String>,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ScoreEntity> for ScoreResponse {
    fn from(entity: ScoreEntity) -> Self {
        Self {
            id: entity.id,
            game_key: entity.game_key,
            value: entity.value,
            user_id: entity.user_id,
            username: entity.username,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}

/// Integral values go out as JSON integers (`42`, not `42.0`).
fn serialize_score_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const I64_BOUND: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.fract() == 0.0 && value.abs() < I64_BOUND {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Query string of `GET /api/scores/leaderboard`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Game key to rank.
    pub game: Option<String>,
    /// Maximum number of rows (default 10, capped at 100). Non-numeric values fall back to the default.
    pub limit: Option<String>,
}

/// Query string of `GET /api/scores/my-scores`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyScoresQuery {
    /// Registered user id or guest id.
    #[serde(rename = "playerId")]
    pub player_id: Option<String>,
    /// Game key to filter on.
    pub game: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn submission(body: Value) -> ScoreSubmission {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn accepts_guest_submission_with_null_user() {
        let score = NewScore::try_from(submission(json!({
            "gameKey": "snake",
            "value": 42,
            "userId": null,
            "username": "Guest"
        })))
        .unwrap();
        assert_eq!(
            score,
            NewScore {
                game_key: "snake".into(),
                value: 42.0,
                user_id: None,
                username: "Guest".into(),
            }
        );
    }

    #[test]
    fn accepts_negative_and_fractional_values() {
        let score = NewScore::try_from(submission(json!({
            "gameKey": "rps", "value": -1, "username": "p"
        })))
        .unwrap();
        assert_eq!(score.value, -1.0);

        let score = NewScore::try_from(submission(json!({
            "gameKey": "typing-speed", "value": 61.5, "username": "p"
        })))
        .unwrap();
        assert_eq!(score.value, 61.5);
    }

    #[test]
    fn rejects_missing_fields_and_string_value() {
        let errors = NewScore::try_from(submission(json!({"value": "42"}))).unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("gameKey"));
        assert!(fields.contains_key("username"));
        assert_eq!(fields["value"][0].code, "value_type");
    }

    #[test]
    fn blank_user_id_is_treated_as_absent() {
        let score = NewScore::try_from(submission(json!({
            "gameKey": "hangman", "value": 1, "userId": "  ", "username": "p"
        })))
        .unwrap();
        assert_eq!(score.user_id, None);
    }

    #[test]
    fn integral_values_serialize_without_fraction() {
        let entity = ScoreEntity::new("snake".into(), 42.0, None, "Guest".into());
        let body = serde_json::to_value(ScoreResponse::from(entity)).unwrap();
        assert_eq!(body["value"], json!(42));
        assert_eq!(body["userId"], Value::Null);
        assert!(body["_id"].is_string());

        let entity = ScoreEntity::new("typing-speed".into(), 61.5, None, "Guest".into());
        let body = serde_json::to_value(ScoreResponse::from(entity)).unwrap();
        assert_eq!(body["value"], json!(61.5));
    }
}
