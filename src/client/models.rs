use serde::{Deserialize, Serialize};

/// A score row as returned by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_key: String,
    pub value: f64,
    pub user_id: Option<String>,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Account summary carried by a signed-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScorePayload<'a> {
    pub game_key: &'a str,
    pub value: f64,
    pub user_id: &'a str,
    pub username: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_record_reads_service_json() {
        let record: ScoreRecord = serde_json::from_value(json!({
            "_id": "0d6c1f0e-8a0e-4a8e-9a61-2f6d6f0d7b11",
            "gameKey": "snake",
            "value": 42,
            "userId": null,
            "username": "Guest",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.value, 42.0);
        assert_eq!(record.user_id, None);
    }

    #[test]
    fn payload_uses_wire_names() {
        let payload = ScorePayload {
            game_key: "tetris",
            value: 1200.0,
            user_id: "guest_abc",
            username: "Guest",
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["gameKey"], "tetris");
        assert_eq!(value["userId"], "guest_abc");
        assert!(value.get("playerId").is_none());
    }
}
