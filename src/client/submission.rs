//! HTTP side of the client: posting scores and reading leaderboards.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle, spawn_blocking};
use tracing::{debug, warn};

use super::{
    identity::{IdentityError, IdentityProvider, PlayerInfo},
    models::{ErrorBody, ScorePayload, ScoreRecord},
};

const SCORES_PATH: &str = "/api/scores";
const LEADERBOARD_PATH: &str = "/api/scores/leaderboard";
const MY_SCORES_PATH: &str = "/api/scores/my-scores";

/// Failures while submitting or querying scores.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("game key must not be empty")]
    EmptyGameKey,
    #[error("score value must be a finite number, got {0}")]
    InvalidValue(f64),
    /// The player could not be identified; nothing was sent.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("identity resolution task failed")]
    IdentityTask(#[source] JoinError),
    #[error("failed to build HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to send request to `{path}`")]
    RequestSend {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("`{path}` answered {status}: {message}")]
    RequestStatus {
        path: &'static str,
        status: StatusCode,
        message: String,
    },
    #[error("failed to decode response from `{path}`")]
    DecodeResponse {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Submits scores on behalf of the player resolved by its [`IdentityProvider`].
///
/// Cloning is cheap; clones share the HTTP connection pool and the identity.
#[derive(Clone)]
pub struct ScoreClient {
    client: Client,
    base_url: Arc<str>,
    identity: Arc<dyn IdentityProvider>,
}

impl ScoreClient {
    pub fn new(
        base_url: &str,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .build()
            .map_err(|source| SubmitError::ClientBuilder { source })?;
        Ok(Self::with_client(client, base_url, identity))
    }

    pub fn with_client(client: Client, base_url: &str, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            identity,
        }
    }

    /// Post one score for the current player and return the stored row.
    ///
    /// Input and identity problems are reported before any request is made.
    pub async fn submit_score(&self, game_key: &str, value: f64) -> Result<ScoreRecord, SubmitError> {
        let game_key = game_key.trim();
        if game_key.is_empty() {
            return Err(SubmitError::EmptyGameKey);
        }
        if !value.is_finite() {
            return Err(SubmitError::InvalidValue(value));
        }
        let player = self.resolve_player().await?;

        let payload = ScorePayload {
            game_key,
            value,
            user_id: &player.id,
            username: &player.name,
        };
        let request = self.authorize(self.client.post(self.url(SCORES_PATH)).json(&payload));
        let record: ScoreRecord = self.send(SCORES_PATH, request).await?;
        debug!(
            score_id = %record.id,
            game_key = %record.game_key,
            guest = player.is_guest,
            "score submitted"
        );
        Ok(record)
    }

    /// Submit, then hand the stored row to `on_complete`. The callback is skipped on failure.
    pub async fn submit_score_then<F>(
        &self,
        game_key: &str,
        value: f64,
        on_complete: F,
    ) -> Result<ScoreRecord, SubmitError>
    where
        F: FnOnce(&ScoreRecord),
    {
        let record = self.submit_score(game_key, value).await?;
        on_complete(&record);
        Ok(record)
    }

    /// Fire-and-forget submission on a tokio task. Failures are logged and never retried.
    pub fn spawn_submit<F>(&self, game_key: impl Into<String>, value: f64, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(ScoreRecord) + Send + 'static,
    {
        let client = self.clone();
        let game_key = game_key.into();
        tokio::spawn(async move {
            match client.submit_score(&game_key, value).await {
                Ok(record) => on_complete(record),
                Err(err) => warn!(%game_key, value, error = %err, "score submission failed"),
            }
        })
    }

    /// Top rows for `game`; the service applies its default when `limit` is `None`.
    pub async fn leaderboard(
        &self,
        game: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ScoreRecord>, SubmitError> {
        let mut query = vec![("game", game.to_owned())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let request = self.client.get(self.url(LEADERBOARD_PATH)).query(&query);
        self.send(LEADERBOARD_PATH, request).await
    }

    /// The current player's best rows for `game`.
    pub async fn my_scores(&self, game: &str) -> Result<Vec<ScoreRecord>, SubmitError> {
        let player = self.resolve_player().await?;
        let request = self
            .client
            .get(self.url(MY_SCORES_PATH))
            .query(&[("playerId", player.id.as_str()), ("game", game)]);
        self.send(MY_SCORES_PATH, self.authorize(request)).await
    }

    /// Providers may touch the guest store on disk, so resolution runs on the blocking pool.
    async fn resolve_player(&self) -> Result<PlayerInfo, SubmitError> {
        let identity = Arc::clone(&self.identity);
        let player = spawn_blocking(move || identity.resolve())
            .await
            .map_err(SubmitError::IdentityTask)??;
        Ok(player)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.identity.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T>(&self, path: &'static str, request: RequestBuilder) -> Result<T, SubmitError>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|source| SubmitError::RequestSend { path, source })?;
        let response = check_status(path, response).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| SubmitError::DecodeResponse { path, source })
    }
}

async fn check_status(path: &'static str, response: Response) -> Result<Response, SubmitError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned(),
    };
    Err(SubmitError::RequestStatus {
        path,
        status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicBool, Ordering},
            mpsc,
        },
        time::Duration,
    };

    use super::*;

    /// Nothing listens on the discard port, so any request attempt fails with `RequestSend`.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    struct NoIdentity;

    impl IdentityProvider for NoIdentity {
        fn resolve(&self) -> Result<PlayerInfo, IdentityError> {
            Err(IdentityError::Missing {
                reason: "signed out",
            })
        }
    }

    struct Fixed;

    impl IdentityProvider for Fixed {
        fn resolve(&self) -> Result<PlayerInfo, IdentityError> {
            Ok(PlayerInfo {
                id: "guest_abcdefgh12345678".into(),
                name: "Guest".into(),
                is_guest: true,
            })
        }
    }

    #[tokio::test]
    async fn identity_failure_aborts_before_any_request() {
        let client = ScoreClient::new(UNREACHABLE, Arc::new(NoIdentity)).unwrap();
        let called = AtomicBool::new(false);
        let result = client
            .submit_score_then("snake", 42.0, |_| called.store(true, Ordering::SeqCst))
            .await;
        assert!(matches!(result, Err(SubmitError::Identity(_))));
        assert!(!called.load(Ordering::SeqCst));
    }

    /// Blocks in `resolve` until the test signals, like a slow guest store read.
    struct Gated {
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl IdentityProvider for Gated {
        fn resolve(&self) -> Result<PlayerInfo, IdentityError> {
            let release = self.release.lock().map_err(|_| IdentityError::Poisoned)?;
            release
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| IdentityError::Missing {
                    reason: "gate never opened",
                })?;
            Fixed.resolve()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn slow_identity_does_not_block_the_runtime() {
        let (open, release) = mpsc::channel();
        let gated = Gated {
            release: Mutex::new(release),
        };
        let client = ScoreClient::new(UNREACHABLE, Arc::new(gated)).unwrap();
        let submit = tokio::spawn(async move { client.submit_score("snake", 1.0).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        open.send(()).unwrap();

        // Identity resolved while the runtime kept running; only the network step fails.
        let result = submit.await.unwrap();
        assert!(matches!(result, Err(SubmitError::RequestSend { .. })));
    }

    #[tokio::test]
    async fn rejects_blank_game_and_non_finite_values() {
        let client = ScoreClient::new(UNREACHABLE, Arc::new(Fixed)).unwrap();
        assert!(matches!(
            client.submit_score("  ", 1.0).await,
            Err(SubmitError::EmptyGameKey)
        ));
        assert!(matches!(
            client.submit_score("snake", f64::NAN).await,
            Err(SubmitError::InvalidValue(_))
        ));
        assert!(matches!(
            client.submit_score("snake", f64::INFINITY).await,
            Err(SubmitError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn network_failure_skips_callback() {
        let client = ScoreClient::new(UNREACHABLE, Arc::new(Fixed)).unwrap();
        let called = AtomicBool::new(false);
        let result = client
            .submit_score_then("snake", 42.0, |_| called.store(true, Ordering::SeqCst))
            .await;
        assert!(matches!(result, Err(SubmitError::RequestSend { .. })));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = ScoreClient::new("http://localhost:8080/", Arc::new(Fixed)).unwrap();
        assert_eq!(client.url(SCORES_PATH), "http://localhost:8080/api/scores");
    }
}
