#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use game_hub_back::{
    build_router,
    config::{AppConfig, StorageBackend},
    dao::hub_store::memory::MemoryHubStore,
    state::AppState,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use uuid::Uuid;

/// A server running on an ephemeral port with the in-memory store.
pub struct TestApp {
    pub base_url: String,
    pub upload_dir: PathBuf,
    pub http: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register an account and return the `{token, user}` body.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&json!({"name": name, "email": email, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "register {email}");
        response.json().await.unwrap()
    }

    pub async fn post_score(&self, body: Value) -> reqwest::Response {
        self.http
            .post(self.url("/api/scores"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn leaderboard(&self, query: &[(&str, &str)]) -> Vec<Value> {
        let response = self
            .http
            .get(self.url("/api/scores/leaderboard"))
            .query(query)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub async fn spawn_app() -> TestApp {
    let upload_dir = std::env::temp_dir().join(format!("game-hub-uploads-{}", Uuid::new_v4()));

    let mut config = AppConfig::new("integration-test-secret");
    config.storage = StorageBackend::Memory;
    config.bcrypt_cost = 4;
    config.upload_dir = upload_dir.clone();

    let state = AppState::with_store(config, Arc::new(MemoryHubStore::new())).await;
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{addr}"),
        upload_dir,
        http: reqwest::Client::new(),
    }
}
