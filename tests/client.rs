mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use game_hub_back::client::{
    AuthenticatedIdentity, GuestIdentity, GuestStore, IdentityError, IdentityProvider,
    PlayerInfo, ScoreClient, Session, SessionIdentity, SubmitError,
};
use tokio::sync::oneshot;
use uuid::Uuid;

use common::spawn_app;

fn guest_store() -> GuestStore {
    GuestStore::new(std::env::temp_dir().join(format!("game-hub-client-{}.json", Uuid::new_v4())))
}

struct SignedOut;

impl IdentityProvider for SignedOut {
    fn resolve(&self) -> Result<PlayerInfo, IdentityError> {
        Err(IdentityError::Missing {
            reason: "no session and no guest store",
        })
    }
}

#[tokio::test]
async fn guest_submission_runs_callback_then_appears_on_leaderboard() {
    let app = spawn_app().await;
    let store = guest_store();
    let guest = Arc::new(GuestIdentity::new(store.clone()));
    guest.set_name("Speedy").unwrap();
    let client = ScoreClient::new(&app.base_url, guest.clone()).unwrap();

    let refreshed = AtomicUsize::new(0);
    let record = client
        .submit_score_then("snake", 42.0, |_| {
            refreshed.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();
    assert_eq!(refreshed.load(Ordering::SeqCst), 1);
    assert_eq!(record.username, "Speedy");
    assert_eq!(record.user_id, Some(guest.resolve().unwrap().id));

    let board = client.leaderboard("snake", Some(5)).await.unwrap();
    assert_eq!(board, vec![record.clone()]);
    let mine = client.my_scores("snake").await.unwrap();
    assert_eq!(mine, vec![record]);

    let _ = std::fs::remove_file(store.path());
}

#[tokio::test]
async fn signed_in_session_is_used_over_guest() {
    let app = spawn_app().await;
    let registered = app.register("Ada", "ada@example.com", "hunter22").await;
    let session: Session = serde_json::from_value(registered).unwrap();

    let store = guest_store();
    let identity = Arc::new(SessionIdentity::new(GuestIdentity::new(store.clone())));
    identity.sign_in(session.clone()).unwrap();
    let client = ScoreClient::new(&app.base_url, identity.clone()).unwrap();

    let record = client.submit_score("tetris", 1200.0).await.unwrap();
    assert_eq!(record.user_id.as_deref(), Some(session.user.id.as_str()));
    assert_eq!(record.username, "Ada");

    identity.sign_out().unwrap();
    let as_guest = client.submit_score("tetris", 300.0).await.unwrap();
    assert!(as_guest.user_id.unwrap().starts_with("guest_"));
    assert_eq!(as_guest.username, "Guest");

    let authed = ScoreClient::new(&app.base_url, Arc::new(AuthenticatedIdentity::new(session))).unwrap();
    let mine = authed.my_scores("tetris").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].value, 1200.0);

    let _ = std::fs::remove_file(store.path());
}

#[tokio::test]
async fn concurrent_guests_on_different_games_stay_separate() {
    let app = spawn_app().await;
    let (store_a, store_b) = (guest_store(), guest_store());
    let client_a = ScoreClient::new(&app.base_url, Arc::new(GuestIdentity::new(store_a.clone()))).unwrap();
    let client_b = ScoreClient::new(&app.base_url, Arc::new(GuestIdentity::new(store_b.clone()))).unwrap();

    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    let task_a = client_a.spawn_submit("snake", 10.0, move |record| {
        let _ = tx_a.send(record);
    });
    let task_b = client_b.spawn_submit("2048", 20.0, move |record| {
        let _ = tx_b.send(record);
    });
    let (a, b) = (rx_a.await.unwrap(), rx_b.await.unwrap());
    task_a.await.unwrap();
    task_b.await.unwrap();

    assert_ne!(a.user_id, b.user_id);
    assert_eq!(client_a.my_scores("snake").await.unwrap().len(), 1);
    assert!(client_a.my_scores("2048").await.unwrap().is_empty());
    assert_eq!(client_b.my_scores("2048").await.unwrap().len(), 1);
    assert!(client_b.my_scores("snake").await.unwrap().is_empty());

    let _ = std::fs::remove_file(store_a.path());
    let _ = std::fs::remove_file(store_b.path());
}

#[tokio::test]
async fn missing_identity_aborts_without_creating_rows() {
    let app = spawn_app().await;
    let client = ScoreClient::new(&app.base_url, Arc::new(SignedOut)).unwrap();

    let result = client.submit_score_then("snake", 42.0, |_| panic!("callback must not run")).await;
    assert!(matches!(result, Err(SubmitError::Identity(_))));

    let handle = client.spawn_submit("snake", 42.0, |_| panic!("callback must not run"));
    handle.await.unwrap();

    assert!(app.leaderboard(&[("game", "snake")]).await.is_empty());
}

#[tokio::test]
async fn service_rejection_surfaces_status_and_message() {
    let app = spawn_app().await;
    let store = guest_store();
    let client = ScoreClient::new(&app.base_url, Arc::new(GuestIdentity::new(store.clone()))).unwrap();

    let err = client.leaderboard("", None).await.unwrap_err();
    match err {
        SubmitError::RequestStatus { status, message, .. } => {
            assert_eq!(status, 400);
            assert!(message.contains("game"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let _ = std::fs::remove_file(store.path());
}
