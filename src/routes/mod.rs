use axum::Router;
use tower_http::services::ServeDir;

use crate::{services::profile_service::UPLOADS_URL_PREFIX, state::SharedState};

pub mod auth;
pub mod docs;
pub mod extract;
pub mod health;
pub mod profile;
pub mod scores;

/// Compose all route trees, wiring in shared state, uploaded files and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = auth::router()
        .merge(scores::router())
        .merge(profile::router(state.clone()));

    let uploads = ServeDir::new(state.config().upload_dir.clone());

    health::router()
        .nest("/api", api_router)
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .merge(docs::router(state.clone()))
        .with_state(state)
}
