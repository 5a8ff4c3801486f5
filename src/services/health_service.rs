use tracing::warn;

use crate::{config::StorageBackend, dto::health::HealthResponse, state::SharedState};

/// Report whether the service can currently reach its storage backend.
///
/// A failed ping flips the state into degraded mode; the storage supervisor takes it from there.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
                state.update_degraded(true).await;
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let storage = match state.config().storage {
        StorageBackend::Mongo => "mongo",
        StorageBackend::Memory => "memory",
    };
    HealthResponse::new(state.is_degraded().await, storage)
}
