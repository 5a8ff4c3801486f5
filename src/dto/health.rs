use serde::Serialize;
use utoipa::ToSchema;

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when a working store is installed, `degraded` otherwise.
    pub status: &'static str,
    /// Configured storage backend (`mongo` or `memory`).
    pub storage: &'static str,
}

impl HealthResponse {
    pub fn new(degraded: bool, storage: &'static str) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            storage,
        }
    }
}
