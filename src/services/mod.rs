/// Registration, login and bearer authentication.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Profile updates and avatar storage.
pub mod profile_service;
/// Score ingestion and leaderboard queries.
pub mod score_service;
/// Storage connection supervisor with backoff and degraded mode.
pub mod storage_supervisor;
/// Bearer token signing and verification.
pub mod token_service;
