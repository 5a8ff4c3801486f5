/// Score and account storage and retrieval operations.
pub mod hub_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
