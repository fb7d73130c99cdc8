/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Tournament, match, player and settings persistence.
pub mod tournament_store;
