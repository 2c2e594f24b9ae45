//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Entity not found.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Entity already exists.
    #[error("entity already exists: {0}")]
    Duplicate(String),

    /// The requested transition is not allowed from the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Stored data could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}
