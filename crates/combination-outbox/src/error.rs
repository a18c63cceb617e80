//! Outbox error types.

use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Pop from an empty queue. A caller contract violation, not a runtime
    /// condition expected in normal operation.
    #[error("combination queue is empty")]
    EmptyQueue,

    /// Rating outside the 1-5 kiosk scale
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] kiosk_storage::StorageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
