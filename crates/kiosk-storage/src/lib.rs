//! Durable key-value storage for the kiosk clients.
//!
//! This crate provides the persistence area the combination queue survives
//! restarts in:
//! - **FileStorage**: single JSON snapshot file, rewritten atomically
//! - **MemoryStorage**: in-memory map, for tests and development

mod file;
mod memory;
mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::KeyValueStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
