//! Configuration error types.

use thiserror::Error;

/// Error type for configuration and path handling.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Path error
    #[error("Path error: {0}")]
    Path(String),

    /// URL parse error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
