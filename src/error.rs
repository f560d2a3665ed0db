//! Error types for tronwatch

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WatchError {
    /// Caller input was rejected before any side effect happened.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The remote account API could not be reached or returned garbage.
    #[error("Upstream error: {0}")]
    Upstream(String),
    /// The store refused an insert.
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WatchError {
    fn from(err: std::io::Error) -> Self {
        WatchError::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for WatchError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                WatchError::Constraint(err.to_string())
            }
            _ => WatchError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(err: reqwest::Error) -> Self {
        WatchError::Upstream(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, WatchError>;
