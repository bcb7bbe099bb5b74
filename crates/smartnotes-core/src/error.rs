//! Error types for smartnotes-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using smartnotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in smartnotes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input, rejected before any I/O
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing, invalid, or expired bearer token; the caller must re-authenticate
    #[error("Authentication required: {0}")]
    Auth(String),

    /// Operation needs connectivity and the device is offline
    #[error("Offline: {0}")]
    Offline(String),

    /// Remote call failed in a way that is not retried locally
    #[error("Remote error: {0}")]
    Remote(RemoteError),
}

impl Error {
    /// Whether the application should force re-authentication.
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<RemoteError> for Error {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Auth(message) => Self::Auth(message),
            RemoteError::NotFound(message) => Self::NotFound(message),
            other => Self::Remote(other),
        }
    }
}
