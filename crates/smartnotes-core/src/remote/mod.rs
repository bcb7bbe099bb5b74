//! Client side of the note REST API

mod client;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NoteFields, RemoteNote};

pub use client::HttpNoteClient;

/// Typed failure of a single remote call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether retrying later could succeed without user action
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Auth(_) | Self::NotFound(_) | Self::InvalidResponse(_) => false,
        }
    }

    /// Whether a failed write should be queued and sent again.
    ///
    /// An unreadable reply leaves the outcome unknown: the server may well
    /// have applied the write, so it is resent rather than dropped.
    pub const fn is_retryable_write(&self) -> bool {
        self.is_transient() || matches!(self, Self::InvalidResponse(_))
    }

    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Note CRUD and summarization against the server.
///
/// Stateless apart from the caller-supplied bearer token. Implementations
/// never retry; retry policy belongs to the sync engine.
#[async_trait]
pub trait NoteRemote: Send + Sync {
    /// Every note owned by the token's user
    async fn list(&self, token: &str) -> RemoteResult<Vec<RemoteNote>>;

    async fn get_by_id(&self, token: &str, id: &str) -> RemoteResult<RemoteNote>;

    /// Create a note. Repeating a call with the same `idempotency_key`
    /// returns the note created by the first call.
    async fn create(
        &self,
        token: &str,
        fields: &NoteFields,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<RemoteNote>;

    async fn update(&self, token: &str, id: &str, fields: &NoteFields) -> RemoteResult<RemoteNote>;

    async fn delete(&self, token: &str, id: &str) -> RemoteResult<()>;

    /// Summary of `text`; requires connectivity
    async fn summarize(&self, token: &str, text: &str) -> RemoteResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(RemoteError::Network("timed out".into()).is_transient());
        for status in [500, 502, 503, 408, 429] {
            assert!(
                RemoteError::Server {
                    status,
                    message: String::new()
                }
                .is_transient(),
                "{status} should be transient"
            );
        }
        for status in [400, 409, 422] {
            assert!(!RemoteError::Server {
                status,
                message: String::new()
            }
            .is_transient());
        }
        assert!(!RemoteError::Auth("expired".into()).is_transient());
        assert!(!RemoteError::NotFound("gone".into()).is_transient());
        assert!(!RemoteError::InvalidResponse("bad json".into()).is_transient());
    }

    #[test]
    fn unreadable_replies_are_retried_for_writes() {
        assert!(RemoteError::InvalidResponse("<html>".into()).is_retryable_write());
        assert!(RemoteError::Network("reset".into()).is_retryable_write());
        assert!(!RemoteError::Auth("expired".into()).is_retryable_write());
        assert!(!RemoteError::Server {
            status: 400,
            message: String::new()
        }
        .is_retryable_write());
    }
}
