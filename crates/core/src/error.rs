//! Unified error types for swcache.
//!
//! Every variant renders as `CODE: detail`. The storage variants share the
//! `STORAGE_ERROR` code so callers can treat them as one failure class.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the swcache workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty generation tag).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unsupported URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A write would push a store past its entry quota.
    #[error("STORAGE_ERROR: quota exceeded for store {store} (limit {limit} entries)")]
    QuotaExceeded { store: String, limit: usize },

    /// Write into a store that was never opened (or was deleted).
    #[error("STORAGE_ERROR: store not found: {0}")]
    StoreNotFound(String),

    /// A stored row could not be decoded.
    #[error("STORAGE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// A precache resource could not be fetched; population was aborted.
    #[error("PRECACHE_FETCH_FAILED: {url}: {reason}")]
    PrecacheFetch { url: String, reason: String },

    /// Live network fetch failed on the cache-miss path.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// No generation with the given tag exists.
    #[error("GENERATION_NOT_FOUND: {0}")]
    GenerationNotFound(String),

    /// Lifecycle event dispatched out of order (e.g., activate before install).
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl Error {
    /// Whether this error belongs to the storage class (store unavailable,
    /// quota exceeded, schema failure).
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Database(_)
                | Error::MigrationFailed(_)
                | Error::QuotaExceeded { .. }
                | Error::StoreNotFound(_)
                | Error::CorruptEntry(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::Database(_)
            | Error::MigrationFailed(_)
            | Error::QuotaExceeded { .. }
            | Error::StoreNotFound(_)
            | Error::CorruptEntry(_) => -32002,
            Error::PrecacheFetch { .. } => -32004,
            Error::Network(_) => -32008,
            Error::GenerationNotFound(_) => -32001,
            Error::Lifecycle(_) => -32005,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PrecacheFetch { url: "https://app.test/icon.png".into(), reason: "status 404".into() };
        assert!(err.to_string().starts_with("PRECACHE_FETCH_FAILED"));
        assert!(err.to_string().contains("status 404"));
    }

    #[test]
    fn test_storage_classification() {
        assert!(Error::QuotaExceeded { store: "v1".into(), limit: 2 }.is_storage());
        assert!(Error::StoreNotFound("v1".into()).is_storage());
        assert!(!Error::Network("offline".into()).is_storage());
        assert!(!Error::PrecacheFetch { url: "/".into(), reason: "offline".into() }.is_storage());
    }

    #[test]
    fn test_error_to_mcp_error() {
        let mcp_err: McpError = Error::GenerationNotFound("v9".to_string()).into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::QuotaExceeded { store: "v1".into(), limit: 1 }.into();
        assert_eq!(mcp_err.code.0, -32002);
        assert!(mcp_err.message.contains("STORAGE_ERROR"));
    }
}
