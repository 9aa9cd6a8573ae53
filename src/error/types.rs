//! Error types
//!
//! Defines the error type shared by every storage operation.

use std::io;

/// Storage errors
///
/// Paths carried by the variants are the normalized, client-relative form, never the
/// absolute on-disk location.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Path escapes storage root: {0}")]
    PathEscape(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    RemovalFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to archive {path}: {source}")]
    ArchiveFailure {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage task failed: {0}")]
    TaskFailed(String),
}

impl StorageError {
    /// Returns true for errors caused by a hostile or malformed client path.
    pub fn is_security_event(&self) -> bool {
        matches!(self, StorageError::PathEscape(_))
    }

    /// HTTP status a request handler should answer with.
    pub fn status_code(&self) -> u16 {
        crate::error::handlers::error_to_status_code(self)
    }
}

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
