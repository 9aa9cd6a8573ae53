//! Error handlers
//!
//! Logging and status mapping for storage errors.

use crate::error::types::StorageError;
use log::{debug, error};

/// Log a storage error at the severity its kind deserves.
///
/// Traversal attempts are already warned about where they are rejected, so
/// they only get a debug line here.
pub fn handle_error(err: &StorageError) {
    match err {
        StorageError::PathEscape(_) => debug!("Rejected request: {}", err),
        StorageError::NotFound(_)
        | StorageError::InvalidPath(_)
        | StorageError::NotADirectory(_) => debug!("Request failed: {}", err),
        _ => error!("Storage error: {}", err),
    }
}

/// Convert error to an HTTP status code
pub fn error_to_status_code(err: &StorageError) -> u16 {
    match err {
        StorageError::PathEscape(_) => 403,
        StorageError::NotFound(_) => 404,
        StorageError::InvalidPath(_) => 400,
        StorageError::NotADirectory(_) => 400,
        StorageError::WriteFailure { .. } => 500,
        StorageError::RemovalFailure { .. } => 500,
        StorageError::ArchiveFailure { .. } => 500,
        StorageError::Io(_) => 500,
        StorageError::TaskFailed(_) => 500,
    }
}
