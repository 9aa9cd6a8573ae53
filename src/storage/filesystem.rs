//! File system helpers
//!
//! Small wrappers shared by the storage operations.

use log::warn;
use std::fs;
use std::io::{ErrorKind, Result};
use std::path::Path;
use std::thread;
use std::time::Duration;

const MAX_RETRIES: u64 = 3;

/// Create a directory and any missing ancestors
pub fn create_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
}

/// Check if directory exists
pub fn directory_exists(path: &Path) -> bool {
    path.is_dir()
}

/// Runs `op`, retrying transient permission errors with a short back-off.
pub fn with_retries<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if attempt < MAX_RETRIES && e.kind() == ErrorKind::PermissionDenied => {
                warn!(
                    "Permission denied (attempt {}/{}): {}. Retrying...",
                    attempt, MAX_RETRIES, e
                );
                thread::sleep(Duration::from_millis(100 * attempt));
                attempt += 1;
            }
            result => return result,
        }
    }
}
