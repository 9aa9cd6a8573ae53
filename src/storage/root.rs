//! Storage root
//!
//! The sandbox boundary every client path is resolved against.

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Canonical, absolute location of the storage tree.
///
/// Built once at startup and passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    path: PathBuf,
}

impl StorageRoot {
    /// Opens the storage root, creating the directory (and its ancestors) if absent.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if path.exists() && !path.is_dir() {
            return Err(StorageError::NotADirectory(path.display().to_string()));
        }

        fs::create_dir_all(path)?;
        let canonical = path.canonicalize()?;

        info!("Storage root directory: {}", canonical.display());

        Ok(Self { path: canonical })
    }

    /// Returns the canonical root path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
