//! Share service
//!
//! Async entry point for a tokio-based request layer. The storage operations
//! block on filesystem I/O, so each call runs on the blocking thread pool.

use log::{info, warn};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ShareConfig;
use crate::error::handlers::handle_error;
use crate::error::{StorageError, StorageResult};
use crate::storage::{
    DirectoryListing, FileDownload, Removal, StorageRoot, UploadItem, UploadReport, UsageReport,
    list_directory, open_file, place_uploads, remove_file, remove_folder, report_usage,
};
use crate::transfer::{ArchiveHandle, export_folder};

/// Everything a folder page shows: its entries and the volume usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderView {
    pub listing: DirectoryListing,
    pub usage: UsageReport,
}

/// Shared handle to the storage tree. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShareService {
    root: Arc<StorageRoot>,
    staging_dir: Arc<PathBuf>,
}

impl ShareService {
    /// Opens (and if needed creates) the configured storage root.
    pub fn open(config: &ShareConfig) -> StorageResult<Self> {
        let root = StorageRoot::open(config.storage_root_path())?;
        let staging_dir = config.staging_dir_path();

        if !staging_dir.is_dir() {
            warn!(
                "Archive staging directory {} does not exist; folder downloads will fail",
                staging_dir.display()
            );
        }

        info!(
            "Share service ready (root: {}, staging: {})",
            root.path().display(),
            staging_dir.display()
        );

        Ok(Self::new(root, staging_dir))
    }

    pub fn new(root: StorageRoot, staging_dir: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
            staging_dir: Arc::new(staging_dir),
        }
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// Lists a folder together with the current usage figures.
    pub async fn browse(&self, path: impl Into<String>) -> StorageResult<FolderView> {
        let path = path.into();
        self.run(move |root| {
            let listing = list_directory(root, &path)?;
            let usage = report_usage(root);
            Ok(FolderView { listing, usage })
        })
        .await
    }

    pub async fn list(&self, path: impl Into<String>) -> StorageResult<DirectoryListing> {
        let path = path.into();
        self.run(move |root| list_directory(root, &path)).await
    }

    pub async fn usage(&self) -> StorageResult<UsageReport> {
        self.run(|root| Ok(report_usage(root))).await
    }

    pub async fn upload<R>(
        &self,
        destination: impl Into<String>,
        items: Vec<UploadItem<R>>,
    ) -> StorageResult<UploadReport>
    where
        R: Read + Send + 'static,
    {
        let destination = destination.into();
        self.run(move |root| place_uploads(root, &destination, items))
            .await
    }

    pub async fn open_file(&self, path: impl Into<String>) -> StorageResult<FileDownload> {
        let path = path.into();
        self.run(move |root| open_file(root, &path)).await
    }

    pub async fn remove_file(&self, path: impl Into<String>) -> StorageResult<Removal> {
        let path = path.into();
        self.run(move |root| remove_file(root, &path)).await
    }

    pub async fn remove_folder(&self, path: impl Into<String>) -> StorageResult<Removal> {
        let path = path.into();
        self.run(move |root| remove_folder(root, &path)).await
    }

    /// Builds a folder archive. The returned handle deletes its staging file
    /// when dropped.
    pub async fn export_folder(&self, path: impl Into<String>) -> StorageResult<ArchiveHandle> {
        let path = path.into();
        let staging_dir = Arc::clone(&self.staging_dir);
        self.run(move |root| export_folder(root, &path, &staging_dir))
            .await
    }

    async fn run<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&StorageRoot) -> StorageResult<T> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || op(&root))
            .await
            .map_err(|e| StorageError::TaskFailed(e.to_string()))?
            .inspect_err(handle_error)
    }
}
