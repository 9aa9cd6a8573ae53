//! Upload placement
//!
//! Writes a batch of uploaded files under a destination folder, recreating the
//! relative folder structure carried by each item's name.

use log::{info, warn};
use std::io::{self, Read};

use crate::error::{StorageError, StorageResult};
use crate::storage::filesystem::{create_directory, directory_exists};
use crate::storage::results::{PlacedFile, UploadOutcome, UploadReport};
use crate::storage::root::StorageRoot;
use crate::storage::validation::{Existence, ResolvedPath, normalize_relative, resolve};
use crate::transfer::file_ops::write_replacing;

/// One uploaded file: its client-supplied relative name and its content.
pub struct UploadItem<R> {
    pub name: String,
    pub content: R,
}

impl<R: Read> UploadItem<R> {
    pub fn new(name: impl Into<String>, content: R) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Places each item under `destination`, in order.
///
/// Items are independent: a failed item is recorded in the report and the batch
/// continues. Only a bad destination fails the whole call.
pub fn place_uploads<R, I>(
    root: &StorageRoot,
    destination: &str,
    items: I,
) -> StorageResult<UploadReport>
where
    R: Read,
    I: IntoIterator<Item = UploadItem<R>>,
{
    let dest = prepare_destination(root, destination)?;
    let mut outcomes = Vec::new();

    for UploadItem { name, mut content } in items {
        let result = place_item(root, &dest, &name, &mut content);

        match &result {
            Ok(placed) => info!(
                "Stored upload {} ({} bytes)",
                placed.relative_path, placed.bytes_written
            ),
            Err(e) => warn!("Skipped upload item {:?}: {}", name, e),
        }

        outcomes.push(UploadOutcome { name, result });
    }

    let report = UploadReport {
        destination: dest.relative().to_string(),
        outcomes,
    };

    info!(
        "Upload batch into {}: {} written, {} failed, {} bytes",
        dest.display(),
        report.written().count(),
        report.failed().count(),
        report.bytes_written()
    );

    Ok(report)
}

/// Resolves the destination folder, creating it with its ancestors if absent.
fn prepare_destination(root: &StorageRoot, destination: &str) -> StorageResult<ResolvedPath> {
    let dest = resolve(root, destination, Existence::Optional)?;

    if dest.as_path().exists() {
        if !directory_exists(dest.as_path()) {
            return Err(StorageError::NotADirectory(dest.display()));
        }
    } else {
        create_directory(dest.as_path()).map_err(|e| StorageError::WriteFailure {
            path: dest.display(),
            source: e,
        })?;
        info!("Created upload folder {}", dest.display());
    }

    Ok(dest)
}

fn place_item<R: Read>(
    root: &StorageRoot,
    dest: &ResolvedPath,
    name: &str,
    content: &mut R,
) -> StorageResult<PlacedFile> {
    // Checked on its own so `..` cannot climb out of the destination.
    let item_relative = normalize_relative(name)?;
    if item_relative.is_empty() {
        return Err(StorageError::InvalidPath(format!("empty upload name {name:?}")));
    }

    let target = resolve(root, &dest.child_relative(&item_relative), Existence::Optional)?;
    let write_failure = |source: io::Error| StorageError::WriteFailure {
        path: target.display(),
        source,
    };

    if directory_exists(target.as_path()) {
        return Err(write_failure(io::Error::new(
            io::ErrorKind::IsADirectory,
            "a folder already exists at this path",
        )));
    }

    if let Some(parent) = target.as_path().parent() {
        create_directory(parent).map_err(write_failure)?;
    }

    let bytes_written = write_replacing(content, target.as_path()).map_err(write_failure)?;

    Ok(PlacedFile {
        relative_path: target.relative().to_string(),
        bytes_written,
    })
}
