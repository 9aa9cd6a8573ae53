//! Folder archive export
//!
//! Packs a folder subtree into a zip file in a staging area and hands it out as
//! a readable [`ArchiveHandle`]. The handle owns the staging file and deletes it
//! when dropped, whether the download finished, was aborted, or never started.

use log::{debug, error, info};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{StorageError, StorageResult};
use crate::storage::root::StorageRoot;
use crate::storage::validation::{Existence, resolve};

/// Lifecycle of an exported archive. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Created,
    Streaming,
    Cleaned,
}

/// A finished archive waiting to be streamed to a client.
#[derive(Debug)]
pub struct ArchiveHandle {
    path: PathBuf,
    file: Option<File>,
    download_name: String,
    source: String,
    len: u64,
    state: ArchiveState,
}

impl ArchiveHandle {
    /// Staging file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name to offer the client, e.g. `photos.zip`.
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    /// Relative path of the exported folder.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Archive size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    /// Copies the whole archive into `writer`, then deletes the staging file.
    ///
    /// Cleanup runs even if the copy fails part way.
    pub fn stream_to<W: Write + ?Sized>(mut self, writer: &mut W) -> io::Result<u64> {
        let result = io::copy(&mut self, writer);
        match &result {
            Ok(bytes) => info!("Streamed archive {} ({} bytes)", self.download_name, bytes),
            Err(e) => error!("Streaming archive {} aborted: {}", self.download_name, e),
        }
        result
    }

    fn cleanup(&mut self) {
        if self.state == ArchiveState::Cleaned {
            return;
        }

        // Close before unlinking so the delete also works on Windows.
        drop(self.file.take());

        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary archive {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Temporary archive {} already gone", self.path.display())
            }
            Err(e) => error!(
                "Error removing temporary archive {}: {}",
                self.path.display(),
                e
            ),
        }

        self.state = ArchiveState::Cleaned;
    }
}

impl Read for ArchiveHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::other("archive is not ready for streaming"));
        };
        self.state = ArchiveState::Streaming;
        file.read(buf)
    }
}

impl Drop for ArchiveHandle {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Packs the folder at `relative_path` into `<base>-<uuid>.zip` inside
/// `staging_dir`. The folder's own name is the top-level directory of the archive.
pub fn export_folder(
    root: &StorageRoot,
    relative_path: &str,
    staging_dir: &Path,
) -> StorageResult<ArchiveHandle> {
    let folder = resolve(root, relative_path, Existence::Required)?;

    if !folder.as_path().is_dir() {
        return Err(StorageError::NotFound(folder.display()));
    }

    let base_name = folder
        .as_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "storage".to_string());
    let archive_path = staging_dir.join(format!("{}-{}.zip", base_name, Uuid::new_v4().simple()));

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&archive_path)?;

    // From here on any early return drops the handle and removes the file.
    let mut handle = ArchiveHandle {
        path: archive_path,
        file: None,
        download_name: format!("{base_name}.zip"),
        source: folder.relative().to_string(),
        len: 0,
        state: ArchiveState::Created,
    };

    let mut file =
        write_archive(folder.as_path(), &base_name, file).map_err(|source| {
            StorageError::ArchiveFailure {
                path: folder.display(),
                source,
            }
        })?;
    file.rewind()?;

    handle.len = file.metadata()?.len();
    handle.file = Some(file);

    info!(
        "Created archive {} for {} ({} bytes)",
        handle.path.display(),
        folder.display(),
        handle.len
    );

    Ok(handle)
}

fn write_archive(folder: &Path, base_name: &str, file: File) -> ZipResult<File> {
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.add_directory(format!("{base_name}/"), options)?;

    for entry in WalkDir::new(folder)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(folder) else {
            continue;
        };

        let mut name = base_name.to_string();
        for component in relative.components() {
            name.push('/');
            name.push_str(&component.as_os_str().to_string_lossy());
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else if file_type.is_file() {
            writer.start_file(name, options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut writer)?;
        } else {
            debug!("Skipping non-regular entry {}", entry.path().display());
        }
    }

    writer.finish()
}
