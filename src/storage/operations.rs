//! Storage operations
//!
//! Listing, download and delete operations over the storage tree.

use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io;

use crate::error::{StorageError, StorageResult};
use crate::storage::classify::classify;
use crate::storage::filesystem::with_retries;
use crate::storage::results::{DirectoryListing, FileDownload, FileEntry, Removal};
use crate::storage::root::StorageRoot;
use crate::storage::validation::{Existence, ResolvedPath, resolve};
use crate::transfer::file_ops::is_staging_name;

/// Lists the immediate folders and files of a directory
pub fn list_directory(root: &StorageRoot, relative_path: &str) -> StorageResult<DirectoryListing> {
    let dir = resolve(root, relative_path, Existence::Required)?;

    if !dir.as_path().is_dir() {
        return Err(StorageError::NotFound(dir.display()));
    }

    let entries = with_retries(|| fs::read_dir(dir.as_path())).map_err(|e| vanished(&dir, e))?;

    let mut folders = Vec::new();
    let mut files = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| vanished(&dir, e))?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Skipping entry with non UTF-8 name {:?} in {}", raw, dir.display());
                continue;
            }
        };

        if is_staging_name(&name) {
            continue;
        }

        let is_dir = entry_is_folder(root, &entry);

        if is_dir {
            folders.push(name);
        } else {
            files.push(FileEntry {
                relative_path: dir.child_relative(&name),
                kind: classify(&name),
                name,
            });
        }
    }

    folders.sort();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        "Listed directory {} (real: {}) - {} folders, {} files",
        dir.display(),
        dir.as_path().display(),
        folders.len(),
        files.len()
    );

    Ok(DirectoryListing {
        path: dir.relative().to_string(),
        parent: dir.parent_relative(),
        folders,
        files,
    })
}

/// Opens a stored file for download
pub fn open_file(root: &StorageRoot, relative_path: &str) -> StorageResult<FileDownload> {
    let target = resolve(root, relative_path, Existence::Required)?;

    let metadata = fs::metadata(target.as_path()).map_err(|e| vanished(&target, e))?;
    if !metadata.is_file() {
        return Err(StorageError::NotFound(target.display()));
    }

    let file = File::open(target.as_path()).map_err(|e| vanished(&target, e))?;
    let name = target.name().unwrap_or_default().to_string();

    info!(
        "Prepared file download for {} (real: {}, {} bytes)",
        target.display(),
        target.as_path().display(),
        metadata.len()
    );

    Ok(FileDownload {
        file,
        len: metadata.len(),
        kind: classify(&name),
        name,
        relative_path: target.relative().to_string(),
    })
}

/// Deletes a single file. Deleting an absent file succeeds.
pub fn remove_file(root: &StorageRoot, relative_path: &str) -> StorageResult<Removal> {
    let target = resolve(root, relative_path, Existence::Optional)?;

    match with_retries(|| fs::remove_file(target.as_path())) {
        Ok(()) => {
            info!(
                "Deleted file {} (real: {})",
                target.display(),
                target.as_path().display()
            );
            Ok(Removal::Removed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Delete of absent file {} ignored", target.display());
            Ok(Removal::Absent)
        }
        Err(e) => {
            error!(
                "Failed to delete file {} (real: {}): {}",
                target.display(),
                target.as_path().display(),
                e
            );
            Err(StorageError::RemovalFailure {
                path: target.display(),
                source: e,
            })
        }
    }
}

/// Recursively deletes a folder. Deleting an absent folder succeeds.
///
/// An interrupted delete may leave the folder partially removed; it is reported,
/// not retried.
pub fn remove_folder(root: &StorageRoot, relative_path: &str) -> StorageResult<Removal> {
    let target = resolve(root, relative_path, Existence::Optional)?;

    if target.is_root() {
        return Err(StorageError::InvalidPath(
            "the storage root cannot be removed".into(),
        ));
    }

    match fs::remove_dir_all(target.as_path()) {
        Ok(()) => {
            info!(
                "Deleted folder {} (real: {})",
                target.display(),
                target.as_path().display()
            );
            Ok(Removal::Removed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !target.as_path().exists() => {
            debug!("Delete of absent folder {} ignored", target.display());
            Ok(Removal::Absent)
        }
        Err(e) => {
            error!(
                "Failed to delete folder {} (real: {}): {}",
                target.display(),
                target.as_path().display(),
                e
            );
            Err(StorageError::RemovalFailure {
                path: target.display(),
                source: e,
            })
        }
    }
}

/// Whether a listed entry should be shown as a folder.
///
/// Symlinks are only followed when they land inside the root. Anything else,
/// including entries that cannot be stat'ed, is shown as a file.
fn entry_is_folder(root: &StorageRoot, entry: &fs::DirEntry) -> bool {
    let Ok(file_type) = entry.file_type() else {
        return false;
    };
    if !file_type.is_symlink() {
        return file_type.is_dir();
    }

    match entry.path().canonicalize() {
        Ok(target) if target.starts_with(root.path()) => target.is_dir(),
        _ => {
            debug!("Not following symlink {:?} out of the storage root", entry.file_name());
            false
        }
    }
}

/// Maps a directory vanishing under us to `NotFound`.
fn vanished(path: &ResolvedPath, e: io::Error) -> StorageError {
    if e.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.display())
    } else {
        StorageError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::classify::EntryKind;
    use std::io::Read;
    use tempfile::tempdir;

    fn scratch_root() -> (tempfile::TempDir, StorageRoot) {
        let dir = tempdir().unwrap();
        let root = StorageRoot::open(dir.path().join("root")).unwrap();
        (dir, root)
    }

    #[test]
    fn test_list_sorts_and_classifies() {
        let (_dir, root) = scratch_root();
        fs::create_dir(root.path().join("b")).unwrap();
        fs::create_dir(root.path().join("a")).unwrap();
        fs::write(root.path().join("z.png"), b"png").unwrap();
        fs::write(root.path().join("a.txt"), b"txt").unwrap();

        let listing = list_directory(&root, "").unwrap();

        assert_eq!(listing.folders, vec!["a", "b"]);
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "z.png"]);
        assert_eq!(listing.files[0].kind, EntryKind::Other);
        assert_eq!(listing.files[1].kind, EntryKind::Image);
        assert_eq!(listing.parent, None);
    }

    #[test]
    fn test_list_nested_paths() {
        let (_dir, root) = scratch_root();
        fs::create_dir_all(root.path().join("photos/2024")).unwrap();
        fs::write(root.path().join("photos/2024/beach.JPG"), b"jpg").unwrap();

        let listing = list_directory(&root, "photos/2024").unwrap();

        assert_eq!(listing.path, "photos/2024");
        assert_eq!(listing.parent.as_deref(), Some("photos"));
        assert_eq!(listing.files[0].relative_path, "photos/2024/beach.JPG");
        assert_eq!(listing.files[0].kind, EntryKind::Image);
    }

    #[test]
    fn test_list_missing_or_file_is_not_found() {
        let (_dir, root) = scratch_root();
        fs::write(root.path().join("a.txt"), b"txt").unwrap();

        assert!(matches!(
            list_directory(&root, "missing"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            list_directory(&root, "a.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_hides_staging_files() {
        let (_dir, root) = scratch_root();
        fs::write(
            root.path().join(".a.txt.0f8c2d1e6b7a4c3d9e5f1a2b3c4d5e6f.rax-part"),
            b"partial",
        )
        .unwrap();
        fs::write(root.path().join("a.txt"), b"done").unwrap();
        fs::write(root.path().join(".notes.rax-part"), b"user file").unwrap();

        let listing = list_directory(&root, "").unwrap();
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![".notes.rax-part", "a.txt"]);
    }

    // Linux filesystems accept arbitrary bytes in names; APFS does not.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_list_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (_dir, root) = scratch_root();
        let bad = root.path().join(OsStr::from_bytes(b"bad\xffname.txt"));
        fs::write(&bad, b"x").unwrap();
        fs::write(root.path().join("good.txt"), b"y").unwrap();

        let listing = list_directory(&root, "").unwrap();

        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["good.txt"]);
        assert!(bad.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_list_does_not_follow_symlinks_out_of_root() {
        let (dir, root) = scratch_root();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::create_dir(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("away")).unwrap();
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("alias"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), root.path().join("dangling"))
            .unwrap();

        let listing = list_directory(&root, "").unwrap();

        assert_eq!(listing.folders, vec!["alias", "real"]);
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["away", "dangling"]);
    }

    #[test]
    fn test_open_file() {
        let (_dir, root) = scratch_root();
        fs::create_dir(root.path().join("music")).unwrap();
        fs::write(root.path().join("music/track.mp3"), b"abc").unwrap();

        let mut download = open_file(&root, "music/track.mp3").unwrap();
        let mut content = String::new();
        download.file.read_to_string(&mut content).unwrap();

        assert_eq!(content, "abc");
        assert_eq!(download.len, 3);
        assert_eq!(download.name, "track.mp3");
        assert_eq!(download.kind, EntryKind::Audio);
        assert!(matches!(
            open_file(&root, "music"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_file_is_idempotent() {
        let (_dir, root) = scratch_root();
        fs::write(root.path().join("a.txt"), b"x").unwrap();

        assert_eq!(remove_file(&root, "a.txt").unwrap(), Removal::Removed);
        assert!(!root.path().join("a.txt").exists());
        assert_eq!(remove_file(&root, "a.txt").unwrap(), Removal::Absent);
        assert_eq!(remove_file(&root, "no/such/file").unwrap(), Removal::Absent);
    }

    #[test]
    fn test_remove_file_on_folder_fails() {
        let (_dir, root) = scratch_root();
        fs::create_dir(root.path().join("docs")).unwrap();

        assert!(matches!(
            remove_file(&root, "docs"),
            Err(StorageError::RemovalFailure { .. })
        ));
        assert!(root.path().join("docs").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_folder_on_file_fails() {
        let (_dir, root) = scratch_root();
        fs::write(root.path().join("a.txt"), b"keep").unwrap();

        assert!(matches!(
            remove_folder(&root, "a.txt"),
            Err(StorageError::RemovalFailure { .. })
        ));
        assert_eq!(fs::read(root.path().join("a.txt")).unwrap(), b"keep");
    }

    #[test]
    fn test_remove_folder_recursively() {
        let (_dir, root) = scratch_root();
        fs::create_dir_all(root.path().join("docs/deep/er")).unwrap();
        fs::write(root.path().join("docs/deep/er/a.txt"), b"x").unwrap();

        assert_eq!(remove_folder(&root, "docs").unwrap(), Removal::Removed);
        assert!(matches!(
            list_directory(&root, "docs"),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(remove_folder(&root, "docs").unwrap(), Removal::Absent);
    }

    #[test]
    fn test_remove_refuses_root_and_escape() {
        let (dir, root) = scratch_root();
        let sibling = dir.path().join("sibling");
        fs::create_dir(&sibling).unwrap();

        assert!(matches!(
            remove_folder(&root, ""),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            remove_folder(&root, "../sibling"),
            Err(StorageError::PathEscape(_))
        ));
        assert!(matches!(
            remove_file(&root, "../sibling"),
            Err(StorageError::PathEscape(_))
        ));
        assert!(sibling.is_dir());
        assert!(root.path().is_dir());
    }
}
