//! Path validation
//!
//! Maps untrusted client paths onto the storage tree. Nothing touches the
//! filesystem with a client path unless it went through [`resolve`] first.

use log::warn;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{StorageError, StorageResult};
use crate::storage::root::StorageRoot;

/// Whether the resolved path must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Required,
    Optional,
}

/// A client path that has been proven to stay inside the storage root.
///
/// Only [`resolve`] constructs this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    /// Location on disk (the canonical root joined with the normalized path).
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Normalized, slash-separated path relative to the root. Empty for the root.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Last path segment, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.relative.rsplit('/').next()
        }
    }

    /// Relative path of the containing folder, `None` for the root.
    pub fn parent_relative(&self) -> Option<String> {
        if self.is_root() {
            return None;
        }
        Some(
            self.relative
                .rsplit_once('/')
                .map(|(parent, _)| parent.to_string())
                .unwrap_or_default(),
        )
    }

    /// Relative path of a child below this one.
    pub fn child_relative(&self, child: &str) -> String {
        if self.is_root() {
            child.to_string()
        } else {
            format!("{}/{}", self.relative, child)
        }
    }

    /// Client-facing form used in messages, e.g. `/docs/a.txt`.
    pub fn display(&self) -> String {
        format!("/{}", self.relative)
    }
}

/// Lexically normalizes a client path.
///
/// Empty and `.` segments are dropped and `..` pops the previous segment.
/// Absolute inputs and `..` above the start fail with `PathEscape`.
pub fn normalize_relative(raw: &str) -> StorageResult<String> {
    if raw.contains('\0') {
        return Err(StorageError::InvalidPath(raw.escape_debug().to_string()));
    }

    let path = Path::new(raw);
    if raw.starts_with('/')
        || path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(StorageError::PathEscape(raw.to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::PathEscape(raw.to_string()));
                }
            }
            name => {
                if cfg!(windows) && (name.contains('\\') || name.contains(':')) {
                    return Err(StorageError::InvalidPath(raw.to_string()));
                }
                segments.push(name);
            }
        }
    }

    Ok(segments.join("/"))
}

/// Resolves a client path against the storage root.
///
/// The deepest existing ancestor of the joined path is canonicalized (following
/// symlinks) and must remain under the root.
pub fn resolve(
    root: &StorageRoot,
    raw: &str,
    existence: Existence,
) -> StorageResult<ResolvedPath> {
    let relative = normalize_relative(raw).inspect_err(|e| {
        if e.is_security_event() {
            warn!("Path traversal attempt rejected: {:?}", raw);
        }
    })?;

    let absolute = if relative.is_empty() {
        root.path().to_path_buf()
    } else {
        root.path().join(&relative)
    };

    let containment = ensure_contained(root.path(), &absolute)?;
    let resolved = ResolvedPath { absolute, relative };

    // Errors carry the client's own path; the on-disk location stays in the log.
    match containment {
        Containment::Outside => {
            warn!(
                "Path traversal attempt rejected: {:?} (resolves outside {} via {})",
                raw,
                root.path().display(),
                resolved.as_path().display()
            );
            Err(StorageError::PathEscape(raw.to_string()))
        }
        Containment::RootMissing => {
            warn!("Storage root {} has disappeared", root.path().display());
            Err(StorageError::NotFound(resolved.display()))
        }
        Containment::Absent if existence == Existence::Required => {
            Err(StorageError::NotFound(resolved.display()))
        }
        Containment::Present | Containment::Absent => Ok(resolved),
    }
}

/// Where a joined path lands relative to the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Containment {
    Present,
    Absent,
    Outside,
    RootMissing,
}

/// Walks up from `absolute` to the first ancestor that exists and checks its
/// canonical form.
fn ensure_contained(root: &Path, absolute: &Path) -> io::Result<Containment> {
    let mut candidate = absolute;
    let mut is_target = true;

    loop {
        match candidate.canonicalize() {
            Ok(canonical) => {
                if !canonical.starts_with(root) {
                    return Ok(Containment::Outside);
                }
                return Ok(if is_target {
                    Containment::Present
                } else {
                    Containment::Absent
                });
            }
            Err(e) if is_absent(&e) => {
                if candidate == root {
                    return Ok(Containment::RootMissing);
                }
                // Present but unresolvable means a dangling symlink.
                if fs::symlink_metadata(candidate).is_ok() {
                    return Ok(Containment::Outside);
                }
            }
            Err(e) => return Err(e),
        }

        is_target = false;
        candidate = match candidate.parent() {
            Some(parent) if parent.starts_with(root) => parent,
            _ => return Ok(Containment::Outside),
        };
    }
}

fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scratch_root() -> (tempfile::TempDir, StorageRoot) {
        let dir = tempdir().unwrap();
        let root = StorageRoot::open(dir.path().join("root")).unwrap();
        (dir, root)
    }

    #[test]
    fn test_normalize_collapses_segments() {
        assert_eq!(normalize_relative("").unwrap(), "");
        assert_eq!(normalize_relative("a//b/./c").unwrap(), "a/b/c");
        assert_eq!(normalize_relative("a/b/../c/").unwrap(), "a/c");
        assert_eq!(normalize_relative("a/..").unwrap(), "");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        for raw in ["..", "../x", "a/../../x", "/etc/passwd", "./../root"] {
            assert!(
                matches!(normalize_relative(raw), Err(StorageError::PathEscape(_))),
                "{raw} should escape"
            );
        }
        assert!(matches!(
            normalize_relative("a\0b"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_resolve_inside_root() {
        let (_dir, root) = scratch_root();
        fs::create_dir_all(root.path().join("docs")).unwrap();

        let resolved = resolve(&root, "docs/./", Existence::Required).unwrap();
        assert_eq!(resolved.relative(), "docs");
        assert_eq!(resolved.as_path(), root.path().join("docs"));
        assert_eq!(resolved.parent_relative(), Some(String::new()));

        let top = resolve(&root, "", Existence::Required).unwrap();
        assert!(top.is_root());
        assert_eq!(top.name(), None);
        assert_eq!(top.parent_relative(), None);
    }

    #[test]
    fn test_resolve_missing_path() {
        let (_dir, root) = scratch_root();

        assert!(matches!(
            resolve(&root, "nope/deeper", Existence::Required),
            Err(StorageError::NotFound(_))
        ));
        let optional = resolve(&root, "nope/deeper", Existence::Optional).unwrap();
        assert_eq!(optional.name(), Some("deeper"));
        assert_eq!(optional.parent_relative().as_deref(), Some("nope"));
    }

    #[test]
    fn test_resolve_under_a_file_is_absent() {
        let (_dir, root) = scratch_root();
        fs::write(root.path().join("plain.txt"), b"x").unwrap();

        assert!(matches!(
            resolve(&root, "plain.txt/child", Existence::Required),
            Err(StorageError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let (dir, root) = scratch_root();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("link")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), root.path().join("dangling"))
            .unwrap();

        for raw in ["link", "link/secret.txt", "link/new.txt", "dangling"] {
            assert!(
                matches!(
                    resolve(&root, raw, Existence::Optional),
                    Err(StorageError::PathEscape(_))
                ),
                "{raw} should escape"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_errors_hide_storage_location() {
        let (dir, root) = scratch_root();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("link")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), root.path().join("dangling"))
            .unwrap();
        let location = root.path().to_string_lossy().into_owned();

        for raw in ["link/x.txt", "dangling", "missing/file.txt"] {
            let existence = if raw.starts_with("missing") {
                Existence::Required
            } else {
                Existence::Optional
            };
            let err = resolve(&root, raw, existence).unwrap_err();
            let message = err.to_string();
            assert!(!message.contains(&location), "{raw}: {message}");
            assert!(!message.contains(&*dir.path().to_string_lossy()), "{raw}: {message}");
        }

        let err = resolve(&root, "link/x.txt", Existence::Optional).unwrap_err();
        assert!(matches!(err, StorageError::PathEscape(ref p) if p == "link/x.txt"));
    }

    #[test]
    fn test_resolve_reports_vanished_root_by_client_path() {
        let (dir, root) = scratch_root();
        fs::remove_dir(root.path()).unwrap();

        let err = resolve(&root, "docs", Existence::Optional).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref p) if p == "/docs"));
        assert!(!err.to_string().contains(&*dir.path().to_string_lossy()));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_allows_symlink_inside_root() {
        let (_dir, root) = scratch_root();
        fs::create_dir_all(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("alias"))
            .unwrap();

        let resolved = resolve(&root, "alias", Existence::Required).unwrap();
        assert_eq!(resolved.relative(), "alias");
    }
}
