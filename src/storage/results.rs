//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;
use std::fs::File;

use crate::error::StorageError;
use crate::storage::classify::EntryKind;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A file shown in a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub relative_path: String,
    pub kind: EntryKind,
}

/// Result of a directory listing operation
///
/// Folders and files are each sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub path: String,
    pub parent: Option<String>,
    pub folders: Vec<String>,
    pub files: Vec<FileEntry>,
}

impl DirectoryListing {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Relative paths of the subfolders, in listing order.
    pub fn folder_paths(&self) -> Vec<String> {
        self.folders
            .iter()
            .map(|name| {
                if self.path.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", self.path, name)
                }
            })
            .collect()
    }
}

/// Space figures for the volume holding the storage root
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
}

impl UsageSnapshot {
    /// Derives used space and percentage from volume totals.
    pub fn from_totals(total_bytes: u64, free_bytes: u64) -> Self {
        let used_bytes = total_bytes.saturating_sub(free_bytes);
        let used_percent = if total_bytes == 0 {
            0.0
        } else {
            round2((used_bytes as f64 / total_bytes as f64 * 100.0).clamp(0.0, 100.0))
        };

        Self {
            total_bytes,
            used_bytes,
            free_bytes: free_bytes.min(total_bytes),
            used_percent,
        }
    }

    pub fn total_mb(&self) -> f64 {
        bytes_to_mb(self.total_bytes)
    }

    pub fn used_mb(&self) -> f64 {
        bytes_to_mb(self.used_bytes)
    }

    pub fn free_mb(&self) -> f64 {
        bytes_to_mb(self.free_bytes)
    }
}

/// Outcome of a usage query.
///
/// An unavailable report still renders as a zeroed snapshot, but callers can tell
/// it apart from a genuinely empty volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsageReport {
    Computed(UsageSnapshot),
    Unavailable { reason: String },
}

impl UsageReport {
    pub fn snapshot(&self) -> UsageSnapshot {
        match self {
            UsageReport::Computed(snapshot) => *snapshot,
            UsageReport::Unavailable { .. } => UsageSnapshot::default(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, UsageReport::Computed(_))
    }
}

/// A successfully written upload item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedFile {
    pub relative_path: String,
    pub bytes_written: u64,
}

/// Result for one item of an upload batch
#[derive(Debug)]
pub struct UploadOutcome {
    pub name: String,
    pub result: Result<PlacedFile, StorageError>,
}

/// Result of an upload batch, one outcome per item in submission order
#[derive(Debug)]
pub struct UploadReport {
    pub destination: String,
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn written(&self) -> impl Iterator<Item = &PlacedFile> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &StorageError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }

    pub fn bytes_written(&self) -> u64 {
        self.written().map(|p| p.bytes_written).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Result of a delete operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Removal {
    Removed,
    Absent,
}

/// A stored file opened for download
#[derive(Debug)]
pub struct FileDownload {
    pub file: File,
    pub len: u64,
    pub name: String,
    pub relative_path: String,
    pub kind: EntryKind,
}

fn bytes_to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_volume() {
        let snapshot = UsageSnapshot::from_totals(0, 0);
        assert_eq!(snapshot.used_percent, 0.0);
        assert_eq!(snapshot.used_bytes, 0);
    }

    #[test]
    fn test_usage_rounding() {
        let mb = 1024 * 1024;
        let snapshot = UsageSnapshot::from_totals(3 * mb, 2 * mb);
        assert_eq!(snapshot.used_mb(), 1.0);
        assert_eq!(snapshot.free_mb(), 2.0);
        assert_eq!(snapshot.used_percent, 33.33);
    }

    #[test]
    fn test_free_larger_than_total_is_clamped() {
        let snapshot = UsageSnapshot::from_totals(100, 500);
        assert_eq!(snapshot.used_bytes, 0);
        assert_eq!(snapshot.free_bytes, 100);
        assert_eq!(snapshot.used_percent, 0.0);
    }

    #[test]
    fn test_unavailable_report_is_zeroed() {
        let report = UsageReport::Unavailable {
            reason: "unsupported".into(),
        };
        assert!(!report.is_available());
        assert_eq!(report.snapshot(), UsageSnapshot::default());
    }

    #[test]
    fn test_folder_paths() {
        let listing = DirectoryListing {
            path: "docs".into(),
            parent: Some(String::new()),
            folders: vec!["a".into(), "b".into()],
            files: vec![],
        };
        assert_eq!(listing.folder_paths(), vec!["docs/a", "docs/b"]);
    }
}
