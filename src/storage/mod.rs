//! File system storage management
//!
//! Handles path validation, listing, uploads, deletes and usage reporting for
//! the storage tree.

pub mod classify;
pub mod filesystem;
pub mod operations;
pub mod results;
pub mod root;
pub mod upload;
pub mod usage;
pub mod validation;

// Re-export commonly used types and functions
pub use classify::{EntryKind, classify};
pub use operations::{list_directory, open_file, remove_file, remove_folder};
pub use results::{
    DirectoryListing, FileDownload, FileEntry, PlacedFile, Removal, UploadOutcome, UploadReport,
    UsageReport, UsageSnapshot,
};
pub use root::StorageRoot;
pub use upload::{UploadItem, place_uploads};
pub use usage::report_usage;
pub use validation::{Existence, ResolvedPath, normalize_relative, resolve};
