//! Transfer module
//!
//! Moves bytes in and out of the storage tree: staged upload writes and
//! folder archive exports.

pub mod archive;
pub mod file_ops;

// Re-export key types and functions
pub use archive::{ArchiveHandle, ArchiveState, export_folder};
pub use file_ops::{is_staging_name, write_replacing};
