//! RAX Share - hierarchical storage manager
//!
//! Maps untrusted client paths onto a sandboxed directory tree and provides
//! listing, upload, download, delete, usage and folder-archive operations over it.

pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod transfer;

pub use config::ShareConfig;
pub use error::{StorageError, StorageResult};
pub use server::{FolderView, ShareService};
pub use storage::StorageRoot;
