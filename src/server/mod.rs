//! Service layer
//!
//! The async facade a request-handling layer calls into.

pub mod core;

pub use self::core::{FolderView, ShareService};
