//! Entry classification
//!
//! Coarse content kind of a file, derived from its extension only.

use serde::Serialize;
use std::fmt;

/// Content kind shown next to a file in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Image,
    Video,
    Audio,
    Other,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Image => "image",
            EntryKind::Video => "video",
            EntryKind::Audio => "audio",
            EntryKind::Other => "other",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a file name by the lowercase suffix after its last `.`.
pub fn classify(name: &str) -> EntryKind {
    let Some((_, extension)) = name.rsplit_once('.') else {
        return EntryKind::Other;
    };

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" => EntryKind::Image,
        "mp4" | "mkv" | "mov" | "avi" => EntryKind::Video,
        "mp3" | "wav" | "ogg" => EntryKind::Audio,
        _ => EntryKind::Other,
    }
}
