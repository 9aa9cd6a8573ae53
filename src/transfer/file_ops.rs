//! Module `file_ops`
//!
//! Streams uploaded content to disk. Every write lands in a uniquely named
//! staging file next to its target and is renamed over the target only once it
//! is complete, so readers never observe a half-written file.

use log::{error, warn};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const BUFFER_SIZE: usize = 8192;
const STAGING_SUFFIX: &str = ".rax-part";

const STAGING_TOKEN_LEN: usize = 32;

/// Returns true for in-progress upload staging files, i.e. names shaped like
/// `.<name>.<uuid>.rax-part` as produced by [`staging_path_for`].
pub fn is_staging_name(name: &str) -> bool {
    let Some(stem) = name
        .strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(STAGING_SUFFIX))
    else {
        return false;
    };
    let Some((target, token)) = stem.rsplit_once('.') else {
        return false;
    };

    !target.is_empty()
        && token.len() == STAGING_TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Staging location for `target`: `.<name>.<uuid>.rax-part` in the same folder.
pub fn staging_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(
        ".{}.{}{}",
        name,
        Uuid::new_v4().simple(),
        STAGING_SUFFIX
    ))
}

/// Copies `content` into `target`, fully replacing any existing file.
///
/// Returns the number of bytes written. On failure the target is untouched and
/// the staging file is removed.
pub fn write_replacing<R: Read + ?Sized>(content: &mut R, target: &Path) -> io::Result<u64> {
    let staging = staging_path_for(target);

    let result = copy_into(content, &staging).and_then(|bytes| {
        fs::rename(&staging, target)?;
        Ok(bytes)
    });

    if let Err(e) = &result {
        error!(
            "Failed to write {} (staging: {}): {}",
            target.display(),
            staging.display(),
            e
        );
        if let Err(cleanup) = fs::remove_file(&staging) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove staging file {}: {}",
                    staging.display(),
                    cleanup
                );
            }
        }
    }

    result
}

fn copy_into<R: Read + ?Sized>(content: &mut R, staging: &Path) -> io::Result<u64> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
    let bytes = io::copy(content, &mut writer)?;
    writer.flush()?;
    Ok(bytes)
}
