//! Archive reading and extraction
//!
//! The rest of the crate talks to archives only through [`ArchiveReader`]: a
//! validity check, an entry listing, and a full extraction with progress. The
//! production implementation is [`RarReader`], backed by the `unrar` crate.

mod rar;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use rar::RarReader;

use crate::error::Result;
use crate::progress::ProgressSink;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Signature of RAR 1.5 to 4.x archives
pub const RAR4_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x00";

/// Signature of RAR 5.0+ archives
pub const RAR5_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x01\x00";

/// One stored entry as listed in archive metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
}

impl ArchiveEntry {
    /// Build an entry from a name and uncompressed size
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Reads and extracts archive containers
///
/// Implementations are synchronous; callers in async code run them on a
/// blocking thread.
pub trait ArchiveReader: Send + Sync {
    /// Whether `path` is a volume of a supported container format
    ///
    /// Must be cheap enough to call on every candidate file in a directory.
    fn is_valid_container(&self, path: &Path) -> bool;

    /// List entries in metadata order
    ///
    /// Entries that span a volume boundary may be listed once per volume they
    /// touch, with the same name on consecutive entries.
    ///
    /// Fails with [`ExtractError::BadContainer`](crate::error::ExtractError::BadContainer)
    /// when the archive cannot be opened or its headers cannot be read.
    fn list_entries(&self, path: &Path) -> Result<Vec<ArchiveEntry>>;

    /// Extract everything into `dest`, reporting written bytes to `progress`
    ///
    /// Returns the paths of the extracted files.
    fn extract_all(
        &self,
        path: &Path,
        dest: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<PathBuf>>;
}

/// Check the leading bytes of `path` for a RAR signature
///
/// Continuation volumes carry the same signature as the first volume, so this
/// accepts every volume of a set.
pub fn has_rar_signature(path: &Path) -> std::io::Result<bool> {
    let mut header = [0u8; 8];
    let mut file = std::fs::File::open(path)?;
    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    let header = &header[..filled];
    Ok(header.starts_with(RAR5_SIGNATURE) || header.starts_with(RAR4_SIGNATURE))
}
