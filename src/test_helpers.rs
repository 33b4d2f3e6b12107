//! Fakes for the archive reader and free-space source, plus fixture writers

use crate::error::{ExtractError, Result};
use crate::extraction::{ArchiveEntry, ArchiveReader, RAR4_SIGNATURE, has_rar_signature};
use crate::progress::ProgressSink;
use crate::utils::DiskSpace;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Write a file that passes the RAR signature check
pub(crate) fn write_volume(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut content = RAR4_SIGNATURE.to_vec();
    content.extend_from_slice(b"volume payload");
    std::fs::write(&path, content).unwrap();
    path
}

/// Archive reader driven by a fixed entry list
///
/// Validity is the real signature check, so fixtures written with
/// [`write_volume`] are valid and anything else is not. Extraction writes one
/// empty file per distinct entry name into an existing `dest` and reports each
/// entry's size as progress.
#[derive(Default)]
pub(crate) struct ScriptedReader {
    entries: Vec<ArchiveEntry>,
    fail_listing: bool,
    fail_extraction: bool,
    list_calls: AtomicUsize,
    extract_calls: AtomicUsize,
}

impl ScriptedReader {
    pub(crate) fn with_entries(entries: Vec<ArchiveEntry>) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    pub(crate) fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn failing_extraction(mut self) -> Self {
        self.fail_extraction = true;
        self
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }
}

impl ArchiveReader for ScriptedReader {
    fn is_valid_container(&self, path: &Path) -> bool {
        has_rar_signature(path).unwrap_or(false)
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<ArchiveEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(ExtractError::BadContainer {
                archive: path.to_path_buf(),
                reason: "scripted listing failure".to_string(),
            }
            .into());
        }
        Ok(self.entries.clone())
    }

    fn extract_all(
        &self,
        path: &Path,
        dest: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<PathBuf>> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_extraction {
            return Err(ExtractError::ExtractionFailed {
                archive: path.to_path_buf(),
                reason: "scripted CRC failure".to_string(),
            }
            .into());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in &self.entries {
            let file = dest.join(&entry.name);
            if files.last() != Some(&file) {
                std::fs::write(&file, b"")?;
                files.push(file);
            }
            progress.advance(entry.size);
        }
        Ok(files)
    }
}

/// Free-space source that always reports the same amount of free space
pub(crate) struct FixedSpace(pub(crate) u64);

impl DiskSpace for FixedSpace {
    fn available_space(&self, _path: &Path) -> std::io::Result<u64> {
        Ok(self.0)
    }
}
