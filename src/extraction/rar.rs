use crate::error::{Error, ExtractError, Result};
use crate::progress::ProgressSink;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::{ArchiveEntry, ArchiveReader, has_rar_signature};

/// Archive reader for RAR volumes, backed by the `unrar` crate
///
/// Multi-volume sets are opened through their first volume; `unrar` follows the
/// later volumes on its own as long as they sit next to it.
#[derive(Clone, Copy, Debug, Default)]
pub struct RarReader;

impl RarReader {
    /// Create a reader
    pub fn new() -> Self {
        Self
    }

    fn bad_container(e: unrar::error::UnrarError, archive_path: &Path) -> Error {
        Error::Extract(ExtractError::BadContainer {
            archive: archive_path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn extraction_failed(reason: String, archive_path: &Path) -> Error {
        Error::Extract(ExtractError::ExtractionFailed {
            archive: archive_path.to_path_buf(),
            reason,
        })
    }

    /// Strip root, prefix and `..` components so entries stay inside `dest`
    pub(crate) fn sanitize_entry_path(name: &Path) -> PathBuf {
        name.components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect()
    }
}

impl ArchiveReader for RarReader {
    fn is_valid_container(&self, path: &Path) -> bool {
        match has_rar_signature(path) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(?path, error = %e, "could not read volume signature");
                false
            }
        }
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<ArchiveEntry>> {
        debug!(?path, "listing RAR entries");

        // Split listing reports a volume-spanning file once per volume it
        // touches; callers collapse the repeats when summing sizes
        let listing = unrar::Archive::new(path)
            .open_for_listing_split()
            .map_err(|e| Self::bad_container(e, path))?;

        let mut entries = Vec::new();
        for header in listing {
            let header = header.map_err(|e| Self::bad_container(e, path))?;
            if header.is_directory() {
                continue;
            }
            entries.push(ArchiveEntry::new(
                header.filename.to_string_lossy(),
                header.unpacked_size as u64,
            ));
        }

        debug!(?path, entry_count = entries.len(), "listed RAR entries");
        Ok(entries)
    }

    fn extract_all(
        &self,
        path: &Path,
        dest: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<PathBuf>> {
        debug!(?path, ?dest, "attempting RAR extraction");

        std::fs::create_dir_all(dest).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to create destination: {}",
                e
            )))
        })?;

        let processor = unrar::Archive::new(path)
            .open_for_processing()
            .map_err(|e| Self::bad_container(e, path))?;

        let mut extracted_files = Vec::new();
        let mut at_header = processor;
        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break,
                Err(e) => return Err(Self::extraction_failed(e.to_string(), path)),
            };

            let header = at_file.entry();
            let sanitized = Self::sanitize_entry_path(&header.filename);

            if sanitized.as_os_str().is_empty() || header.is_directory() {
                at_header = at_file.skip().map_err(|e| {
                    Self::extraction_failed(format!("failed to skip entry: {}", e), path)
                })?;
                continue;
            }

            let size = header.unpacked_size as u64;
            let file_path = dest.join(&sanitized);
            at_header = at_file
                .extract_to(&file_path)
                .map_err(|e| Self::extraction_failed(e.to_string(), path))?;
            progress.advance(size);
            extracted_files.push(file_path);
        }

        info!(
            ?path,
            extracted_count = extracted_files.len(),
            "RAR extraction successful"
        );

        Ok(extracted_files)
    }
}
