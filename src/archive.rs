//! Archive sets: one logical archive made of a first volume and its siblings
//!
//! An [`ArchiveSet`] knows where its volumes are, how large its payload is
//! (from archive metadata, not from file sizes on disk), and how to extract
//! itself under the space-buffer policy and remove its volumes afterwards.

use crate::config::UnpackOptions;
use crate::error::{Error, ExtractError, Result};
use crate::extraction::{ArchiveEntry, ArchiveReader};
use crate::pattern::{SiblingMatcher, VolumeKind, VolumeStyle, classify, classify_path};
use crate::progress::ExtractionProgress;
use crate::utils::DiskSpace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Where sibling volumes are looked for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SiblingSearch {
    /// Only the directory holding the first volume
    #[default]
    Directory,
    /// That directory and everything below it
    Subtree,
}

/// Name and location of an archive set, fixed at discovery
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIdentity {
    /// Logical name with volume suffix and extension stripped
    pub base_name: String,
    /// Absolute path of the directory holding the first volume
    pub directory: PathBuf,
    /// Naming convention of the first volume
    pub style: VolumeStyle,
}

/// Result of one [`ArchiveSet::unpack`] call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnpackOutcome {
    /// Extraction succeeded
    Extracted {
        /// Files written to the destination
        files: Vec<PathBuf>,
        /// Volumes deleted afterwards, in deletion order (first volume last)
        removed: Vec<PathBuf>,
        /// Why cleanup stopped early, if it did
        cleanup_error: Option<String>,
    },
    /// Nothing was touched: extracting would have left less than the buffer free
    SkippedSpaceBuffer {
        /// Free bytes at the destination
        available: u64,
        /// Payload size of the set
        payload: u64,
        /// Configured buffer
        buffer: u64,
    },
    /// The archive could not be read or extracted; all volumes are intact
    Failed {
        /// Error message
        reason: String,
    },
}

impl UnpackOutcome {
    /// Short label for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            UnpackOutcome::Extracted { .. } => "extracted",
            UnpackOutcome::SkippedSpaceBuffer { .. } => "skipped",
            UnpackOutcome::Failed { .. } => "failed",
        }
    }
}

/// Sum entry sizes, counting a run of consecutive entries with the same name once
///
/// Split listings repeat a file that spans a volume boundary on consecutive
/// entries; each repeat carries the full size of the file.
pub fn payload_size(entries: &[ArchiveEntry]) -> u64 {
    let mut total: u64 = 0;
    let mut previous: Option<&str> = None;
    for entry in entries {
        if previous == Some(entry.name.as_str()) {
            continue;
        }
        total = total.saturating_add(entry.size);
        previous = Some(entry.name.as_str());
    }
    total
}

/// One logical archive: the first volume plus every sibling volume
#[derive(Clone, Debug)]
pub struct ArchiveSet {
    first_part: PathBuf,
    identity: ArchiveIdentity,
    parts: Vec<PathBuf>,
    total_payload: OnceLock<u64>,
}

impl ArchiveSet {
    /// Build the set whose first volume is `first_part`
    ///
    /// Sibling volumes are the files matching the set's [`SiblingMatcher`],
    /// other than the first volume, that `reader` accepts as valid containers.
    pub fn discover(
        first_part: &Path,
        search: SiblingSearch,
        reader: &dyn ArchiveReader,
    ) -> Result<Self> {
        let first_part = std::path::absolute(first_part)?;
        let filename = first_part
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidPath {
                path: first_part.clone(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;

        let (base_name, style) = match classify(filename) {
            VolumeKind::FirstVolume { base_name, style } => (base_name, style),
            _ => {
                return Err(Error::NotAFirstVolume {
                    filename: filename.to_string(),
                });
            }
        };

        let directory = first_part
            .parent()
            .ok_or_else(|| Error::InvalidPath {
                path: first_part.clone(),
                reason: "no parent directory".to_string(),
            })?
            .to_path_buf();

        let matcher = SiblingMatcher::new(&base_name)?;
        let mut nested_owners: HashMap<PathBuf, bool> = HashMap::new();
        let mut parts: Vec<PathBuf> = list_candidates(&directory, search)?
            .into_iter()
            .filter(|path| *path != first_part && matcher.matches_path(path))
            .filter(|path| {
                let Some(parent) = path.parent() else {
                    return true;
                };
                if parent == directory.as_path() {
                    return true;
                }
                let owned = *nested_owners
                    .entry(parent.to_path_buf())
                    .or_insert_with(|| has_own_first_volume(parent, &matcher));
                if owned {
                    debug!(?path, "volume belongs to a nested set with the same name");
                }
                !owned
            })
            .filter(|path| {
                let valid = reader.is_valid_container(path);
                if !valid {
                    debug!(?path, "ignoring volume that is not a valid container");
                }
                valid
            })
            .collect();
        parts.sort_by_key(|path| (volume_index(path), path.clone()));
        parts.dedup();

        debug!(
            ?first_part,
            base_name = %base_name,
            sibling_count = parts.len(),
            "discovered archive set"
        );

        Ok(Self {
            first_part,
            identity: ArchiveIdentity {
                base_name,
                directory,
                style,
            },
            parts,
            total_payload: OnceLock::new(),
        })
    }

    /// Absolute path of the first volume
    pub fn first_part(&self) -> &Path {
        &self.first_part
    }

    /// Absolute path of the directory holding the first volume
    pub fn directory(&self) -> &Path {
        &self.identity.directory
    }

    /// Name and location of the set
    pub fn identity(&self) -> &ArchiveIdentity {
        &self.identity
    }

    /// Sibling volumes, first volume excluded, in volume order
    pub fn parts(&self) -> &[PathBuf] {
        &self.parts
    }

    /// Every volume, siblings first and the first volume last
    ///
    /// This is the order cleanup deletes them in.
    pub fn volumes(&self) -> impl Iterator<Item = &Path> {
        self.parts
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(self.first_part.as_path()))
    }

    /// Uncompressed payload size from archive metadata
    ///
    /// Computed on first call and cached; a failed listing is not cached.
    pub fn total_payload(&self, reader: &dyn ArchiveReader) -> Result<u64> {
        if let Some(size) = self.total_payload.get() {
            return Ok(*size);
        }
        let entries = reader.list_entries(&self.first_part)?;
        let size = payload_size(&entries);
        debug!(
            archive = ?self.first_part,
            entry_count = entries.len(),
            payload_bytes = size,
            "computed payload size"
        );
        Ok(*self.total_payload.get_or_init(|| size))
    }

    /// Extract the set if the space buffer allows, then optionally remove it
    ///
    /// `on_progress` receives `(processed, total)` payload bytes as extraction
    /// advances. Errors never escape: they come back as
    /// [`UnpackOutcome::Failed`] with every volume left in place.
    pub fn unpack(
        &self,
        reader: &dyn ArchiveReader,
        space: &dyn DiskSpace,
        options: &UnpackOptions,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> UnpackOutcome {
        match self.try_unpack(reader, space, options, on_progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(archive = ?self.first_part, error = %e, "failed to extract archive set");
                UnpackOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_unpack(
        &self,
        reader: &dyn ArchiveReader,
        space: &dyn DiskSpace,
        options: &UnpackOptions,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<UnpackOutcome> {
        let payload = self.total_payload(reader)?;
        let destination = options
            .destination
            .clone()
            .unwrap_or_else(|| self.identity.directory.clone());

        let available = space.available_space(&destination).map_err(|e| {
            Error::DiskSpaceCheckFailed(format!("{}: {}", destination.display(), e))
        })?;
        let buffer = options.space_buffer.bytes();

        // Equivalent to `available - payload < buffer` without underflow
        if available < payload.saturating_add(buffer) {
            info!(
                archive = ?self.first_part,
                available,
                payload,
                buffer,
                "not enough free space to keep the buffer, skipping"
            );
            return Ok(UnpackOutcome::SkippedSpaceBuffer {
                available,
                payload,
                buffer,
            });
        }

        info!(
            archive = ?self.first_part,
            ?destination,
            payload,
            volumes = self.parts.len() + 1,
            "extracting archive set"
        );

        std::fs::create_dir_all(&destination)?;

        let mut progress = ExtractionProgress::new(payload, |processed, total| {
            on_progress(processed, total)
        });
        let files = reader.extract_all(&self.first_part, &destination, &mut progress)?;
        if !progress.is_complete() {
            debug!(
                archive = ?self.first_part,
                processed = progress.processed(),
                payload,
                "reader reported less than the listed payload"
            );
        }

        let mut removed = Vec::new();
        let mut cleanup_error = None;
        if options.clean {
            if let Err(e) = self.remove_volumes(&mut removed) {
                warn!(
                    archive = ?self.first_part,
                    error = %e,
                    "cleanup stopped early, first volume kept"
                );
                cleanup_error = Some(e.to_string());
            } else {
                info!(archive = ?self.first_part, removed = removed.len(), "removed archive volumes");
            }
        }

        Ok(UnpackOutcome::Extracted {
            files,
            removed,
            cleanup_error,
        })
    }

    /// Delete every sibling volume, then the first volume
    ///
    /// Stops at the first failure so the first volume survives as a marker of
    /// incomplete cleanup. Deleted paths are appended to `removed` in order.
    /// A volume that is already gone counts as removed.
    pub fn remove_volumes(&self, removed: &mut Vec<PathBuf>) -> Result<()> {
        for volume in self.volumes() {
            match std::fs::remove_file(volume) {
                Ok(()) => {
                    debug!(?volume, "deleted archive volume");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(?volume, "archive volume already gone");
                }
                Err(e) => {
                    return Err(ExtractError::CleanupFailed {
                        path: volume.to_path_buf(),
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
            removed.push(volume.to_path_buf());
        }
        Ok(())
    }
}

/// Regular files that could hold sibling volumes
fn list_candidates(directory: &Path, search: SiblingSearch) -> Result<Vec<PathBuf>> {
    match search {
        SiblingSearch::Directory => {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(directory)? {
                let path = entry?.path();
                if path.is_file() {
                    files.push(path);
                }
            }
            Ok(files)
        }
        SiblingSearch::Subtree => Ok(WalkDir::new(directory)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry while collecting volumes");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()),
    }
}

/// Whether `directory` holds a first volume named for the same set as `matcher`
///
/// Volumes in such a directory belong to that directory's own release.
fn has_own_first_volume(directory: &Path, matcher: &SiblingMatcher) -> bool {
    let Ok(entries) = std::fs::read_dir(directory) else {
        return false;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .any(|entry| {
            let kind = classify_path(&entry.path());
            matches!(kind, VolumeKind::FirstVolume { .. })
                && kind
                    .base_name()
                    .is_some_and(|base| base.eq_ignore_ascii_case(matcher.base_name()))
        })
}

fn volume_index(path: &Path) -> u32 {
    match classify_path(path) {
        VolumeKind::ContinuationVolume { index, .. } => index,
        _ => 0,
    }
}
