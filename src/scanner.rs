//! Directory scanning for archive sets
//!
//! Each directory contributes at most one archive set: the first file, in
//! directory-listing order, that is a valid first volume. A folder is assumed
//! to hold a single release.

pub use crate::config::ScanMode;

use crate::archive::{ArchiveSet, SiblingSearch};
use crate::extraction::ArchiveReader;
use crate::pattern::{RAR_EXTENSION, is_first_volume};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Finds archive sets under a root directory
#[derive(Clone)]
pub struct DirectoryScanner {
    reader: Arc<dyn ArchiveReader>,
}

impl DirectoryScanner {
    /// Create a scanner that validates candidates with `reader`
    pub fn new(reader: Arc<dyn ArchiveReader>) -> Self {
        Self { reader }
    }

    /// The archive set in `directory`, if there is one
    ///
    /// Sibling volumes are collected from `directory` only.
    pub fn scan_one(&self, directory: &Path) -> Option<ArchiveSet> {
        find_archive_set(self.reader.as_ref(), directory, SiblingSearch::Directory)
    }

    /// Lazily yield the archive sets under `root` for the given traversal mode
    ///
    /// In [`ScanMode::Recursive`] sibling volumes are also collected from the
    /// subtree below each first volume.
    pub fn scan(&self, root: &Path, mode: ScanMode) -> Scan {
        let (pending, recurse, search) = match mode {
            ScanMode::Single => (vec![root.to_path_buf()], false, SiblingSearch::Directory),
            ScanMode::OneLevel => {
                let mut children = subdirectories(root);
                children.reverse();
                (children, false, SiblingSearch::Directory)
            }
            ScanMode::Recursive => (vec![root.to_path_buf()], true, SiblingSearch::Subtree),
        };

        debug!(?root, %mode, "starting directory scan");
        Scan {
            reader: Arc::clone(&self.reader),
            pending,
            recurse,
            search,
            directories_visited: 0,
        }
    }
}

/// Iterator over the archive sets found by [`DirectoryScanner::scan`]
///
/// Directories are visited in pre-order: a directory is searched before any
/// of its subdirectories, and siblings are visited in listing order.
pub struct Scan {
    reader: Arc<dyn ArchiveReader>,
    pending: Vec<PathBuf>,
    recurse: bool,
    search: SiblingSearch,
    directories_visited: usize,
}

impl Scan {
    /// Number of directories searched so far
    pub fn directories_visited(&self) -> usize {
        self.directories_visited
    }
}

impl Iterator for Scan {
    type Item = ArchiveSet;

    fn next(&mut self) -> Option<ArchiveSet> {
        while let Some(directory) = self.pending.pop() {
            if self.recurse {
                let mut children = subdirectories(&directory);
                children.reverse();
                self.pending.extend(children);
            }

            self.directories_visited += 1;
            if let Some(set) = find_archive_set(self.reader.as_ref(), &directory, self.search) {
                return Some(set);
            }
        }
        None
    }
}

/// Immediate subdirectories of `directory`, in listing order
///
/// Symlinked directories are skipped so recursive scans cannot loop.
fn subdirectories(directory: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(?directory, error = %e, "failed to read directory");
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
        .map(|entry| entry.path())
        .collect()
}

fn find_archive_set(
    reader: &dyn ArchiveReader,
    directory: &Path,
    search: SiblingSearch,
) -> Option<ArchiveSet> {
    trace!(?directory, "scanning directory");

    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(?directory, error = %e, "failed to read directory");
            return None;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(?directory, error = %e, "failed to read entry");
                continue;
            }
        };

        let has_rar_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(RAR_EXTENSION));
        if !has_rar_extension || !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_first_volume(name) {
            continue;
        }
        if !reader.is_valid_container(&path) {
            debug!(?path, "first-volume name but not a valid archive, skipping");
            continue;
        }

        match ArchiveSet::discover(&path, search, reader) {
            Ok(set) => return Some(set),
            Err(e) => {
                warn!(?path, error = %e, "failed to collect archive set");
            }
        }
    }

    None
}
