//! Events emitted while a batch is processed

use crate::config::ScanMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Event emitted during a batch
///
/// Delivered on a broadcast channel (see
/// [`Unpacker::subscribe`](crate::unpacker::Unpacker::subscribe)); slow
/// subscribers may miss progress events but never block extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Directory scanning started
    Scanning {
        /// Root directory of the scan
        root: PathBuf,
        /// Traversal mode
        mode: ScanMode,
    },

    /// Work on an archive set started
    Extracting {
        /// First volume of the set
        archive: PathBuf,
        /// Number of volumes, first volume included
        volumes: usize,
    },

    /// Extraction progress update
    Progress {
        /// First volume of the set
        archive: PathBuf,
        /// Payload bytes written so far, never above `total`
        processed: u64,
        /// Payload size of the set
        total: u64,
    },

    /// Archive set extracted
    Extracted {
        /// First volume of the set
        archive: PathBuf,
        /// Number of files written
        files: usize,
        /// Volumes deleted afterwards, in deletion order
        removed: Vec<PathBuf>,
        /// Why cleanup stopped early, if it did
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cleanup_error: Option<String>,
    },

    /// Archive set left alone because extracting it would eat into the space buffer
    SkippedSpaceBuffer {
        /// First volume of the set
        archive: PathBuf,
        /// Free bytes at the destination
        available: u64,
        /// Payload size of the set
        payload: u64,
        /// Configured buffer
        buffer: u64,
    },

    /// Archive set could not be extracted
    ExtractionFailed {
        /// First volume of the set
        archive: PathBuf,
        /// Error message
        error: String,
    },

    /// Every archive set has been handled, or the batch was cancelled
    BatchComplete {
        /// Sets extracted
        extracted: usize,
        /// Sets skipped for lack of space
        skipped: usize,
        /// Sets that failed
        failed: usize,
        /// Whether cancellation cut the batch short
        cancelled: bool,
    },
}

impl Event {
    /// First volume this event refers to, if it concerns a single archive set
    pub fn archive(&self) -> Option<&PathBuf> {
        match self {
            Event::Extracting { archive, .. }
            | Event::Progress { archive, .. }
            | Event::Extracted { archive, .. }
            | Event::SkippedSpaceBuffer { archive, .. }
            | Event::ExtractionFailed { archive, .. } => Some(archive),
            Event::Scanning { .. } | Event::BatchComplete { .. } => None,
        }
    }
}
