//! Error types for unpacker
//!
//! Errors fall in two groups:
//! - fatal setup errors (bad `--buffer` value, bad configuration) that stop the
//!   program before any directory is scanned
//! - per-archive errors ([`ExtractError`]) that are logged and recorded as a failed
//!   outcome while the batch moves on to the next archive set

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for unpacker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for unpacker
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "destination")
        key: Option<String>,
    },

    /// A size string such as `4000M` could not be parsed
    #[error("invalid size {input:?}: {reason}")]
    InvalidSizeFormat {
        /// The rejected input, verbatim
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// A filename that is not a first volume was used where one is required
    ///
    /// The scanner only builds archive sets from names that already passed
    /// [`is_first_volume`](crate::pattern::is_first_volume), so seeing this
    /// means a caller broke that precondition.
    #[error("{filename} is not the first volume of an archive set")]
    NotAFirstVolume {
        /// The offending file name
        filename: String,
    },

    /// Extraction-related error for a single archive set
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Invalid path encountered while scanning or resolving destinations
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The path that was rejected
        path: PathBuf,
        /// The reason the path is invalid
        reason: String,
    },

    /// Failed to check disk space
    #[error("failed to check disk space: {0}")]
    DiskSpaceCheckFailed(String),

    /// A blocking worker panicked or was aborted
    #[error("background task failed: {0}")]
    Task(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors scoped to one archive set
///
/// None of these stop a batch; the orchestrator records them as a failed
/// outcome and continues with the next set.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The archive could not be opened or its headers could not be read
    #[error("bad archive {archive}: {reason}")]
    BadContainer {
        /// The archive that failed to open
        archive: PathBuf,
        /// The reason reported by the archive reader
        reason: String,
    },

    /// Extraction started but the reader failed part-way
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// A volume could not be deleted after a successful extraction
    #[error("cleanup failed for {path}: {reason}")]
    CleanupFailed {
        /// The volume that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        reason: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error only concerns one archive set
    ///
    /// Fatal errors (configuration, size format) return `false`.
    pub fn is_per_archive(&self) -> bool {
        matches!(
            self,
            Error::Extract(_) | Error::DiskSpaceCheckFailed(_) | Error::Io(_)
        )
    }
}
