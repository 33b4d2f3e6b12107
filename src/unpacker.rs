//! Batch orchestration
//!
//! [`Unpacker`] walks the archive sets yielded by a scan one at a time:
//! announce, check space, extract, optionally clean up, report. A failing set
//! never stops the batch. Cancellation is honoured between sets; an extraction
//! already under way runs to completion.

use crate::archive::{ArchiveSet, UnpackOutcome};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extraction::{ArchiveReader, RarReader};
use crate::scanner::DirectoryScanner;
use crate::types::Event;
use crate::utils::{DiskSpace, FsDiskSpace, resolve_directory};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Outcome for one archive set of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveResult {
    /// First volume of the set
    pub archive: PathBuf,
    /// What happened to it
    #[serde(flatten)]
    pub outcome: UnpackOutcome,
}

/// Summary of a finished batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One entry per archive set handled, in processing order
    pub results: Vec<ArchiveResult>,
    /// Whether cancellation cut the batch short
    pub cancelled: bool,
}

impl BatchReport {
    /// Sets that were extracted
    pub fn extracted(&self) -> usize {
        self.count(|o| matches!(o, UnpackOutcome::Extracted { .. }))
    }

    /// Sets skipped because of the space buffer
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, UnpackOutcome::SkippedSpaceBuffer { .. }))
    }

    /// Sets that failed
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, UnpackOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&UnpackOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Runs batches of archive set extractions
///
/// Cloning is cheap; clones share the event channel and cancellation token.
#[derive(Clone)]
pub struct Unpacker {
    config: Config,
    reader: Arc<dyn ArchiveReader>,
    space: Arc<dyn DiskSpace>,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl Unpacker {
    /// Create an unpacker with explicit archive and disk backends
    pub fn new(
        config: Config,
        reader: Arc<dyn ArchiveReader>,
        space: Arc<dyn DiskSpace>,
    ) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(config.event_capacity);
        Ok(Self {
            config,
            reader,
            space,
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Create an unpacker that extracts RAR archives on the local filesystem
    pub fn with_defaults(config: Config) -> Result<Self> {
        Self::new(config, Arc::new(RarReader::new()), Arc::new(FsDiskSpace))
    }

    /// Subscribe to batch events
    ///
    /// Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the batch before its next archive set when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scanner sharing this unpacker's archive reader
    pub fn scanner(&self) -> DirectoryScanner {
        DirectoryScanner::new(Arc::clone(&self.reader))
    }

    /// Scan `root` with the configured mode and unpack every set found
    ///
    /// Fails only when `root` is not a usable directory; per-archive problems
    /// are recorded in the report.
    pub async fn run_path(&self, root: &Path) -> Result<BatchReport> {
        let root = resolve_directory(root)?;
        let mode = self.config.mode;
        info!(?root, %mode, "scanning for archive sets");
        self.emit(Event::Scanning {
            root: root.clone(),
            mode,
        });

        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let scan = this.scanner().scan(&root, mode);
            this.process(scan)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))
    }

    /// Unpack already discovered archive sets
    pub async fn run(&self, sets: Vec<ArchiveSet>) -> Result<BatchReport> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.process(sets))
            .await
            .map_err(|e| Error::Task(e.to_string()))
    }

    /// Unpack archive sets in order on the current thread
    ///
    /// Blocks; async callers use [`Unpacker::run`] or [`Unpacker::run_path`].
    pub fn process<I>(&self, sets: I) -> BatchReport
    where
        I: IntoIterator<Item = ArchiveSet>,
    {
        let mut report = BatchReport::default();

        for set in sets {
            if self.cancel_token.is_cancelled() {
                info!("batch cancelled, remaining archive sets left untouched");
                report.cancelled = true;
                break;
            }
            let outcome = self.unpack_one(&set);
            report.results.push(ArchiveResult {
                archive: set.first_part().to_path_buf(),
                outcome,
            });
        }

        info!(
            extracted = report.extracted(),
            skipped = report.skipped(),
            failed = report.failed(),
            cancelled = report.cancelled,
            "batch complete"
        );
        self.emit(Event::BatchComplete {
            extracted: report.extracted(),
            skipped: report.skipped(),
            failed: report.failed(),
            cancelled: report.cancelled,
        });
        report
    }

    fn unpack_one(&self, set: &ArchiveSet) -> UnpackOutcome {
        let archive = set.first_part().to_path_buf();
        self.emit(Event::Extracting {
            archive: archive.clone(),
            volumes: set.parts().len() + 1,
        });

        let options = self.config.unpack_options();
        let mut on_progress = |processed: u64, total: u64| {
            self.emit(Event::Progress {
                archive: archive.clone(),
                processed,
                total,
            });
        };
        let outcome = set.unpack(
            self.reader.as_ref(),
            self.space.as_ref(),
            &options,
            &mut on_progress,
        );

        let event = match &outcome {
            UnpackOutcome::Extracted {
                files,
                removed,
                cleanup_error,
            } => Event::Extracted {
                archive,
                files: files.len(),
                removed: removed.clone(),
                cleanup_error: cleanup_error.clone(),
            },
            UnpackOutcome::SkippedSpaceBuffer {
                available,
                payload,
                buffer,
            } => Event::SkippedSpaceBuffer {
                archive,
                available: *available,
                payload: *payload,
                buffer: *buffer,
            },
            UnpackOutcome::Failed { reason } => Event::ExtractionFailed {
                archive,
                error: reason.clone(),
            },
        };
        self.emit(event);
        outcome
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        if self.event_tx.send(event).is_err() {
            debug!("event dropped, no subscribers");
        }
    }
}
