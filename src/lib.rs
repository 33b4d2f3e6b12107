//! # unpacker
//!
//! Finds multi-volume RAR archive sets in a directory tree and extracts them,
//! keeping a configurable amount of disk space free and optionally deleting
//! the volumes afterwards.
//!
//! ## Design Philosophy
//!
//! - **One set per folder** - each directory holds at most one release
//! - **Metadata sizing** - space checks use the uncompressed payload size from
//!   archive headers, with split entries counted once
//! - **Never half-clean** - volumes are only deleted after a successful
//!   extraction, and the first volume goes last
//! - **Event-driven** - consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use unpacker::{Config, ScanMode, Unpacker};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         mode: ScanMode::Recursive,
//!         clean: true,
//!         ..Default::default()
//!     };
//!
//!     let unpacker = Unpacker::with_defaults(config)?;
//!
//!     let mut events = unpacker.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = unpacker.run_path(Path::new("/downloads")).await?;
//!     println!("{} extracted", report.extracted());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive sets, payload sizing and cleanup
pub mod archive;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Volume name classification
pub mod pattern;
/// Extraction progress tracking
pub mod progress;
/// Directory scanning
pub mod scanner;
/// Human-readable byte sizes
pub mod size;
/// Events
pub mod types;
/// Batch orchestration
pub mod unpacker;
/// Utility functions
pub mod utils;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archive::{ArchiveIdentity, ArchiveSet, SiblingSearch, UnpackOutcome, payload_size};
pub use config::{Config, ScanMode, UnpackOptions};
pub use error::{Error, ExtractError, Result};
pub use extraction::{ArchiveEntry, ArchiveReader, RarReader};
pub use pattern::{VolumeKind, VolumeStyle, classify, extract_base_name, is_first_volume};
pub use progress::{ExtractionProgress, ProgressSink};
pub use scanner::DirectoryScanner;
pub use size::{ByteSize, SizeUnit};
pub use types::Event;
pub use unpacker::{ArchiveResult, BatchReport, Unpacker};
pub use utils::{DiskSpace, FsDiskSpace};

/// Run a batch over `root`, cancelling it when a termination signal arrives
///
/// The archive set being extracted when the signal arrives is finished; the
/// rest are left untouched.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use unpacker::{Config, Unpacker, run_with_shutdown};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let unpacker = Unpacker::with_defaults(Config::default())?;
///     let report = run_with_shutdown(&unpacker, Path::new("/downloads")).await?;
///     println!("cancelled: {}", report.cancelled);
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    unpacker: &Unpacker,
    root: &std::path::Path,
) -> Result<BatchReport> {
    let token = unpacker.cancellation_token();
    let watcher = tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("stopping after the current archive set");
        token.cancel();
    });

    let report = unpacker.run_path(root).await;
    watcher.abort();
    report
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
