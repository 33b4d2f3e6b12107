//! Command line front end: scan a directory for RAR sets and unpack them

use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;
use unpacker::{ByteSize, Config, Error, Event, ScanMode, Unpacker, run_with_shutdown};

/// Exit status for unusable arguments or configuration
const EXIT_USAGE: u8 = 2;

/// Extract multi-part RAR archives, keeping a free-space buffer
#[derive(Parser, Debug)]
#[command(name = "unpacker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to scan
    #[arg(value_parser = existing_directory)]
    path: PathBuf,

    /// Which directories to search for archive sets
    #[arg(long, value_enum, conflicts_with_all = ["recursive", "top"])]
    mode: Option<ModeArg>,

    /// Search PATH and every directory below it (same as --mode recursive)
    #[arg(short = 'r', long, conflicts_with = "top")]
    recursive: bool,

    /// Search each directory directly inside PATH (same as --mode one-level)
    #[arg(short = 't', long)]
    top: bool,

    /// Delete the volumes after a successful extraction
    #[arg(short = 'c', long)]
    clean: bool,

    /// Free space to keep after extracting, e.g. 4000M or 2G [default: 4000M]
    #[arg(short = 'b', long, value_parser = parse_buffer)]
    buffer: Option<ByteSize>,

    /// Extract into this directory instead of next to each archive
    #[arg(short = 'd', long)]
    dest: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(long, env = "UNPACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Do not draw progress bars
    #[arg(long)]
    no_progress: bool,

    /// Print events as JSON lines instead of human output
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Single,
    OneLevel,
    Recursive,
}

impl From<ModeArg> for ScanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => ScanMode::Single,
            ModeArg::OneLevel => ScanMode::OneLevel,
            ModeArg::Recursive => ScanMode::Recursive,
        }
    }
}

impl Cli {
    fn scan_mode(&self) -> Option<ScanMode> {
        if let Some(mode) = self.mode {
            Some(mode.into())
        } else if self.recursive {
            Some(ScanMode::Recursive)
        } else if self.top {
            Some(ScanMode::OneLevel)
        } else {
            None
        }
    }

    /// File configuration (or defaults) with command line overrides applied
    fn to_config(&self) -> unpacker::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };
        if let Some(mode) = self.scan_mode() {
            config.mode = mode;
        }
        if self.clean {
            config.clean = true;
        }
        if let Some(buffer) = self.buffer {
            config.space_buffer = buffer;
        }
        if let Some(dest) = &self.dest {
            config.destination = Some(dest.clone());
        }
        if self.no_progress || self.json {
            config.show_progress = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn existing_directory(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("{value} is not an existing directory"))
    }
}

fn parse_buffer(value: &str) -> Result<ByteSize, String> {
    ByteSize::parse(value).map_err(|e| e.to_string())
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn human(bytes: u64) -> String {
    let (value, unit) = ByteSize::from_bytes(bytes).human();
    format!("{value:.1}{unit}")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {wide_msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Render events for a person at a terminal
async fn render_human(mut events: broadcast::Receiver<Event>, show_progress: bool) {
    let mut bar: Option<ProgressBar> = None;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "progress display fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let name = event
            .archive()
            .map(|archive| display_name(archive.as_path()))
            .unwrap_or_default();
        match event {
            Event::Scanning { root, mode } => {
                println!("Scanning {} ({mode})", root.display());
            }
            Event::Extracting { volumes, .. } => {
                if show_progress {
                    let pb = ProgressBar::new(0);
                    pb.set_style(bar_style());
                    pb.set_message(name);
                    bar = Some(pb);
                } else {
                    println!("Extracting {name} ({volumes} volumes)");
                }
            }
            Event::Progress {
                processed, total, ..
            } => {
                if let Some(pb) = &bar {
                    pb.set_length(total);
                    pb.set_position(processed);
                }
            }
            Event::Extracted {
                files,
                removed,
                cleanup_error,
                ..
            } => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
                match cleanup_error {
                    Some(error) => println!(
                        "Extracted {name}: {files} files, cleanup stopped after {} volumes: {error}",
                        removed.len()
                    ),
                    None if !removed.is_empty() => println!(
                        "Extracted {name}: {files} files, removed {} volumes",
                        removed.len()
                    ),
                    None => println!("Extracted {name}: {files} files"),
                }
            }
            Event::SkippedSpaceBuffer {
                available,
                payload,
                buffer,
                ..
            } => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
                println!(
                    "Skipped {name}: needs {} plus a {} buffer, only {} free",
                    human(payload),
                    human(buffer),
                    human(available)
                );
            }
            Event::ExtractionFailed { error, .. } => {
                if let Some(pb) = bar.take() {
                    pb.abandon_with_message("failed");
                }
                println!("Failed {name}: {error}");
            }
            Event::BatchComplete {
                extracted,
                skipped,
                failed,
                cancelled,
            } => {
                if cancelled {
                    println!("Interrupted, remaining archives left untouched");
                }
                println!("{extracted} extracted, {skipped} skipped, {failed} failed");
            }
        }
    }
}

/// Print every event as one JSON object per line
async fn render_json(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
            },
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "event output fell behind, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return exit_code_for(&e);
        }
    };

    if !cli.json {
        println!("Mode: {}", config.mode);
        println!("Cleaning: {}", if config.clean { "yes" } else { "no" });
        println!("Buffer: {}", config.space_buffer);
        if let Some(dest) = &config.destination {
            println!("Destination: {}", dest.display());
        }
    }

    let show_progress = config.show_progress;
    let unpacker = match Unpacker::with_defaults(config) {
        Ok(unpacker) => unpacker,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let events = unpacker.subscribe();
    let renderer = if cli.json {
        tokio::spawn(render_json(events))
    } else {
        tokio::spawn(render_human(events, show_progress))
    };

    let result = run_with_shutdown(&unpacker, &cli.path).await;

    // Closing the channel lets the renderer drain and exit
    drop(unpacker);
    renderer.await.ok();

    match result {
        Ok(_) => {
            if !cli.json {
                println!("All done!");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

/// Usage problems exit with 2, failures while running with 1
fn exit_code_for(error: &Error) -> ExitCode {
    if error.is_per_archive() || matches!(error, Error::Task(_)) {
        ExitCode::FAILURE
    } else {
        ExitCode::from(EXIT_USAGE)
    }
}
