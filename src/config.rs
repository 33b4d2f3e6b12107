//! Configuration types for unpacker

use crate::error::{Error, Result};
use crate::size::ByteSize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which directories under the root are searched for archive sets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Only the root directory (default)
    #[default]
    Single,
    /// Each immediate child directory of the root, but not the root itself
    OneLevel,
    /// The root and every directory below it
    Recursive,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanMode::Single => "single",
            ScanMode::OneLevel => "one-level",
            ScanMode::Recursive => "recursive",
        };
        f.write_str(name)
    }
}

impl FromStr for ScanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(ScanMode::Single),
            "one-level" | "onelevel" | "one_level" | "top" => Ok(ScanMode::OneLevel),
            "recursive" => Ok(ScanMode::Recursive),
            other => Err(Error::config(
                "mode",
                format!(
                    "unknown scan mode '{}', expected single, one-level or recursive",
                    other
                ),
            )),
        }
    }
}

/// Settings that apply to every archive set in a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Delete the volumes after a successful extraction
    pub clean: bool,
    /// Free space that must remain after extraction
    pub space_buffer: ByteSize,
    /// Extract here instead of next to the archive
    pub destination: Option<PathBuf>,
}

/// Main configuration
///
/// Every field has a default, so an empty TOML file is a valid configuration.
///
/// ```
/// use unpacker::config::{Config, ScanMode};
///
/// let config: Config = toml::from_str(r#"
///     mode = "recursive"
///     clean = true
///     space_buffer = "2G"
/// "#).unwrap();
///
/// assert_eq!(config.mode, ScanMode::Recursive);
/// assert_eq!(config.space_buffer.bytes(), 2 * 1024 * 1024 * 1024);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Directory traversal mode (default: single)
    #[serde(default)]
    pub mode: ScanMode,

    /// Delete archive volumes after a successful extraction (default: false)
    #[serde(default)]
    pub clean: bool,

    /// Minimum free space to keep after extracting (default: 4000M)
    #[serde(default = "default_space_buffer")]
    pub space_buffer: ByteSize,

    /// Extraction destination (default: the directory holding each archive)
    #[serde(default)]
    pub destination: Option<PathBuf>,

    /// Render a progress bar while extracting (default: true)
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Capacity of the event broadcast channel (default: 1000)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ScanMode::default(),
            clean: false,
            space_buffer: default_space_buffer(),
            destination: None,
            show_progress: true,
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text).map_err(|e| Error::Config {
            message: format!("{}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::config(
                "event_capacity",
                "event channel capacity must be at least 1",
            ));
        }
        if let Some(dest) = &self.destination
            && dest.exists()
            && !dest.is_dir()
        {
            return Err(Error::config(
                "destination",
                format!("{} exists and is not a directory", dest.display()),
            ));
        }
        Ok(())
    }

    /// Per-archive settings derived from this configuration
    pub fn unpack_options(&self) -> UnpackOptions {
        UnpackOptions {
            clean: self.clean,
            space_buffer: self.space_buffer,
            destination: self.destination.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_space_buffer() -> ByteSize {
    ByteSize::from_bytes(4000 * 1024 * 1024) // 4000M
}

fn default_event_capacity() -> usize {
    1000
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = Config::default();
        assert_eq!(config.mode, ScanMode::Single);
        assert!(!config.clean);
        assert_eq!(config.space_buffer, ByteSize::parse("4000M").unwrap());
        assert!(config.destination.is_none());
        assert!(config.show_progress);
    }

    #[test]
    fn empty_toml_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn toml_round_trip_keeps_size_strings() {
        let config = Config {
            mode: ScanMode::OneLevel,
            clean: true,
            space_buffer: ByteSize::parse("2G").unwrap(),
            destination: Some(PathBuf::from("/srv/extracted")),
            show_progress: false,
            event_capacity: 16,
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("mode = \"one-level\""), "{text}");
        assert!(text.contains("space_buffer = \"2G\""), "{text}");

        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn invalid_buffer_in_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unpacker.toml");
        std::fs::write(&path, "space_buffer = \"lots\"\n").unwrap();

        let err = Config::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "{err:?}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::from_toml_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn destination_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let config = Config {
            destination: Some(file),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(key), .. }) if key == "destination"
        ));

        let missing_ok = Config {
            destination: Some(dir.path().join("created-later")),
            ..Default::default()
        };
        assert!(missing_ok.validate().is_ok());
    }

    #[test]
    fn zero_event_capacity_rejected() {
        let config = Config {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn scan_mode_parses_aliases() {
        assert_eq!("single".parse::<ScanMode>().unwrap(), ScanMode::Single);
        assert_eq!("one-level".parse::<ScanMode>().unwrap(), ScanMode::OneLevel);
        assert_eq!("TOP".parse::<ScanMode>().unwrap(), ScanMode::OneLevel);
        assert_eq!("Recursive".parse::<ScanMode>().unwrap(), ScanMode::Recursive);
        assert!("deep".parse::<ScanMode>().is_err());
        assert_eq!(ScanMode::OneLevel.to_string(), "one-level");
    }

    #[test]
    fn unpack_options_mirror_config() {
        let config = Config {
            clean: true,
            destination: Some(PathBuf::from("/out")),
            ..Default::default()
        };
        let options = config.unpack_options();
        assert!(options.clean);
        assert_eq!(options.space_buffer, config.space_buffer);
        assert_eq!(options.destination, Some(PathBuf::from("/out")));
    }
}
