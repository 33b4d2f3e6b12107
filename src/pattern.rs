//! RAR volume naming conventions
//!
//! Two multi-volume conventions are recognized for an archive set named `B`:
//! - part-numbered: `B.part1.rar`, `B.part2.rar`, ... (any zero padding, so
//!   `B.part01.rar` and `B.part001.rar` are also first volumes)
//! - legacy: `B.rar` first, then `B.r00`, `B.r01`, ... (exactly two digits)
//!
//! All matching is ASCII case-insensitive. Every decision goes through
//! [`classify`]; the sibling matcher is the only place a base name is turned
//! into a regular expression, and it is escaped there.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extension shared by every first volume, in either convention
pub const RAR_EXTENSION: &str = "rar";

/// Multi-volume naming convention
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStyle {
    /// `B.partN.rar`
    PartNumbered,
    /// `B.rar`, `B.r00`, `B.r01`, ...
    Legacy,
}

/// What a filename says about its role in an archive set
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VolumeKind {
    /// The volume extraction starts from
    FirstVolume {
        /// Logical name of the set, with volume suffix and extension stripped
        base_name: String,
        /// Naming convention the file follows
        style: VolumeStyle,
    },
    /// Any later volume of a set
    ContinuationVolume {
        /// Logical name of the set
        base_name: String,
        /// Number taken from the name (`2` for `.part2.rar`, `0` for `.r00`)
        index: u32,
        /// Naming convention the file follows
        style: VolumeStyle,
    },
    /// Not a RAR volume name
    NotAnArchive,
}

impl VolumeKind {
    /// Base name of the set this volume belongs to, if any
    pub fn base_name(&self) -> Option<&str> {
        match self {
            VolumeKind::FirstVolume { base_name, .. }
            | VolumeKind::ContinuationVolume { base_name, .. } => Some(base_name),
            VolumeKind::NotAnArchive => None,
        }
    }
}

/// Strip `suffix` from the end of `s`, ignoring ASCII case
fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(split) || !s[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    Some(&s[..split])
}

/// Classify a bare filename (no directory components)
pub fn classify(filename: &str) -> VolumeKind {
    if let Some(stem) = strip_suffix_ignore_case(filename, ".rar") {
        // ASCII lowercasing keeps byte offsets valid for slicing `stem`
        if let Some(part_idx) = stem.to_ascii_lowercase().rfind(".part") {
            let digits = &stem[part_idx + ".part".len()..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                let base_name = &stem[..part_idx];
                if base_name.is_empty() {
                    return VolumeKind::NotAnArchive;
                }
                let index = digits.parse::<u32>().unwrap_or(u32::MAX);
                return if index == 1 {
                    VolumeKind::FirstVolume {
                        base_name: base_name.to_string(),
                        style: VolumeStyle::PartNumbered,
                    }
                } else {
                    VolumeKind::ContinuationVolume {
                        base_name: base_name.to_string(),
                        index,
                        style: VolumeStyle::PartNumbered,
                    }
                };
            }
        }

        // Plain .rar with no .partNNN
        if stem.is_empty() {
            return VolumeKind::NotAnArchive;
        }
        return VolumeKind::FirstVolume {
            base_name: stem.to_string(),
            style: VolumeStyle::Legacy,
        };
    }

    // Legacy continuation: .r00 .. .r99
    let bytes = filename.as_bytes();
    if bytes.len() > 4 {
        let ext = &bytes[bytes.len() - 4..];
        if ext[0] == b'.'
            && ext[1].eq_ignore_ascii_case(&b'r')
            && ext[2].is_ascii_digit()
            && ext[3].is_ascii_digit()
        {
            let index = u32::from(ext[2] - b'0') * 10 + u32::from(ext[3] - b'0');
            return VolumeKind::ContinuationVolume {
                base_name: filename[..filename.len() - 4].to_string(),
                index,
                style: VolumeStyle::Legacy,
            };
        }
    }

    VolumeKind::NotAnArchive
}

/// Classify the final component of a path
pub fn classify_path(path: &Path) -> VolumeKind {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(classify)
        .unwrap_or(VolumeKind::NotAnArchive)
}

/// Whether `filename` is the first volume of an archive set
///
/// True for `B.part1.rar` with any zero padding and for a plain `B.rar`.
pub fn is_first_volume(filename: &str) -> bool {
    matches!(classify(filename), VolumeKind::FirstVolume { .. })
}

/// Base name of a first-volume filename
///
/// Fails with [`Error::NotAFirstVolume`] for anything else, including
/// continuation volumes.
pub fn extract_base_name(filename: &str) -> Result<String> {
    match classify(filename) {
        VolumeKind::FirstVolume { base_name, .. } => Ok(base_name),
        _ => Err(Error::NotAFirstVolume {
            filename: filename.to_string(),
        }),
    }
}

/// Matches every volume filename of one archive set
///
/// True for `B.part<digits>.rar` (any digit count) and `B.r<2 digits>`. The
/// base name is matched literally and the pattern is anchored at both ends, so
/// `movie2.rar` or `movie.rar.bak` never match a set named `movie`.
#[derive(Clone, Debug)]
pub struct SiblingMatcher {
    base_name: String,
    regex: Regex,
}

impl SiblingMatcher {
    /// Build a matcher for the set named `base_name`
    pub fn new(base_name: &str) -> Result<Self> {
        let pattern = format!(
            r"^{}(?:\.part[0-9]+\.rar|\.r[0-9]{{2}})$",
            regex::escape(base_name)
        );
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(1024 * 1024)
            .build()
            .map_err(|e| Error::InvalidPath {
                path: base_name.into(),
                reason: format!("cannot build volume matcher: {}", e),
            })?;

        Ok(Self {
            base_name: base_name.to_string(),
            regex,
        })
    }

    /// The base name this matcher was built for
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Whether `filename` is a volume of this set
    pub fn matches(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }

    /// [`matches`](Self::matches) applied to the final component of `path`
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.matches(name))
    }
}
