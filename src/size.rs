//! Human-readable byte sizes (`4000M`, `2G`) with binary multipliers

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Size unit accepted in size strings
///
/// Multipliers are binary: `K` is 1024 bytes, not 1000.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeUnit {
    /// Kibibytes (1024 bytes)
    K,
    /// Mebibytes (1024² bytes)
    M,
    /// Gibibytes (1024³ bytes)
    G,
}

impl SizeUnit {
    /// All units, smallest first
    pub const ALL: [SizeUnit; 3] = [SizeUnit::K, SizeUnit::M, SizeUnit::G];

    /// Number of bytes in one of this unit
    pub const fn multiplier(self) -> u64 {
        match self {
            SizeUnit::K => 1024,
            SizeUnit::M => 1024 * 1024,
            SizeUnit::G => 1024 * 1024 * 1024,
        }
    }

    /// Parse a unit symbol, case-insensitive
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'K' => Some(SizeUnit::K),
            'M' => Some(SizeUnit::M),
            'G' => Some(SizeUnit::G),
            _ => None,
        }
    }

    /// The unit's symbol as written in size strings
    pub const fn symbol(self) -> char {
        match self {
            SizeUnit::K => 'K',
            SizeUnit::M => 'M',
            SizeUnit::G => 'G',
        }
    }

    /// Express `bytes` in this unit, for display only
    pub fn to_human(self, bytes: u64) -> f64 {
        bytes as f64 / self.multiplier() as f64
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A non-negative byte count
///
/// Parsed from `<integer><unit>` strings and serialized back to the same form,
/// so it can sit directly in configuration files.
///
/// ```
/// use unpacker::size::ByteSize;
///
/// let buffer: ByteSize = "4000M".parse().unwrap();
/// assert_eq!(buffer.bytes(), 4000 * 1024 * 1024);
/// assert_eq!(buffer.to_string(), "4000M");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ByteSize(u64);

impl ByteSize {
    /// Wrap a raw byte count
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// The byte count
    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Parse a size string of the form `<integer><K|M|G>`
    ///
    /// The unit is the single trailing character; everything before it must be a
    /// non-negative integer.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let invalid = |reason: String| Error::InvalidSizeFormat {
            input: text.to_string(),
            reason,
        };

        let symbol = trimmed
            .chars()
            .last()
            .ok_or_else(|| invalid("empty size".to_string()))?;
        let unit = SizeUnit::from_symbol(symbol)
            .ok_or_else(|| invalid(format!("unknown unit '{symbol}', expected K, M or G")))?;

        let digits = &trimmed[..trimmed.len() - symbol.len_utf8()];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!(
                "'{digits}' is not a non-negative integer"
            )));
        }

        let value: u64 = digits
            .parse()
            .map_err(|e| invalid(format!("'{digits}': {e}")))?;
        value
            .checked_mul(unit.multiplier())
            .map(Self)
            .ok_or_else(|| invalid("value does not fit in 64 bits".to_string()))
    }

    /// Largest unit that keeps the value at or above 1, with the scaled value
    ///
    /// Sizes under 1K are reported in K.
    pub fn human(self) -> (f64, SizeUnit) {
        let unit = SizeUnit::ALL
            .into_iter()
            .rev()
            .find(|unit| self.0 >= unit.multiplier())
            .unwrap_or(SizeUnit::K);
        (unit.to_human(self.0), unit)
    }
}

impl FromStr for ByteSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl TryFrom<String> for ByteSize {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ByteSize> for String {
    fn from(size: ByteSize) -> Self {
        size.to_string()
    }
}

/// Writes the largest unit that divides the value exactly, so the output
/// parses back to the same byte count. Counts that are not a multiple of 1K
/// cannot be written in this format and fall back to a plain `<n>B`.
impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "0K");
        }
        match SizeUnit::ALL
            .into_iter()
            .rev()
            .find(|unit| self.0 % unit.multiplier() == 0)
        {
            Some(unit) => write!(f, "{}{}", self.0 / unit.multiplier(), unit),
            None => write!(f, "{}B", self.0),
        }
    }
}
