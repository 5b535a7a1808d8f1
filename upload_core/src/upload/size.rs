//! Compact byte-size policies such as `"512K"` or `"5M"`.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref SIZE_SPEC: Regex = Regex::new(r"^([0-9]+)([BKMGbkmg])$").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeLimitError {
    #[error("Malformed size spec: {0:?} (expected digits followed by B, K, M or G)")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
}

impl SizeUnit {
    pub fn multiplier(&self) -> u64 {
        match self {
            SizeUnit::Bytes => 1,
            SizeUnit::Kilobytes => 1024,
            SizeUnit::Megabytes => 1024 * 1024,
            SizeUnit::Gigabytes => 1024 * 1024 * 1024,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            SizeUnit::Bytes => 'B',
            SizeUnit::Kilobytes => 'K',
            SizeUnit::Megabytes => 'M',
            SizeUnit::Gigabytes => 'G',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'B' => Some(SizeUnit::Bytes),
            'K' => Some(SizeUnit::Kilobytes),
            'M' => Some(SizeUnit::Megabytes),
            'G' => Some(SizeUnit::Gigabytes),
            _ => None,
        }
    }
}

/// A maximum byte count parsed from a size spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SizeLimit {
    bytes: u64,
}

impl SizeLimit {
    pub fn from_bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn allows(&self, size: u64) -> bool {
        size <= self.bytes
    }
}

impl FromStr for SizeLimit {
    type Err = SizeLimitError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let captures = SIZE_SPEC
            .captures(spec)
            .ok_or_else(|| SizeLimitError::Malformed(spec.to_string()))?;

        let unit = captures[2]
            .chars()
            .next()
            .and_then(SizeUnit::from_symbol)
            .ok_or_else(|| SizeLimitError::Malformed(spec.to_string()))?;

        // The capture is all digits, so parsing only fails on overflow.
        let amount: u64 = captures[1].parse().unwrap_or(u64::MAX);

        Ok(Self {
            bytes: amount.saturating_mul(unit.multiplier()),
        })
    }
}

impl fmt::Display for SizeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = [SizeUnit::Gigabytes, SizeUnit::Megabytes, SizeUnit::Kilobytes]
            .into_iter()
            .find(|unit| self.bytes > 0 && self.bytes % unit.multiplier() == 0)
            .unwrap_or(SizeUnit::Bytes);

        write!(f, "{}{}", self.bytes / unit.multiplier(), unit.symbol())
    }
}
