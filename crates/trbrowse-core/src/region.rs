//! The `chromosome:start-end` region grammar.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{BrowseError, Result};

fn region_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+):(\d+)-(\d+)$").expect("region grammar is valid"))
}

/// A typed `chromosome:start-end` span identifying one TR locus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    /// Parses user or catalog input. Anything outside `^\w+:\d+-\d+$` is
    /// rejected before reaching a backend.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let caps = region_re()
            .captures(trimmed)
            .ok_or_else(|| BrowseError::InvalidRegion(input.to_string()))?;
        let start: u64 = caps[2]
            .parse()
            .map_err(|_| BrowseError::InvalidRegion(input.to_string()))?;
        let end: u64 = caps[3]
            .parse()
            .map_err(|_| BrowseError::InvalidRegion(input.to_string()))?;
        Ok(Self {
            chrom: caps[1].to_string(),
            start,
            end,
        })
    }

    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Inclusive overlap on the same chromosome.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.chrom == other.chrom && self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

impl FromStr for Region {
    type Err = BrowseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
