//! Workload definition structures

use super::cli_convert::parse_record_range;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How discard ranges are addressed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Walk forward from the start offset one record at a time
    #[default]
    Sequential,
    /// Unique random records drawn by the address allocator
    Random,
}

impl AccessMode {
    pub fn is_random(&self) -> bool {
        matches!(self, Self::Random)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Record sizes to sweep: `start, start + step, ...` up to `end`
///
/// Written as `START:END:STEP` on the command line and in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordRange {
    pub start: u64,
    pub end: u64,
    pub step: u64,
}

impl RecordRange {
    /// Number of sweep iterations
    pub fn steps(&self) -> u64 {
        (self.end - self.start) / self.step + 1
    }

    /// Record sizes in sweep order
    pub fn sizes(&self) -> impl Iterator<Item = u64> {
        let RecordRange { start, step, .. } = *self;
        (0..self.steps()).map(move |i| start + step * i)
    }

    /// Largest record size the sweep reaches
    pub fn largest(&self) -> u64 {
        self.start + self.step * (self.steps() - 1)
    }
}

impl TryFrom<String> for RecordRange {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_record_range(&value)
    }
}

impl From<RecordRange> for String {
    fn from(range: RecordRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for RecordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.step)
    }
}
