//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! Sizes are bytes everywhere; in config files they may be written either as
//! integers or as unit-suffixed strings (`"4k"`, `"10M"`).

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;
pub mod workload;

use crate::util::buffer::FillPattern;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use workload::*;

/// Default record size (4 KiB)
pub const DEFAULT_RECORD_SIZE: u64 = 4096;

/// Default amount of data discarded per step (10 MiB)
pub const DEFAULT_TOTAL_SIZE: u64 = 10 * 1024 * 1024;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Block device under test
    pub device: Option<PathBuf>,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// What to discard and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// First byte discarded in sequential mode
    #[serde(default, deserialize_with = "deserialize_size")]
    pub start: u64,
    /// Bytes discarded per discard call
    #[serde(default = "default_record_size", deserialize_with = "deserialize_size")]
    pub record_size: u64,
    /// Bytes discarded per test step
    #[serde(default = "default_total_size", deserialize_with = "deserialize_size")]
    pub total_size: u64,
    /// Sweep of record sizes; overrides `record_size` when set
    #[serde(default)]
    pub record_range: Option<RecordRange>,
    /// Sequential or random addressing
    #[serde(default)]
    pub mode: AccessMode,
    /// Skip preparation and discard already-discarded blocks
    #[serde(default)]
    pub discard_discarded: bool,
    /// Seed for the random address source and filler data
    #[serde(default)]
    pub seed: Option<u64>,
    /// Maximum number of extent nodes tracked in random mode
    #[serde(default)]
    pub max_extents: Option<usize>,
    /// Filler written while preparing the device
    #[serde(default)]
    pub fill_pattern: FillPattern,
}

fn default_record_size() -> u64 {
    DEFAULT_RECORD_SIZE
}

fn default_total_size() -> u64 {
    DEFAULT_TOTAL_SIZE
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            start: 0,
            record_size: default_record_size(),
            total_size: default_total_size(),
            record_range: None,
            mode: AccessMode::default(),
            discard_discarded: false,
            seed: None,
            max_extents: None,
            fill_pattern: FillPattern::default(),
        }
    }
}

impl WorkloadConfig {
    /// Record sizes the run will test, in order
    pub fn record_sizes(&self) -> Vec<u64> {
        match self.record_range {
            Some(range) => range.sizes().collect(),
            None => vec![self.record_size],
        }
    }

    /// Largest record size of the run
    pub fn largest_record_size(&self) -> u64 {
        self.record_range
            .map_or(self.record_size, |range| range.largest())
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// One machine-readable line per step instead of the human report
    #[serde(default)]
    pub batch: bool,
    /// JSON report file path
    #[serde(default)]
    pub json_output: Option<PathBuf>,
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Time the loop but do not issue BLKDISCARD
    #[serde(default)]
    pub no_discard: bool,
    /// Do not write filler data
    #[serde(default)]
    pub no_prepare: bool,
    /// Validate and print configuration, touch nothing
    #[serde(default)]
    pub dry_run: bool,
    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            no_discard: false,
            no_prepare: false,
            dry_run: false,
            log_level: default_log_level(),
        }
    }
}

/// Accept `4096` or `"4k"` for size fields
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeValue {
        Int(u64),
        Str(String),
    }

    match SizeValue::deserialize(deserializer)? {
        SizeValue::Int(value) => Ok(value),
        SizeValue::Str(s) => cli_convert::parse_offset(&s).map_err(serde::de::Error::custom),
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = self
            .device
            .as_ref()
            .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());
        writeln!(f, "device : {}", device)?;
        writeln!(f, "mode : {}", self.workload.mode)?;
        writeln!(f, "start : {}", self.workload.start)?;
        match self.workload.record_range {
            Some(range) => writeln!(
                f,
                "record_size from {} to {} with the step {}",
                range.start, range.end, range.step
            )?,
            None => writeln!(f, "record_size : {}", self.workload.record_size)?,
        }
        write!(f, "total_size : {}", self.workload.total_size)
    }
}
