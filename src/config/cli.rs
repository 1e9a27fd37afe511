//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// TrimPulse - block device discard (TRIM) benchmark
///
/// Discards `--total-size` bytes in `--record-size` steps and reports the
/// min/max/avg latency of the discard calls and the resulting throughput.
///
/// NUM is a plain number or a number followed by k|K, m|M, g|G (x1024^n),
/// e.g. `trimpulse -s 10k -r 4k -t 10M -d /dev/sdb1` or
/// `trimpulse -t 100m -R 4k:64k:4k -d /dev/sdb1 -b`.
#[derive(Parser, Debug, Default)]
#[command(name = "trimpulse")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Device which should be tested
    #[arg(short = 'd', long, env = "TRIMPULSE_DEVICE")]
    pub device: Option<PathBuf>,

    /// Starting point of the discard (NUM, sequential mode only)
    #[arg(short = 's', long)]
    pub start: Option<String>,

    /// Size of the record discarded in one step (NUM, default 4k)
    #[arg(short = 'r', long)]
    pub record_size: Option<String>,

    /// Total amount of discarded data (NUM, default 10M)
    #[arg(short = 't', long)]
    pub total_size: Option<String>,

    /// Record size range to test, START:END:STEP
    #[arg(short = 'R', long)]
    pub record_range: Option<String>,

    /// Script-friendly output, one line per record size:
    /// <record_size> <total_size> <min> <max> <avg> <sum> <throughput in MB/s>
    #[arg(short = 'b', long)]
    pub batch: bool,

    /// Discard already discarded blocks (skip device preparation)
    #[arg(short = 'z', long)]
    pub discard_discarded: bool,

    /// Run test with random IO pattern; --start is ignored
    #[arg(short = 'x', long)]
    pub random: bool,

    /// Seed for the random address source and filler data
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum number of extents tracked in random mode
    #[arg(long)]
    pub max_extents: Option<usize>,

    /// Filler data written while preparing the device
    #[arg(long, value_enum)]
    pub fill_pattern: Option<FillPatternArg>,

    /// Time the loop without issuing BLKDISCARD
    #[arg(long)]
    pub no_discard: bool,

    /// Do not write filler data before and between steps
    #[arg(long)]
    pub no_prepare: bool,

    /// Validate and print the configuration, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of all steps to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// TOML configuration file; command line options take precedence
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Filler data pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FillPatternArg {
    /// All zeros
    Zeros,
    /// All ones
    Ones,
    /// Pseudo-random bytes
    Random,
    /// Sequential byte values
    Sequential,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
