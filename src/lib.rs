//! TrimPulse - block device discard (TRIM) benchmark
//!
//! TrimPulse measures how long a block device takes to discard ranges of a
//! given size. It issues `BLKDISCARD` over a region one record at a time,
//! times every call and reports min/max/avg latency and throughput, optionally
//! sweeping over a range of record sizes.
//!
//! # Architecture
//!
//! - **Address allocator**: unique random record indices tracked in a sparse,
//!   coalescing extent set ([`distribution::tracker`])
//! - **Discard engines**: `BLKDISCARD` ioctl or an in-memory mock ([`engine`])
//! - **Worker**: the timed discard loop of one step ([`worker`])
//! - **Runner**: device preparation, sweeps and reporting ([`runner`])

pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod output;
pub mod runner;
pub mod stats;
pub mod target;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use distribution::tracker::{AddressAllocator, TrackerError};
pub use engine::DiscardEngine;
pub use error::BenchError;

/// Result type used throughout TrimPulse
pub type Result<T> = anyhow::Result<T>;
