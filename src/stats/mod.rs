//! Discard latency statistics
//!
//! One [`DiscardStats`] is collected per test step. Only min, max, sum and count
//! of the per-discard elapsed time are kept; average and throughput are derived
//! when reporting. Accumulation is plain `f64` addition.
//!
//! # Example
//!
//! ```
//! use trimpulse::stats::DiscardStats;
//!
//! let mut stats = DiscardStats::new();
//! stats.record(0.002);
//! stats.record(0.004);
//!
//! assert_eq!(stats.count(), 2);
//! assert_eq!(stats.max(), 0.004);
//! assert!((stats.avg() - 0.003).abs() < 1e-12);
//! ```

use crate::util::time::throughput_mb_s;
use serde::{Deserialize, Serialize};

/// Aggregated elapsed times of the discards in one step, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscardStats {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

impl DiscardStats {
    /// Empty statistics
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: 0.0,
            sum: 0.0,
            count: 0,
        }
    }

    /// Add one elapsed time
    #[inline]
    pub fn record(&mut self, elapsed: f64) {
        if elapsed > self.max {
            self.max = elapsed;
        }
        if elapsed < self.min {
            self.min = elapsed;
        }
        self.sum += elapsed;
        self.count += 1;
    }

    /// Shortest discard, 0 if nothing was recorded
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Total time spent inside the discard primitive
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean discard time, 0 if nothing was recorded
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// MiB/s for `total_size` bytes discarded in `sum` seconds
    pub fn throughput_mb_s(&self, total_size: u64) -> f64 {
        throughput_mb_s(total_size, self.sum)
    }
}

impl Default for DiscardStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics of one completed step of a sweep
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub record_size: u64,
    pub total_size: u64,
    pub start: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub sum: f64,
    pub count: u64,
    pub throughput_mb_s: f64,
}

impl StepResult {
    pub fn new(record_size: u64, total_size: u64, start: u64, stats: &DiscardStats) -> Self {
        Self {
            record_size,
            total_size,
            start,
            min: stats.min(),
            max: stats.max(),
            avg: stats.avg(),
            sum: stats.sum(),
            count: stats.count(),
            throughput_mb_s: stats.throughput_mb_s(total_size),
        }
    }
}
