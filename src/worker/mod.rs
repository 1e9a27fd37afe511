//! Discard driver
//!
//! The worker is the timed inner loop of a test step. For every discard it
//! reads the clock, issues the discard through the [`DiscardEngine`], reads the
//! clock again and feeds the elapsed time into [`DiscardStats`].
//!
//! # Addressing
//!
//! - **Sequential**: record-sized ranges walking forward from `start` until
//!   `total_size` bytes are covered. The last range is clipped to the residual,
//!   so it may be shorter than one record.
//! - **Random**: `index * record_size` for indices drawn from an
//!   [`AddressAllocator`], clipped to the device size.
//!
//! Any failure (discard, clock, allocator) aborts the step. Nothing is retried:
//! statistics over a partial step would be meaningless.
//!
//! # Example
//!
//! ```
//! use trimpulse::config::workload::AccessMode;
//! use trimpulse::distribution::uniform::UniformDistribution;
//! use trimpulse::engine::mock::MockEngine;
//! use trimpulse::util::time::MonotonicClock;
//! use trimpulse::worker::{StepPlan, Worker};
//!
//! let plan = StepPlan::new(0, 4096, 12288, 1 << 20, AccessMode::Sequential);
//! let mut engine = MockEngine::new();
//! let mut clock = MonotonicClock::new();
//!
//! let stats = Worker::<UniformDistribution>::new(plan, &mut engine, &mut clock)
//!     .run()?;
//! assert_eq!(stats.count(), 3);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod prepare;

use crate::config::workload::AccessMode;
use crate::distribution::tracker::AddressAllocator;
use crate::distribution::uniform::UniformDistribution;
use crate::distribution::Distribution;
use crate::engine::{ByteRange, DiscardEngine};
use crate::error::BenchError;
use crate::stats::DiscardStats;
use crate::util::time::Clock;
use crate::Result;
use anyhow::Context;
use tracing::{debug, trace};

/// Parameters of one test step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    /// First byte discarded (sequential mode)
    pub start: u64,
    pub record_size: u64,
    /// Bytes to discard in this step
    pub total_size: u64,
    /// Device size; random ranges are clipped to it
    pub dev_size: u64,
    pub mode: AccessMode,
    /// When false the loop is timed but no discard reaches the device
    pub issue_discard: bool,
}

impl StepPlan {
    pub fn new(start: u64, record_size: u64, total_size: u64, dev_size: u64, mode: AccessMode) -> Self {
        Self {
            start,
            record_size,
            total_size,
            dev_size,
            mode,
            issue_discard: true,
        }
    }

    /// Time the loop without touching the device
    pub fn without_discard(mut self) -> Self {
        self.issue_discard = false;
        self
    }

    /// Number of discards the step issues
    pub fn discard_count(&self) -> u64 {
        if self.record_size == 0 {
            0
        } else {
            self.total_size.div_ceil(self.record_size)
        }
    }

    /// Ranges of a sequential step, in issue order
    pub fn sequential_ranges(&self) -> SequentialRanges {
        SequentialRanges {
            next: self.start,
            end: self.start.saturating_add(self.total_size),
            record_size: self.record_size,
        }
    }
}

/// Iterator over the record-sized ranges of a sequential step
#[derive(Debug, Clone)]
pub struct SequentialRanges {
    next: u64,
    end: u64,
    record_size: u64,
}

impl Iterator for SequentialRanges {
    type Item = ByteRange;

    fn next(&mut self) -> Option<ByteRange> {
        if self.next >= self.end || self.record_size == 0 {
            return None;
        }
        let length = self.record_size.min(self.end - self.next);
        let range = ByteRange::new(self.next, length);
        self.next += length;
        Some(range)
    }
}

/// Runs one timed discard step
///
/// The worker borrows the engine, clock and (in random mode) the allocator
/// from the runner. The allocator must have been reset by the caller before a
/// new step; the worker only draws indices from it.
pub struct Worker<'a, D: Distribution = UniformDistribution> {
    plan: StepPlan,
    engine: &'a mut dyn DiscardEngine,
    clock: &'a mut dyn Clock,
    allocator: Option<&'a mut AddressAllocator<D>>,
    stats: DiscardStats,
}

impl<'a, D: Distribution> Worker<'a, D> {
    pub fn new(plan: StepPlan, engine: &'a mut dyn DiscardEngine, clock: &'a mut dyn Clock) -> Self {
        Self {
            plan,
            engine,
            clock,
            allocator: None,
            stats: DiscardStats::new(),
        }
    }

    /// Source of record indices for random mode
    pub fn with_allocator(mut self, allocator: &'a mut AddressAllocator<D>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Run the step to completion and return its statistics
    pub fn run(mut self) -> Result<DiscardStats> {
        debug!(
            mode = %self.plan.mode,
            start = self.plan.start,
            record_size = self.plan.record_size,
            total_size = self.plan.total_size,
            discards = self.plan.discard_count(),
            "starting discard loop"
        );

        match self.plan.mode {
            AccessMode::Sequential => {
                for range in self.plan.sequential_ranges() {
                    self.timed_discard(range)?;
                }
            }
            AccessMode::Random => {
                let Some(allocator) = self.allocator.take() else {
                    return Err(
                        BenchError::config("random mode needs an address allocator").into()
                    );
                };
                let record_size = allocator.record_size();
                for _ in 0..self.plan.discard_count() {
                    let index = allocator.next_random_block().map_err(BenchError::from)?;
                    let range =
                        ByteRange::new(index * record_size, record_size).clip_to(self.plan.dev_size);
                    self.timed_discard(range)?;
                }
                debug!(
                    extents = allocator.extents().len(),
                    issued = allocator.issued(),
                    "random step finished"
                );
            }
        }

        Ok(self.stats)
    }

    #[inline]
    fn timed_discard(&mut self, range: ByteRange) -> Result<()> {
        let before = self.clock.now()?;
        if self.plan.issue_discard {
            self.engine
                .discard(range)
                .with_context(|| format!("discard of {} failed", range))?;
        }
        let after = self.clock.now()?;

        let elapsed = after - before;
        trace!(range = %range, elapsed, "discard");
        self.stats.record(elapsed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::scripted::ScriptedDistribution;
    use crate::distribution::tracker::TrackerError;
    use crate::engine::mock::MockEngine;
    use crate::error::classify;
    use crate::util::time::{MonotonicClock, ScriptedClock};

    fn run_plain(plan: StepPlan, engine: &mut MockEngine) -> Result<DiscardStats> {
        let mut clock = MonotonicClock::new();
        Worker::<UniformDistribution>::new(plan, engine, &mut clock).run()
    }

    #[test]
    fn test_sequential_three_records() {
        let plan = StepPlan::new(0, 4096, 12288, 1 << 20, AccessMode::Sequential);
        let mut engine = MockEngine::new();
        let stats = run_plain(plan, &mut engine).unwrap();

        assert_eq!(
            engine.discards(),
            vec![
                ByteRange::new(0, 4096),
                ByteRange::new(4096, 4096),
                ByteRange::new(8192, 4096),
            ]
        );
        assert_eq!(stats.count(), 3);
    }

    #[test]
    fn test_sequential_clips_residual() {
        let plan = StepPlan::new(8192, 4096, 10000, 1 << 20, AccessMode::Sequential);
        let mut engine = MockEngine::new();
        run_plain(plan, &mut engine).unwrap();

        assert_eq!(
            engine.discards(),
            vec![
                ByteRange::new(8192, 4096),
                ByteRange::new(12288, 4096),
                ByteRange::new(16384, 1808),
            ]
        );
        assert_eq!(plan.discard_count(), 3);
    }

    #[test]
    fn test_statistics_from_scripted_clock() {
        let plan = StepPlan::new(0, 4096, 12288, 1 << 20, AccessMode::Sequential);
        let mut engine = MockEngine::new();
        let mut clock = ScriptedClock::from_durations(&[0.01, 0.02, 0.03]);

        let stats = Worker::<UniformDistribution>::new(plan, &mut engine, &mut clock)
            .run()
            .unwrap();

        assert!((stats.min() - 0.01).abs() < 1e-9);
        assert!((stats.max() - 0.03).abs() < 1e-9);
        assert!((stats.sum() - 0.06).abs() < 1e-9);
        assert!((stats.avg() - 0.02).abs() < 1e-9);
        assert_eq!(stats.count(), 3);
    }

    #[test]
    fn test_random_uses_allocator_indices() {
        let plan = StepPlan::new(0, 4096, 3 * 4096, 100 * 4096, AccessMode::Random);
        let mut allocator =
            AddressAllocator::new(100 * 4096, 4096, ScriptedDistribution::new([5, 6, 4])).unwrap();
        let mut engine = MockEngine::new();
        let mut clock = MonotonicClock::new();

        Worker::new(plan, &mut engine, &mut clock)
            .with_allocator(&mut allocator)
            .run()
            .unwrap();

        assert_eq!(
            engine.discards(),
            vec![
                ByteRange::new(5 * 4096, 4096),
                ByteRange::new(6 * 4096, 4096),
                ByteRange::new(4 * 4096, 4096),
            ]
        );
        let extents: Vec<(u64, u64)> = allocator.enumerate().map(|e| (e.start, e.count)).collect();
        assert_eq!(extents, vec![(4, 3)]);
    }

    #[test]
    fn test_random_without_allocator_is_rejected() {
        let plan = StepPlan::new(0, 4096, 4096, 1 << 20, AccessMode::Random);
        let mut engine = MockEngine::new();
        let err = run_plain(plan, &mut engine).unwrap_err();
        assert!(matches!(classify(&err), Some(BenchError::Configuration(_))));
    }

    #[test]
    fn test_random_exhaustion_aborts_step() {
        let plan = StepPlan::new(0, 4096, 3 * 4096, 2 * 4096, AccessMode::Random);
        let mut allocator =
            AddressAllocator::new(2 * 4096, 4096, UniformDistribution::with_seed(1)).unwrap();
        let mut engine = MockEngine::new();
        let mut clock = MonotonicClock::new();

        let err = Worker::new(plan, &mut engine, &mut clock)
            .with_allocator(&mut allocator)
            .run()
            .unwrap_err();

        assert!(matches!(
            classify(&err),
            Some(BenchError::Allocation(TrackerError::Exhausted { capacity: 2 }))
        ));
        assert_eq!(engine.discards().len(), 2);
    }

    #[test]
    fn test_discard_failure_propagates() {
        let plan = StepPlan::new(0, 4096, 4 * 4096, 1 << 20, AccessMode::Sequential);
        let mut engine = MockEngine::new().fail_discard_at(2);
        let err = run_plain(plan, &mut engine).unwrap_err();

        assert!(matches!(classify(&err), Some(BenchError::Device { .. })));
        assert!(format!("{:#}", err).contains("8192+4096"));
        assert_eq!(engine.discards().len(), 2);
    }

    #[test]
    fn test_clock_failure_propagates() {
        let plan = StepPlan::new(0, 4096, 2 * 4096, 1 << 20, AccessMode::Sequential);
        let mut engine = MockEngine::new();
        let mut clock = ScriptedClock::new([1.0, 2.0, 3.0]);

        let result = Worker::<UniformDistribution>::new(plan, &mut engine, &mut clock).run();
        assert!(result.is_err());
    }

    #[test]
    fn test_without_discard_times_but_skips_device() {
        let plan = StepPlan::new(0, 4096, 8 * 4096, 1 << 20, AccessMode::Sequential).without_discard();
        let mut engine = MockEngine::new();
        let stats = run_plain(plan, &mut engine).unwrap();

        assert_eq!(stats.count(), 8);
        assert!(engine.operations().is_empty());
    }

    #[test]
    fn test_discard_count_rounds_up() {
        assert_eq!(StepPlan::new(0, 4096, 4096, 0, AccessMode::Sequential).discard_count(), 1);
        assert_eq!(StepPlan::new(0, 4096, 4097, 0, AccessMode::Sequential).discard_count(), 2);
        assert_eq!(StepPlan::new(0, 0, 4097, 0, AccessMode::Sequential).discard_count(), 0);
    }
}
