//! Run orchestration
//!
//! The runner owns everything that lives for a whole sweep: the engine, the
//! clock, the address allocator and the reporter. For each record size it
//! prepares the device, runs one [`Worker`] step and reports the statistics.
//!
//! # Sweep
//!
//! 1. Discard the whole device once.
//! 2. For every record size:
//!    - round the configured total to the nearest multiple of the record size
//!      and clamp it to the device,
//!    - prepare (sequential: `[start, start + total)` every step; random: the
//!      whole device before the first step only),
//!    - reset the allocator (random),
//!    - run and report the step,
//!    - random: rewrite exactly the extents the step discarded.
//!
//! An interruption request is honored between steps; a step in progress
//! always runs to completion.

use crate::config::validator::{validate_against_device, validate_config};
use crate::config::{Config, RuntimeConfig, WorkloadConfig};
use crate::distribution::tracker::AddressAllocator;
use crate::distribution::uniform::UniformDistribution;
use crate::distribution::Distribution;
use crate::engine::ioctl::IoctlEngine;
use crate::engine::{ByteRange, DiscardEngine};
use crate::error::BenchError;
use crate::output::json::{write_json_report, JsonReport};
use crate::output::Reporter;
use crate::stats::StepResult;
use crate::target::block::BlockTarget;
use crate::target::{DeviceGeometry, Target};
use crate::util::buffer::{FillerBuffer, FILLER_SIZE};
use crate::util::time::{Clock, MonotonicClock};
use crate::worker::prepare::{prepare_extents, prepare_region};
use crate::worker::{StepPlan, Worker};
use crate::Result;
use anyhow::Context;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives a sweep of test steps over one device
pub struct Runner<'a> {
    workload: &'a WorkloadConfig,
    runtime: &'a RuntimeConfig,
    geometry: DeviceGeometry,
    stop: Arc<AtomicBool>,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a Config, geometry: DeviceGeometry) -> Self {
        Self {
            workload: &config.workload,
            runtime: &config.runtime,
            geometry,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between steps; setting it ends the sweep early
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Bytes discarded in a step with the given record size
    ///
    /// The configured total is rounded to the nearest multiple of the record
    /// size (half rounds up), then clamped so the step stays on the device. In
    /// random mode only whole records can be issued, so the clamp is the
    /// allocator capacity in bytes.
    pub fn step_total(&self, record_size: u64) -> u64 {
        let total = self.workload.total_size;
        let records = total.saturating_add(record_size / 2) / record_size;
        let rounded = records.saturating_mul(record_size);

        let available = if self.workload.mode.is_random() {
            (self.geometry.size / record_size) * record_size
        } else {
            self.geometry.size.saturating_sub(self.workload.start)
        };
        if rounded > available {
            debug!(rounded, available, "step total clamped to device");
            available
        } else {
            rounded
        }
    }

    fn preparing(&self) -> bool {
        !self.workload.discard_discarded && !self.runtime.no_prepare
    }

    /// Run every step of the sweep and return their statistics
    ///
    /// `dist` is the random source for random mode; it is unused otherwise.
    pub fn run<W: Write, D: Distribution>(
        &self,
        engine: &mut dyn DiscardEngine,
        clock: &mut dyn Clock,
        dist: D,
        reporter: &mut Reporter<W>,
    ) -> Result<Vec<StepResult>> {
        let dev_size = self.geometry.size;
        let start = self.workload.start;
        let mode = self.workload.mode;
        let record_sizes = self.workload.record_sizes();

        if record_sizes.is_empty() || record_sizes.contains(&0) {
            return Err(BenchError::config("record size must be greater than 0").into());
        }

        reporter.status("Discarding device")?;
        if !self.runtime.no_discard {
            engine
                .discard(ByteRange::new(0, dev_size))
                .context("initial discard of the whole device failed")?;
        }

        let filler = FillerBuffer::new(FILLER_SIZE, self.workload.fill_pattern, self.workload.seed);

        let mut allocator = if mode.is_random() {
            Some(AddressAllocator::with_node_limit(
                dev_size,
                record_sizes[0],
                dist,
                self.workload.max_extents.unwrap_or(usize::MAX),
            )?)
        } else {
            None
        };

        let mut results = Vec::with_capacity(record_sizes.len());

        for (i, &record_size) in record_sizes.iter().enumerate() {
            if self.stop.load(Ordering::Relaxed) {
                warn!(completed = results.len(), "interrupted, stopping sweep");
                break;
            }

            let total_size = self.step_total(record_size);

            if self.preparing() {
                if !mode.is_random() {
                    reporter.status("Preparing device")?;
                    prepare_region(engine, ByteRange::new(start, total_size), &filler)?;
                } else if i == 0 {
                    reporter.status("Preparing device")?;
                    prepare_region(engine, ByteRange::new(0, dev_size), &filler)?;
                }
            }

            if let Some(allocator) = allocator.as_mut() {
                allocator.reset_with_record_size(record_size)?;
            }

            reporter.step_header(start, record_size, total_size)?;

            let mut plan = StepPlan::new(start, record_size, total_size, dev_size, mode);
            if self.runtime.no_discard {
                plan = plan.without_discard();
            }

            let mut worker = Worker::new(plan, engine, clock);
            if let Some(allocator) = allocator.as_mut() {
                worker = worker.with_allocator(allocator);
            }
            let stats = worker
                .run()
                .with_context(|| format!("test step with record size {} failed", record_size))?;

            let result = StepResult::new(record_size, total_size, start, &stats);
            info!(
                record_size,
                total_size,
                count = result.count,
                sum = result.sum,
                throughput_mb_s = result.throughput_mb_s,
                "step finished"
            );
            reporter.step_result(&result)?;
            results.push(result);

            if self.preparing() {
                if let Some(allocator) = allocator.as_ref() {
                    reporter.status("Preparing device")?;
                    prepare_extents(engine, allocator, &filler)?;
                }
            }
        }

        Ok(results)
    }
}

/// Run a sweep against the configured block device
///
/// Opens and validates the device, runs every step with the `BLKDISCARD`
/// engine, writes the JSON report if one was requested and closes the device.
pub fn run(config: &Config, stop: Arc<AtomicBool>) -> Result<Vec<StepResult>> {
    validate_config(config).context("Configuration validation failed")?;

    let device = config
        .device
        .clone()
        .ok_or_else(|| BenchError::config("You must specify device"))?;

    let mut target = BlockTarget::new(device.clone());
    target.open()?;
    let geometry = target.geometry()?;
    info!(
        device = %device.display(),
        size = geometry.size,
        sector_size = geometry.sector_size,
        "device opened"
    );

    validate_against_device(&config.workload, &geometry)
        .context("Configuration does not fit the device")?;

    let mut engine = IoctlEngine::new(target.fd()?);
    let mut clock = MonotonicClock::new();
    let dist = UniformDistribution::from_seed_option(config.workload.seed);
    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), config.output.batch);

    let results = Runner::new(config, geometry)
        .with_stop_flag(stop)
        .run(&mut engine, &mut clock, dist, &mut reporter)?;

    if let Some(ref path) = config.output.json_output {
        let report = JsonReport::new(&device, config.workload.mode.is_random(), results.clone());
        write_json_report(path, &report)?;
        info!(path = %path.display(), "JSON report written");
    }

    target.close()?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workload::{AccessMode, RecordRange};
    use crate::distribution::scripted::ScriptedDistribution;
    use crate::distribution::tracker::TrackerError;
    use crate::engine::mock::{MockEngine, MockOp};
    use crate::error::classify;
    use std::path::PathBuf;

    const DEV_SIZE: u64 = 1 << 20;

    fn config(record_size: u64, total_size: u64) -> Config {
        let mut config = Config {
            device: Some(PathBuf::from("/dev/mock")),
            ..Config::default()
        };
        config.workload.record_size = record_size;
        config.workload.total_size = total_size;
        config
    }

    fn run_mock(
        config: &Config,
        engine: &mut MockEngine,
        dist: ScriptedDistribution,
    ) -> Result<Vec<StepResult>> {
        let mut clock = MonotonicClock::new();
        let mut reporter = Reporter::new(Vec::new(), true);
        Runner::new(config, DeviceGeometry::new(DEV_SIZE, 512)).run(
            engine,
            &mut clock,
            dist,
            &mut reporter,
        )
    }

    fn no_dist() -> ScriptedDistribution {
        ScriptedDistribution::new([0])
    }

    #[test]
    fn test_sequential_step_order_of_operations() {
        let config = config(4096, 12288);
        let mut engine = MockEngine::new();
        let results = run_mock(&config, &mut engine, no_dist()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].count, 3);
        assert_eq!(
            engine.operations(),
            &[
                MockOp::Discard(ByteRange::new(0, DEV_SIZE)),
                MockOp::Write { offset: 0, length: 4096 },
                MockOp::Write { offset: 4096, length: 4096 },
                MockOp::Write { offset: 8192, length: 4096 },
                MockOp::Sync,
                MockOp::Discard(ByteRange::new(0, 4096)),
                MockOp::Discard(ByteRange::new(4096, 4096)),
                MockOp::Discard(ByteRange::new(8192, 4096)),
            ]
        );
    }

    #[test]
    fn test_step_total_rounding_and_clamping() {
        let mut config = config(4096, 10000);
        let runner = Runner::new(&config, DeviceGeometry::new(DEV_SIZE, 512));
        assert_eq!(runner.step_total(4096), 8192);
        assert_eq!(runner.step_total(8192), 8192);
        assert_eq!(runner.step_total(16384), 16384);

        config.workload.total_size = 6144;
        let runner = Runner::new(&config, DeviceGeometry::new(DEV_SIZE, 512));
        assert_eq!(runner.step_total(4096), 8192);

        config.workload.start = 4096;
        config.workload.total_size = 12288;
        let runner = Runner::new(&config, DeviceGeometry::new(16384, 512));
        assert_eq!(runner.step_total(8192), 12288);
    }

    #[test]
    fn test_random_step_total_is_whole_records() {
        let mut config = config(24576, DEV_SIZE);
        config.workload.mode = AccessMode::Random;
        let runner = Runner::new(&config, DeviceGeometry::new(DEV_SIZE, 512));
        assert_eq!(runner.step_total(24576), 42 * 24576);
        assert_eq!(runner.step_total(4096), DEV_SIZE);
    }

    #[test]
    fn test_random_whole_device_with_unaligned_record_size() {
        let mut config = config(24576, DEV_SIZE);
        config.workload.mode = AccessMode::Random;
        config.workload.discard_discarded = true;

        let mut engine = MockEngine::new();
        let results = run_mock(&config, &mut engine, ScriptedDistribution::new([0])).unwrap();

        assert_eq!(results[0].count, 42);
        assert_eq!(results[0].total_size, 42 * 24576);
        let discards = engine.discards();
        assert_eq!(discards.len(), 1 + 42);
        assert!(discards.iter().all(|r| r.offset + r.length <= DEV_SIZE));
    }

    #[test]
    fn test_sweep_reports_every_record_size() {
        let mut config = config(4096, 65536);
        config.workload.record_range = Some(RecordRange { start: 4096, end: 16384, step: 4096 });
        config.workload.discard_discarded = true;

        let mut engine = MockEngine::new();
        let results = run_mock(&config, &mut engine, no_dist()).unwrap();

        let sizes: Vec<u64> = results.iter().map(|r| r.record_size).collect();
        assert_eq!(sizes, vec![4096, 8192, 12288, 16384]);
        assert_eq!(results[0].count, 16);
        assert_eq!(results[2].total_size, 61440);
        assert_eq!(results[2].count, 5);
        assert!(engine.writes().is_empty());
    }

    #[test]
    fn test_random_prepares_device_once_then_extents() {
        let mut config = config(4096, 8192);
        config.workload.mode = AccessMode::Random;
        config.workload.record_range = Some(RecordRange { start: 4096, end: 8192, step: 4096 });

        let mut engine = MockEngine::new();
        let results =
            run_mock(&config, &mut engine, ScriptedDistribution::new([10, 30, 10])).unwrap();
        assert_eq!(results.len(), 2);

        let writes = engine.writes();
        let whole_device = (DEV_SIZE / FILLER_SIZE as u64) as usize;
        assert_eq!(writes.len(), whole_device + 2 + 2);

        // First step: indices 10 and 30 at 4k records
        assert_eq!(&writes[whole_device..whole_device + 2], &[(10 * 4096, 4096), (30 * 4096, 4096)]);
        // Second step: one 8k record at index 10, rewritten in two filler chunks
        assert_eq!(
            &writes[whole_device + 2..],
            &[(10 * 8192, 4096), (10 * 8192 + 4096, 4096)]
        );
        assert_eq!(engine.sync_count(), 3);
    }

    #[test]
    fn test_random_step_discards_issued_records() {
        let mut config = config(4096, 3 * 4096);
        config.workload.mode = AccessMode::Random;
        config.workload.discard_discarded = true;

        let mut engine = MockEngine::new();
        run_mock(&config, &mut engine, ScriptedDistribution::new([5, 6, 4])).unwrap();

        assert_eq!(
            engine.discards(),
            vec![
                ByteRange::new(0, DEV_SIZE),
                ByteRange::new(5 * 4096, 4096),
                ByteRange::new(6 * 4096, 4096),
                ByteRange::new(4 * 4096, 4096),
            ]
        );
    }

    #[test]
    fn test_no_discard_never_discards() {
        let mut config = config(4096, 16384);
        config.runtime.no_discard = true;
        config.runtime.no_prepare = true;

        let mut engine = MockEngine::new();
        let results = run_mock(&config, &mut engine, no_dist()).unwrap();

        assert_eq!(results[0].count, 4);
        assert!(engine.operations().is_empty());
    }

    #[test]
    fn test_stop_flag_ends_sweep_before_next_step() {
        let mut config = config(4096, 8192);
        config.workload.record_range = Some(RecordRange { start: 4096, end: 8192, step: 4096 });
        let stop = Arc::new(AtomicBool::new(true));

        let mut engine = MockEngine::new();
        let mut clock = MonotonicClock::new();
        let mut reporter = Reporter::new(Vec::new(), true);
        let results = Runner::new(&config, DeviceGeometry::new(DEV_SIZE, 512))
            .with_stop_flag(stop)
            .run(&mut engine, &mut clock, no_dist(), &mut reporter)
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(engine.discards(), vec![ByteRange::new(0, DEV_SIZE)]);
    }

    #[test]
    fn test_step_discard_failure_aborts_run() {
        let config = config(4096, 16384);
        let mut engine = MockEngine::new().fail_discard_at(2);
        let err = run_mock(&config, &mut engine, no_dist()).unwrap_err();

        assert!(matches!(classify(&err), Some(BenchError::Device { .. })));
        assert!(format!("{:#}", err).contains("record size 4096"));
    }

    #[test]
    fn test_initial_discard_failure() {
        let config = config(4096, 16384);
        let mut engine = MockEngine::new().fail_discard_at(0);
        let err = run_mock(&config, &mut engine, no_dist()).unwrap_err();

        assert!(matches!(classify(&err), Some(BenchError::Device { .. })));
        assert!(engine.writes().is_empty());
    }

    #[test]
    fn test_extent_limit_is_fatal() {
        let mut config = config(4096, 3 * 4096);
        config.workload.mode = AccessMode::Random;
        config.workload.max_extents = Some(1);
        config.workload.discard_discarded = true;

        let mut engine = MockEngine::new();
        let err = run_mock(&config, &mut engine, ScriptedDistribution::new([0, 10])).unwrap_err();

        assert!(matches!(
            classify(&err),
            Some(BenchError::Allocation(TrackerError::ExtentLimit { limit: 1 }))
        ));
    }

    #[test]
    fn test_short_preparation_write_aborts_before_step() {
        let config = config(4096, 8192);
        let mut engine = MockEngine::new().short_writes(512);
        let err = run_mock(&config, &mut engine, no_dist()).unwrap_err();

        assert!(matches!(classify(&err), Some(BenchError::Io(_))));
        assert_eq!(engine.discards().len(), 1);
    }

    #[test]
    fn test_run_without_device_is_configuration_error() {
        let config = Config::default();
        let err = run(&config, Arc::new(AtomicBool::new(false))).unwrap_err();
        assert!(matches!(classify(&err), Some(BenchError::Configuration(_))));
    }

    #[test]
    fn test_run_rejects_regular_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config {
            device: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let err = run(&config, Arc::new(AtomicBool::new(false))).unwrap_err();
        assert!(format!("{:#}", err).contains("is not a valid device"));
    }
}
