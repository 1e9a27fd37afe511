//! Timing utilities
//!
//! Discard latency is measured as elapsed seconds in an `f64`, read from
//! `clock_gettime(CLOCK_MONOTONIC)` immediately before and after each discard.
//! The clock sits behind the [`Clock`] trait so the driver can be fed scripted
//! timestamps in tests.

use crate::error::BenchError;
use crate::Result;
use std::time::Duration;

/// Source of timestamps in seconds
pub trait Clock {
    /// Current time in seconds; fails if the clock cannot be read
    fn now(&mut self) -> Result<f64>;
}

/// Clock reading `CLOCK_MONOTONIC` (nanosecond resolution)
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now(&mut self) -> Result<f64> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // SAFETY: ts is a valid, writable timespec
        let result = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if result != 0 {
            return Err(BenchError::last_os("clock_gettime(CLOCK_MONOTONIC) failed").into());
        }

        Ok(ts.tv_sec as f64 + ts.tv_nsec as f64 * 1e-9)
    }
}

/// Clock that replays fixed timestamps, then fails
#[cfg(test)]
pub struct ScriptedClock {
    ticks: std::collections::VecDeque<f64>,
}

#[cfg(test)]
impl ScriptedClock {
    pub fn new(ticks: impl IntoIterator<Item = f64>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }

    /// Start/stop pairs giving each step the requested duration
    pub fn from_durations(durations: &[f64]) -> Self {
        let mut t = 100.0;
        let mut ticks = Vec::with_capacity(durations.len() * 2);
        for d in durations {
            ticks.push(t);
            ticks.push(t + d);
            t += d + 1.0;
        }
        Self::new(ticks)
    }
}

#[cfg(test)]
impl Clock for ScriptedClock {
    fn now(&mut self) -> Result<f64> {
        self.ticks.pop_front().ok_or_else(|| {
            BenchError::device(
                "clock_gettime failed",
                std::io::Error::from_raw_os_error(libc::EINVAL),
            )
            .into()
        })
    }
}

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use trimpulse::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

/// Throughput in MiB per second for `bytes` moved in `seconds`
///
/// Returns 0 when no time was spent.
pub fn throughput_mb_s(bytes: u64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        (bytes as f64 / (1024.0 * 1024.0)) / seconds
    } else {
        0.0
    }
}
