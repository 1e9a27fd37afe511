//! Error kinds
//!
//! Most functions return `crate::Result` (an `anyhow::Result`) and add context as
//! the error travels up. The root cause of every failure that aborts a run is one
//! of the [`BenchError`] kinds below, so callers can classify an error with
//! `err.downcast_ref::<BenchError>()`.
//!
//! None of these are retried. A benchmark that keeps going after one of them
//! would report statistics over a run that did not happen as configured.

use crate::distribution::tracker::TrackerError;
use thiserror::Error;

/// Classified failure of a benchmark run
#[derive(Error, Debug)]
pub enum BenchError {
    /// Invalid numeric argument or insane size/range boundaries
    #[error("configuration error: {0}")]
    Configuration(String),

    /// open/stat/ioctl/size-query failure on the device
    #[error("device error: {context}")]
    Device {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The extent set could not grow, so issued addresses are no longer tracked
    #[error("allocation failure")]
    Allocation(#[source] TrackerError),

    /// Failed or short write while preparing the device
    #[error("I/O error: {0}")]
    Io(String),

    /// The extent set violates its ordering/coalescing invariant
    #[error("extent set corrupted: {0}")]
    Corrupted(String),
}

impl BenchError {
    /// Build a configuration error from anything printable
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wrap an OS error with a description of what was being attempted
    pub fn device(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Device {
            context: context.into(),
            source,
        }
    }

    /// Device error from `errno` of the last failed syscall
    pub fn last_os(context: impl Into<String>) -> Self {
        Self::device(context, std::io::Error::last_os_error())
    }
}

impl From<TrackerError> for BenchError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Inconsistent { .. } => Self::Corrupted(err.to_string()),
            other => Self::Allocation(other),
        }
    }
}

/// Find the [`BenchError`] at the root of an error chain, if any
pub fn classify(err: &anyhow::Error) -> Option<&BenchError> {
    err.chain().find_map(|cause| cause.downcast_ref::<BenchError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_classify_through_context() {
        let result: crate::Result<()> = Err(BenchError::config("record size is zero"))
            .context("validating run");
        let err = result.unwrap_err();

        assert!(matches!(classify(&err), Some(BenchError::Configuration(_))));
        assert!(format!("{:#}", err).contains("record size is zero"));
    }

    #[test]
    fn test_device_error_keeps_source() {
        let err = BenchError::device(
            "ioctl(BLKDISCARD) failed",
            std::io::Error::from_raw_os_error(libc::ENOTTY),
        );
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().to_lowercase().contains("ioctl"));
    }

    #[test]
    fn test_allocation_from_tracker_error() {
        let err: BenchError = TrackerError::Exhausted { capacity: 4 }.into();
        assert!(matches!(err, BenchError::Allocation(TrackerError::Exhausted { capacity: 4 })));
    }

    #[test]
    fn test_allocation_message_printed_once() {
        let err = anyhow::Error::from(BenchError::from(TrackerError::Exhausted { capacity: 42 }))
            .context("test step with record size 24576 failed");
        let rendered = format!("{:#}", err);

        assert_eq!(rendered.matches("all 42 records").count(), 1, "{}", rendered);
        assert!(rendered.contains("allocation failure: all 42 records"));
    }

    #[test]
    fn test_inconsistent_extent_is_corruption() {
        let err = BenchError::from(TrackerError::Inconsistent { start: 7 });
        match err {
            BenchError::Corrupted(msg) => assert!(msg.contains("starting at 7")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
