//! Discard engine abstraction
//!
//! An engine is the thin layer that talks to the device: it issues the discard
//! primitive, writes filler data during preparation and flushes it. Everything
//! above it (driver, preparer, runner) is written against the [`DiscardEngine`]
//! trait so it can run against a real block device or the in-memory mock.
//!
//! # Engine Types
//!
//! - **ioctl**: `BLKDISCARD` ioctl + `pwrite`/`fsync` on a block device fd
//! - **mock**: records every operation, with injectable failures
//!
//! # Example
//!
//! ```
//! use trimpulse::engine::{ByteRange, DiscardEngine};
//! use trimpulse::engine::mock::MockEngine;
//!
//! let mut engine = MockEngine::new();
//! engine.discard(ByteRange::new(0, 4096)).unwrap();
//! assert_eq!(engine.discards(), vec![ByteRange::new(0, 4096)]);
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device operations used by the benchmark
///
/// All calls are blocking: a call returns only when the device has completed
/// the operation. Engines are `Send` but never shared; one run owns one engine.
///
/// # Preconditions
///
/// Offsets and lengths passed to [`DiscardEngine::discard`] are aligned to the
/// device sector size and lie within the device. The configuration validator
/// enforces this before any engine call is made.
pub trait DiscardEngine: Send {
    /// Discard `range` on the device
    ///
    /// # Errors
    ///
    /// Returns a device error if the kernel rejects the discard.
    fn discard(&mut self, range: ByteRange) -> Result<()>;

    /// Write `data` at byte `offset`, returning how many bytes were written
    ///
    /// A short count is not an error at this level; the preparer decides.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize>;

    /// Flush written data to stable storage
    fn sync(&mut self) -> Result<()>;
}

impl<E: DiscardEngine + ?Sized> DiscardEngine for Box<E> {
    fn discard(&mut self, range: ByteRange) -> Result<()> {
        (**self).discard(range)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        (**self).write_at(offset, data)
    }

    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }
}

/// Byte range `[offset, offset + length)` on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// First byte past the range
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Shorten the range so it does not extend past `limit`
    pub fn clip_to(self, limit: u64) -> Self {
        if self.end() > limit {
            Self::new(self.offset, limit.saturating_sub(self.offset))
        } else {
            self
        }
    }

    /// Kernel argument layout for `BLKDISCARD`: `[start, len]`
    pub fn as_ioctl_arg(&self) -> [u64; 2] {
        [self.offset, self.length]
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.offset, self.length)
    }
}

pub mod ioctl;
pub mod mock;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range_clip() {
        assert_eq!(ByteRange::new(0, 4096).clip_to(8192), ByteRange::new(0, 4096));
        assert_eq!(ByteRange::new(4096, 8192).clip_to(8192), ByteRange::new(4096, 4096));
        assert_eq!(ByteRange::new(8192, 4096).clip_to(8192), ByteRange::new(8192, 0));
    }

    #[test]
    fn test_byte_range_ioctl_arg() {
        let range = ByteRange::new(512, 1024);
        assert_eq!(range.as_ioctl_arg(), [512, 1024]);
        assert_eq!(range.end(), 1536);
        assert_eq!(range.to_string(), "512+1024");
    }
}
