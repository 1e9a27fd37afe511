//! Mock discard engine for testing
//!
//! Simulates a device without performing any system calls. Every discard,
//! write and sync is recorded so tests can check exactly which byte ranges the
//! driver and preparer touched.
//!
//! # Features
//!
//! - Records all operations in submission order
//! - Fails the N-th discard on request
//! - Simulates short or failing writes

use super::{ByteRange, DiscardEngine};
use crate::error::BenchError;
use crate::Result;

/// Record of an operation seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    Discard(ByteRange),
    Write { offset: u64, length: usize },
    Sync,
}

/// Mock engine recording operations
#[derive(Debug, Default, Clone)]
pub struct MockEngine {
    ops: Vec<MockOp>,

    /// Fail the discard with this zero-based index
    fail_discard_at: Option<usize>,

    /// Cap every write at this many bytes
    short_write: Option<usize>,

    /// Fail every write
    fail_writes: bool,

    discard_count: usize,
}

impl MockEngine {
    /// Create a mock that succeeds every operation
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `index`-th discard (zero-based) fail
    pub fn fail_discard_at(mut self, index: usize) -> Self {
        self.fail_discard_at = Some(index);
        self
    }

    /// Report at most `bytes` written per write call
    pub fn short_writes(mut self, bytes: usize) -> Self {
        self.short_write = Some(bytes);
        self
    }

    /// Make every write fail
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// All recorded operations
    pub fn operations(&self) -> &[MockOp] {
        &self.ops
    }

    /// Discarded ranges in order
    pub fn discards(&self) -> Vec<ByteRange> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                MockOp::Discard(range) => Some(*range),
                _ => None,
            })
            .collect()
    }

    /// Written `(offset, length)` pairs in order
    pub fn writes(&self) -> Vec<(u64, usize)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                MockOp::Write { offset, length } => Some((*offset, *length)),
                _ => None,
            })
            .collect()
    }

    /// Total bytes reported written
    pub fn bytes_written(&self) -> u64 {
        self.writes().iter().map(|&(_, len)| len as u64).sum()
    }

    pub fn sync_count(&self) -> usize {
        self.ops.iter().filter(|op| **op == MockOp::Sync).count()
    }

    /// Forget recorded operations
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl DiscardEngine for MockEngine {
    fn discard(&mut self, range: ByteRange) -> Result<()> {
        let index = self.discard_count;
        self.discard_count += 1;

        if self.fail_discard_at == Some(index) {
            return Err(BenchError::device(
                format!("ioctl(BLKDISCARD) failed: range={}", range),
                std::io::Error::from_raw_os_error(libc::EIO),
            )
            .into());
        }

        self.ops.push(MockOp::Discard(range));
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        if self.fail_writes {
            return Err(BenchError::Io(format!("mock write failed at offset {}", offset)).into());
        }

        let length = match self.short_write {
            Some(cap) => data.len().min(cap),
            None => data.len(),
        };
        self.ops.push(MockOp::Write { offset, length });
        Ok(length)
    }

    fn sync(&mut self) -> Result<()> {
        self.ops.push(MockOp::Sync);
        Ok(())
    }
}
