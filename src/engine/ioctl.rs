//! Block device engine
//!
//! Issues `ioctl(BLKDISCARD)` for discards and positioned `pwrite` for filler
//! writes on an already-open file descriptor. The engine does not own the fd;
//! the [`BlockTarget`](crate::target::block::BlockTarget) that opened it does.
//!
//! # Example
//!
//! ```no_run
//! use trimpulse::engine::{ByteRange, DiscardEngine};
//! use trimpulse::engine::ioctl::IoctlEngine;
//! use trimpulse::target::{block::BlockTarget, Target};
//! use std::path::PathBuf;
//!
//! // Note: Requires root permissions
//! let mut target = BlockTarget::new(PathBuf::from("/dev/sdb"));
//! target.open().unwrap();
//! let mut engine = IoctlEngine::new(target.fd().unwrap());
//! engine.discard(ByteRange::new(0, 1 << 20)).unwrap();
//! ```

use super::{ByteRange, DiscardEngine};
use crate::error::BenchError;
use crate::Result;
use std::os::unix::io::RawFd;
use tracing::trace;

// _IO(0x12, 119)
pub(crate) const BLKDISCARD: libc::c_ulong = 0x1277;

/// Engine driving a block device through ioctl and pwrite
#[derive(Debug)]
pub struct IoctlEngine {
    fd: RawFd,
}

impl IoctlEngine {
    /// Create an engine for an open, writable fd
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl DiscardEngine for IoctlEngine {
    fn discard(&mut self, range: ByteRange) -> Result<()> {
        let arg = range.as_ioctl_arg();
        trace!(range = %range, "BLKDISCARD");

        // SAFETY: arg is a [u64; 2] as BLKDISCARD expects and outlives the call
        let result = unsafe { libc::ioctl(self.fd, BLKDISCARD as _, arg.as_ptr()) };
        if result == -1 {
            return Err(BenchError::last_os(format!(
                "ioctl(BLKDISCARD) failed: fd={}, range={}",
                self.fd, range
            ))
            .into());
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        // SAFETY: data is a valid slice for the duration of the call
        let result = unsafe {
            libc::pwrite(
                self.fd,
                data.as_ptr() as *const libc::c_void,
                data.len(),
                offset as libc::off_t,
            )
        };

        if result < 0 {
            let err = std::io::Error::last_os_error();
            return Err(BenchError::Io(format!(
                "pwrite failed: fd={}, offset={}, length={}: {}",
                self.fd,
                offset,
                data.len(),
                err
            ))
            .into());
        }
        Ok(result as usize)
    }

    fn sync(&mut self) -> Result<()> {
        // SAFETY: plain syscall on an fd
        let result = unsafe { libc::fsync(self.fd) };
        if result == -1 {
            let err = std::io::Error::last_os_error();
            return Err(BenchError::Io(format!("fsync failed: fd={}: {}", self.fd, err)).into());
        }
        Ok(())
    }
}
