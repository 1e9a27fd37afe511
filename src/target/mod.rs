//! Target abstraction
//!
//! A target is the device under test. It is opened once per process run and
//! its geometry (size and logical sector size) is read-mostly state for the
//! rest of the run; only discard and preparation writes touch the device.
//!
//! # Example
//!
//! ```no_run
//! use trimpulse::target::{Target, block::BlockTarget};
//! use std::path::PathBuf;
//!
//! // Note: Requires root permissions
//! let mut target = BlockTarget::new(PathBuf::from("/dev/sdb"));
//! target.open().unwrap();
//! let geometry = target.geometry().unwrap();
//! println!("{} bytes, {} byte sectors", geometry.size, geometry.sector_size);
//! target.close().unwrap();
//! ```

use crate::Result;
use serde::Serialize;
use std::os::unix::io::RawFd;
use std::path::Path;

/// Target trait for devices under test
///
/// # Lifecycle
///
/// 1. Create target instance (via `new()` on concrete type)
/// 2. Call `open()`
/// 3. Read `geometry()` and hand `fd()` to an engine
/// 4. Call `close()` when done
pub trait Target: Send {
    /// Open the target for reading and writing and query its geometry
    ///
    /// # Errors
    ///
    /// Returns a device error if the path is not a block device, cannot be
    /// opened, or its size/sector size cannot be determined.
    fn open(&mut self) -> Result<()>;

    /// File descriptor for engines; fails if the target is not open
    fn fd(&self) -> Result<RawFd>;

    /// Size and sector size; fails if the target is not open
    fn geometry(&self) -> Result<DeviceGeometry>;

    /// Path the target was created with
    fn path(&self) -> &Path;

    /// Close the target
    ///
    /// Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Device size information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceGeometry {
    /// Device size in bytes
    pub size: u64,

    /// Logical sector size in bytes; discard ranges must be aligned to it
    pub sector_size: u64,
}

impl DeviceGeometry {
    pub fn new(size: u64, sector_size: u64) -> Self {
        Self { size, sector_size }
    }

    /// True if `value` is a multiple of the sector size
    pub fn is_aligned(&self, value: u64) -> bool {
        self.sector_size != 0 && value % self.sector_size == 0
    }
}

pub mod block;
