//! Block device target implementation
//!
//! Opens a raw block device (e.g., /dev/sdb1, /dev/nvme0n1p2) read-write and
//! reads its geometry through ioctls.
//!
//! # Features
//!
//! - Refuses anything that is not a block device (`S_ISBLK`)
//! - Detects device size via ioctl (BLKGETSIZE64)
//! - Detects logical sector size via ioctl (BLKSSZGET)
//!
//! # Requirements
//!
//! - Root or appropriate permissions to access block devices
//! - A device that supports discard; otherwise every BLKDISCARD fails

use super::{DeviceGeometry, Target};
use crate::error::BenchError;
use crate::Result;
use std::fs::OpenOptions;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::{IntoRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::debug;

// ioctl request code for getting block device size in bytes
const BLKGETSIZE64: libc::c_ulong = 0x80081272;

// _IO(0x12, 104): logical sector size
const BLKSSZGET: libc::c_ulong = 0x1268;

/// Block device target
pub struct BlockTarget {
    /// Path to the block device
    path: PathBuf,

    /// File descriptor (Some when open)
    fd: Option<RawFd>,

    /// Geometry read at open time
    geometry: Option<DeviceGeometry>,
}

impl BlockTarget {
    /// Create a new, closed block device target
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            fd: None,
            geometry: None,
        }
    }

    /// Check that the path names a block device
    fn check_is_block_device(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.path).map_err(|e| {
            BenchError::device(format!("stat failed: path={}", self.path.display()), e)
        })?;

        if !metadata.file_type().is_block_device() {
            return Err(BenchError::config(format!(
                "{} is not a valid device",
                self.path.display()
            ))
            .into());
        }
        Ok(())
    }

    fn detect_size(fd: RawFd, path: &Path) -> Result<u64> {
        let mut size: u64 = 0;
        // SAFETY: BLKGETSIZE64 writes one u64 through the pointer
        let result = unsafe { libc::ioctl(fd, BLKGETSIZE64 as _, &mut size as *mut u64) };

        if result < 0 {
            return Err(BenchError::last_os(format!(
                "ioctl(BLKGETSIZE64) failed: path={}",
                path.display()
            ))
            .into());
        }
        if size == 0 {
            return Err(BenchError::device(
                format!("device reports zero size: path={}", path.display()),
                std::io::Error::from_raw_os_error(libc::EINVAL),
            )
            .into());
        }
        Ok(size)
    }

    fn detect_sector_size(fd: RawFd, path: &Path) -> Result<u64> {
        let mut sector_size: libc::c_int = 0;
        // SAFETY: BLKSSZGET writes one int through the pointer
        let result =
            unsafe { libc::ioctl(fd, BLKSSZGET as _, &mut sector_size as *mut libc::c_int) };

        if result < 0 {
            return Err(BenchError::last_os(format!(
                "ioctl(BLKSSZGET) failed: path={}",
                path.display()
            ))
            .into());
        }
        if sector_size <= 0 {
            return Err(BenchError::device(
                format!("device reports sector size {}: path={}", sector_size, path.display()),
                std::io::Error::from_raw_os_error(libc::EINVAL),
            )
            .into());
        }
        Ok(sector_size as u64)
    }
}

impl Target for BlockTarget {
    fn open(&mut self) -> Result<()> {
        self.check_is_block_device()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| {
                BenchError::device(
                    format!("Opening block device failed: {}", self.path.display()),
                    e,
                )
            })?;
        let fd = file.into_raw_fd();
        self.fd = Some(fd);

        let geometry = Self::detect_size(fd, &self.path).and_then(|size| {
            Self::detect_sector_size(fd, &self.path).map(|ss| DeviceGeometry::new(size, ss))
        });

        match geometry {
            Ok(geometry) => {
                debug!(
                    path = %self.path.display(),
                    size = geometry.size,
                    sector_size = geometry.sector_size,
                    "opened block device"
                );
                self.geometry = Some(geometry);
                Ok(())
            }
            Err(e) => {
                let _ = self.close();
                Err(e)
            }
        }
    }

    fn fd(&self) -> Result<RawFd> {
        self.fd
            .ok_or_else(|| anyhow::anyhow!("Device not open: {}", self.path.display()))
    }

    fn geometry(&self) -> Result<DeviceGeometry> {
        self.geometry
            .ok_or_else(|| anyhow::anyhow!("Device not open: {}", self.path.display()))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<()> {
        if let Some(fd) = self.fd.take() {
            self.geometry = None;
            // SAFETY: fd came from into_raw_fd and is closed exactly once
            let result = unsafe { libc::close(fd) };
            if result < 0 {
                return Err(BenchError::last_os(format!(
                    "Closing block device failed: {}",
                    self.path.display()
                ))
                .into());
            }
        }
        Ok(())
    }
}

impl Drop for BlockTarget {
    fn drop(&mut self) {
        // Ensure device is closed
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    // Tests against real block devices need root and a scratch device, so only
    // the rejection paths are covered here.

    #[test]
    fn test_block_target_creation() {
        let target = BlockTarget::new(PathBuf::from("/dev/null"));
        assert!(target.fd().is_err());
        assert!(target.geometry().is_err());
        assert_eq!(target.path(), Path::new("/dev/null"));
    }

    #[test]
    fn test_block_target_rejects_character_device() {
        let mut target = BlockTarget::new(PathBuf::from("/dev/null"));
        let err = target.open().unwrap_err();
        assert!(matches!(classify(&err), Some(BenchError::Configuration(_))));
    }

    #[test]
    fn test_block_target_rejects_regular_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut target = BlockTarget::new(file.path().to_path_buf());
        assert!(target.open().is_err());
    }

    #[test]
    fn test_block_target_missing_path_is_device_error() {
        let mut target = BlockTarget::new(PathBuf::from("/nonexistent/trimpulse-dev"));
        let err = target.open().unwrap_err();
        assert!(matches!(classify(&err), Some(BenchError::Device { .. })));
    }

    #[test]
    fn test_close_when_not_open() {
        let mut target = BlockTarget::new(PathBuf::from("/dev/null"));
        assert!(target.close().is_ok());
    }
}
