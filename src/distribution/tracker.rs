//! Random-I/O address allocator
//!
//! Draws record indices without replacement for random-mode discard runs.
//! Discarding a range twice tells us nothing about the device, but a bitmap with
//! one bit per record is too large for big devices, so issued indices live in a
//! sparse [`ExtentSet`].
//!
//! # Allocation protocol
//!
//! 1. Sample a candidate uniformly from `[0, capacity)`. When the random source
//!    cannot cover the whole device the sampling range is clamped and a warning
//!    is logged once.
//! 2. If no extent contains or borders the candidate, insert `(candidate, 1)`
//!    (merging right) and return it.
//! 3. Otherwise the candidate is taken: return the extent's end instead and grow
//!    the extent by one. If the extent already reaches the end of the device,
//!    restart the search at index 0.
//!
//! A collision therefore always costs one lookup and one extension, never a
//! re-sample, so each call terminates. The price is a looser distribution:
//! indices right of busy extents and, after the tail saturates, indices near the
//! start of the device are picked more often than uniform sampling would.

use super::extent::{Extent, ExtentSet};
use super::uniform::UniformDistribution;
use super::Distribution;
use crate::error::BenchError;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure to hand out a fresh record index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Every record index has been issued since the last reset
    #[error("all {capacity} records have already been discarded in this run")]
    Exhausted { capacity: u64 },

    /// The extent set may not grow any further
    #[error("extent set reached its limit of {limit} nodes")]
    ExtentLimit { limit: usize },

    /// An extent returned by a lookup could not be extended
    #[error("extent starting at {start} is missing from the set")]
    Inconsistent { start: u64 },
}

/// Issues unique random record indices for one device
pub struct AddressAllocator<D: Distribution = UniformDistribution> {
    extents: ExtentSet,
    dist: D,
    dev_size: u64,
    record_size: u64,
    /// Records on the device (`dev_size / record_size`)
    capacity: u64,
    warned_unreachable: bool,
}

impl<D: Distribution> AddressAllocator<D> {
    /// Create an allocator for a device of `dev_size` bytes split into records
    pub fn new(dev_size: u64, record_size: u64, dist: D) -> crate::Result<Self> {
        Self::with_node_limit(dev_size, record_size, dist, usize::MAX)
    }

    /// Same as [`AddressAllocator::new`] with a cap on extent nodes
    pub fn with_node_limit(
        dev_size: u64,
        record_size: u64,
        dist: D,
        node_limit: usize,
    ) -> crate::Result<Self> {
        if record_size == 0 {
            return Err(BenchError::config("record size must be greater than 0").into());
        }

        Ok(Self {
            extents: ExtentSet::with_node_limit(node_limit),
            dist,
            dev_size,
            record_size,
            capacity: dev_size / record_size,
            warned_unreachable: false,
        })
    }

    /// Number of records on the device
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn record_size(&self) -> u64 {
        self.record_size
    }

    /// Number of indices issued since the last reset
    pub fn issued(&self) -> u64 {
        self.extents.covered()
    }

    /// True when the random source cannot sample the whole device
    pub fn is_clamped(&self) -> bool {
        self.capacity > self.dist.max_blocks()
    }

    /// Read access to the tracked extents
    pub fn extents(&self) -> &ExtentSet {
        &self.extents
    }

    /// Forget every issued index
    pub fn reset(&mut self) {
        self.extents.clear();
    }

    /// Reset and switch to a new record size (next step of a sweep)
    pub fn reset_with_record_size(&mut self, record_size: u64) -> crate::Result<()> {
        if record_size == 0 {
            return Err(BenchError::config("record size must be greater than 0").into());
        }
        self.record_size = record_size;
        self.capacity = self.dev_size / record_size;
        self.reset();
        Ok(())
    }

    /// Issued extents in ascending order
    pub fn enumerate(&self) -> impl Iterator<Item = Extent> + '_ {
        self.extents.iter()
    }

    /// Issued extents as `(offset, length)` byte ranges
    pub fn enumerate_bytes(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        let record_size = self.record_size;
        self.extents.iter().map(move |e| e.to_bytes(record_size))
    }

    fn sample(&mut self) -> u64 {
        let limit = self.dist.max_blocks();
        let range = if self.capacity > limit {
            if !self.warned_unreachable {
                warn!(
                    capacity = self.capacity,
                    reachable = limit,
                    "random source cannot address the whole device, sampling is clamped"
                );
                self.warned_unreachable = true;
            }
            limit
        } else {
            self.capacity
        };
        self.dist.next_block(range)
    }

    /// Next unused record index
    pub fn next_random_block(&mut self) -> Result<u64, TrackerError> {
        if self.extents.covered() >= self.capacity {
            return Err(TrackerError::Exhausted {
                capacity: self.capacity,
            });
        }

        let mut candidate = self.sample();
        let mut wrapped = false;

        loop {
            let Some(extent) = self.extents.find_touching(candidate) else {
                self.extents.insert_single(candidate)?;
                return Ok(candidate);
            };

            if extent.end() >= self.capacity {
                if wrapped {
                    // Only reachable if the whole range is one extent
                    return Err(TrackerError::Exhausted {
                        capacity: self.capacity,
                    });
                }
                debug!(extent = %extent, "extent reaches device end, wrapping to 0");
                wrapped = true;
                candidate = 0;
                continue;
            }

            let (added, _) = self
                .extents
                .extend_right(extent.start)
                .ok_or(TrackerError::Inconsistent {
                    start: extent.start,
                })?;
            return Ok(added);
        }
    }
}
