//! Block address generation
//!
//! This module provides the sources of record indices for discard operations and
//! the bookkeeping that keeps random-mode indices unique within a run.
//!
//! # Components
//!
//! - **Distribution**: raw random source producing record indices in `[0, n)`
//! - **ExtentSet**: ordered, coalescing set of already-issued index ranges
//! - **AddressAllocator**: draws a random index and turns collisions into a fresh,
//!   adjacent reservation so every returned index is unused
//!
//! # Block-Based Design
//!
//! Everything here works in records (0, 1, 2, ..., N-1), not bytes. The driver
//! converts an index to a byte offset: `offset = index * record_size`.
//!
//! # Example
//!
//! ```
//! use trimpulse::distribution::tracker::AddressAllocator;
//! use trimpulse::distribution::uniform::UniformDistribution;
//!
//! // 1 GiB device, 4 KiB records
//! let mut alloc = AddressAllocator::new(1 << 30, 4096, UniformDistribution::with_seed(7)).unwrap();
//! let index = alloc.next_random_block().unwrap();
//! assert!(index < (1 << 30) / 4096);
//! assert_eq!(alloc.issued(), 1);
//! ```

/// Random source for record indices
///
/// # Thread Safety
///
/// Distributions must be `Send` so the run context that owns one can move
/// between threads. The benchmark itself only drives it from one thread.
pub trait Distribution: Send {
    /// Generate next record index
    ///
    /// Returns an index in `[0, num_blocks)`. `num_blocks` never exceeds
    /// [`Distribution::max_blocks`]; callers clamp before asking.
    fn next_block(&mut self, num_blocks: u64) -> u64;

    /// Largest range this source can sample uniformly
    ///
    /// Devices with more records than this cannot be fully reached by sampling.
    fn max_blocks(&self) -> u64 {
        u64::MAX
    }
}

impl<D: Distribution + ?Sized> Distribution for Box<D> {
    fn next_block(&mut self, num_blocks: u64) -> u64 {
        (**self).next_block(num_blocks)
    }

    fn max_blocks(&self) -> u64 {
        (**self).max_blocks()
    }
}

pub mod extent;
pub mod scripted;
pub mod tracker;
pub mod uniform;
