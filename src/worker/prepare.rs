//! Device preparation
//!
//! Overwrites regions with filler data so the next discard operates on live
//! blocks. Discarding storage the device already considers free would bias the
//! timing, so random runs rewrite exactly the extents the allocator issued.
//!
//! A short write is an error: continuing would leave the extent set out of
//! sync with what the device actually holds.

use crate::distribution::tracker::AddressAllocator;
use crate::distribution::Distribution;
use crate::engine::{ByteRange, DiscardEngine};
use crate::error::BenchError;
use crate::util::buffer::FillerBuffer;
use crate::Result;
use tracing::{debug, info};

/// Overwrite `range` with filler and flush, returning bytes written
pub fn prepare_region(
    engine: &mut dyn DiscardEngine,
    range: ByteRange,
    filler: &FillerBuffer,
) -> Result<u64> {
    info!(range = %range, "preparing region");
    let written = write_range(engine, range, filler)?;
    engine.sync()?;
    Ok(written)
}

/// Overwrite every extent issued by `allocator` and flush
///
/// The extent set is checked first; a set that is not ordered and coalesced
/// means issued addresses were lost and the run cannot continue.
pub fn prepare_extents<D: Distribution>(
    engine: &mut dyn DiscardEngine,
    allocator: &AddressAllocator<D>,
    filler: &FillerBuffer,
) -> Result<u64> {
    allocator
        .extents()
        .check_invariants()
        .map_err(BenchError::Corrupted)?;

    let mut written = 0;
    for (offset, length) in allocator.enumerate_bytes() {
        written += write_range(engine, ByteRange::new(offset, length), filler)?;
    }
    engine.sync()?;

    debug!(
        extents = allocator.extents().len(),
        bytes = written,
        "restored discarded extents"
    );
    Ok(written)
}

fn write_range(engine: &mut dyn DiscardEngine, range: ByteRange, filler: &FillerBuffer) -> Result<u64> {
    if filler.is_empty() {
        return Err(BenchError::config("filler buffer is empty").into());
    }

    let mut offset = range.offset;
    while offset < range.end() {
        let chunk = (range.end() - offset).min(filler.len() as u64) as usize;
        let written = engine.write_at(offset, &filler.as_slice()[..chunk])?;
        if written != chunk {
            return Err(BenchError::Io(format!(
                "short write at offset {}: {} of {} bytes",
                offset, written, chunk
            ))
            .into());
        }
        offset += chunk as u64;
    }
    Ok(range.length)
}
