//! Configuration validation
//!
//! Two passes: [`validate_config`] checks what can be checked without the
//! device, [`validate_against_device`] checks alignment and boundaries once the
//! device geometry is known. Both run before any discard or write is issued.

use super::*;
use crate::error::BenchError;
use crate::target::DeviceGeometry;
use crate::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.device.is_none() {
        return Err(BenchError::config("You must specify device").into());
    }
    validate_workload(&config.workload)?;
    validate_runtime(&config.runtime)?;
    Ok(())
}

/// Validate workload configuration
pub fn validate_workload(workload: &WorkloadConfig) -> Result<()> {
    let largest = workload.largest_record_size();

    if workload.record_size == 0 || largest == 0 {
        return Err(BenchError::config("record size must be greater than 0").into());
    }

    if workload.total_size < largest {
        return Err(BenchError::config(format!(
            "Insane boundaries! Block size = {}, Total size = {}",
            largest, workload.total_size
        ))
        .into());
    }

    if let Some(range) = workload.record_range {
        if range.step == 0 || range.start > range.end || range.start + range.step > range.end {
            return Err(BenchError::config(format!("Insane record range: {}", range)).into());
        }
    }

    if workload.max_extents == Some(0) {
        return Err(BenchError::config("max_extents must be at least 1").into());
    }

    if workload.start.checked_add(workload.total_size).is_none() {
        return Err(BenchError::config("start + total_size overflows").into());
    }

    Ok(())
}

/// Validate runtime configuration
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    if !LEVELS.contains(&runtime.log_level.to_lowercase().as_str()) {
        return Err(BenchError::config(format!(
            "log_level must be one of {:?}, got {}",
            LEVELS, runtime.log_level
        ))
        .into());
    }
    Ok(())
}

/// Check alignment to the sector size and that the run fits in the device
pub fn validate_against_device(workload: &WorkloadConfig, geometry: &DeviceGeometry) -> Result<()> {
    if !geometry.is_aligned(workload.total_size) {
        return Err(BenchError::config(format!(
            "Total size must be aligned to the sector size ({})",
            geometry.sector_size
        ))
        .into());
    }

    for record_size in workload.record_sizes() {
        if !geometry.is_aligned(record_size) {
            return Err(BenchError::config(format!(
                "Record size {} must be aligned to the sector size ({})",
                record_size, geometry.sector_size
            ))
            .into());
        }
    }

    if !geometry.is_aligned(workload.start) {
        return Err(BenchError::config(format!(
            "Starting point must be aligned to the sector size ({})",
            geometry.sector_size
        ))
        .into());
    }

    if workload.start + workload.total_size > geometry.size {
        return Err(BenchError::config(format!(
            "Boundaries does not fit in the device: start {} + total {} > device size {}",
            workload.start, workload.total_size, geometry.size
        ))
        .into());
    }

    if workload.mode.is_random() && workload.largest_record_size() > geometry.size {
        return Err(BenchError::config("Record size is larger than the device").into());
    }

    Ok(())
}
