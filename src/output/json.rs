//! JSON output format
//!
//! One document per sweep:
//!
//! ```json
//! {
//!   "device": "/dev/sdb1",
//!   "timestamp": "2024-05-01T12:00:00+02:00",
//!   "random": false,
//!   "steps": [
//!     { "record_size": 4096, "total_size": 10485760, "start": 0,
//!       "min": 0.0001, "max": 0.002, "avg": 0.0003, "sum": 0.8,
//!       "count": 2560, "throughput_mb_s": 12.5 }
//!   ]
//! }
//! ```

use crate::stats::StepResult;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Report of a complete sweep
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub device: String,
    /// RFC 3339 local time the report was created
    pub timestamp: String,
    pub random: bool,
    pub steps: Vec<StepResult>,
}

impl JsonReport {
    pub fn new(device: &Path, random: bool, steps: Vec<StepResult>) -> Self {
        Self {
            device: device.display().to_string(),
            timestamp: chrono::Local::now().to_rfc3339(),
            random,
            steps,
        }
    }
}

/// Write JSON output to file
pub fn write_json_report(output_path: &Path, report: &JsonReport) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON report: {}", output_path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("Failed to write JSON report: {}", output_path.display()))?;
    writer.flush()?;

    Ok(())
}
