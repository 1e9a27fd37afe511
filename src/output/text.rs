//! Human-readable and batch text output

use crate::stats::StepResult;
use std::io::{self, Write};

/// Run parameters printed before each step
pub fn write_step_header(
    out: &mut impl Write,
    start: u64,
    record_size: u64,
    total_size: u64,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "[+] Running test")?;
    writeln!(out, "Start: {}", start)?;
    writeln!(out, "Record size: {}", record_size)?;
    writeln!(out, "Total size: {}", total_size)?;
    writeln!(out)?;
    writeln!(out, "[+] Testing")
}

/// Labeled result block of one step
pub fn write_human_result(out: &mut impl Write, step: &StepResult) -> io::Result<()> {
    writeln!(out, "[+] RESULTS")?;
    writeln!(out, "min = {:.6}s", step.min)?;
    writeln!(out, "max = {:.6}s", step.max)?;
    writeln!(out, "avg = {:.6}s", step.avg)?;
    writeln!(out, "count = {}", step.count)?;
    writeln!(out, "sum = {:.6}s", step.sum)?;
    writeln!(out, "throughput = {:.6} MB/s", step.throughput_mb_s)
}

/// `record_size total_size min max avg sum throughput`
pub fn format_batch_line(step: &StepResult) -> String {
    format!(
        "{} {} {:.6} {:.6} {:.6} {:.6} {:.6}",
        step.record_size,
        step.total_size,
        step.min,
        step.max,
        step.avg,
        step.sum,
        step.throughput_mb_s
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::DiscardStats;

    fn three_step() -> StepResult {
        let mut stats = DiscardStats::new();
        for d in [0.01, 0.02, 0.03] {
            stats.record(d);
        }
        StepResult::new(4096, 12288, 0, &stats)
    }

    #[test]
    fn test_batch_line_has_seven_fields() {
        let line = format_batch_line(&three_step());
        let fields: Vec<&str> = line.split_whitespace().collect();

        assert_eq!(fields.len(), 7);
        assert_eq!(&fields[..6], &["4096", "12288", "0.010000", "0.030000", "0.020000", "0.060000"]);
        let throughput: f64 = fields[6].parse().unwrap();
        assert!((throughput - 0.1953125).abs() < 1e-5);
    }

    #[test]
    fn test_human_result_block() {
        let mut stats = DiscardStats::new();
        stats.record(0.125);
        stats.record(0.375);
        let step = StepResult::new(4096, 1 << 20, 0, &stats);

        let mut out = Vec::new();
        write_human_result(&mut out, &step).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "[+] RESULTS\n\
             min = 0.125000s\n\
             max = 0.375000s\n\
             avg = 0.250000s\n\
             count = 2\n\
             sum = 0.500000s\n\
             throughput = 2.000000 MB/s\n"
        );
    }

    #[test]
    fn test_step_header() {
        let mut out = Vec::new();
        write_step_header(&mut out, 10240, 4096, 10485760).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Start: 10240\nRecord size: 4096\nTotal size: 10485760\n"));
        assert!(text.ends_with("[+] Testing\n"));
    }

    #[test]
    fn test_empty_step_prints_zeros() {
        let step = StepResult::new(4096, 0, 0, &DiscardStats::new());
        assert_eq!(
            format_batch_line(&step),
            "4096 0 0.000000 0.000000 0.000000 0.000000 0.000000"
        );
    }
}
