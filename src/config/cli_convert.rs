//! CLI to Config conversion utilities

use crate::config::cli;
use crate::config::workload::RecordRange;
use crate::error::BenchError;
use crate::util::buffer::FillPattern;
use crate::Result;

/// Parse a size string (e.g., "4k", "100M", "1G") to bytes
///
/// Units are binary: k = 1024, m = 1024^2, g = 1024^3, t = 1024^4, with an
/// optional trailing `b`. Zero and values that overflow `u64` are rejected.
pub fn parse_size(s: &str) -> Result<u64> {
    let value = parse_offset(s)?;
    if value == 0 {
        return Err(BenchError::config(format!("Numeric argument out of range: {}", s)).into());
    }
    Ok(value)
}

/// Like [`parse_size`] but accepts zero (offsets)
pub fn parse_offset(s: &str) -> Result<u64> {
    let lower = s.trim().to_lowercase();
    let digits_end = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (num_str, unit) = lower.split_at(digits_end);

    if num_str.is_empty() {
        return Err(BenchError::config(format!("Bad syntax of numeric argument: {}", s)).into());
    }

    let multiplier: u64 = match unit {
        "" | "b" => 1,
        "k" | "kb" => 1024,
        "m" | "mb" => 1024 * 1024,
        "g" | "gb" => 1024 * 1024 * 1024,
        "t" | "tb" => 1024 * 1024 * 1024 * 1024,
        _ => {
            return Err(
                BenchError::config(format!("Bad syntax of numeric argument: {}", s)).into(),
            )
        }
    };

    num_str
        .parse::<u64>()
        .ok()
        .and_then(|num| num.checked_mul(multiplier))
        .ok_or_else(|| BenchError::config(format!("Numeric argument out of range: {}", s)).into())
}

/// Parse a record range `START:END:STEP` (each part a size)
pub fn parse_record_range(s: &str) -> Result<RecordRange> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(BenchError::config(format!(
            "Record range must be START:END:STEP, got {}",
            s
        ))
        .into());
    }

    let range = RecordRange {
        start: parse_size(parts[0])?,
        end: parse_size(parts[1])?,
        step: parse_size(parts[2])?,
    };

    let reaches_second_step = range
        .start
        .checked_add(range.step)
        .map_or(false, |next| next <= range.end);
    if range.start > range.end || !reaches_second_step {
        return Err(BenchError::config(format!(
            "Insane record range: {}:{}:{}",
            range.start, range.end, range.step
        ))
        .into());
    }

    Ok(range)
}

/// Convert CLI FillPatternArg to FillPattern
pub fn convert_fill_pattern(arg: cli::FillPatternArg) -> FillPattern {
    match arg {
        cli::FillPatternArg::Zeros => FillPattern::Zeros,
        cli::FillPatternArg::Ones => FillPattern::Ones,
        cli::FillPatternArg::Random => FillPattern::Random,
        cli::FillPatternArg::Sequential => FillPattern::Sequential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("512").unwrap(), 512);
    }

    #[test]
    fn test_parse_size_kb() {
        assert_eq!(parse_size("4k").unwrap(), 4096);
        assert_eq!(parse_size("4K").unwrap(), 4096);
        assert_eq!(parse_size("4kb").unwrap(), 4096);
        assert_eq!(parse_size("10k").unwrap(), 10240);
    }

    #[test]
    fn test_parse_size_mb_gb() {
        assert_eq!(parse_size("10M").unwrap(), 10485760);
        assert_eq!(parse_size("100m").unwrap(), 104857600);
        assert_eq!(parse_size("1g").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("2T").unwrap(), 2 * 1024 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_size_rejects_zero() {
        let err = parse_size("0").unwrap_err();
        assert!(matches!(classify(&err), Some(BenchError::Configuration(_))));
        assert_eq!(parse_offset("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_size_bad_syntax() {
        assert!(parse_size("").is_err());
        assert!(parse_size("k").is_err());
        assert!(parse_size("4x").is_err());
        assert!(parse_size("4k4").is_err());
        assert!(parse_size("-4").is_err());
    }

    #[test]
    fn test_parse_size_overflow() {
        assert!(parse_size("99999999999999999999").is_err());
        assert!(parse_size("18446744073709551615k").is_err());
    }

    #[test]
    fn test_parse_record_range() {
        let range = parse_record_range("4k:64k:4k").unwrap();
        assert_eq!(range, RecordRange { start: 4096, end: 65536, step: 4096 });
        assert_eq!(range.steps(), 16);
    }

    #[test]
    fn test_parse_record_range_insane() {
        assert!(parse_record_range("64k:4k:4k").is_err());
        assert!(parse_record_range("4k:8k:8k").is_err());
        assert!(parse_record_range("4k:8k").is_err());
        assert!(parse_record_range("4k:8k:0").is_err());
        assert!(parse_record_range("4k:8k:4k:1").is_err());
    }

    #[test]
    fn test_convert_fill_pattern() {
        assert_eq!(convert_fill_pattern(cli::FillPatternArg::Ones), FillPattern::Ones);
        assert_eq!(convert_fill_pattern(cli::FillPatternArg::Random), FillPattern::Random);
    }
}
