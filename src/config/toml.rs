//! TOML configuration file parsing

use super::cli_convert::{convert_fill_pattern, parse_offset, parse_record_range, parse_size};
use super::workload::AccessMode;
use super::*;
use crate::config::cli::Cli;
use crate::error::BenchError;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    ::toml::from_str(contents)
        .map_err(|e| BenchError::config(format!("invalid TOML configuration: {}", e)).into())
}

/// Render a configuration as TOML (used by `--dry-run`)
pub fn to_toml_string(config: &Config) -> Result<String> {
    ::toml::to_string_pretty(config).context("Failed to serialize configuration")
}

/// Build the effective configuration: config file (if any) overridden by CLI
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    if let Some(ref device) = cli.device {
        config.device = Some(device.clone());
    }

    // Sizes
    if let Some(ref start) = cli.start {
        config.workload.start = parse_offset(start).context("Invalid start")?;
    }
    if let Some(ref record_size) = cli.record_size {
        config.workload.record_size = parse_size(record_size).context("Invalid record size")?;
    }
    if let Some(ref total_size) = cli.total_size {
        config.workload.total_size = parse_size(total_size).context("Invalid total size")?;
    }
    if let Some(ref range) = cli.record_range {
        config.workload.record_range =
            Some(parse_record_range(range).context("Invalid record range")?);
    }

    // Flags only ever switch behaviour on
    if cli.random {
        config.workload.mode = AccessMode::Random;
    }
    if cli.discard_discarded {
        config.workload.discard_discarded = true;
    }
    if cli.batch {
        config.output.batch = true;
    }
    if cli.no_discard {
        config.runtime.no_discard = true;
    }
    if cli.no_prepare {
        config.runtime.no_prepare = true;
    }
    if cli.dry_run {
        config.runtime.dry_run = true;
    }

    if cli.seed.is_some() {
        config.workload.seed = cli.seed;
    }
    if cli.max_extents.is_some() {
        config.workload.max_extents = cli.max_extents;
    }
    if let Some(pattern) = cli.fill_pattern {
        config.workload.fill_pattern = convert_fill_pattern(pattern);
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if let Some(ref level) = cli.log_level {
        config.runtime.log_level = level.clone();
    }

    // Random addressing covers the whole device
    if config.workload.mode.is_random() {
        config.workload.start = 0;
    }

    Ok(config)
}
