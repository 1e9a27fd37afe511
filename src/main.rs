//! TrimPulse CLI entry point

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use trimpulse::config::cli::Cli;
use trimpulse::config::toml::{load_config, to_toml_string};
use trimpulse::config::validator::validate_config;
use trimpulse::config::Config;
use trimpulse::error::{classify, BenchError};
use trimpulse::util::time::format_duration;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.runtime.log_level);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match classify(&e) {
                Some(BenchError::Configuration(_)) => {}
                Some(kind) => error!(error = %kind, "run aborted"),
                None => error!("run aborted"),
            }
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays clean for batch output; RUST_LOG wins over
/// the configured level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn run(config: Config) -> Result<()> {
    if config.runtime.dry_run {
        validate_config(&config).context("Configuration validation failed")?;
        print!("{}", to_toml_string(&config)?);
        eprintln!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    if !config.output.batch {
        println!("TrimPulse v{}", env!("CARGO_PKG_VERSION"));
        println!("{}", config);
        println!();
    }

    let stop = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
        let stop = Arc::clone(&stop);
        move || {
            if stop.fetch_or(true, Ordering::Relaxed) {
                error!("interrupted twice, aborting");
                std::process::abort();
            } else {
                info!("interrupt received, stopping after the current step");
            }
        }
    })
    .context("Failed to install interrupt handler")?;

    let started = Instant::now();
    let results = trimpulse::runner::run(&config, stop)?;
    info!(
        steps = results.len(),
        elapsed = %format_duration(started.elapsed()),
        "sweep finished"
    );
    Ok(())
}
