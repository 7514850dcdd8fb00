//! cellpack soak harness.
//!
//! Runs one writer tick thread against a block section while reader threads
//! serialize it concurrently, then verifies every cell against a model.
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.

mod soak;

use std::process::ExitCode;

use cellpack_config::{CliArgs, Config};
use clap::Parser;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config_dir();
    if config_dir.is_none() {
        eprintln!("No config directory available, using defaults");
    }

    // Load or create config, then apply CLI overrides
    let mut config = config_dir
        .as_deref()
        .map(|dir| {
            Config::load_or_create(dir).unwrap_or_else(|e| {
                eprintln!("Failed to load config: {e}, using defaults");
                Config::default()
            })
        })
        .unwrap_or_default();
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid overrides: {e}, using defaults");
        config = Config::default();
    }

    let log_dir = config_dir.map(|dir| dir.join("logs"));
    cellpack_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    match soak::run(&config) {
        Ok(report) => {
            report.log();
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "soak run failed");
            ExitCode::FAILURE
        }
    }
}
