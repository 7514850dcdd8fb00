//! Command-line argument parsing for the soak harness.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Directory name under the platform config dir.
const APP_DIR: &str = "cellpack";

/// cellpack soak command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "cellpack-soak", about = "Concurrent soak test for cellpack buffers")]
pub struct CliArgs {
    /// Number of reader threads.
    #[arg(long)]
    pub readers: Option<usize>,

    /// Writer ticks to run.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Cells written per tick.
    #[arg(long)]
    pub writes_per_tick: Option<u32>,

    /// Distinct values the writer draws from.
    #[arg(long)]
    pub distinct_values: Option<u32>,

    /// RNG seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the thread-safe buffer (true) or copies of a standard one (false).
    #[arg(long)]
    pub thread_safe: Option<bool>,

    /// Disable the 4-bit nibble storage fast path.
    #[arg(long)]
    pub no_nibble: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// `--config` if given, else `<platform config dir>/cellpack`.
    pub fn config_dir(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR)))
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(readers) = args.readers {
            self.soak.reader_threads = readers;
        }
        if let Some(ticks) = args.ticks {
            self.soak.ticks = ticks;
        }
        if let Some(writes) = args.writes_per_tick {
            self.soak.writes_per_tick = writes;
        }
        if let Some(values) = args.distinct_values {
            self.soak.distinct_values = values;
        }
        if let Some(seed) = args.seed {
            self.soak.seed = seed;
        }
        if let Some(thread_safe) = args.thread_safe {
            self.soak.thread_safe = thread_safe;
        }
        if args.no_nibble {
            self.storage.nibble_fast_path = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
