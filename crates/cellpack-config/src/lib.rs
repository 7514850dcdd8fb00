//! Configuration for the cellpack storage engine and its soak harness.
//!
//! Settings persist to disk as RON, every section falls back to defaults when
//! missing, and individual fields can be overridden from the command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CONFIG_FILE, Config, DebugConfig, SoakConfig, StorageConfig};
pub use error::ConfigError;
