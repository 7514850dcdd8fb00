//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Widest packed entry the storage engine supports.
const MAX_PACKED_BITS: u8 = 32;

/// Most values a thread-safe buffer can address with 16-bit ids.
const MAX_ATOMIC_VALUES: u32 = 1 << 16;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Storage engine sizing and tuning.
    pub storage: StorageConfig,
    /// Soak harness workload.
    pub soak: SoakConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Storage engine sizing and tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Edge length of a cubic block section, in blocks.
    pub section_edge: u32,
    /// Blocks covered by one biome cell along x and z.
    pub biome_cell_edge: u32,
    /// Narrowest packed width for block sections.
    pub min_block_bits: u8,
    /// Narrowest packed width for biome areas.
    pub min_biome_bits: u8,
    /// Store 4-bit sections as nibbles (two entries per byte).
    pub nibble_fast_path: bool,
}

impl StorageConfig {
    /// Biome cells along one horizontal edge of a section.
    pub fn biome_edge(&self) -> u32 {
        (self.section_edge / self.biome_cell_edge.max(1)).max(1)
    }
}

/// Soak harness workload: one writer tick thread plus reader threads
/// standing in for network serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoakConfig {
    /// Concurrent reader threads.
    pub reader_threads: usize,
    /// Writer ticks to run.
    pub ticks: u32,
    /// Cells written per tick.
    pub writes_per_tick: u32,
    /// Distinct values the writer draws from.
    pub distinct_values: u32,
    /// RNG seed, so runs are reproducible.
    pub seed: u64,
    /// Exercise the thread-safe buffer. When false the writer owns a standard
    /// buffer and readers see copies published once per tick.
    pub thread_safe: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            section_edge: 16,
            biome_cell_edge: 4,
            min_block_bits: 4,
            min_biome_bits: 1,
            nibble_fast_path: true,
        }
    }
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            reader_threads: 4,
            ticks: 2000,
            writes_per_tick: 64,
            distinct_values: 48,
            seed: 42,
            thread_safe: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Validation ---

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl Config {
    /// Checks ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;
        if storage.section_edge == 0 {
            return Err(invalid("storage.section_edge", "must be positive"));
        }
        if storage.biome_cell_edge == 0 || storage.section_edge % storage.biome_cell_edge != 0 {
            return Err(invalid(
                "storage.biome_cell_edge",
                format!("must divide section_edge ({})", storage.section_edge),
            ));
        }
        for (field, bits) in [
            ("storage.min_block_bits", storage.min_block_bits),
            ("storage.min_biome_bits", storage.min_biome_bits),
        ] {
            if bits == 0 || bits > MAX_PACKED_BITS {
                return Err(invalid(field, format!("must be in 1..={MAX_PACKED_BITS}")));
            }
        }

        let soak = &self.soak;
        if soak.distinct_values == 0 || soak.distinct_values > MAX_ATOMIC_VALUES {
            return Err(invalid(
                "soak.distinct_values",
                format!("must be in 1..={MAX_ATOMIC_VALUES}"),
            ));
        }
        if soak.writes_per_tick == 0 {
            return Err(invalid("soak.writes_per_tick", "must be positive"));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("section_edge: 16"));
        assert!(ron_str.contains("distinct_values: 48"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert_eq!(StorageConfig::default().biome_edge(), 4);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(storage: (section_edge: 32), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.storage.section_edge, 32);
        assert_eq!(config.storage.biome_cell_edge, 4);
        assert_eq!(config.soak, SoakConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.storage.biome_cell_edge = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "storage.biome_cell_edge",
                ..
            })
        ));

        let mut config = Config::default();
        config.storage.min_block_bits = 33;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "storage.min_block_bits",
                ..
            })
        ));

        let mut config = Config::default();
        config.soak.distinct_values = 70_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.nibble_fast_path = false;
        config.soak.seed = 7;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "(storage: (section_edge: 0))",
        )
        .unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.soak.ticks = 10;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().soak.ticks, 10);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
