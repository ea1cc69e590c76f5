//! Allocator configuration.
//!
//! Loaded from an optional `medseq.toml` and overridden by environment
//! variables such as `MEDSEQ__STORAGE__BACKEND=postgres`.

use std::time::Duration;

use medseq_core::{ResetPeriod, SequenceName, validate_name};
use medseq_db_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or merged.
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    /// The merged configuration is semantically invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocatorConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-sequence settings. Sequences not listed here use the defaults.
    #[serde(default)]
    pub sequences: Vec<SequenceSettings>,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Storage
        match self.storage.backend {
            StorageBackend::Postgres => {
                let Some(pg) = &self.storage.postgres else {
                    return Err(ConfigError::invalid(
                        "storage.backend=postgres requires storage.postgres",
                    ));
                };
                if pg.url.is_empty() {
                    return Err(ConfigError::invalid("storage.postgres.url must not be empty"));
                }
                if pg.pool_size == 0 {
                    return Err(ConfigError::invalid("storage.postgres.pool_size must be > 0"));
                }
            }
            StorageBackend::Memory => {}
        }
        // Logging
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        // Sequences
        for (i, seq) in self.sequences.iter().enumerate() {
            validate_name(&seq.name)
                .map_err(|e| ConfigError::invalid(format!("sequences[{i}].name: {e}")))?;
            if self.sequences[..i].iter().any(|other| other.name == seq.name) {
                return Err(ConfigError::invalid(format!(
                    "sequences[{i}].name {} is listed twice",
                    seq.name
                )));
            }
        }
        // Sweeper
        if self.sweeper.enabled && self.sweeper.interval_secs == 0 {
            return Err(ConfigError::invalid("sweeper.interval_secs must be > 0"));
        }
        Ok(())
    }

    /// Reset periods to apply when configured sequences are first created.
    pub fn sequence_periods(&self) -> Result<Vec<(SequenceName, ResetPeriod)>, ConfigError> {
        self.sequences
            .iter()
            .map(|seq| {
                SequenceName::new(seq.name.as_str())
                    .map(|name| (name, seq.reset_period))
                    .map_err(|e| ConfigError::invalid(e.to_string()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local counters. Not valid when more than one process allocates.
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    pub name: String,
    #[serde(default)]
    pub reset_period: ResetPeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Whether the periodic reset sweeper runs.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_sweep_interval_secs() -> u64 {
    300
}

pub mod loader {
    use super::{AllocatorConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// File read when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "medseq.toml";

    /// Prefix of environment overrides, e.g. `MEDSEQ__SWEEPER__INTERVAL_SECS=60`.
    pub const ENV_PREFIX: &str = "MEDSEQ";

    /// Environment source with the standard prefix and separator.
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__")
    }

    pub fn load_config(path: Option<&Path>) -> Result<AllocatorConfig, ConfigError> {
        load_config_with_environment(path, environment())
    }

    /// Loads from `path` (or the default file, if present) then applies `env` on top.
    pub fn load_config_with_environment(
        path: Option<&Path>,
        env: Environment,
    ) -> Result<AllocatorConfig, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::invalid(format!(
                        "config file {} does not exist",
                        p.display()
                    )));
                }
                builder = builder.add_source(File::from(p));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        builder = builder.add_source(env);

        let merged: AllocatorConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}
