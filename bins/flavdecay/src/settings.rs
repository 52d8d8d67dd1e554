//! Layered settings for the `flavdecay` binary.
//!
//! Built-in defaults, then the settings file, then `FLAVDECAY_*`
//! environment variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use flavdecay_core::constants::DEFAULT_MAX_DECAY_ATTEMPTS;
use flavdecay_core::types::ForceDecayPolicy;
use flavdecay_relink::{RelinkerConfig, RetryPolicy, SpeciesFilter};
use serde::{Deserialize, Serialize};

/// Prefix of environment variables read as settings.
pub const ENV_PREFIX: &str = "FLAVDECAY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub species: SpeciesFilter,
    pub force_decay: ForceDecayPolicy,
    /// User decay table merged over the embedded one.
    pub decay_table: Option<PathBuf>,
    /// Seed of the decay engine; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Engine calls per candidate; 0 retries forever.
    pub max_attempts: u32,
    pub stack_capacity: Option<usize>,
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            species: SpeciesFilter::default(),
            force_decay: ForceDecayPolicy::default(),
            decay_table: None,
            seed: None,
            max_attempts: DEFAULT_MAX_DECAY_ATTEMPTS,
            stack_capacity: None,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

/// `<config_dir>/flavdecay/config.toml`, if the platform has a config directory.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("flavdecay").join("config.toml"))
}

impl Settings {
    /// Read the settings file and environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        match path {
            Some(path) => builder = builder.add_source(File::from(path).required(true)),
            None => {
                if let Some(path) = default_settings_path() {
                    builder = builder.add_source(File::from(path.as_path()).required(false));
                }
            }
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        builder
            .build()
            .context("failed to read settings")?
            .try_deserialize()
            .context("invalid settings")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self.max_attempts {
            0 => RetryPolicy::unbounded(),
            n => RetryPolicy::bounded(n),
        }
    }

    /// Relinker options, with the decay table checked for existence.
    pub fn relinker_config(&self) -> Result<RelinkerConfig> {
        let mut config = RelinkerConfig::default()
            .with_species(self.species)
            .with_force_decay(self.force_decay)
            .with_retry(self.retry_policy());
        config
            .set_user_decay_table(self.decay_table.as_deref())
            .context("invalid decay table setting")?;
        Ok(config)
    }
}
