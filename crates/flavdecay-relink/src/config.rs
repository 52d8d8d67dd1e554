//! Relinker configuration: species selection, decay-table options, retry cap.
//!
//! Everything here is read once, when the relinker initializes its decay
//! engine or starts a pass. The user decay table can only be set through
//! [`RelinkerConfig::set_user_decay_table`], which checks that the file
//! exists first.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flavdecay_core::constants::{DEFAULT_MAX_DECAY_ATTEMPTS, FLAVOR_BEAUTY, FLAVOR_CHARM};
use flavdecay_core::error::ConfigError;
use flavdecay_core::types::ForceDecayPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Which flavours the relinker forces to decay.
///
/// # Examples
///
/// ```
/// use flavdecay_relink::SpeciesFilter;
/// let filter: SpeciesFilter = "charm".parse().unwrap();
/// assert!(filter.accepts(4));
/// assert!(!filter.accepts(5));
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesFilter {
    /// Every particle, whatever its flavour.
    All,
    /// Beauty hadrons only.
    #[default]
    Beauty,
    /// Charm hadrons only.
    Charm,
}

impl SpeciesFilter {
    /// Whether a particle of flavour `flavor` passes the filter.
    pub fn accepts(self, flavor: i32) -> bool {
        match self {
            Self::All => true,
            Self::Beauty => flavor == FLAVOR_BEAUTY,
            Self::Charm => flavor == FLAVOR_CHARM,
        }
    }
}

impl fmt::Display for SpeciesFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Beauty => "beauty",
            Self::Charm => "charm",
        };
        f.write_str(name)
    }
}

impl FromStr for SpeciesFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "beauty" => Ok(Self::Beauty),
            "charm" => Ok(Self::Charm),
            other => Err(ConfigError::UnknownSpecies(other.to_string())),
        }
    }
}

/// How often a decay is resampled before the candidate is given up.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of engine calls per candidate. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32) -> Self {
        Self { max_attempts: Some(max_attempts) }
    }

    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    /// Whether another engine call may follow `attempts` failed ones.
    ///
    /// The first call is always made, so a cap of zero behaves like one.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(DEFAULT_MAX_DECAY_ATTEMPTS)
    }
}

/// Options of a [`Relinker`](crate::Relinker).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct RelinkerConfig {
    #[serde(default)]
    pub species: SpeciesFilter,
    #[serde(default)]
    pub force_decay: ForceDecayPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(skip)]
    user_decay_table: Option<PathBuf>,
}

impl RelinkerConfig {
    /// Use the decay table at `path` on top of the engine defaults.
    ///
    /// `None` or an empty path clears a previously configured table. A
    /// path that does not exist is rejected and leaves the configuration
    /// untouched.
    pub fn set_user_decay_table(&mut self, path: Option<&Path>) -> Result<(), ConfigError> {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            if self.user_decay_table.take().is_some() {
                debug!("user decay table cleared");
            }
            return Ok(());
        };
        if !path.exists() {
            error!(path = %path.display(), "user decay table does not exist");
            return Err(ConfigError::DecayTableNotFound { path: path.to_path_buf() });
        }
        debug!(path = %path.display(), "user decay table set");
        self.user_decay_table = Some(path.to_path_buf());
        Ok(())
    }

    /// The configured user decay table, if any.
    pub fn user_decay_table(&self) -> Option<&Path> {
        self.user_decay_table.as_deref()
    }

    pub fn uses_custom_table(&self) -> bool {
        self.user_decay_table.is_some()
    }

    pub fn with_species(mut self, species: SpeciesFilter) -> Self {
        self.species = species;
        self
    }

    pub fn with_force_decay(mut self, policy: ForceDecayPolicy) -> Self {
        self.force_decay = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
