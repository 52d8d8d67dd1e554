//! Decay tables: particle properties and branching ratios.
//!
//! A [`DecayTable`] is the on-disk JSON form. It lists particles (mass,
//! proper decay length, charge-conjugation behaviour) and, per parent,
//! the decay channels with their branching ratios. A user table is merged
//! over the embedded defaults, entry by entry.
//!
//! [`DecayCatalog`] is the compiled form used while sampling: channels are
//! filtered by the force-decay policy, renormalized, and charge-conjugated
//! for antiparticles that the table does not list explicitly.

use std::collections::HashMap;
use std::path::Path;

use flavdecay_core::error::EngineError;
use flavdecay_core::types::ForceDecayPolicy;
use serde::{Deserialize, Serialize};

/// Decay table shipped with the crate.
pub const DEFAULT_TABLE_JSON: &str = include_str!("../data/default_decay_table.json");

/// Static properties of one particle species.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ParticleData {
    /// PDG code of the particle (the antiparticle shares the entry).
    pub pdg: i32,
    pub name: String,
    /// Rest mass in GeV.
    pub mass: f64,
    /// Proper decay length in cm.
    #[serde(default)]
    pub ctau: f64,
    /// The particle is its own antiparticle.
    #[serde(default)]
    pub self_conjugate: bool,
}

/// One decay mode of a parent.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Channel {
    pub branching_ratio: f64,
    pub daughters: Vec<i32>,
}

/// All decay modes of one parent.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DecayEntry {
    pub parent: i32,
    pub channels: Vec<Channel>,
}

/// Serialized decay table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct DecayTable {
    #[serde(default)]
    pub particles: Vec<ParticleData>,
    #[serde(default)]
    pub decays: Vec<DecayEntry>,
}

impl DecayTable {
    /// Parse a table from JSON. `source_name` only labels errors.
    pub fn from_json(source_name: &str, json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::TableParse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a table file.
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|e| EngineError::TableRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&path.display().to_string(), &json)
    }

    /// The embedded default table.
    pub fn embedded() -> Result<Self, EngineError> {
        Self::from_json("embedded default table", DEFAULT_TABLE_JSON)
    }

    /// Overlay `other`: its particles and decay entries replace ours with the same code.
    pub fn merge(&mut self, other: DecayTable) {
        for particle in other.particles {
            match self.particles.iter_mut().find(|p| p.pdg.abs() == particle.pdg.abs()) {
                Some(existing) => *existing = particle,
                None => self.particles.push(particle),
            }
        }
        for entry in other.decays {
            match self.decays.iter_mut().find(|d| d.parent == entry.parent) {
                Some(existing) => *existing = entry,
                None => self.decays.push(entry),
            }
        }
    }
}

/// Charged leptons: e, mu, tau.
pub fn is_charged_lepton(pdg: i32) -> bool {
    matches!(pdg.abs(), 11 | 13 | 15)
}

/// Neutrinos of all generations.
pub fn is_neutrino(pdg: i32) -> bool {
    matches!(pdg.abs(), 12 | 14 | 16)
}

/// Whether `policy` lets the engine sample `channel`.
pub fn policy_allows(policy: ForceDecayPolicy, channel: &Channel) -> bool {
    let charged = channel.daughters.iter().any(|d| is_charged_lepton(*d));
    let neutrino = channel.daughters.iter().any(|d| is_neutrino(*d));
    match policy {
        ForceDecayPolicy::All => true,
        ForceDecayPolicy::Semileptonic => charged && neutrino,
        ForceDecayPolicy::Hadronic => !charged && !neutrino,
    }
}

/// Sampling-ready view of a [`DecayTable`].
#[derive(Debug, Clone, Default)]
pub struct DecayCatalog {
    /// Keyed by `|pdg|`.
    particles: HashMap<i32, ParticleData>,
    /// Keyed by signed parent code; branching ratios sum to one.
    channels: HashMap<i32, Vec<Channel>>,
}

impl DecayCatalog {
    /// Validate `table`, apply `policy`, and build the lookup maps.
    ///
    /// A parent whose channels are all rejected by the policy keeps its
    /// full channel list, so intermediate resonances still decay.
    pub fn build(table: &DecayTable, policy: ForceDecayPolicy) -> Result<Self, EngineError> {
        let mut particles = HashMap::with_capacity(table.particles.len());
        for p in &table.particles {
            particles.insert(p.pdg.abs(), p.clone());
        }
        let mut catalog = Self { particles, channels: HashMap::new() };

        for entry in &table.decays {
            catalog.validate(entry)?;
            let allowed: Vec<Channel> = entry
                .channels
                .iter()
                .filter(|c| policy_allows(policy, c))
                .cloned()
                .collect();
            let chosen = if allowed.is_empty() { entry.channels.clone() } else { allowed };
            catalog.channels.insert(entry.parent, normalize(chosen));
        }

        let explicit: Vec<i32> = catalog.channels.keys().copied().collect();
        for parent in explicit {
            let anti = catalog.conjugate(parent);
            if anti == parent || catalog.channels.contains_key(&anti) {
                continue;
            }
            let conjugated = catalog.channels[&parent]
                .iter()
                .map(|c| Channel {
                    branching_ratio: c.branching_ratio,
                    daughters: c.daughters.iter().map(|d| catalog.conjugate(*d)).collect(),
                })
                .collect();
            catalog.channels.insert(anti, conjugated);
        }

        Ok(catalog)
    }

    fn validate(&self, entry: &DecayEntry) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidChannel { parent: entry.parent, reason };
        if !self.particles.contains_key(&entry.parent.abs()) {
            return Err(invalid("parent missing from particle list".to_string()));
        }
        if entry.channels.is_empty() {
            return Err(invalid("no channels".to_string()));
        }
        for channel in &entry.channels {
            if !(channel.branching_ratio.is_finite() && channel.branching_ratio > 0.0) {
                return Err(invalid(format!("branching ratio {}", channel.branching_ratio)));
            }
            if channel.daughters.len() < 2 {
                return Err(invalid(format!("{} daughters", channel.daughters.len())));
            }
            if let Some(d) = channel.daughters.iter().find(|d| !self.particles.contains_key(&d.abs())) {
                return Err(invalid(format!("unknown daughter {d}")));
            }
        }
        Ok(())
    }

    /// Particle properties for `pdg` or its antiparticle.
    pub fn particle(&self, pdg: i32) -> Option<&ParticleData> {
        self.particles.get(&pdg.abs())
    }

    pub fn mass(&self, pdg: i32) -> Option<f64> {
        self.particle(pdg).map(|p| p.mass)
    }

    /// Decay channels of `pdg`, or `None` if it is stable in this catalog.
    pub fn channels(&self, pdg: i32) -> Option<&[Channel]> {
        self.channels.get(&pdg).map(Vec::as_slice)
    }

    /// Antiparticle code of `pdg`.
    pub fn conjugate(&self, pdg: i32) -> i32 {
        match self.particle(pdg) {
            Some(p) if p.self_conjugate => pdg,
            _ => -pdg,
        }
    }

    /// Number of particle species known to the catalog.
    pub fn n_particles(&self) -> usize {
        self.particles.len()
    }

    /// Number of signed codes with at least one channel.
    pub fn n_decaying(&self) -> usize {
        self.channels.len()
    }
}

fn normalize(mut channels: Vec<Channel>) -> Vec<Channel> {
    let total: f64 = channels.iter().map(|c| c.branching_ratio).sum();
    for c in &mut channels {
        c.branching_ratio /= total;
    }
    channels
}
