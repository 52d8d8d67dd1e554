//! Core particle types: four-momenta, stack particles, decay products.
//!
//! Units follow the upstream simulation: momenta and energies in GeV,
//! positions in cm, times in seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{STATUS_FORCED_DECAY, STATUS_UNDECIDED};
use crate::error::ConfigError;

/// Relativistic four-momentum `(px, py, pz, E)` in GeV.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct FourMomentum {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
}

impl FourMomentum {
    /// Create a four-momentum from its components.
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// A particle of mass `mass` at rest.
    pub fn at_rest(mass: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, mass)
    }

    /// Build from a three-momentum and a mass, putting the particle on shell.
    pub fn from_momentum_and_mass(p: [f64; 3], mass: f64) -> Self {
        let e = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2] + mass * mass).sqrt();
        Self::new(p[0], p[1], p[2], e)
    }

    /// Spatial part of the four-momentum.
    pub fn three(&self) -> [f64; 3] {
        [self.px, self.py, self.pz]
    }

    /// Magnitude of the three-momentum.
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Invariant mass. Negative mass-squared from rounding is clamped to zero.
    pub fn mass(&self) -> f64 {
        let m2 = self.e * self.e - self.p() * self.p();
        m2.max(0.0).sqrt()
    }

    /// Velocity `p / E` of the frame in which this momentum is at rest.
    pub fn boost_vector(&self) -> [f64; 3] {
        if self.e <= 0.0 {
            return [0.0; 3];
        }
        [self.px / self.e, self.py / self.e, self.pz / self.e]
    }

    /// Lorentz-boost this momentum by velocity `beta`.
    pub fn boost(&self, beta: [f64; 3]) -> Self {
        let b2 = beta[0] * beta[0] + beta[1] * beta[1] + beta[2] * beta[2];
        if b2 <= 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta[0] * self.px + beta[1] * self.py + beta[2] * self.pz;
        let gamma2 = (gamma - 1.0) / b2;
        let k = gamma2 * bp + gamma * self.e;
        Self {
            px: self.px + k * beta[0],
            py: self.py + k * beta[1],
            pz: self.pz + k * beta[2],
            e: gamma * (self.e + bp),
        }
    }
}

impl std::ops::Add for FourMomentum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.px + rhs.px,
            self.py + rhs.py,
            self.pz + rhs.pz,
            self.e + rhs.e,
        )
    }
}

/// How a particle entered the stack.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductionMechanism {
    /// Written by the upstream event generator.
    #[default]
    Primary,
    /// Pushed as the product of a decay.
    Decay,
}

fn unit_weight() -> f64 {
    1.0
}

fn transported() -> bool {
    true
}

/// A particle record owned by the particle stack.
///
/// The relinker only ever mutates `status`, `done`, and `transport`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Particle {
    /// Signed PDG particle-type code.
    pub pdg: i32,
    /// Generator status code.
    pub status: i32,
    pub momentum: FourMomentum,
    /// Production vertex.
    pub vertex: [f64; 3],
    /// Production time.
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub polarization: [f64; 3],
    #[serde(default = "unit_weight")]
    pub weight: f64,
    #[serde(default)]
    pub mechanism: ProductionMechanism,
    #[serde(default)]
    pub first_mother: Option<usize>,
    #[serde(default)]
    pub first_daughter: Option<usize>,
    #[serde(default)]
    pub last_daughter: Option<usize>,
    /// Number of daughters assigned so far, upstream or by the stack.
    #[serde(default)]
    pub n_daughters: usize,
    /// Bookkeeping is finished for this particle.
    #[serde(default)]
    pub done: bool,
    /// The particle is handed to detector transport.
    #[serde(default = "transported")]
    pub transport: bool,
}

impl Particle {
    /// A fresh primary with no lineage, flagged for transport.
    pub fn new(pdg: i32, status: i32, momentum: FourMomentum, vertex: [f64; 3], time: f64) -> Self {
        Self {
            pdg,
            status,
            momentum,
            vertex,
            time,
            polarization: [0.0; 3],
            weight: 1.0,
            mechanism: ProductionMechanism::Primary,
            first_mother: None,
            first_daughter: None,
            last_daughter: None,
            n_daughters: 0,
            done: false,
            transport: true,
        }
    }

    /// Whether this particle can still be decayed: final-state status and no daughters.
    pub fn is_undecided(&self) -> bool {
        self.status == STATUS_UNDECIDED && self.n_daughters == 0
    }

    /// Flag the particle as decayed by the relinker so transport skips it.
    pub fn mark_forced_decay(&mut self) {
        self.status = STATUS_FORCED_DECAY;
        self.done = true;
        self.transport = false;
    }
}

/// One entry of the flat list returned by a decay engine.
///
/// Index 0 of such a list is the reconstructed decaying particle; real
/// products occupy indices `1..N`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DecayProduct {
    pub pdg: i32,
    /// Engine-assigned status; [`STABLE_STATUS`](crate::constants::STABLE_STATUS) marks a leaf.
    pub status: i32,
    /// 1-based index of the mother within the same list, 0 when it has none.
    pub first_mother: usize,
    pub momentum: FourMomentum,
    /// Production vertex relative to the decaying particle's origin.
    pub vertex_offset: [f64; 3],
    /// Production time relative to the decaying particle's time.
    pub time_offset: f64,
}

impl DecayProduct {
    /// 0-based list index of this product's mother, if it has one.
    ///
    /// # Examples
    ///
    /// ```
    /// use flavdecay_core::types::{DecayProduct, FourMomentum};
    /// let product = DecayProduct {
    ///     pdg: 211,
    ///     status: 1,
    ///     first_mother: 3,
    ///     momentum: FourMomentum::default(),
    ///     vertex_offset: [0.0; 3],
    ///     time_offset: 0.0,
    /// };
    /// assert_eq!(product.local_mother(), Some(2));
    /// ```
    pub fn local_mother(&self) -> Option<usize> {
        self.first_mother.checked_sub(1)
    }
}

/// Everything the stack needs to append a decay product.
#[derive(Clone, Debug, PartialEq)]
pub struct NewParticle {
    /// Hand the particle to downstream transport.
    pub trackable: bool,
    /// Global stack index of the mother.
    pub parent: usize,
    pub pdg: i32,
    pub momentum: FourMomentum,
    pub origin: [f64; 3],
    pub polarization: [f64; 3],
    pub time: f64,
    pub mechanism: ProductionMechanism,
    pub weight: f64,
    pub status: i32,
}

/// Which decay channels the engine may sample.
///
/// # Examples
///
/// ```
/// use flavdecay_core::types::ForceDecayPolicy;
/// let policy: ForceDecayPolicy = "semileptonic".parse().unwrap();
/// assert_eq!(policy, ForceDecayPolicy::Semileptonic);
/// assert_eq!(ForceDecayPolicy::default(), ForceDecayPolicy::All);
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForceDecayPolicy {
    /// Every channel in the decay table.
    #[default]
    All,
    /// Only channels with a charged lepton and a neutrino.
    Semileptonic,
    /// Only channels without leptons.
    Hadronic,
}

impl fmt::Display for ForceDecayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Semileptonic => "semileptonic",
            Self::Hadronic => "hadronic",
        };
        f.write_str(name)
    }
}

impl FromStr for ForceDecayPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "semileptonic" => Ok(Self::Semileptonic),
            "hadronic" => Ok(Self::Hadronic),
            other => Err(ConfigError::UnknownForceDecay(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STABLE_STATUS;

    fn b0_at_rest() -> Particle {
        Particle::new(511, STATUS_UNDECIDED, FourMomentum::at_rest(5.279_65), [0.1, 0.2, 0.3], 0.0)
    }

    #[test]
    fn mass_of_particle_at_rest() {
        let p = FourMomentum::at_rest(1.864_84);
        assert!((p.mass() - 1.864_84).abs() < 1e-12);
        assert_eq!(p.p(), 0.0);
    }

    #[test]
    fn on_shell_construction() {
        let p = FourMomentum::from_momentum_and_mass([3.0, 0.0, 4.0], 0.0);
        assert!((p.e - 5.0).abs() < 1e-12);
        assert!(p.mass() < 1e-6);
    }

    #[test]
    fn boost_preserves_mass() {
        let p = FourMomentum::from_momentum_and_mass([0.3, -0.2, 1.1], 0.139_57);
        let boosted = p.boost([0.2, 0.5, -0.6]);
        assert!((boosted.mass() - 0.139_57).abs() < 1e-9);
    }

    #[test]
    fn boost_at_rest_gives_parent_momentum() {
        let parent = FourMomentum::from_momentum_and_mass([1.0, 2.0, -3.0], 5.279_65);
        let rest = FourMomentum::at_rest(5.279_65);
        let lab = rest.boost(parent.boost_vector());
        assert!((lab.px - parent.px).abs() < 1e-9);
        assert!((lab.py - parent.py).abs() < 1e-9);
        assert!((lab.pz - parent.pz).abs() < 1e-9);
        assert!((lab.e - parent.e).abs() < 1e-9);
    }

    #[test]
    fn zero_boost_is_identity() {
        let p = FourMomentum::new(1.0, 2.0, 3.0, 10.0);
        assert_eq!(p.boost([0.0; 3]), p);
    }

    #[test]
    fn new_particle_is_undecided() {
        assert!(b0_at_rest().is_undecided());
    }

    #[test]
    fn particle_with_daughters_is_not_undecided() {
        let mut p = b0_at_rest();
        p.n_daughters = 2;
        assert!(!p.is_undecided());
    }

    #[test]
    fn particle_with_other_status_is_not_undecided() {
        let mut p = b0_at_rest();
        p.status = 2;
        assert!(!p.is_undecided());
    }

    #[test]
    fn mark_forced_decay_updates_flags() {
        let mut p = b0_at_rest();
        p.mark_forced_decay();
        assert_eq!(p.status, STATUS_FORCED_DECAY);
        assert!(p.done);
        assert!(!p.transport);
        assert!(!p.is_undecided());
    }

    #[test]
    fn local_mother_of_orphan_is_none() {
        let product = DecayProduct {
            pdg: 22,
            status: STABLE_STATUS,
            first_mother: 0,
            momentum: FourMomentum::default(),
            vertex_offset: [0.0; 3],
            time_offset: 0.0,
        };
        assert_eq!(product.local_mother(), None);
    }

    #[test]
    fn particle_json_defaults() {
        let json = r#"{"pdg":421,"status":1,"momentum":{"px":0.0,"py":0.0,"pz":1.0,"e":2.1},"vertex":[0.0,0.0,0.0]}"#;
        let p: Particle = serde_json::from_str(json).unwrap();
        assert_eq!(p.weight, 1.0);
        assert_eq!(p.mechanism, ProductionMechanism::Primary);
        assert_eq!(p.n_daughters, 0);
        assert!(p.is_undecided());
        assert!(!p.done);
        // same as a primary built in code
        assert_eq!(p, Particle::new(421, 1, p.momentum, [0.0; 3], 0.0));
    }

    #[test]
    fn force_decay_policy_roundtrip_display() {
        for policy in [ForceDecayPolicy::All, ForceDecayPolicy::Semileptonic, ForceDecayPolicy::Hadronic] {
            assert_eq!(policy.to_string().parse::<ForceDecayPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn force_decay_policy_rejects_unknown() {
        assert_eq!(
            "dimuon".parse::<ForceDecayPolicy>(),
            Err(ConfigError::UnknownForceDecay("dimuon".to_string()))
        );
    }
}
