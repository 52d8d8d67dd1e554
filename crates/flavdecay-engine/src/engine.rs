//! Table-driven decay engine implementing [`DecayEngine`].
//!
//! Each call decays one particle and, recursively, every product that has
//! channels in the loaded table. The result is a flat list whose entry 0 is
//! the decaying particle itself; all other entries point at their mother
//! through a 1-based list index. Vertices and times are offsets from the
//! decaying particle's own origin.

use std::fmt;
use std::path::{Path, PathBuf};

use flavdecay_core::constants::{DECAYED_STATUS, STABLE_STATUS};
use flavdecay_core::error::EngineError;
use flavdecay_core::traits::DecayEngine;
use flavdecay_core::types::{DecayProduct, ForceDecayPolicy, FourMomentum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::kinematics;
use crate::table::{Channel, DecayCatalog, DecayTable};

/// Upper bound on the length of one product list.
///
/// Guards against self-referencing user tables; hitting it rejects the sample.
pub const MAX_PRODUCTS: usize = 512;

/// Phase-space decayer driven by a [`DecayTable`].
pub struct TableDecayer {
    rng: StdRng,
    /// Replaces the embedded defaults when set.
    default_override: Option<DecayTable>,
    defaults: Option<DecayTable>,
    user_table: Option<PathBuf>,
    policy: ForceDecayPolicy,
    catalog: Option<DecayCatalog>,
    products: Vec<DecayProduct>,
}

impl fmt::Debug for TableDecayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDecayer")
            .field("user_table", &self.user_table)
            .field("policy", &self.policy)
            .field("loaded", &self.catalog.is_some())
            .finish_non_exhaustive()
    }
}

impl TableDecayer {
    /// Create a decayer with a reproducible random stream.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create a decayer seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            default_override: None,
            defaults: None,
            user_table: None,
            policy: ForceDecayPolicy::default(),
            catalog: None,
            products: Vec::new(),
        }
    }

    /// Use `table` instead of the embedded defaults on [`initialize`](DecayEngine::initialize).
    pub fn with_default_table(mut self, table: DecayTable) -> Self {
        self.default_override = Some(table);
        self
    }

    /// The compiled table, once [`load_decay_table`](DecayEngine::load_decay_table) succeeded.
    pub fn catalog(&self) -> Option<&DecayCatalog> {
        self.catalog.as_ref()
    }

    pub fn policy(&self) -> ForceDecayPolicy {
        self.policy
    }

    pub fn user_table(&self) -> Option<&Path> {
        self.user_table.as_deref()
    }
}

fn sample_channel<'a, R: Rng + ?Sized>(rng: &mut R, channels: &'a [Channel]) -> Option<&'a Channel> {
    let r: f64 = rng.gen_range(0.0..1.0);
    let mut cumulative = 0.0;
    for channel in channels {
        cumulative += channel.branching_ratio;
        if r < cumulative {
            return Some(channel);
        }
    }
    // Rounding left the cumulative sum just below one.
    channels.last()
}

fn product_status(catalog: &DecayCatalog, pdg: i32) -> i32 {
    if catalog.channels(pdg).is_some() { DECAYED_STATUS } else { STABLE_STATUS }
}

/// Fill `products` with the full decay tree of `pdg`.
///
/// Returns `None` when a sampled channel is kinematically closed or the
/// tree grows past [`MAX_PRODUCTS`].
fn sample_tree(
    rng: &mut StdRng,
    catalog: &DecayCatalog,
    products: &mut Vec<DecayProduct>,
    pdg: i32,
    momentum: &FourMomentum,
) -> Option<()> {
    products.clear();
    products.push(DecayProduct {
        pdg,
        status: product_status(catalog, pdg),
        first_mother: 0,
        momentum: *momentum,
        vertex_offset: [0.0; 3],
        time_offset: 0.0,
    });

    let mut i = 0;
    while i < products.len() {
        let mother = products[i].clone();
        let Some(channels) = catalog.channels(mother.pdg) else {
            i += 1;
            continue;
        };
        let channel = sample_channel(rng, channels)?;
        let masses: Vec<f64> = channel
            .daughters
            .iter()
            .map(|d| catalog.mass(*d))
            .collect::<Option<_>>()?;
        let (mother_mass, ctau) = catalog
            .particle(mother.pdg)
            .map_or((mother.momentum.mass(), 0.0), |p| (p.mass, p.ctau));

        let rest_frame = kinematics::decay_at_rest(rng, mother_mass, &masses)?;
        let (displacement, flight_time) = kinematics::flight(rng, ctau, mother_mass, &mother.momentum);
        let vertex = [
            mother.vertex_offset[0] + displacement[0],
            mother.vertex_offset[1] + displacement[1],
            mother.vertex_offset[2] + displacement[2],
        ];
        let time = mother.time_offset + flight_time;
        let beta = mother.momentum.boost_vector();

        if products.len() + channel.daughters.len() > MAX_PRODUCTS {
            warn!(pdg, "decay tree exceeds {MAX_PRODUCTS} products, rejecting sample");
            return None;
        }
        for (daughter, p4) in channel.daughters.iter().zip(rest_frame) {
            products.push(DecayProduct {
                pdg: *daughter,
                status: product_status(catalog, *daughter),
                first_mother: i + 1,
                momentum: p4.boost(beta),
                vertex_offset: vertex,
                time_offset: time,
            });
        }
        i += 1;
    }
    Some(())
}

impl DecayEngine for TableDecayer {
    fn initialize(&mut self) -> Result<(), EngineError> {
        let defaults = match self.default_override.take() {
            Some(table) => table,
            None => DecayTable::embedded()?,
        };
        info!(
            particles = defaults.particles.len(),
            parents = defaults.decays.len(),
            "default decay table loaded"
        );
        self.defaults = Some(defaults);
        Ok(())
    }

    fn set_force_decay(&mut self, policy: ForceDecayPolicy) {
        self.policy = policy;
    }

    fn set_decay_table_path(&mut self, path: &Path) {
        self.user_table = Some(path.to_path_buf());
    }

    fn load_decay_table(&mut self) -> Result<(), EngineError> {
        let mut table = self.defaults.clone().ok_or(EngineError::NotInitialized)?;
        if let Some(path) = &self.user_table {
            let user = DecayTable::from_path(path)?;
            info!(path = %path.display(), parents = user.decays.len(), "user decay table merged");
            table.merge(user);
        }
        let catalog = DecayCatalog::build(&table, self.policy)?;
        info!(
            particles = catalog.n_particles(),
            decaying = catalog.n_decaying(),
            policy = %self.policy,
            "decay table ready"
        );
        self.catalog = Some(catalog);
        Ok(())
    }

    fn decay(&mut self, pdg: i32, momentum: &FourMomentum) -> Option<usize> {
        let Some(catalog) = self.catalog.as_ref() else {
            warn!(pdg, "decay requested before the decay table was loaded");
            self.products.clear();
            return Some(0);
        };
        match sample_tree(&mut self.rng, catalog, &mut self.products, pdg, momentum) {
            Some(()) => {
                debug!(pdg, products = self.products.len(), "decay sampled");
                Some(self.products.len())
            }
            None => {
                self.products.clear();
                None
            }
        }
    }

    fn import_products(&mut self, out: &mut Vec<DecayProduct>) {
        out.append(&mut self.products);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const M_B0: f64 = 5.279_65;

    fn loaded(seed: u64, policy: ForceDecayPolicy) -> TableDecayer {
        let mut engine = TableDecayer::new(seed);
        engine.initialize().unwrap();
        engine.set_force_decay(policy);
        engine.load_decay_table().unwrap();
        engine
    }

    fn b0_momentum() -> FourMomentum {
        FourMomentum::from_momentum_and_mass([1.5, -0.5, 4.0], M_B0)
    }

    fn decay_once(engine: &mut TableDecayer, pdg: i32, p: &FourMomentum) -> Vec<DecayProduct> {
        let n = engine.decay(pdg, p).expect("open channels only");
        let mut out = Vec::new();
        engine.import_products(&mut out);
        assert_eq!(out.len(), n);
        out
    }

    #[test]
    fn load_before_initialize_fails() {
        let mut engine = TableDecayer::new(1);
        assert_eq!(engine.load_decay_table(), Err(EngineError::NotInitialized));
    }

    #[test]
    fn decay_before_load_yields_nothing() {
        let mut engine = TableDecayer::new(1);
        assert_eq!(engine.decay(511, &b0_momentum()), Some(0));
    }

    #[test]
    fn entry_zero_is_the_parent() {
        let mut engine = loaded(3, ForceDecayPolicy::All);
        let p = b0_momentum();
        let out = decay_once(&mut engine, 511, &p);
        assert!(out.len() >= 3);
        assert_eq!(out[0].pdg, 511);
        assert_eq!(out[0].first_mother, 0);
        assert_eq!(out[0].momentum, p);
        assert_eq!(out[0].status, DECAYED_STATUS);
        assert_eq!(out[0].vertex_offset, [0.0; 3]);
    }

    #[test]
    fn mothers_precede_daughters() {
        let mut engine = loaded(11, ForceDecayPolicy::All);
        for _ in 0..50 {
            let out = decay_once(&mut engine, 511, &b0_momentum());
            for (i, product) in out.iter().enumerate().skip(1) {
                let mother = product.local_mother().unwrap();
                assert!(mother < i);
                assert_eq!(out[mother].status, DECAYED_STATUS);
            }
        }
    }

    #[test]
    fn leaves_are_stable_and_intermediates_decayed() {
        let mut engine = loaded(5, ForceDecayPolicy::All);
        let out = decay_once(&mut engine, 511, &b0_momentum());
        for (i, product) in out.iter().enumerate() {
            let has_daughters = out.iter().any(|p| p.local_mother() == Some(i));
            if has_daughters {
                assert_eq!(product.status, DECAYED_STATUS);
            } else {
                assert_eq!(product.status, STABLE_STATUS);
            }
        }
    }

    #[test]
    fn direct_daughters_conserve_four_momentum() {
        let mut engine = loaded(17, ForceDecayPolicy::All);
        let p = b0_momentum();
        let out = decay_once(&mut engine, 511, &p);
        let sum = out
            .iter()
            .filter(|d| d.local_mother() == Some(0))
            .fold(FourMomentum::default(), |acc, d| acc + d.momentum);
        assert!((sum.e - p.e).abs() < 1e-9);
        assert!((sum.px - p.px).abs() < 1e-9);
        assert!((sum.py - p.py).abs() < 1e-9);
        assert!((sum.pz - p.pz).abs() < 1e-9);
    }

    #[test]
    fn siblings_share_production_vertex() {
        let mut engine = loaded(23, ForceDecayPolicy::All);
        let out = decay_once(&mut engine, 421, &FourMomentum::from_momentum_and_mass([0.0, 0.0, 5.0], 1.864_84));
        let direct: Vec<&DecayProduct> = out.iter().filter(|d| d.local_mother() == Some(0)).collect();
        assert!(direct.len() >= 2);
        for d in &direct {
            assert_eq!(d.vertex_offset, direct[0].vertex_offset);
            assert_eq!(d.time_offset, direct[0].time_offset);
            // flight along +z only
            assert_eq!(d.vertex_offset[0], 0.0);
            assert!(d.vertex_offset[2] >= 0.0);
        }
    }

    #[test]
    fn stable_particle_returns_only_itself() {
        let mut engine = loaded(1, ForceDecayPolicy::All);
        let out = decay_once(&mut engine, 211, &FourMomentum::at_rest(0.139_57));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, STABLE_STATUS);
    }

    #[test]
    fn same_seed_same_products() {
        let mut a = loaded(42, ForceDecayPolicy::All);
        let mut b = loaded(42, ForceDecayPolicy::All);
        for _ in 0..10 {
            assert_eq!(decay_once(&mut a, 521, &b0_momentum()), decay_once(&mut b, 521, &b0_momentum()));
        }
    }

    #[test]
    fn semileptonic_policy_always_yields_a_lepton() {
        let mut engine = loaded(9, ForceDecayPolicy::Semileptonic);
        for _ in 0..50 {
            let out = decay_once(&mut engine, -511, &b0_momentum());
            let direct: Vec<i32> = out.iter().filter(|d| d.local_mother() == Some(0)).map(|d| d.pdg).collect();
            assert!(direct.iter().any(|pdg| crate::table::is_charged_lepton(*pdg)), "{direct:?}");
            assert!(direct.iter().any(|pdg| crate::table::is_neutrino(*pdg)), "{direct:?}");
        }
    }

    #[test]
    fn antiparticle_decays_to_conjugate_products() {
        let mut engine = loaded(2, ForceDecayPolicy::Hadronic);
        let p = FourMomentum::from_momentum_and_mass([0.0, 1.0, 0.0], 1.864_84);
        let out = decay_once(&mut engine, -421, &p);
        let direct: Vec<i32> = out.iter().filter(|d| d.local_mother() == Some(0)).map(|d| d.pdg).collect();
        assert_eq!(direct, vec![321, -211]);
    }

    #[test]
    fn closed_channel_requests_retry() {
        let table = DecayTable::from_json(
            "closed",
            r#"{"particles": [
                    {"pdg": 421, "name": "D0", "mass": 0.2},
                    {"pdg": 321, "name": "K+", "mass": 0.493677},
                    {"pdg": 211, "name": "pi+", "mass": 0.13957}],
                "decays": [{"parent": 421, "channels": [{"branching_ratio": 1.0, "daughters": [-321, 211]}]}]}"#,
        )
        .unwrap();
        let mut engine = TableDecayer::new(1).with_default_table(table);
        engine.initialize().unwrap();
        engine.load_decay_table().unwrap();
        assert_eq!(engine.decay(421, &FourMomentum::at_rest(0.2)), None);
        let mut out = Vec::new();
        engine.import_products(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn runaway_table_is_rejected() {
        let table = DecayTable::from_json(
            "runaway",
            r#"{"particles": [
                    {"pdg": 9000, "name": "X", "mass": 1.0},
                    {"pdg": 22, "name": "gamma", "mass": 0.0, "self_conjugate": true}],
                "decays": [{"parent": 9000, "channels": [{"branching_ratio": 1.0, "daughters": [9000, 22]}]}]}"#,
        )
        .unwrap();
        let mut engine = TableDecayer::new(1).with_default_table(table);
        engine.initialize().unwrap();
        engine.load_decay_table().unwrap();
        assert_eq!(engine.decay(9000, &FourMomentum::at_rest(1.0)), None);
    }

    #[test]
    fn user_table_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"decays": [{{"parent": 421, "channels": [{{"branching_ratio": 1.0, "daughters": [-321, 211]}}]}}]}}"#
        )
        .unwrap();

        let mut engine = TableDecayer::new(4);
        engine.initialize().unwrap();
        engine.set_decay_table_path(file.path());
        engine.load_decay_table().unwrap();
        assert_eq!(engine.user_table(), Some(file.path()));
        assert_eq!(engine.catalog().unwrap().channels(421).unwrap().len(), 1);
        // B0 still comes from the defaults
        assert_eq!(engine.catalog().unwrap().channels(511).unwrap().len(), 4);
    }

    #[test]
    fn missing_user_table_fails_load() {
        let mut engine = TableDecayer::new(4);
        engine.initialize().unwrap();
        engine.set_decay_table_path(Path::new("/nonexistent/user.json"));
        assert!(matches!(engine.load_decay_table(), Err(EngineError::TableRead { .. })));
        assert!(engine.catalog().is_none());
    }

    #[test]
    fn sample_channel_respects_cumulative_ratios() {
        let channels = vec![
            Channel { branching_ratio: 0.0, daughters: vec![1, 2] },
            Channel { branching_ratio: 1.0, daughters: vec![3, 4] },
        ];
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            assert_eq!(sample_channel(&mut rng, &channels).unwrap().daughters, vec![3, 4]);
        }
        assert!(sample_channel(&mut rng, &[]).is_none());
    }
}
