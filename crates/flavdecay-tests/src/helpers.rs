//! Shared test helpers: particle builders, a scripted engine, a recording stack.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use flavdecay_core::constants::{DECAYED_STATUS, STATUS_UNDECIDED};
use flavdecay_core::error::{EngineError, StackError};
use flavdecay_core::stack::EventStack;
use flavdecay_core::traits::{DecayEngine, ParticleStack};
use flavdecay_core::types::{DecayProduct, ForceDecayPolicy, FourMomentum, NewParticle, Particle};

/// An undecided primary at `origin`, produced at `time`.
pub fn undecided(pdg: i32, origin: [f64; 3], time: f64) -> Particle {
    Particle::new(
        pdg,
        STATUS_UNDECIDED,
        FourMomentum::from_momentum_and_mass([0.3, -0.4, 12.0], 5.279_65),
        origin,
        time,
    )
}

/// Entry 0 of a product list: the decaying particle itself.
pub fn reconstructed_parent(pdg: i32) -> DecayProduct {
    DecayProduct {
        pdg,
        status: DECAYED_STATUS,
        first_mother: 0,
        momentum: FourMomentum::default(),
        vertex_offset: [0.0; 3],
        time_offset: 0.0,
    }
}

/// A decay product with a 1-based local mother index.
pub fn product(pdg: i32, status: i32, first_mother: usize, offset: [f64; 3], time_offset: f64) -> DecayProduct {
    DecayProduct {
        pdg,
        status,
        first_mother,
        momentum: FourMomentum::from_momentum_and_mass([0.1, 0.2, 1.5], 0.139_57),
        vertex_offset: offset,
        time_offset,
    }
}

/// Decay engine that replays canned responses.
///
/// Each `decay` call pops the next scripted response; once the script is
/// exhausted every call returns `fallback`.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    script: VecDeque<Option<Vec<DecayProduct>>>,
    fallback: Option<Vec<DecayProduct>>,
    pending: Vec<DecayProduct>,
    /// Codes passed to `decay`, in call order.
    pub calls: Vec<i32>,
    pub initializations: usize,
    pub loads: usize,
    pub table_path: Option<PathBuf>,
    pub policy: Option<ForceDecayPolicy>,
}

impl ScriptedEngine {
    /// Answer every call with `products`.
    pub fn repeating(products: Vec<DecayProduct>) -> Self {
        Self { fallback: Some(products), ..Default::default() }
    }

    /// Fail the next `count` calls before falling back to the usual answer.
    pub fn failing_first(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.script.push_back(None);
        }
        self
    }

    /// Answer the next call with `products`.
    pub fn then(mut self, products: Vec<DecayProduct>) -> Self {
        self.script.push_back(Some(products));
        self
    }
}

impl DecayEngine for ScriptedEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        self.initializations += 1;
        Ok(())
    }

    fn set_force_decay(&mut self, policy: ForceDecayPolicy) {
        self.policy = Some(policy);
    }

    fn set_decay_table_path(&mut self, path: &Path) {
        self.table_path = Some(path.to_path_buf());
    }

    fn load_decay_table(&mut self) -> Result<(), EngineError> {
        self.loads += 1;
        Ok(())
    }

    fn decay(&mut self, pdg: i32, _momentum: &FourMomentum) -> Option<usize> {
        self.calls.push(pdg);
        let response = match self.script.pop_front() {
            Some(response) => response,
            None => self.fallback.clone(),
        };
        let products = response?;
        let n = products.len();
        self.pending = products;
        Some(n)
    }

    fn import_products(&mut self, out: &mut Vec<DecayProduct>) {
        out.append(&mut self.pending);
    }
}

/// [`EventStack`] wrapper that records collaborator calls and can refuse pushes.
#[derive(Debug, Default)]
pub struct RecordingStack {
    pub inner: EventStack,
    /// Every accepted push with the index it was given.
    pub pushes: Vec<(usize, NewParticle)>,
    pub retained: Vec<usize>,
    pub high_water_marks: Vec<usize>,
    /// 1-based push attempts to refuse.
    refuse: Vec<usize>,
    attempts: usize,
}

impl RecordingStack {
    pub fn new(primaries: Vec<Particle>) -> Self {
        Self { inner: EventStack::from_primaries(primaries), ..Default::default() }
    }

    /// Refuse the `attempt`-th push (1-based, counted over the whole pass).
    pub fn refusing(mut self, attempt: usize) -> Self {
        self.refuse.push(attempt);
        self
    }

    pub fn particle(&self, index: usize) -> &Particle {
        &self.inner.particles()[index]
    }

    /// Index assigned to the `n`-th accepted push (0-based).
    pub fn pushed_index(&self, n: usize) -> usize {
        self.pushes[n].0
    }
}

impl ParticleStack for RecordingStack {
    fn count(&self) -> usize {
        self.inner.count()
    }

    fn primary_count(&self) -> usize {
        self.inner.primary_count()
    }

    fn get(&self, index: usize) -> Option<&Particle> {
        self.inner.get(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.inner.get_mut(index)
    }

    fn push(&mut self, particle: NewParticle) -> Result<usize, StackError> {
        self.attempts += 1;
        if self.refuse.contains(&self.attempts) {
            return Err(StackError::CapacityExceeded { capacity: self.inner.count() });
        }
        let index = self.inner.push(particle.clone())?;
        self.pushes.push((index, particle));
        Ok(index)
    }

    fn retain(&mut self, index: usize) {
        self.retained.push(index);
        self.inner.retain(index);
    }

    fn mark_high_water_mark(&mut self, index: usize) {
        self.high_water_marks.push(index);
        self.inner.mark_high_water_mark(index);
    }
}
