//! Trait interfaces between the relinker and its collaborators.
//!
//! - [`ParticleStack`]: the simulation's particle history ([`EventStack`](crate::stack::EventStack) implements)
//! - [`DecayEngine`]: samples decays of a single particle (flavdecay-engine implements)

use std::path::Path;

use crate::error::{EngineError, StackError};
use crate::types::{DecayProduct, ForceDecayPolicy, FourMomentum, NewParticle, Particle};

/// Read/append access to the particle history of one event.
///
/// Indices are global and stable for the lifetime of a pass.
pub trait ParticleStack {
    /// Number of particles currently in the stack.
    fn count(&self) -> usize;

    /// Particle at `index`, or `None` when out of range.
    fn get(&self, index: usize) -> Option<&Particle>;

    /// Mutable particle at `index`, or `None` when out of range.
    fn get_mut(&mut self, index: usize) -> Option<&mut Particle>;

    /// Append a particle, returning its new global index.
    fn push(&mut self, particle: NewParticle) -> Result<usize, StackError>;

    /// The particle at `index` must survive any later compaction.
    fn retain(&mut self, index: usize);

    /// `index` is the highest index guaranteed to stay valid.
    fn mark_high_water_mark(&mut self, index: usize);

    /// Whether `index` refers to a particle.
    ///
    /// Default implementation: `index < count()`.
    fn contains(&self, index: usize) -> bool {
        index < self.count()
    }

    /// Number of leading entries written by the upstream generator.
    ///
    /// A relinking pass only visits these. Default implementation: `count()`.
    fn primary_count(&self) -> usize {
        self.count()
    }
}

/// Black-box decay sampler.
///
/// Lifecycle: [`initialize`](Self::initialize) loads the default tables,
/// then [`set_decay_table_path`](Self::set_decay_table_path) and
/// [`set_force_decay`](Self::set_force_decay) configure it and
/// [`load_decay_table`](Self::load_decay_table) finalizes loading.
pub trait DecayEngine {
    /// Load the default decay and particle tables.
    fn initialize(&mut self) -> Result<(), EngineError>;

    /// Restrict sampling to the channels allowed by `policy`.
    fn set_force_decay(&mut self, policy: ForceDecayPolicy);

    /// Use the decay table at `path` on top of the defaults.
    fn set_decay_table_path(&mut self, path: &Path);

    /// Finish table loading with the configured path and policy.
    fn load_decay_table(&mut self) -> Result<(), EngineError>;

    /// Sample one decay of `pdg` with lab momentum `momentum`.
    ///
    /// Returns the number of entries in the product list, including the
    /// reconstructed parent at index 0, or `None` when no valid decay
    /// could be sampled and the call should be retried.
    fn decay(&mut self, pdg: i32, momentum: &FourMomentum) -> Option<usize>;

    /// Append the products of the last successful [`decay`](Self::decay) to `out`.
    fn import_products(&mut self, out: &mut Vec<DecayProduct>);
}

macro_rules! forward_stack {
    ($($ty:ty),*) => {$(
        impl<T: ParticleStack + ?Sized> ParticleStack for $ty {
            fn count(&self) -> usize { (**self).count() }
            fn get(&self, index: usize) -> Option<&Particle> { (**self).get(index) }
            fn get_mut(&mut self, index: usize) -> Option<&mut Particle> { (**self).get_mut(index) }
            fn push(&mut self, particle: NewParticle) -> Result<usize, StackError> { (**self).push(particle) }
            fn retain(&mut self, index: usize) { (**self).retain(index) }
            fn mark_high_water_mark(&mut self, index: usize) { (**self).mark_high_water_mark(index) }
            fn contains(&self, index: usize) -> bool { (**self).contains(index) }
            fn primary_count(&self) -> usize { (**self).primary_count() }
        }
    )*};
}

macro_rules! forward_engine {
    ($($ty:ty),*) => {$(
        impl<T: DecayEngine + ?Sized> DecayEngine for $ty {
            fn initialize(&mut self) -> Result<(), EngineError> { (**self).initialize() }
            fn set_force_decay(&mut self, policy: ForceDecayPolicy) { (**self).set_force_decay(policy) }
            fn set_decay_table_path(&mut self, path: &Path) { (**self).set_decay_table_path(path) }
            fn load_decay_table(&mut self) -> Result<(), EngineError> { (**self).load_decay_table() }
            fn decay(&mut self, pdg: i32, momentum: &FourMomentum) -> Option<usize> { (**self).decay(pdg, momentum) }
            fn import_products(&mut self, out: &mut Vec<DecayProduct>) { (**self).import_products(out) }
        }
    )*};
}

// Borrowed and boxed collaborators can be handed to the relinker directly.
forward_stack!(&mut T, Box<T>);
forward_engine!(&mut T, Box<T>);
