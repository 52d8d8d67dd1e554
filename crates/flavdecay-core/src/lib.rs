//! # flavdecay-core
//! Particle types, collaborator traits, and the in-memory event stack
//! shared by the flavdecay crates.

pub mod constants;
pub mod error;
pub mod event;
pub mod flavor;
pub mod stack;
pub mod traits;
pub mod types;

pub use event::read_event;
pub use flavor::classify;
pub use stack::EventStack;
pub use traits::{DecayEngine, ParticleStack};
