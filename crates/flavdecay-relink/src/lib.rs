//! # flavdecay-relink: Forced decays relinked into the particle history.
//!
//! The [`Relinker`] selects particles of one flavour from an event's
//! particle stack, has a [`DecayEngine`](flavdecay_core::traits::DecayEngine)
//! decay them, and pushes the products back with consistent parent
//! indices, absolute origins and times, and trackability flags:
//! - **Species filter**: all particles, beauty only, or charm only.
//! - **Bounded retries**: a decay the engine cannot sample is retried up to
//!   a configurable cap, then reported as unresolved.
//! - **Index relinking**: engine-local mother indices are mapped onto
//!   global stack indices through a [`ParentIndexMap`].

pub mod config;
pub mod parent_map;
pub mod relinker;
pub mod report;

pub use config::{RelinkerConfig, RetryPolicy, SpeciesFilter};
pub use parent_map::ParentIndexMap;
pub use relinker::{is_trackable, Relinker};
pub use report::PassReport;
