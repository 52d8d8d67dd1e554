//! # flavdecay-engine: Table-driven particle decays.
//!
//! This crate implements the [`DecayEngine`](flavdecay_core::traits::DecayEngine)
//! trait on top of a JSON decay table. Kinematics are generated with
//! sequential two-body phase space; decay vertices follow the exponential
//! proper-time distribution given by each particle's `ctau`.

pub mod engine;
pub mod kinematics;
pub mod table;

pub use engine::TableDecayer;
pub use table::{DecayCatalog, DecayTable};
