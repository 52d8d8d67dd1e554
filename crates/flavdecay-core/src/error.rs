//! Error types for flavdecay.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("stack capacity of {capacity} particles exceeded")] CapacityExceeded { capacity: usize },
    #[error("unknown parent index {parent} (stack holds {len} particles)")] UnknownParent { parent: usize, len: usize },
    #[error("particle index out of range: {index} >= {len}")] IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("decay engine not initialized")] NotInitialized,
    #[error("cannot read decay table {path}: {reason}")] TableRead { path: PathBuf, reason: String },
    #[error("malformed decay table {source_name}: {reason}")] TableParse { source_name: String, reason: String },
    #[error("invalid decay channel for {parent}: {reason}")] InvalidChannel { parent: i32, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("decay table path does not exist: {}", path.display())] DecayTableNotFound { path: PathBuf },
    #[error("unknown species filter: {0}")] UnknownSpecies(String),
    #[error("unknown force-decay policy: {0}")] UnknownForceDecay(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelinkError {
    #[error("no particle stack attached")] NoStack,
    #[error("decay engine used before initialization")] NotInitialized,
    #[error("decay of particle {index} (pdg {pdg}) unresolved after {attempts} attempts")] DecayUnresolvable { index: usize, pdg: i32, attempts: u32 },
    #[error(transparent)] Engine(#[from] EngineError),
}

#[derive(Error, Debug)]
pub enum FlavdecayError {
    #[error(transparent)] Stack(#[from] StackError),
    #[error(transparent)] Engine(#[from] EngineError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Relink(#[from] RelinkError),
    #[error("event io: {0}")] Io(String),
    #[error("malformed event: {0}")] Parse(String),
}
