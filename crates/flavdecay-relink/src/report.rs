//! Summary of one relinking pass.

use flavdecay_core::error::RelinkError;
use serde::{Serialize, Serializer};

/// What a call to [`Relinker::generate`](crate::Relinker::generate) did.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Particles in the stack snapshot taken at the start of the pass.
    pub scanned: usize,
    /// Particles that passed the species filter.
    pub selected: usize,
    /// Selected particles skipped because they were already decayed.
    pub skipped_already_decayed: usize,
    /// Candidates whose decay was sampled.
    pub decayed: usize,
    /// Decay products added to the stack.
    pub pushed: usize,
    /// Decay products the stack refused.
    pub push_failures: usize,
    /// Candidates marked decayed for which no decay could be sampled.
    #[serde(serialize_with = "serialize_errors")]
    pub unresolved: Vec<RelinkError>,
}

impl PassReport {
    /// Every selected candidate was either skipped or decayed.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Turn the first unresolved decay into an error.
    pub fn into_result(mut self) -> Result<Self, RelinkError> {
        if self.unresolved.is_empty() {
            Ok(self)
        } else {
            Err(self.unresolved.swap_remove(0))
        }
    }
}

fn serialize_errors<S: Serializer>(errors: &[RelinkError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
