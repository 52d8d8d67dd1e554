//! Reading generator output.
//!
//! An event file is a JSON array of [`Particle`]s. Lineage references are
//! checked on load so later stack operations never see a dangling index.

use std::io::Read;

use tracing::debug;

use crate::error::FlavdecayError;
use crate::stack::EventStack;
use crate::types::Particle;

/// Parse one event and build its particle stack.
pub fn read_event<R: Read>(reader: R) -> Result<EventStack, FlavdecayError> {
    let particles: Vec<Particle> = serde_json::from_reader(reader).map_err(|e| {
        if e.is_io() { FlavdecayError::Io(e.to_string()) } else { FlavdecayError::Parse(e.to_string()) }
    })?;
    debug!(particles = particles.len(), "event parsed");
    Ok(EventStack::try_from_primaries(particles)?)
}
