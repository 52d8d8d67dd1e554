//! In-memory particle history for one event.
//!
//! [`EventStack`] is the default [`ParticleStack`]: primaries come from the
//! upstream generator, decay products are appended behind them and linked
//! to their mothers. Entries can be marked as retained and the stack can
//! later be compacted, dropping intermediate entries nobody asked to keep.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StackError;
use crate::traits::ParticleStack;
use crate::types::{NewParticle, Particle};

/// Append-only particle history with lineage links.
///
/// Not thread-safe. A relinking pass owns the stack exclusively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStack {
    particles: Vec<Particle>,
    /// Number of leading entries written by the generator.
    n_primary: usize,
    /// Per-entry "must survive compaction" flag.
    kept: Vec<bool>,
    high_water_mark: Option<usize>,
    /// Maximum number of entries; `None` is unbounded.
    #[serde(default)]
    capacity: Option<usize>,
}

impl EventStack {
    /// Create a stack from generator output.
    ///
    /// Lineage links are taken as given; see [`try_from_primaries`](Self::try_from_primaries).
    pub fn from_primaries(primaries: Vec<Particle>) -> Self {
        let n_primary = primaries.len();
        Self {
            kept: vec![false; n_primary],
            particles: primaries,
            n_primary,
            high_water_mark: None,
            capacity: None,
        }
    }

    /// Create a stack from generator output, checking its lineage links.
    ///
    /// Every mother and daughter reference must point inside the event.
    pub fn try_from_primaries(primaries: Vec<Particle>) -> Result<Self, StackError> {
        let len = primaries.len();
        for p in &primaries {
            let links = [p.first_mother, p.first_daughter, p.last_daughter];
            if let Some(index) = links.into_iter().flatten().find(|&i| i >= len) {
                return Err(StackError::IndexOutOfRange { index, len });
            }
        }
        Ok(Self::from_primaries(primaries))
    }

    /// Limit the total number of entries; pushes beyond it fail.
    pub fn with_capacity_limit(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Number of generator-written entries.
    pub fn n_primary(&self) -> usize {
        self.n_primary
    }

    /// All particles in stack order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Consume the stack, returning its particles.
    pub fn into_particles(self) -> Vec<Particle> {
        self.particles
    }

    pub fn high_water_mark(&self) -> Option<usize> {
        self.high_water_mark
    }

    /// Whether `index` was marked with [`retain`](ParticleStack::retain).
    pub fn is_retained(&self, index: usize) -> bool {
        self.kept.get(index).copied().unwrap_or(false)
    }

    /// Global indices of the direct daughters of `index`.
    pub fn daughters(&self, index: usize) -> Vec<usize> {
        self.particles
            .iter()
            .enumerate()
            .skip(index + 1)
            .filter(|(_, p)| p.first_mother == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop entries that are neither primaries, retained, nor transported.
    ///
    /// Mothers of surviving entries are re-pointed at their closest
    /// surviving ancestor and daughter ranges are rebuilt. Returns the map
    /// from old to new index (`None` for dropped entries).
    pub fn compact(&mut self) -> Vec<Option<usize>> {
        let keep: Vec<bool> = self
            .particles
            .iter()
            .enumerate()
            .map(|(i, p)| i < self.n_primary || self.is_retained(i) || p.transport)
            .collect();

        let mut remap = vec![None; self.particles.len()];
        let mut next = 0;
        for (i, keep_it) in keep.iter().enumerate() {
            if *keep_it {
                remap[i] = Some(next);
                next += 1;
            }
        }

        let mut compacted = Vec::with_capacity(next);
        let mut kept = Vec::with_capacity(next);
        for (i, p) in self.particles.iter().enumerate() {
            if !keep[i] {
                continue;
            }
            let mut q = p.clone();
            q.first_mother = self.surviving_ancestor(p.first_mother, &keep, &remap);
            compacted.push(q);
            kept.push(self.is_retained(i));
        }

        // Only entries whose daughters live in this stack get their links rebuilt;
        // upstream daughter counts without stack entries are left alone.
        let linked: Vec<bool> = compacted.iter().map(|p| p.first_daughter.is_some()).collect();
        for (p, is_linked) in compacted.iter_mut().zip(&linked) {
            if *is_linked {
                p.first_daughter = None;
                p.last_daughter = None;
                p.n_daughters = 0;
            }
        }
        for i in 0..compacted.len() {
            let Some(mother) = compacted[i].first_mother else { continue };
            if !linked[mother] {
                continue;
            }
            let m = &mut compacted[mother];
            if m.first_daughter.is_none() {
                m.first_daughter = Some(i);
            }
            m.last_daughter = Some(i);
            m.n_daughters += 1;
        }

        self.high_water_mark = self
            .high_water_mark
            .and_then(|hwm| remap.iter().take(hwm.saturating_add(1)).rev().find_map(|r| *r));

        debug!(before = self.particles.len(), after = compacted.len(), "stack compacted");
        self.particles = compacted;
        self.kept = kept;
        remap
    }

    fn surviving_ancestor(
        &self,
        mut mother: Option<usize>,
        keep: &[bool],
        remap: &[Option<usize>],
    ) -> Option<usize> {
        // Bounded walk: lineage read from disk may dangle or loop.
        for _ in 0..self.particles.len() {
            let m = mother?;
            if *keep.get(m)? {
                return remap[m];
            }
            mother = self.particles[m].first_mother;
        }
        None
    }
}

impl ParticleStack for EventStack {
    fn count(&self) -> usize {
        self.particles.len()
    }

    fn primary_count(&self) -> usize {
        self.n_primary.min(self.particles.len())
    }

    fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    fn push(&mut self, particle: NewParticle) -> Result<usize, StackError> {
        let len = self.particles.len();
        if let Some(capacity) = self.capacity {
            if len >= capacity {
                return Err(StackError::CapacityExceeded { capacity });
            }
        }
        if particle.parent >= len {
            return Err(StackError::UnknownParent { parent: particle.parent, len });
        }

        let index = len;
        let parent = &mut self.particles[particle.parent];
        if parent.first_daughter.is_none() {
            parent.first_daughter = Some(index);
        }
        parent.last_daughter = Some(index);
        parent.n_daughters += 1;

        self.particles.push(Particle {
            pdg: particle.pdg,
            status: particle.status,
            momentum: particle.momentum,
            vertex: particle.origin,
            time: particle.time,
            polarization: particle.polarization,
            weight: particle.weight,
            mechanism: particle.mechanism,
            first_mother: Some(particle.parent),
            first_daughter: None,
            last_daughter: None,
            n_daughters: 0,
            done: false,
            transport: particle.trackable,
        });
        self.kept.push(false);
        Ok(index)
    }

    fn retain(&mut self, index: usize) {
        if let Some(flag) = self.kept.get_mut(index) {
            *flag = true;
        }
    }

    fn mark_high_water_mark(&mut self, index: usize) {
        self.high_water_mark = Some(self.high_water_mark.map_or(index, |hwm| hwm.max(index)));
    }
}
