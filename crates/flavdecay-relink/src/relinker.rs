//! The decay relinker.
//!
//! One pass walks the generator-written primaries of the particle stack
//! (counted once at the start of the pass), forces every eligible
//! particle of the selected flavour to decay, and writes the decay products
//! back into the stack with parent links, absolute origins and times, and
//! trackability flags.
//!
//! Per candidate:
//! 1. The particle is marked decayed before the engine is called. The mark
//!    is never undone, even when no decay can be sampled.
//! 2. The engine is called until it returns a product list, up to the
//!    configured [`RetryPolicy`](crate::RetryPolicy) cap.
//! 3. Products `1..n` are pushed in order. A product whose mother was pushed
//!    earlier in the same decay is attached to it; all others are attached
//!    to the candidate. A refused push leaves no map entry, so that
//!    product's descendants are attached to the candidate as well.

use flavdecay_core::constants::{DECAY_PRODUCT_WEIGHT, HEAVY_PDG_THRESHOLD, STABLE_STATUS};
use flavdecay_core::error::RelinkError;
use flavdecay_core::flavor::classify;
use flavdecay_core::traits::{DecayEngine, ParticleStack};
use flavdecay_core::types::{DecayProduct, FourMomentum, NewParticle, ProductionMechanism};
use tracing::{debug, error, info, warn};

use crate::config::{RelinkerConfig, RetryPolicy};
use crate::parent_map::ParentIndexMap;
use crate::report::PassReport;

/// The particle currently being decayed.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    pdg: i32,
    momentum: FourMomentum,
    origin: [f64; 3],
    time: f64,
}

/// Whether a product with engine status `status` is transported downstream.
pub fn is_trackable(status: i32) -> bool {
    status == STABLE_STATUS
}

/// Forces flavoured particles to decay and relinks the products.
///
/// The stack is injected with [`with_stack`](Self::with_stack) or
/// [`attach_stack`](Self::attach_stack); a pass without one fails with
/// [`RelinkError::NoStack`].
pub struct Relinker<E, S> {
    engine: E,
    stack: Option<S>,
    config: RelinkerConfig,
    initialized: bool,
    scratch: Vec<DecayProduct>,
    parents: ParentIndexMap,
}

impl<E: DecayEngine, S: ParticleStack> Relinker<E, S> {
    /// Relinker without a stack.
    pub fn new(engine: E, config: RelinkerConfig) -> Self {
        Self {
            engine,
            stack: None,
            config,
            initialized: false,
            scratch: Vec::new(),
            parents: ParentIndexMap::new(),
        }
    }

    pub fn with_stack(engine: E, stack: S, config: RelinkerConfig) -> Self {
        let mut relinker = Self::new(engine, config);
        relinker.stack = Some(stack);
        relinker
    }

    /// Use `stack` for the following passes, returning the previous one.
    pub fn attach_stack(&mut self, stack: S) -> Option<S> {
        self.stack.replace(stack)
    }

    pub fn detach_stack(&mut self) -> Option<S> {
        self.stack.take()
    }

    pub fn stack(&self) -> Option<&S> {
        self.stack.as_ref()
    }

    pub fn stack_mut(&mut self) -> Option<&mut S> {
        self.stack.as_mut()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &RelinkerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize and configure the decay engine.
    ///
    /// Runs once. Later calls log a warning and return `Ok(())` without
    /// touching the engine.
    pub fn init(&mut self) -> Result<(), RelinkError> {
        if self.initialized {
            warn!("decay engine already initialized, ignoring");
            return Ok(());
        }
        self.engine.initialize()?;
        if let Some(path) = self.config.user_decay_table() {
            info!(path = %path.display(), "using user decay table");
            self.engine.set_decay_table_path(path);
        }
        self.engine.set_force_decay(self.config.force_decay);
        self.engine.load_decay_table()?;
        self.initialized = true;
        info!(
            species = %self.config.species,
            force_decay = %self.config.force_decay,
            max_attempts = ?self.config.retry.max_attempts,
            "decay relinker initialized"
        );
        Ok(())
    }

    /// Run one pass over the attached stack.
    pub fn generate(&mut self) -> Result<PassReport, RelinkError> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.generate_with(&mut scratch);
        self.scratch = scratch;
        result
    }

    /// Run one pass using `scratch` to receive decay products.
    ///
    /// `scratch` is cleared before every import and after every candidate;
    /// its contents on entry are discarded.
    pub fn generate_with(&mut self, scratch: &mut Vec<DecayProduct>) -> Result<PassReport, RelinkError> {
        let Some(stack) = self.stack.as_mut() else {
            error!("no particle stack attached, aborting pass");
            return Err(RelinkError::NoStack);
        };
        if !self.initialized {
            error!("decay engine not initialized, aborting pass");
            return Err(RelinkError::NotInitialized);
        }

        let snapshot = stack.primary_count().min(stack.count());
        let mut report = PassReport { scanned: snapshot, ..Default::default() };

        for index in 0..snapshot {
            let Some(particle) = stack.get(index) else {
                continue;
            };
            let pdg = particle.pdg;
            let flavor = classify(pdg);
            if !self.config.species.accepts(flavor) {
                continue;
            }
            report.selected += 1;

            if !particle.is_undecided() {
                report.skipped_already_decayed += 1;
                if pdg.unsigned_abs() > HEAVY_PDG_THRESHOLD {
                    warn!(
                        index,
                        pdg,
                        status = particle.status,
                        n_daughters = particle.n_daughters,
                        "particle already decayed, skipping"
                    );
                }
                continue;
            }

            let candidate = Candidate {
                index,
                pdg,
                momentum: particle.momentum,
                origin: particle.vertex,
                time: particle.time,
            };
            debug!(index, pdg, flavor, "forcing decay");
            if let Some(particle) = stack.get_mut(index) {
                particle.mark_forced_decay();
            }

            scratch.clear();
            let n = match sample_decay(&mut self.engine, self.config.retry, &candidate) {
                Ok(n) => n,
                Err(err) => {
                    error!(index, pdg, %err, "giving up on decay");
                    report.unresolved.push(err);
                    continue;
                }
            };
            self.engine.import_products(scratch);
            report.decayed += 1;
            if scratch.len() != n {
                debug!(index, pdg, reported = n, imported = scratch.len(), "product count mismatch");
            }
            let n = n.min(scratch.len());
            debug!(index, pdg, products = n, "decay sampled");

            if n > 1 {
                relink_products(stack, &scratch[..n], &mut self.parents, &candidate, &mut report);
            }
            scratch.clear();
        }

        info!(
            scanned = report.scanned,
            selected = report.selected,
            decayed = report.decayed,
            pushed = report.pushed,
            push_failures = report.push_failures,
            unresolved = report.unresolved.len(),
            "decay relinking pass done"
        );
        Ok(report)
    }
}

/// Call the engine until it samples a decay or the retry cap is reached.
fn sample_decay<E: DecayEngine>(
    engine: &mut E,
    retry: RetryPolicy,
    candidate: &Candidate,
) -> Result<usize, RelinkError> {
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        if let Some(n) = engine.decay(candidate.pdg, &candidate.momentum) {
            if attempts > 1 {
                debug!(index = candidate.index, pdg = candidate.pdg, attempts, "decay sampled after retries");
            }
            return Ok(n);
        }
        if !retry.allows_retry(attempts) {
            return Err(RelinkError::DecayUnresolvable {
                index: candidate.index,
                pdg: candidate.pdg,
                attempts,
            });
        }
        if attempts == 1 {
            warn!(index = candidate.index, pdg = candidate.pdg, "no decay sampled, retrying");
        }
    }
}

/// Push `products[1..]` onto the stack under `candidate`.
fn relink_products<S: ParticleStack>(
    stack: &mut S,
    products: &[DecayProduct],
    parents: &mut ParentIndexMap,
    candidate: &Candidate,
    report: &mut PassReport,
) {
    let trackable: Vec<bool> = products.iter().map(|p| is_trackable(p.status)).collect();
    debug!(
        index = candidate.index,
        trackable = trackable.iter().skip(1).filter(|t| **t).count(),
        "trackable decay products"
    );

    parents.reset(products.len());
    for (local, product) in products.iter().enumerate().skip(1) {
        let parent = parents.parent_of(product, candidate.index);
        let origin = [
            candidate.origin[0] + product.vertex_offset[0],
            candidate.origin[1] + product.vertex_offset[1],
            candidate.origin[2] + product.vertex_offset[2],
        ];
        let new_particle = NewParticle {
            trackable: trackable[local],
            parent,
            pdg: product.pdg,
            momentum: product.momentum,
            origin,
            polarization: [0.0; 3],
            time: candidate.time + product.time_offset,
            mechanism: ProductionMechanism::Decay,
            weight: DECAY_PRODUCT_WEIGHT,
            status: product.status,
        };
        match stack.push(new_particle) {
            Ok(new_index) => {
                parents.record(local, new_index);
                stack.retain(new_index);
                stack.mark_high_water_mark(new_index);
                report.pushed += 1;
                debug!(
                    index = candidate.index,
                    local,
                    pdg = product.pdg,
                    first_mother = product.first_mother,
                    parent,
                    new_index,
                    "decay product pushed"
                );
            }
            Err(err) => {
                report.push_failures += 1;
                warn!(index = candidate.index, pdg = product.pdg, %err, "failed to push decay product");
            }
        }
    }
}
