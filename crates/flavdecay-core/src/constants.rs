//! Status codes and physical constants shared by every flavdecay crate.
//!
//! Status codes follow the generator convention used by the upstream
//! particle history: `1` is a final-state particle that nothing has decayed
//! yet, anything else has already been handled.

/// Status of a particle that is neither transported nor decayed.
///
/// Only particles with this status and no daughters are decay candidates.
pub const STATUS_UNDECIDED: i32 = 1;

/// Status written onto a candidate once the relinker forces its decay.
pub const STATUS_FORCED_DECAY: i32 = 11;

/// Engine status of a leaf decay product that must be tracked downstream.
///
/// # Examples
///
/// ```
/// use flavdecay_core::constants::{STABLE_STATUS, STATUS_UNDECIDED};
/// assert_eq!(STABLE_STATUS, STATUS_UNDECIDED);
/// ```
pub const STABLE_STATUS: i32 = 1;

/// Engine status of a product that decayed further inside the engine.
pub const DECAYED_STATUS: i32 = 2;

/// PDG codes with a magnitude above this are hadrons or heavy leptons.
///
/// Already-decayed candidates above the threshold are reported; lighter
/// codes (quarks, gluons, leptons) are skipped silently.
pub const HEAVY_PDG_THRESHOLD: u32 = 10;

/// Flavour digit of strange hadrons.
pub const FLAVOR_STRANGE: i32 = 3;
/// Flavour digit of charm hadrons.
pub const FLAVOR_CHARM: i32 = 4;
/// Flavour digit of beauty hadrons.
pub const FLAVOR_BEAUTY: i32 = 5;

/// Speed of light in cm/s. Positions are in cm and times in seconds.
pub const SPEED_OF_LIGHT_CM_PER_S: f64 = 2.997_924_58e10;

/// Default number of attempts the relinker makes before a decay is declared unresolvable.
pub const DEFAULT_MAX_DECAY_ATTEMPTS: u32 = 1_000;

/// Weight assigned to every particle pushed from a decay.
pub const DECAY_PRODUCT_WEIGHT: f64 = 1.0;
