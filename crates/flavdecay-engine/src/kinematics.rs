//! Phase-space kinematics for sequential two-body decays.
//!
//! Momenta are generated in the rest frame of the decaying particle and
//! boosted by the caller. N-body final states are built from a chain of
//! two-body splits with uniformly sampled intermediate masses, which is
//! enough for vertexing and lineage studies but not a flat phase space.

use std::f64::consts::TAU;

use flavdecay_core::constants::SPEED_OF_LIGHT_CM_PER_S;
use flavdecay_core::types::FourMomentum;
use rand::Rng;

/// Momentum of either daughter in the two-body decay `m -> m1 + m2`.
///
/// Returns `None` when the decay is kinematically closed.
pub fn two_body_momentum(m: f64, m1: f64, m2: f64) -> Option<f64> {
    if m < m1 + m2 {
        return None;
    }
    let sum = m1 + m2;
    let diff = m1 - m2;
    let arg = (m * m - sum * sum) * (m * m - diff * diff);
    Some(arg.max(0.0).sqrt() / (2.0 * m))
}

/// Unit vector with uniformly distributed direction.
pub fn isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> [f64; 3] {
    let cos_theta: f64 = rng.gen_range(-1.0..=1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi: f64 = rng.gen_range(0.0..TAU);
    [sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta]
}

/// Daughter momenta of a particle of mass `parent_mass` decaying at rest.
///
/// Returns one four-momentum per entry of `masses`, in order, or `None`
/// when fewer than two daughters are given or the decay is closed.
pub fn decay_at_rest<R: Rng + ?Sized>(
    rng: &mut R,
    parent_mass: f64,
    masses: &[f64],
) -> Option<Vec<FourMomentum>> {
    if masses.len() < 2 || masses.iter().sum::<f64>() > parent_mass {
        return None;
    }

    let first = masses[0];
    let rest_masses = &masses[1..];
    // Mass of the system recoiling against the first daughter.
    let recoil_mass = if rest_masses.len() == 1 {
        rest_masses[0]
    } else {
        let lo: f64 = rest_masses.iter().sum();
        let hi = parent_mass - first;
        lo + (hi - lo) * rng.gen_range(0.0..1.0)
    };

    let p = two_body_momentum(parent_mass, first, recoil_mass)?;
    let dir = isotropic_direction(rng);
    let p1 = [p * dir[0], p * dir[1], p * dir[2]];
    let first_p4 = FourMomentum::from_momentum_and_mass(p1, first);
    let recoil_p4 = FourMomentum::from_momentum_and_mass([-p1[0], -p1[1], -p1[2]], recoil_mass);

    let mut out = Vec::with_capacity(masses.len());
    out.push(first_p4);
    if rest_masses.len() == 1 {
        out.push(recoil_p4);
    } else {
        let beta = recoil_p4.boost_vector();
        for p4 in decay_at_rest(rng, recoil_mass, rest_masses)? {
            out.push(p4.boost(beta));
        }
    }
    Some(out)
}

/// Sample where and when a particle decays.
///
/// `ctau` is the proper decay length in cm and `mass` the rest mass used
/// for the Lorentz factors. Returns the lab-frame displacement (cm) and
/// lab-frame time of flight (s). Particles with no lifetime decay in place.
pub fn flight<R: Rng + ?Sized>(
    rng: &mut R,
    ctau: f64,
    mass: f64,
    momentum: &FourMomentum,
) -> ([f64; 3], f64) {
    if ctau <= 0.0 || mass <= 0.0 {
        return ([0.0; 3], 0.0);
    }
    let u: f64 = rng.gen_range(0.0..1.0);
    let proper_length = -(1.0 - u).ln() * ctau;
    let scale = proper_length / mass;
    let displacement = [momentum.px * scale, momentum.py * scale, momentum.pz * scale];
    let time = proper_length * momentum.e / mass / SPEED_OF_LIGHT_CM_PER_S;
    (displacement, time)
}
