//! Coarse quark-flavour classification of PDG codes.

/// Reduce a PDG code to its flavour digit.
///
/// The sign is ignored. Excited states (`> 100000`, then `> 10000`) are
/// folded back onto the ground-state code, mesons are divided by 100 and
/// baryons once more by 10. The result is 3 for strange, 4 for charm and
/// 5 for beauty hadrons. Quarks keep their own code and leptons reduce to 0.
///
/// # Examples
///
/// ```
/// use flavdecay_core::flavor::classify;
/// assert_eq!(classify(511), 5);
/// assert_eq!(classify(-421), 4);
/// assert_eq!(classify(5122), 5);
/// assert_eq!(classify(321), 3);
/// ```
pub fn classify(pdg: i32) -> i32 {
    let mut code = pdg.unsigned_abs();
    if code > 100_000 {
        code %= 100_000;
    }
    if code > 10_000 {
        code %= 10_000;
    }
    if code > 10 {
        code /= 100;
    }
    if code > 10 {
        code /= 10;
    }
    code as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{FLAVOR_BEAUTY, FLAVOR_CHARM, FLAVOR_STRANGE};
    use proptest::prelude::*;

    #[test]
    fn beauty_mesons() {
        assert_eq!(classify(511), FLAVOR_BEAUTY);
        assert_eq!(classify(521), FLAVOR_BEAUTY);
        assert_eq!(classify(531), FLAVOR_BEAUTY);
    }

    #[test]
    fn charm_mesons() {
        assert_eq!(classify(421), FLAVOR_CHARM);
        assert_eq!(classify(411), FLAVOR_CHARM);
        assert_eq!(classify(431), FLAVOR_CHARM);
    }

    #[test]
    fn strange_mesons() {
        assert_eq!(classify(321), FLAVOR_STRANGE);
        assert_eq!(classify(310), FLAVOR_STRANGE);
    }

    #[test]
    fn baryons() {
        assert_eq!(classify(5122), FLAVOR_BEAUTY);
        assert_eq!(classify(4122), FLAVOR_CHARM);
        assert_eq!(classify(3122), FLAVOR_STRANGE);
    }

    #[test]
    fn excited_states_fold_onto_ground_state() {
        // D*(2007)0 and an orbitally excited B
        assert_eq!(classify(423), FLAVOR_CHARM);
        assert_eq!(classify(10511), FLAVOR_BEAUTY);
        assert_eq!(classify(100_443), FLAVOR_CHARM);
    }

    #[test]
    fn leptons_have_no_flavor_and_quarks_keep_their_code() {
        assert_eq!(classify(11), 0);
        assert_eq!(classify(13), 0);
        assert_eq!(classify(5), 5);
        assert_eq!(classify(-4), 4);
    }

    #[test]
    fn zero_is_zero() {
        assert_eq!(classify(0), 0);
    }

    #[test]
    fn extreme_codes_do_not_panic() {
        let _ = classify(i32::MIN);
        let _ = classify(i32::MAX);
    }

    proptest! {
        #[test]
        fn sign_independent(pdg in -10_000_000i32..10_000_000) {
            prop_assert_eq!(classify(pdg), classify(-pdg));
        }

        #[test]
        fn repeated_calls_agree(pdg in any::<i32>()) {
            let first = classify(pdg);
            prop_assert_eq!(classify(pdg), first);
        }
    }
}
