//! Local-to-global index map for one decay.
//!
//! The engine returns its products as a flat list whose entries refer to
//! their mothers by list position. While those products are pushed, each
//! successful push records its new stack index here so that later
//! products can be attached to it.

use flavdecay_core::types::DecayProduct;

/// Global stack index of each product of the current decay.
///
/// `None` marks a product that has not been pushed yet or whose push failed.
#[derive(Debug, Clone, Default)]
pub struct ParentIndexMap {
    slots: Vec<Option<usize>>,
}

impl ParentIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous decay and make room for `len` products.
    pub fn reset(&mut self, len: usize) {
        self.slots.clear();
        self.slots.resize(len, None);
    }

    /// Record that local product `local` now lives at `global` in the stack.
    pub fn record(&mut self, local: usize, global: usize) {
        if local >= self.slots.len() {
            self.slots.resize(local + 1, None);
        }
        self.slots[local] = Some(global);
    }

    /// Stack index of local product `local`, if it was pushed.
    pub fn resolve(&self, local: usize) -> Option<usize> {
        self.slots.get(local).copied().flatten()
    }

    /// Stack index `product` must be attached to.
    ///
    /// Products whose mother is the decaying particle itself, or whose
    /// mother never made it onto the stack, hang off `candidate`.
    pub fn parent_of(&self, product: &DecayProduct, candidate: usize) -> usize {
        product
            .local_mother()
            .filter(|&mother| mother > 0)
            .and_then(|mother| self.resolve(mother))
            .unwrap_or(candidate)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flavdecay_core::constants::STABLE_STATUS;
    use flavdecay_core::types::FourMomentum;
    use proptest::prelude::*;

    fn product(first_mother: usize) -> DecayProduct {
        DecayProduct {
            pdg: 211,
            status: STABLE_STATUS,
            first_mother,
            momentum: FourMomentum::default(),
            vertex_offset: [0.0; 3],
            time_offset: 0.0,
        }
    }

    #[test]
    fn direct_daughters_hang_off_candidate() {
        let mut map = ParentIndexMap::new();
        map.reset(3);
        map.record(1, 40);
        assert_eq!(map.parent_of(&product(1), 7), 7);
    }

    #[test]
    fn granddaughters_hang_off_resolved_mother() {
        let mut map = ParentIndexMap::new();
        map.reset(4);
        map.record(1, 40);
        map.record(2, 41);
        assert_eq!(map.parent_of(&product(3), 7), 41);
    }

    #[test]
    fn unresolved_mother_falls_back_to_candidate() {
        let mut map = ParentIndexMap::new();
        map.reset(4);
        map.record(1, 40);
        assert_eq!(map.parent_of(&product(3), 7), 7);
        // mother index beyond the list
        assert_eq!(map.parent_of(&product(99), 7), 7);
        // no mother at all
        assert_eq!(map.parent_of(&product(0), 7), 7);
    }

    #[test]
    fn reset_forgets_previous_decay() {
        let mut map = ParentIndexMap::new();
        map.reset(3);
        map.record(2, 12);
        map.reset(2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve(2), None);
        assert_eq!(map.resolve(1), None);
    }

    proptest! {
        #[test]
        fn parent_is_candidate_or_recorded_mother(
            pushed in proptest::collection::vec(proptest::option::of(100usize..200), 1..16),
            mother in 0usize..20,
        ) {
            let candidate = 7;
            let mut map = ParentIndexMap::new();
            map.reset(pushed.len());
            for (local, global) in pushed.iter().enumerate() {
                if let Some(global) = global {
                    map.record(local, *global);
                }
            }

            let parent = map.parent_of(&product(mother), candidate);
            let expected = mother
                .checked_sub(1)
                .filter(|&m| m > 0)
                .and_then(|m| pushed.get(m).copied().flatten())
                .unwrap_or(candidate);
            prop_assert_eq!(parent, expected);
            prop_assert!(parent == candidate || pushed.contains(&Some(parent)));
        }
    }

    #[test]
    fn record_grows_when_needed() {
        let mut map = ParentIndexMap::new();
        assert!(map.is_empty());
        map.record(5, 9);
        assert_eq!(map.len(), 6);
        assert_eq!(map.resolve(5), Some(9));
    }
}
