//! Fair, repeating random iteration over a fixed snapshot of items.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Iterates forever over a snapshot of items in random order.
///
/// Each pass visits every item exactly once; when a pass is exhausted a fresh
/// independent shuffle starts the next one. This is the fairness primitive
/// that keeps any one host or task from always being picked last.
///
/// The iterator holds an immutable snapshot: when the underlying collection
/// changes membership the owner must rebuild the iterator rather than mutate
/// it in place.
#[derive(Debug)]
pub struct RandomInfiniteIter<T> {
    items: Vec<T>,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
}

impl<T: Clone> RandomInfiniteIter<T> {
    /// Snapshot `items` and seed the internal shuffle stream from `seed_rng`.
    pub fn new(items: Vec<T>, seed_rng: &mut impl Rng) -> Self {
        let mut rng = StdRng::seed_from_u64(seed_rng.gen());
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.shuffle(&mut rng);
        RandomInfiniteIter {
            items,
            order,
            cursor: 0,
            rng,
        }
    }

    /// The next item of the current pass, or `None` if the snapshot is empty.
    pub fn next_item(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        if self.cursor == self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
        }
        let item = self.items[self.order[self.cursor]].clone();
        self.cursor += 1;
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn empty_snapshot_always_yields_none() {
        let mut seed = StdRng::seed_from_u64(7);
        let mut iter: RandomInfiniteIter<u32> = RandomInfiniteIter::new(Vec::new(), &mut seed);
        for _ in 0..10 {
            assert_eq!(iter.next_item(), None);
        }
    }

    #[test]
    fn every_aligned_window_is_a_permutation() {
        let mut seed = StdRng::seed_from_u64(42);
        for n in 1..=8usize {
            let items: Vec<usize> = (0..n).collect();
            let mut iter = RandomInfiniteIter::new(items, &mut seed);
            for window in 0..5 {
                let mut seen = HashSet::new();
                for _ in 0..n {
                    let item = iter.next_item().expect("non-empty iterator");
                    assert!(
                        seen.insert(item),
                        "item repeated within pass {window} of size {n}"
                    );
                }
                assert_eq!(seen.len(), n);
            }
        }
    }

    #[test]
    fn single_item_repeats_forever() {
        let mut seed = StdRng::seed_from_u64(1);
        let mut iter = RandomInfiniteIter::new(vec!["only"], &mut seed);
        for _ in 0..20 {
            assert_eq!(iter.next_item(), Some("only"));
        }
    }
}
