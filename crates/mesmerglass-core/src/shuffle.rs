//! Weighted shuffler with last-N anti-repetition (§4.2).

use rand::Rng;
use std::collections::VecDeque;

/// Weighted random selection with a bounded repetition window.
///
/// Each draw decrements the chosen item's weight (restored once it ages out
/// of the last-N window), so a just-shown item has strictly reduced odds of
/// reappearing for `capacity` draws and is fully restored afterward.
#[derive(Debug, Clone)]
pub struct WeightedShuffler {
    weights: Vec<u32>,
    baseline: Vec<u32>,
    total_weight: u32,
    last_indices: VecDeque<usize>,
    capacity: usize,
}

impl WeightedShuffler {
    /// Create a shuffler over `item_count` items, each starting at weight
    /// `initial_weight`, with a last-N window of `capacity`.
    pub fn new(item_count: usize, capacity: usize) -> Self {
        Self::with_weights(vec![1u32; item_count], capacity)
    }

    /// Create a shuffler with explicit per-item initial weights.
    pub fn with_weights(weights: Vec<u32>, capacity: usize) -> Self {
        let total_weight = weights.iter().sum();
        Self {
            baseline: weights.clone(),
            weights,
            total_weight,
            last_indices: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Number of items tracked.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether there are no items to select from.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Draw the next index, applying the anti-repetition rules in §4.2.
    pub fn next(&mut self) -> usize {
        self.next_with(&mut rand::rng())
    }

    /// Same as [`Self::next`] but with an injected RNG, for deterministic tests.
    pub fn next_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        assert!(!self.weights.is_empty(), "shuffler has no items");

        let selected = if self.total_weight == 0 {
            self.fallback_uniform(rng)
        } else {
            let r = rng.random_range(0..self.total_weight);
            let mut cumulative = 0u32;
            let mut chosen = self.weights.len() - 1;
            for (idx, weight) in self.weights.iter().enumerate() {
                cumulative += *weight;
                if cumulative > r {
                    chosen = idx;
                    break;
                }
            }
            chosen
        };

        if self.weights[selected] > 0 {
            self.weights[selected] -= 1;
            self.total_weight -= 1;
        }

        self.last_indices.push_back(selected);
        if self.last_indices.len() > self.capacity {
            if let Some(expired) = self.last_indices.pop_front() {
                self.weights[expired] += 1;
                self.total_weight += 1;
            }
        }

        selected
    }

    /// Degenerate safety net (§4.2): all weights at zero, select uniformly
    /// among items not currently in the repetition window.
    fn fallback_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let eligible: Vec<usize> = (0..self.weights.len())
            .filter(|idx| !self.last_indices.contains(idx))
            .collect();
        if eligible.is_empty() {
            rng.random_range(0..self.weights.len())
        } else {
            eligible[rng.random_range(0..eligible.len())]
        }
    }

    /// Reset every weight to its baseline and clear the repetition window.
    pub fn reset(&mut self) {
        self.weights = self.baseline.clone();
        self.total_weight = self.weights.iter().sum();
        self.last_indices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn weight_restored_after_window_ages_out() {
        let mut shuffler = WeightedShuffler::new(4, 2);
        let mut rng = StdRng::seed_from_u64(7);
        let first = shuffler.next_with(&mut rng);
        assert_eq!(shuffler.weights[first], 0);
        shuffler.next_with(&mut rng);
        shuffler.next_with(&mut rng); // this pop should restore `first`'s weight
        assert_eq!(shuffler.weights[first], 1);
    }

    #[test]
    fn anti_repetition_window_excludes_recent_items() {
        // 10 items, all-zero weights force the fallback path so we can
        // directly verify the last-N exclusion set.
        let mut shuffler = WeightedShuffler::with_weights(vec![0; 10], 8);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = Vec::new();
        for _ in 0..10_000 {
            let idx = shuffler.next_with(&mut rng);
            if seen.len() >= 8 {
                let window = &seen[seen.len() - 8..];
                assert!(!window.contains(&idx), "repeated within window of 8");
            }
            seen.push(idx);
        }
    }

    #[test]
    fn probability_scales_with_current_weight() {
        // Item 0 starts far heavier than item 1; over many draws with a
        // capacity large enough to avoid forced restoration mid-run, it
        // should be selected noticeably more often.
        let mut shuffler = WeightedShuffler::with_weights(vec![97, 3], 1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut counts = [0u32; 2];
        for _ in 0..2000 {
            counts[shuffler.next_with(&mut rng)] += 1;
            shuffler.reset();
        }
        assert!(counts[0] > counts[1] * 3);
    }

    #[test]
    fn reset_restores_baseline() {
        let mut shuffler = WeightedShuffler::with_weights(vec![5, 5], 4);
        let mut rng = StdRng::seed_from_u64(3);
        shuffler.next_with(&mut rng);
        shuffler.next_with(&mut rng);
        shuffler.reset();
        assert_eq!(shuffler.weights, vec![5, 5]);
        assert!(shuffler.last_indices.is_empty());
    }

    #[test]
    fn degenerate_all_zero_weights_falls_back_to_uniform_over_unseen() {
        let mut shuffler = WeightedShuffler::with_weights(vec![0, 0, 0], 2);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let idx = shuffler.next_with(&mut rng);
            assert!(idx < 3);
        }
    }
}
