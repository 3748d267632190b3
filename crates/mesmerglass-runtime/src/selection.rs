//! Playback-pool weighted selection with per-cue anti-repetition (§4.7
//! "Selecting a playback from a pool").

use mesmerglass_core::{PlaybackPoolEntry, WeightedShuffler};

/// Tracks the currently-selected pool entry for one cue, plus how long it
/// has been active (wall-clock and media cycles), so `min_*`/`max_*`
/// constraints (§3) can gate re-selection.
pub struct PoolSelector {
    shuffler: WeightedShuffler,
    entries: Vec<PlaybackPoolEntry>,
    current: usize,
    selected_at_time_s: f32,
    selected_at_cycle: u32,
}

impl PoolSelector {
    /// Build a selector over `entries`, drawing the initial selection
    /// immediately (§4.7 "at cue start ... sample weighted by entry weight").
    pub fn new(entries: Vec<PlaybackPoolEntry>, anti_repeat_window: usize) -> Self {
        assert!(!entries.is_empty(), "playback pool must be non-empty (§3 invariant)");
        let weights = entries.iter().map(|e| e.weight).collect();
        let mut shuffler = WeightedShuffler::with_weights(weights, anti_repeat_window);
        let current = shuffler.next();
        Self {
            shuffler,
            entries,
            current,
            selected_at_time_s: 0.0,
            selected_at_cycle: 0,
        }
    }

    /// The currently-selected pool entry.
    pub fn current_entry(&self) -> &PlaybackPoolEntry {
        &self.entries[self.current]
    }

    /// The currently-selected playback key.
    pub fn current_playback_key(&self) -> &str {
        &self.entries[self.current].playback_key
    }

    /// Whether the current selection has satisfied its `min_duration_s`/
    /// `min_cycles` constraints (if any) and may be replaced.
    pub fn may_reselect(&self, elapsed_s: f32, cycle_count: u32) -> bool {
        let entry = self.current_entry();
        let duration_ok = entry
            .min_duration_s
            .map(|min| elapsed_s - self.selected_at_time_s >= min)
            .unwrap_or(true);
        let cycles_ok = entry
            .min_cycles
            .map(|min| cycle_count.saturating_sub(self.selected_at_cycle) >= min)
            .unwrap_or(true);
        duration_ok && cycles_ok
    }

    /// Whether the current selection has exceeded its `max_duration_s`/
    /// `max_cycles` constraints (if any) and must be replaced.
    pub fn must_reselect(&self, elapsed_s: f32, cycle_count: u32) -> bool {
        let entry = self.current_entry();
        let duration_exceeded = entry
            .max_duration_s
            .map(|max| elapsed_s - self.selected_at_time_s >= max)
            .unwrap_or(false);
        let cycles_exceeded = entry
            .max_cycles
            .map(|max| cycle_count.saturating_sub(self.selected_at_cycle) >= max)
            .unwrap_or(false);
        duration_exceeded || cycles_exceeded
    }

    /// Draw a new selection, recording the time/cycle baseline it started
    /// from, and return the newly-selected playback key.
    pub fn reselect(&mut self, elapsed_s: f32, cycle_count: u32) -> &str {
        self.current = self.shuffler.next();
        self.selected_at_time_s = elapsed_s;
        self.selected_at_cycle = cycle_count;
        self.current_playback_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, weight: u32, min_cycles: Option<u32>, max_cycles: Option<u32>) -> PlaybackPoolEntry {
        PlaybackPoolEntry {
            playback_key: key.to_string(),
            weight,
            min_duration_s: None,
            max_duration_s: None,
            min_cycles,
            max_cycles,
        }
    }

    #[test]
    fn must_reselect_once_max_cycles_reached() {
        let mut selector = PoolSelector::new(
            vec![
                entry("a", 1, Some(3), Some(3)),
                entry("b", 1, Some(3), Some(3)),
            ],
            1,
        );
        assert!(!selector.must_reselect(0.0, 2));
        assert!(selector.must_reselect(0.0, 3));
    }

    #[test]
    fn min_cycles_blocks_early_reselection() {
        let selector = PoolSelector::new(vec![entry("a", 1, Some(3), None)], 1);
        assert!(!selector.may_reselect(0.0, 1));
        assert!(selector.may_reselect(0.0, 3));
    }

    #[test]
    fn reselect_alternates_between_two_equally_weighted_entries() {
        let mut selector = PoolSelector::new(
            vec![entry("a", 1, None, None), entry("b", 1, None, None)],
            1,
        );
        let first = selector.current_playback_key().to_string();
        let second = selector.reselect(0.0, 0).to_string();
        assert_ne!(first, second, "anti-repetition window of 1 forbids repeats");
    }

    #[test]
    fn no_constraints_never_forces_reselection() {
        let selector = PoolSelector::new(vec![entry("a", 1, None, None)], 1);
        assert!(!selector.must_reselect(1_000_000.0, 1_000_000));
    }
}
