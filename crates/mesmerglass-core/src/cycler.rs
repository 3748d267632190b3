//! Cycler primitives (§4.1): frame-accurate, composable timing.
//!
//! A `Cycler` is a value, not a trait object holding a closure — callbacks
//! are reified as `CyclerEvent`s returned from `advance()` so the caller
//! decides ordering and re-entrancy, matching the teacher's preference for
//! explicit event types over ambient signal/callback coupling (see
//! `mapmap-core::trigger_system`, which accumulates timer state per part
//! rather than invoking callbacks directly).

use serde::{Deserialize, Serialize};

/// Opaque identifier for an `Action` cycler, handed back in `CyclerEvent::Fire`
/// so a caller with several `Action`s in one graph can tell them apart.
pub type ActionId = u32;

/// An event emitted by `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclerEvent {
    /// An `Action`'s period elapsed on this frame.
    Fire(ActionId),
    /// No action fired for the child advanced this frame.
    None,
}

/// Frame-accurate composable timing primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Cycler {
    /// Fires `id` every time `(frame - offset) mod period == 0`. Never completes.
    Action {
        /// Action identity, echoed back in `CyclerEvent::Fire`.
        id: ActionId,
        /// Frames between fires.
        period: u32,
        /// Frame offset before the first fire.
        offset: u32,
        /// Frames advanced so far.
        frame: u32,
    },
    /// Advances `child` repeatedly; completes once it has completed `count` times.
    Repeat {
        /// Target completions.
        count: u32,
        /// Completions observed so far.
        completed: u32,
        /// The repeated cycler.
        child: Box<Cycler>,
    },
    /// Advances children in order; completes once the last child completes.
    Sequence {
        /// Index of the child currently being advanced.
        current: usize,
        /// Ordered children.
        children: Vec<Cycler>,
    },
    /// Advances every non-complete child each tick; completes when all do.
    Parallel {
        /// Children, advanced together.
        children: Vec<Cycler>,
    },
}

impl Cycler {
    /// Build an `Action` at frame zero.
    pub fn action(id: ActionId, period: u32, offset: u32) -> Self {
        Cycler::Action {
            id,
            period: period.max(1),
            offset,
            frame: 0,
        }
    }

    /// Build a `Repeat` wrapping `child`.
    pub fn repeat(count: u32, child: Cycler) -> Self {
        Cycler::Repeat {
            count,
            completed: 0,
            child: Box::new(child),
        }
    }

    /// Build a `Sequence` over `children`.
    pub fn sequence(children: Vec<Cycler>) -> Self {
        Cycler::Sequence {
            current: 0,
            children,
        }
    }

    /// Build a `Parallel` over `children`.
    pub fn parallel(children: Vec<Cycler>) -> Self {
        Cycler::Parallel { children }
    }

    /// Advance by one frame, returning the event this tick produced.
    ///
    /// Deterministic and idempotent per `(frame, cycler-graph)`: replaying
    /// the same sequence of `advance()` calls from a freshly-`reset()` graph
    /// always reproduces the same event sequence (§4.1 invariant, §8 property).
    pub fn advance(&mut self) -> CyclerEvent {
        match self {
            Cycler::Action {
                id,
                period,
                offset,
                frame,
            } => {
                let due = frame.wrapping_sub(*offset) % *period == 0;
                let event = if due {
                    CyclerEvent::Fire(*id)
                } else {
                    CyclerEvent::None
                };
                *frame = frame.wrapping_add(1);
                event
            }
            Cycler::Repeat {
                count,
                completed,
                child,
            } => {
                if *completed >= *count {
                    return CyclerEvent::None;
                }
                let event = child.advance();
                if child.complete() {
                    *completed += 1;
                    child.reset();
                }
                event
            }
            Cycler::Sequence { current, children } => {
                if *current >= children.len() {
                    return CyclerEvent::None;
                }
                let event = children[*current].advance();
                if children[*current].complete() {
                    *current += 1;
                }
                event
            }
            Cycler::Parallel { children } => {
                let mut fired = CyclerEvent::None;
                for child in children.iter_mut() {
                    if !child.complete() {
                        let event = child.advance();
                        if matches!(event, CyclerEvent::Fire(_)) {
                            fired = event;
                        }
                    }
                }
                fired
            }
        }
    }

    /// Whether this cycler has finished. `Action` never completes.
    pub fn complete(&self) -> bool {
        match self {
            Cycler::Action { .. } => false,
            Cycler::Repeat { count, completed, .. } => completed >= count,
            Cycler::Sequence { current, children } => *current >= children.len(),
            Cycler::Parallel { children } => children.iter().all(Cycler::complete),
        }
    }

    /// Restore fresh state recursively.
    pub fn reset(&mut self) {
        match self {
            Cycler::Action { frame, .. } => *frame = 0,
            Cycler::Repeat { completed, child, .. } => {
                *completed = 0;
                child.reset();
            }
            Cycler::Sequence { current, children } => {
                *current = 0;
                for child in children.iter_mut() {
                    child.reset();
                }
            }
            Cycler::Parallel { children } => {
                for child in children.iter_mut() {
                    child.reset();
                }
            }
        }
    }

    /// Number of direct children (0 for `Action`, 1 for `Repeat`).
    pub fn length(&self) -> usize {
        match self {
            Cycler::Action { .. } => 0,
            Cycler::Repeat { .. } => 1,
            Cycler::Sequence { children, .. } => children.len(),
            Cycler::Parallel { children } => children.len(),
        }
    }

    /// Overall progress in `[0, 1]`. `Action` is always `0.0` (it never completes).
    pub fn progress(&self) -> f32 {
        match self {
            Cycler::Action { .. } => 0.0,
            Cycler::Repeat { count, completed, .. } => {
                if *count == 0 {
                    1.0
                } else {
                    *completed as f32 / *count as f32
                }
            }
            Cycler::Sequence { current, children } => {
                if children.is_empty() {
                    1.0
                } else {
                    *current as f32 / children.len() as f32
                }
            }
            Cycler::Parallel { children } => {
                if children.is_empty() {
                    1.0
                } else {
                    children.iter().map(Cycler::progress).sum::<f32>() / children.len() as f32
                }
            }
        }
    }

    /// Current index into this cycler's children (0 for `Action`).
    pub fn index(&self) -> usize {
        match self {
            Cycler::Action { .. } => 0,
            Cycler::Repeat { completed, .. } => *completed as usize,
            Cycler::Sequence { current, .. } => *current,
            Cycler::Parallel { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_count(cycler: &mut Cycler, ticks: u32) -> u32 {
        let mut fires = 0;
        for _ in 0..ticks {
            if matches!(cycler.advance(), CyclerEvent::Fire(_)) {
                fires += 1;
            }
        }
        fires
    }

    #[test]
    fn action_fires_on_period() {
        let mut action = Cycler::action(1, 4, 0);
        let events: Vec<_> = (0..8).map(|_| action.advance()).collect();
        assert_eq!(
            events,
            vec![
                CyclerEvent::Fire(1),
                CyclerEvent::None,
                CyclerEvent::None,
                CyclerEvent::None,
                CyclerEvent::Fire(1),
                CyclerEvent::None,
                CyclerEvent::None,
                CyclerEvent::None,
            ]
        );
        assert!(!action.complete());
    }

    #[test]
    fn action_honours_offset() {
        let mut action = Cycler::action(1, 4, 2);
        let events: Vec<_> = (0..6).map(|_| action.advance()).collect();
        assert_eq!(
            events,
            vec![
                CyclerEvent::None,
                CyclerEvent::None,
                CyclerEvent::Fire(1),
                CyclerEvent::None,
                CyclerEvent::None,
                CyclerEvent::None,
            ]
        );
    }

    #[test]
    fn repeat_completes_after_count_child_completions() {
        let child = Cycler::action(1, 2, 0);
        // An Action never completes, so wrap in a Sequence of length 1 to get
        // a completing child for this test of Repeat's bookkeeping.
        let completing_child = Cycler::sequence(vec![child]);
        let mut repeat = Cycler::repeat(3, completing_child);
        assert!(!repeat.complete());
        repeat.advance(); // sequence's single child advances once -> completes
        assert_eq!(
            if let Cycler::Repeat { completed, .. } = &repeat {
                *completed
            } else {
                unreachable!()
            },
            1
        );
        repeat.advance();
        repeat.advance();
        assert!(repeat.complete());
    }

    #[test]
    fn sequence_advances_children_in_order_then_completes() {
        let mut seq = Cycler::sequence(vec![
            Cycler::sequence(vec![Cycler::action(10, 1, 0)]),
            Cycler::sequence(vec![Cycler::action(20, 1, 0)]),
        ]);
        assert!(!seq.complete());
        let first = seq.advance();
        assert_eq!(first, CyclerEvent::Fire(10));
        let second = seq.advance();
        assert_eq!(second, CyclerEvent::Fire(20));
        assert!(seq.complete());
    }

    #[test]
    fn parallel_advances_all_non_complete_children() {
        let mut par = Cycler::parallel(vec![
            Cycler::action(1, 4, 0),
            Cycler::sequence(vec![Cycler::action(2, 1, 0)]),
        ]);
        // First tick: action 1 fires on frame 0, the sequence's action also fires.
        let _ = par.advance();
        // Second child (wrapped in a 1-length sequence) is now complete and stays that way.
        if let Cycler::Parallel { children } = &par {
            assert!(children[1].complete());
        }
        // Parallel itself never "completes" while action 1 never completes.
        assert!(!par.complete());
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut action = Cycler::action(1, 4, 0);
        fire_count(&mut action, 10);
        action.reset();
        assert_eq!(action.advance(), CyclerEvent::Fire(1));
    }

    /// §8: `advance()` N times produces the same callback sequence as
    /// N/2 then N/2 advances, for any cycler graph and frame count N.
    #[test]
    fn determinism_split_advance_matches_full_advance() {
        let build = || {
            Cycler::parallel(vec![
                Cycler::action(1, 48, 0),
                Cycler::sequence(vec![
                    Cycler::repeat(3, Cycler::sequence(vec![Cycler::action(2, 4, 0)])),
                    Cycler::action(3, 7, 0),
                ]),
            ])
        };

        for n in [2u32, 10, 100, 257] {
            let mut whole = build();
            let full: Vec<_> = (0..n).map(|_| whole.advance()).collect();

            let mut split = build();
            let half = n / 2;
            let mut spliced: Vec<_> = (0..half).map(|_| split.advance()).collect();
            spliced.extend((0..(n - half)).map(|_| split.advance()));

            assert_eq!(full, spliced, "mismatch at n={n}");
        }
    }

    #[test]
    fn progress_and_index_report_sequence_state() {
        let mut seq = Cycler::sequence(vec![
            Cycler::sequence(vec![Cycler::action(1, 1, 0)]),
            Cycler::sequence(vec![Cycler::action(2, 1, 0)]),
        ]);
        assert_eq!(seq.progress(), 0.0);
        seq.advance();
        assert_eq!(seq.index(), 1);
        assert_eq!(seq.progress(), 0.5);
    }
}
