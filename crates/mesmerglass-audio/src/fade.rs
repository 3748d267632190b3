//! Linear fade-in/fade-out envelope for a single role handle (§4.4).

/// Where a role handle's volume envelope currently sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeState {
    /// Ramping from 0 to `target_volume` over `duration`.
    FadingIn {
        /// Seconds elapsed since the fade began.
        elapsed: f32,
        /// Total fade-in duration.
        duration: f32,
    },
    /// Holding at `target_volume`.
    Steady,
    /// Ramping from `target_volume` to 0 over `duration`.
    FadingOut {
        /// Seconds elapsed since the fade began.
        elapsed: f32,
        /// Total fade-out duration.
        duration: f32,
    },
    /// Fully silent and eligible for removal from the mixer.
    Finished,
}

impl FadeState {
    /// Start a role handle fading in over `duration` seconds (0 fades in
    /// instantly, landing on `Steady`).
    pub fn start_in(duration: f32) -> Self {
        if duration <= 0.0 {
            FadeState::Steady
        } else {
            FadeState::FadingIn {
                elapsed: 0.0,
                duration,
            }
        }
    }

    /// Transition to fading out over `duration` seconds from whatever the
    /// current state is (0 finishes instantly).
    pub fn begin_fade_out(self, duration: f32) -> Self {
        if duration <= 0.0 {
            FadeState::Finished
        } else {
            FadeState::FadingOut {
                elapsed: 0.0,
                duration,
            }
        }
    }

    /// Advance the envelope by `dt` seconds, returning the multiplier to
    /// apply to `target_volume` this tick.
    pub fn advance(&mut self, dt: f32) -> f32 {
        match *self {
            FadeState::FadingIn { elapsed, duration } => {
                let elapsed = elapsed + dt;
                if elapsed >= duration {
                    *self = FadeState::Steady;
                    1.0
                } else {
                    *self = FadeState::FadingIn { elapsed, duration };
                    elapsed / duration
                }
            }
            FadeState::Steady => 1.0,
            FadeState::FadingOut { elapsed, duration } => {
                let elapsed = elapsed + dt;
                if elapsed >= duration {
                    *self = FadeState::Finished;
                    0.0
                } else {
                    *self = FadeState::FadingOut { elapsed, duration };
                    1.0 - elapsed / duration
                }
            }
            FadeState::Finished => 0.0,
        }
    }

    /// Whether the envelope has reached silence and its handle can be dropped.
    pub fn is_finished(&self) -> bool {
        matches!(self, FadeState::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_in_ramps_linearly_to_one() {
        let mut state = FadeState::start_in(2.0);
        assert_eq!(state.advance(0.5), 0.25);
        assert_eq!(state.advance(0.5), 0.5);
        assert_eq!(state.advance(1.0), 1.0);
        assert_eq!(state, FadeState::Steady);
    }

    #[test]
    fn zero_duration_fade_in_is_instant() {
        let mut state = FadeState::start_in(0.0);
        assert_eq!(state, FadeState::Steady);
        assert_eq!(state.advance(0.0), 1.0);
    }

    #[test]
    fn fade_out_ramps_linearly_to_zero_then_finishes() {
        let mut state = FadeState::Steady.begin_fade_out(1.0);
        assert_eq!(state.advance(0.25), 0.75);
        assert_eq!(state.advance(0.25), 0.5);
        assert_eq!(state.advance(0.5), 0.0);
        assert!(state.is_finished());
    }

    #[test]
    fn zero_duration_fade_out_finishes_instantly() {
        let state = FadeState::Steady.begin_fade_out(0.0);
        assert!(state.is_finished());
    }

    #[test]
    fn overshoot_past_fade_duration_clamps_to_endpoint() {
        let mut state = FadeState::start_in(1.0);
        assert_eq!(state.advance(5.0), 1.0);
        assert_eq!(state, FadeState::Steady);
    }
}
