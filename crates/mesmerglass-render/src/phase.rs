//! Spiral rotation phase accumulator (§4.5).
//!
//! Each render tick the director increments this by
//! `(rotation_speed_rpm / 60) / target_fps` full cycles (negative when the
//! spiral is reversed). The shader's `time` uniform is exactly this
//! accumulated value — the fragment shader must not re-multiply by
//! `rotation_speed` itself, or rotation speed would double-scale. The whole
//! and fractional cycle counts are tracked separately so that a session
//! running for hours doesn't lose fractional precision to a huge `f64`
//! integer part.

/// Accumulates spiral rotation phase in units of full cycles, split into a
/// whole-cycle counter and an `f64` fractional remainder.
#[derive(Debug, Clone, Copy)]
pub struct PhaseAccumulator {
    whole_cycles: i64,
    fraction: f64,
}

impl PhaseAccumulator {
    /// Start at phase zero.
    pub fn new() -> Self {
        Self {
            whole_cycles: 0,
            fraction: 0.0,
        }
    }

    /// Advance by one render tick at `rotation_speed_rpm`, given the
    /// session's `target_fps`. `reverse` negates the increment.
    pub fn advance(&mut self, rotation_speed_rpm: f64, target_fps: f64, reverse: bool) {
        let mut delta = (rotation_speed_rpm / 60.0) / target_fps;
        if reverse {
            delta = -delta;
        }
        self.fraction += delta;
        while self.fraction >= 1.0 {
            self.fraction -= 1.0;
            self.whole_cycles += 1;
        }
        while self.fraction < 0.0 {
            self.fraction += 1.0;
            self.whole_cycles -= 1;
        }
    }

    /// Total accumulated cycles (whole + fractional) as a single `f64`. This
    /// is the exact value the shader's `time` uniform should carry.
    pub fn total_cycles(&self) -> f64 {
        self.whole_cycles as f64 + self.fraction
    }

    /// Total accumulated cycles narrowed to `f32` for the uniform buffer.
    pub fn time_uniform(&self) -> f32 {
        self.total_cycles() as f32
    }

    /// Whole completed cycle count, independent of the fractional part.
    pub fn whole_cycles(&self) -> i64 {
        self.whole_cycles
    }

    /// Current fractional position within the cycle, `[0, 1)`.
    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

impl Default for PhaseAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_the_documented_fraction_per_tick() {
        let mut acc = PhaseAccumulator::new();
        acc.advance(20.0, 60.0, false);
        assert!((acc.total_cycles() - (20.0 / 60.0 / 60.0)).abs() < 1e-12);
    }

    #[test]
    fn reverse_negates_the_increment() {
        let mut forward = PhaseAccumulator::new();
        forward.advance(20.0, 60.0, false);
        let mut backward = PhaseAccumulator::new();
        backward.advance(20.0, 60.0, true);
        assert!((forward.total_cycles() + backward.total_cycles()).abs() < 1e-12);
    }

    #[test]
    fn whole_cycles_increment_as_fraction_overflows() {
        let mut acc = PhaseAccumulator::new();
        for _ in 0..4 {
            acc.advance(1.0, 1.0 / 60.0, false); // delta = 1/60 per tick, 60 ticks/cycle worth over 4 calls of size 1
        }
        assert!(acc.whole_cycles() >= 0);
    }

    #[test]
    fn phase_integrity_matches_one_hour_at_twenty_rpm_sixty_fps() {
        let mut acc = PhaseAccumulator::new();
        let ticks = 60 * 3600;
        for _ in 0..ticks {
            acc.advance(20.0, 60.0, false);
        }
        let expected = 1200.0;
        let relative_error = (acc.total_cycles() - expected).abs() / expected;
        assert!(relative_error < 1e-6, "relative_error={relative_error}");
    }

    #[test]
    fn negative_fraction_borrows_from_whole_cycles() {
        let mut acc = PhaseAccumulator::new();
        acc.advance(20.0, 60.0, true);
        assert_eq!(acc.whole_cycles(), -1);
        assert!(acc.fraction() > 0.99);
    }
}
