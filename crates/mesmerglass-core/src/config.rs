//! Runtime tunables
//!
//! `RuntimeConfig` carries every numeric default the specification calls
//! out explicitly (prefetch limits, buffer depths, anti-repetition window,
//! transition timeouts). Core crates only ever read these through a
//! `RuntimeConfig` value passed in by the caller; nothing here touches disk.
//! A collaborator (e.g. a CLI or settings UI, both out of scope for this
//! crate) is expected to deserialize overrides from its own config file.

use serde::{Deserialize, Serialize};

/// Tunable limits shared across the media cache, audio engine, and runner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Target display refresh rate used to scale cycle speeds and phase
    /// accumulation when no surface has reported a real rate yet.
    pub target_fps: f32,

    /// Video decode ring size per active video (§4.3).
    pub video_buf_cap: usize,
    /// Low-water mark that triggers background refill (§4.3).
    pub video_buf_low: usize,

    /// Decode threshold above which an audio asset is marked stream-only (§4.4).
    pub slow_decode_stream_ms: u64,
    /// Maximum time the runner will block waiting on prefetch (§4.4).
    pub prefetch_block_limit_ms: u64,
    /// Cues of audio lookahead the prefetch worker stays ahead by (§4.7).
    pub audio_lookahead_cues: usize,

    /// Last-N anti-repetition window for the weighted shuffler (§4.2).
    pub shuffle_window: usize,

    /// Upper bound on how long the runner waits for a cycle boundary
    /// before forcing a transition (§7, `Transition Stuck`).
    pub max_transition_wait_s: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            video_buf_cap: 30,
            video_buf_low: 8,
            slow_decode_stream_ms: 350,
            prefetch_block_limit_ms: 150,
            audio_lookahead_cues: 2,
            shuffle_window: 8,
            max_transition_wait_s: 30.0,
        }
    }
}

impl RuntimeConfig {
    /// `media.cycle_speed` (1..=100) to frames-per-cycle, per §4.6:
    /// `round(600 * 0.96^(cycle_speed - 1))`, clamped to at least one frame.
    pub fn frames_per_cycle(cycle_speed: u8) -> u32 {
        let speed = cycle_speed.clamp(1, 100) as i32;
        let raw = 600.0 * 0.96_f64.powi(speed - 1);
        raw.round().max(1.0) as u32
    }
}
