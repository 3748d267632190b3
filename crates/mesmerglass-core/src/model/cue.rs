//! Cuelist and Cue (§3).

use serde::{Deserialize, Serialize};

/// Loop policy for a Cuelist (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Stop after the last cue.
    Once,
    /// Wrap back to the first cue.
    Loop,
    /// Reverse direction at either endpoint.
    PingPong,
}

/// When the runner resolves a pool entry (glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Resolved once, at cue start.
    OnCueStart,
    /// Re-resolved possibly many times per cue, at media-cycle boundaries.
    OnMediaCycle,
}

/// One audio role bound to a Cue (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueAudio {
    /// Mixer role.
    pub role: AudioRole,
    /// Path to the audio asset.
    pub path: String,
    /// Playback volume, `[0, 1]`.
    pub volume: f32,
    /// Whether this track should loop once it ends.
    #[serde(rename = "loop")]
    pub looped: bool,
    /// Fade-in duration in seconds.
    pub fade_in_s: f32,
    /// Fade-out duration in seconds.
    pub fade_out_s: f32,
}

/// Mixer role (§4.4). The role set is small and fixed; `Other` covers any
/// additional named role a session defines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioRole {
    /// Primary hypnotic/voice track.
    Hypno,
    /// Ambient background bed.
    Background,
    /// Any additional named role.
    Other(String),
}

/// One candidate in a Cue's playback pool (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackPoolEntry {
    /// Key of the Playback this entry selects.
    pub playback_key: String,
    /// Relative weight for the weighted shuffler.
    pub weight: u32,
    /// Minimum wall-clock duration before this selection may be replaced.
    pub min_duration_s: Option<f32>,
    /// Maximum wall-clock duration before this selection must be replaced.
    pub max_duration_s: Option<f32>,
    /// Minimum media cycles before this selection may be replaced.
    pub min_cycles: Option<u32>,
    /// Maximum media cycles before this selection must be replaced.
    pub max_cycles: Option<u32>,
}

impl PlaybackPoolEntry {
    /// §3 backward-compat rule: any duration/cycle constraint promotes the
    /// cue's effective selection mode to `on_media_cycle`.
    pub fn forces_media_cycle_selection(&self) -> bool {
        self.min_duration_s.is_some()
            || self.max_duration_s.is_some()
            || self.min_cycles.is_some()
            || self.max_cycles.is_some()
    }
}

/// A single timed segment within a Cuelist (§3, glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cue {
    /// Human-readable name.
    pub name: String,
    /// Nominal duration, must be `> 0`.
    pub duration_seconds: f32,
    /// Fade-in duration applied by the compositor/renderer at cue start.
    pub fade_in: f32,
    /// Fade-out duration applied at cue end.
    pub fade_out: f32,
    /// Weighted candidate playbacks.
    pub playback_pool: Vec<PlaybackPoolEntry>,
    /// Stored selection mode; see [`Cue::effective_selection_mode`].
    pub selection_mode: SelectionMode,
    /// Audio roles active during this cue.
    pub audio: Vec<CueAudio>,
}

impl Cue {
    /// Effective selection mode after applying the §3 backward-compat
    /// promotion rule: any pool entry with a duration/cycle constraint
    /// forces `on_media_cycle` regardless of the stored value.
    pub fn effective_selection_mode(&self) -> SelectionMode {
        if self
            .playback_pool
            .iter()
            .any(PlaybackPoolEntry::forces_media_cycle_selection)
        {
            SelectionMode::OnMediaCycle
        } else {
            self.selection_mode
        }
    }
}

/// Ordered list of Cues with a loop policy (§3, glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cuelist {
    /// Human-readable name.
    pub name: String,
    /// Loop policy.
    pub loop_mode: LoopMode,
    /// Ordered cues.
    pub cues: Vec<Cue>,
}
