//! Event types published by the Session Runner (§6, §9: explicit event
//! types with dispatcher ownership on the runner, replacing the source's
//! global Qt/signal coupling).

/// Which §7 error kind an [`RunnerEvent::Error`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `SessionInvalid{reason}`.
    SessionInvalid,
    /// `PlaybackLoadFailed{key, cause}`.
    PlaybackLoadFailed,
    /// `MediaDecodeFailed{path, cause}`.
    MediaDecodeFailed,
    /// `AudioPrefetchTimeout{role}`.
    AudioPrefetchTimeout,
    /// `GpuUploadFailed{cause}`.
    GpuUploadFailed,
    /// `Transition Stuck`.
    TransitionStuck,
}

/// Events the runner publishes to its subscribers (§6).
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// A cue began playing.
    CueStarted {
        /// Index of the cue within its cuelist.
        cue_index: usize,
        /// The cue's human-readable name.
        cue_name: String,
    },
    /// A cue finished (its playback was torn down).
    CueEnded {
        /// Index of the cue that ended.
        cue_index: usize,
    },
    /// A cue transition was requested but is waiting for a cycle boundary
    /// before it executes (§4.7 two-phase transition, request phase).
    TransitionPending {
        /// Human-readable reason, surfaced for diagnostics/UI.
        reason: String,
    },
    /// A non-fatal error occurred; the runner continues (§7).
    Error {
        /// Which error kind occurred.
        kind: ErrorKind,
        /// Human-readable detail.
        detail: String,
    },
}
