//! Visual Director (§4.6) and Session Runner (§4.7): playback lifecycle,
//! media cycling, cycle-boundary dispatch, and the cue state machine that
//! ties the compositor, media decoders, and audio engine together.
//!
//! The renderer itself (`mesmerglass-render::Compositor`) needs a live GPU
//! device, which this crate's own tests cannot assume is available. Director
//! and Runner logic is therefore decoupled from the concrete compositor
//! behind the [`VisualRenderer`] trait: callers (the `mesmerglass` bin crate,
//! or a test double) own the real `Compositor` and adapt [`RenderFrame`]
//! into `mesmerglass_render::FrameInputs`.

#![warn(missing_docs)]

pub mod director;
pub mod events;
pub mod image_pool;
pub mod renderer;
pub mod runner;
pub mod selection;
pub mod visual;

use thiserror::Error;

pub use director::{BoundaryEvent, BoundaryKind, Director};
pub use events::{ErrorKind, RunnerEvent};
pub use renderer::{RenderBackground, RenderFrame, RenderText, VisualRenderer};
pub use runner::{Command, RunnerState, SessionRunner};
pub use selection::PoolSelector;
pub use visual::Visual;

/// Runtime errors (§7 taxonomy).
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// §7 `SessionInvalid{reason}`: fatal at load time.
    #[error("session invalid: {0}")]
    SessionInvalid(#[from] mesmerglass_core::SessionValidationError),
    /// §7 `PlaybackLoadFailed{key, cause}`.
    #[error("failed to load playback '{key}': {cause}")]
    PlaybackLoadFailed {
        /// Playback key that failed to load.
        key: String,
        /// Underlying cause.
        cause: String,
    },
    /// §7 `MediaDecodeFailed{path, cause}`.
    #[error("failed to decode media '{path}': {cause}")]
    MediaDecodeFailed {
        /// Path that failed to decode.
        path: String,
        /// Underlying cause.
        cause: String,
    },
    /// §7 `AudioPrefetchTimeout{role}`.
    #[error("audio prefetch timed out for role '{0}'")]
    AudioPrefetchTimeout(String),
    /// §7 `GpuUploadFailed{cause}`.
    #[error("GPU upload failed: {0}")]
    GpuUploadFailed(String),
    /// §7 `Transition Stuck`: no cycle boundary observed within
    /// `max_transition_wait_s` past cue duration.
    #[error("transition stuck: no cycle boundary within {0:.1}s of cue end")]
    TransitionStuck(f32),
    /// The runner was asked to start, command, or seek a cuelist/cue that
    /// does not exist in the session.
    #[error("unknown cuelist or cue: {0}")]
    UnknownCue(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
