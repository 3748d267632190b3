//! Multi-role audio mixer with async prefetch and streaming fallback (§4.4).
//!
//! Roles (hypno, background, and any additional named role) each own at most
//! one active playback handle. A prefetch worker decodes assets ahead of
//! need; assets that decode slowly are marked stream-only and read
//! progressively instead. Mixing is additive PCM, no FFT analysis — that is
//! a different concern entirely out of scope here.

#![warn(missing_docs)]

pub mod engine;
pub mod fade;
pub mod mixer;
pub mod pcm;
pub mod prefetch;
pub mod streaming;

use thiserror::Error;

pub use engine::{AudioCommand, AudioEngine};
pub use fade::FadeState;
pub use mixer::{Mixer, RoleHandle};
pub use pcm::PcmBuffer;
pub use prefetch::{AssetKey, PrefetchWorker, ResolvedAsset};
pub use streaming::StreamingWorker;

/// Audio engine errors (§4.4, §7).
#[derive(Error, Debug)]
pub enum AudioError {
    /// The asset file does not exist.
    #[error("audio file not found: {0}")]
    FileMissing(String),
    /// The file exists but could not be decoded as a supported format.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    /// The output device could not be opened or configured.
    #[error("audio output device error: {0}")]
    Device(String),
    /// A prefetch request was not satisfied before the caller's deadline.
    #[error("prefetch timed out waiting for cue {0}")]
    PrefetchTimeout(String),
}

/// Result type for audio operations.
pub type Result<T> = std::result::Result<T, AudioError>;
