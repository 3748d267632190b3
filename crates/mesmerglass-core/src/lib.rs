//! MesmerGlass Core - Domain Model and Timing Primitives
//!
//! This crate contains the data model and the timing/selection primitives
//! shared by every other MesmerGlass crate:
//! - Session / Playback / Cuelist / Cue schema (typed, validated at load)
//! - Cycler primitives (Action/Repeat/Sequence/Parallel)
//! - Weighted shuffler with last-N anti-repetition
//! - Collaborator interfaces (display surface, file I/O, audio sink, device control)
//! - Runtime configuration defaults

#![warn(missing_docs)]

pub mod config;
pub mod cycler;
pub mod interfaces;
pub mod model;
pub mod shuffle;

pub use config::RuntimeConfig;
pub use cycler::{Cycler, CyclerEvent};
pub use interfaces::{
    AudioSink, DeviceControl, DisplaySurface, FileReader, MediaBankResolver, VideoSource,
};
pub use model::{
    AudioRole, Cue, CueAudio, Cuelist, LoopMode, MediaBankEntry, MediaBankKind, MediaConfig,
    MediaItem, MediaKind, MediaMode, MediaPathRef, Playback, PlaybackPoolEntry, Rgba,
    RuntimeHints, SelectionMode, Session, SessionMetadata, SessionValidationError, SpiralConfig,
    SpiralType, TextConfig, TextMode, ZoomConfig, ZoomMode,
};
pub use shuffle::WeightedShuffler;
