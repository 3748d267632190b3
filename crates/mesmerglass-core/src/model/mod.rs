//! Session data model (§3): typed schema structs plus a validator, replacing
//! the dynamic-typed config dictionaries the source used (§9 re-architecture
//! note). Everything here is `Serialize`/`Deserialize` so the Session JSON
//! wire format in §6 round-trips, even though on-disk load/save stays a
//! collaborator's responsibility (§1).

mod cue;
mod media;
mod playback;
mod session;
mod validate;

pub use cue::{AudioRole, Cue, CueAudio, Cuelist, LoopMode, PlaybackPoolEntry, SelectionMode};
pub use media::{MediaBankEntry, MediaBankKind, MediaItem, MediaKind};
pub use playback::{
    MediaConfig, MediaMode, MediaPathRef, Playback, Rgba, SpiralConfig, SpiralType, TextConfig,
    TextMode, ZoomConfig, ZoomMode,
};
pub use session::{RuntimeHints, Session, SessionMetadata};
pub use validate::SessionValidationError;
