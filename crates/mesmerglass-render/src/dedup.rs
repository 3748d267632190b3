//! Frame-dedup upload policy (§4.5).
//!
//! A `write_texture` call is only worth making when the frame actually
//! changed. Decoders may redeliver the same frame (e.g. a cursor stalled on
//! the last frame of a one-shot clip, or a still image re-requested every
//! tick), so every upload is gated on a cheap tuple comparison against the
//! last key this slot actually uploaded.

use std::collections::HashMap;

/// Identifies a single decoded frame destined for a texture slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadKey {
    /// Source asset path.
    pub path: String,
    /// Decoder-assigned frame index (or cursor `frame_index()` for video).
    pub frame_id: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// Tracks the last uploaded [`UploadKey`] per named texture slot and decides
/// whether a new key is worth uploading.
#[derive(Default)]
pub struct DedupCache {
    last_uploaded: HashMap<String, UploadKey>,
}

impl DedupCache {
    /// Construct an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `key` as the new baseline if `key` differs
    /// from the slot's last uploaded key (or the slot has never uploaded).
    /// Returns `false` without mutating state if the frame is unchanged.
    pub fn should_upload(&mut self, slot: &str, key: UploadKey) -> bool {
        if self.last_uploaded.get(slot) == Some(&key) {
            return false;
        }
        self.last_uploaded.insert(slot.to_string(), key);
        true
    }

    /// Forget a slot's baseline, forcing the next `should_upload` call for it
    /// to succeed regardless of key. Used when a playback switches media and
    /// the new source's frame numbering starts over from a value the old
    /// source may have already used.
    pub fn invalidate(&mut self, slot: &str) {
        self.last_uploaded.remove(slot);
    }
}
