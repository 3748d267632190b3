//! Media Item and Media Bank entries (§3, §6).

use serde::{Deserialize, Serialize};

/// Kind of a resolved media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
}

/// A resolved media item (§3): an image, or a video with a frame cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Image or video.
    pub kind: MediaKind,
    /// Absolute path this item was resolved from.
    pub path: String,
    /// Decoded resolution, once known.
    pub resolution: Option<(u32, u32)>,
    /// Total frame count, for videos only.
    pub duration_frames: Option<u64>,
}

impl MediaItem {
    /// Construct an image item with as-yet-unknown resolution.
    pub fn image(path: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            path: path.into(),
            resolution: None,
            duration_frames: None,
        }
    }

    /// Construct a video item with as-yet-unknown resolution/duration.
    pub fn video(path: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            path: path.into(),
            resolution: None,
            duration_frames: None,
        }
    }
}

/// Which media types a Media Bank label groups (§6 `media_bank[].type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBankKind {
    /// Images only.
    Images,
    /// Videos only.
    Videos,
    /// Both images and videos.
    Both,
    /// Fonts (consumed by the text overlay, not the media cycler).
    Fonts,
}

/// One entry of a Session's Media Bank (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaBankEntry {
    /// Human-readable label, referenced by `Playback.media.paths`.
    pub label: String,
    /// Directory this label points to.
    pub path: String,
    /// Kind of content in this directory.
    #[serde(rename = "type")]
    pub kind: MediaBankKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_bank_kind_serializes_lowercase() {
        let entry = MediaBankEntry {
            label: "showreel".into(),
            path: "/media/showreel".into(),
            kind: MediaBankKind::Both,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"both\""));
    }
}
