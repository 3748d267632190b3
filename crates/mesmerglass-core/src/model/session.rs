//! Session: the root, loaded-from-JSON bundle (§3, §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::cue::Cuelist;
use super::media::MediaBankEntry;
use super::playback::Playback;
use super::validate::SessionValidationError;

/// Free-form session metadata (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session display name.
    pub name: String,
    /// ISO-8601 creation timestamp.
    #[serde(default)]
    pub created: Option<String>,
    /// ISO-8601 last-modified timestamp.
    #[serde(default)]
    pub modified: Option<String>,
}

/// Carried-over UI hints (§3, §6), not used by the core runtime itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeHints {
    /// Last playback key opened in the editor.
    #[serde(default)]
    pub last_playback: Option<String>,
    /// Last cuelist key opened in the editor.
    #[serde(default)]
    pub last_cuelist: Option<String>,
}

/// The top-level, immutable-during-a-run session bundle (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Schema version; the core only understands `"1.0"`.
    pub version: String,
    /// Free-form metadata.
    pub metadata: SessionMetadata,
    /// Indexed playbacks.
    pub playbacks: HashMap<String, Playback>,
    /// Indexed cuelists.
    pub cuelists: HashMap<String, Cuelist>,
    /// Media bank entries.
    #[serde(default)]
    pub media_bank: Vec<MediaBankEntry>,
    /// Optional runtime hints.
    #[serde(default)]
    pub runtime: RuntimeHints,
}

impl Session {
    /// Parse and validate a Session from a JSON string (§9 re-architecture:
    /// dynamic config dictionaries become typed schema structs plus a
    /// separate validator; downstream code only ever sees the typed form).
    ///
    /// This performs schema validation only — reading the JSON off disk is
    /// a collaborator's responsibility (§1).
    pub fn from_json_str(raw: &str) -> Result<Self, SessionValidationError> {
        let session: Session = serde_json::from_str(raw)
            .map_err(|e| SessionValidationError::Malformed(e.to_string()))?;
        session.validate()?;
        Ok(session)
    }

    /// Validate cross-reference and range invariants named in §3.
    pub fn validate(&self) -> Result<(), SessionValidationError> {
        super::validate::validate_session(self)
    }
}
