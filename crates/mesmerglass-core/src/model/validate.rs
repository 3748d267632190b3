//! Session validation: the typed-schema counterpart to §7's
//! `SessionInvalid{reason}` (fatal at load time).

use thiserror::Error;

use super::session::Session;

/// Schema and cross-reference violations detected while validating a
/// parsed [`Session`] (§3 invariants, §7 `SessionInvalid`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    /// The JSON did not even deserialize into the Session schema.
    #[error("malformed session JSON: {0}")]
    Malformed(String),

    /// `Session.version` is not a version this core understands.
    #[error("unsupported session version: {0}")]
    UnsupportedVersion(String),

    /// A Cuelist has no cues at all.
    #[error("cuelist '{0}' has no cues")]
    EmptyCuelist(String),

    /// A Cue's `duration_seconds` is not strictly positive.
    #[error("cue '{cuelist}'/'{cue}' has non-positive duration_seconds ({duration})")]
    NonPositiveCueDuration {
        /// Owning cuelist key.
        cuelist: String,
        /// Cue name.
        cue: String,
        /// The offending duration.
        duration: f32,
    },

    /// A Cue's `playback_pool` is empty.
    #[error("cue '{cuelist}'/'{cue}' has an empty playback_pool")]
    EmptyPlaybackPool {
        /// Owning cuelist key.
        cuelist: String,
        /// Cue name.
        cue: String,
    },

    /// A Cue's playback pool references a playback key absent from the session.
    #[error("cue '{cuelist}'/'{cue}' references unknown playback '{playback_key}'")]
    DanglingPlaybackKey {
        /// Owning cuelist key.
        cuelist: String,
        /// Cue name.
        cue: String,
        /// The dangling key.
        playback_key: String,
    },

    /// `media.cycle_speed` or `text.manual_cycle_speed` is outside `1..=100`.
    #[error("playback '{playback}' has cycle_speed {value} outside 1..=100 ({field})")]
    CycleSpeedOutOfRange {
        /// Owning playback key.
        playback: String,
        /// Which field was out of range.
        field: &'static str,
        /// The offending value.
        value: u8,
    },

    /// A `MediaPathRef::BankLabel` references a label absent from `media_bank`.
    #[error("playback '{playback}' references unknown media bank label '{label}'")]
    DanglingMediaBankLabel {
        /// Owning playback key.
        playback: String,
        /// The dangling label.
        label: String,
    },
}

/// Validate a [`Session`] against the invariants in §3.
pub fn validate_session(session: &Session) -> Result<(), SessionValidationError> {
    if session.version != "1.0" {
        return Err(SessionValidationError::UnsupportedVersion(
            session.version.clone(),
        ));
    }

    for (playback_key, playback) in &session.playbacks {
        if !(1..=100).contains(&playback.media.cycle_speed) {
            return Err(SessionValidationError::CycleSpeedOutOfRange {
                playback: playback_key.clone(),
                field: "media.cycle_speed",
                value: playback.media.cycle_speed,
            });
        }
        if !(1..=100).contains(&playback.text.manual_cycle_speed) {
            return Err(SessionValidationError::CycleSpeedOutOfRange {
                playback: playback_key.clone(),
                field: "text.manual_cycle_speed",
                value: playback.text.manual_cycle_speed,
            });
        }
        for path_ref in &playback.media.paths {
            if let super::playback::MediaPathRef::BankLabel { label } = path_ref {
                if !session.media_bank.iter().any(|entry| &entry.label == label) {
                    return Err(SessionValidationError::DanglingMediaBankLabel {
                        playback: playback_key.clone(),
                        label: label.clone(),
                    });
                }
            }
        }
    }

    for (cuelist_key, cuelist) in &session.cuelists {
        if cuelist.cues.is_empty() {
            return Err(SessionValidationError::EmptyCuelist(cuelist_key.clone()));
        }
        for cue in &cuelist.cues {
            if cue.duration_seconds <= 0.0 {
                return Err(SessionValidationError::NonPositiveCueDuration {
                    cuelist: cuelist_key.clone(),
                    cue: cue.name.clone(),
                    duration: cue.duration_seconds,
                });
            }
            if cue.playback_pool.is_empty() {
                return Err(SessionValidationError::EmptyPlaybackPool {
                    cuelist: cuelist_key.clone(),
                    cue: cue.name.clone(),
                });
            }
            for entry in &cue.playback_pool {
                if !session.playbacks.contains_key(&entry.playback_key) {
                    return Err(SessionValidationError::DanglingPlaybackKey {
                        cuelist: cuelist_key.clone(),
                        cue: cue.name.clone(),
                        playback_key: entry.playback_key.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cue::{Cue, Cuelist, LoopMode, PlaybackPoolEntry, SelectionMode};
    use crate::model::playback::{MediaConfig, MediaMode, Playback, SpiralConfig, TextConfig, ZoomConfig};
    use crate::model::session::{RuntimeHints, SessionMetadata};
    use std::collections::HashMap;

    fn base_session() -> Session {
        let mut playbacks = HashMap::new();
        playbacks.insert(
            "pb1".into(),
            Playback {
                spiral: SpiralConfig::default(),
                media: MediaConfig {
                    mode: MediaMode::None,
                    ..MediaConfig::default()
                },
                text: TextConfig::default(),
                zoom: ZoomConfig::default(),
            },
        );

        Session {
            version: "1.0".into(),
            metadata: SessionMetadata {
                name: "T".into(),
                created: None,
                modified: None,
            },
            playbacks,
            cuelists: HashMap::new(),
            media_bank: vec![],
            runtime: RuntimeHints::default(),
        }
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut session = base_session();
        session.version = "2.0".into();
        assert_eq!(
            session.validate(),
            Err(SessionValidationError::UnsupportedVersion("2.0".into()))
        );
    }

    #[test]
    fn rejects_empty_cuelist() {
        let mut session = base_session();
        session.cuelists.insert(
            "main".into(),
            Cuelist {
                name: "Main".into(),
                loop_mode: LoopMode::Once,
                cues: vec![],
            },
        );
        assert_eq!(
            session.validate(),
            Err(SessionValidationError::EmptyCuelist("main".into()))
        );
    }

    #[test]
    fn rejects_non_positive_duration() {
        let mut session = base_session();
        session.cuelists.insert(
            "main".into(),
            Cuelist {
                name: "Main".into(),
                loop_mode: LoopMode::Once,
                cues: vec![Cue {
                    name: "c".into(),
                    duration_seconds: 0.0,
                    fade_in: 0.0,
                    fade_out: 0.0,
                    playback_pool: vec![PlaybackPoolEntry {
                        playback_key: "pb1".into(),
                        weight: 1,
                        min_duration_s: None,
                        max_duration_s: None,
                        min_cycles: None,
                        max_cycles: None,
                    }],
                    selection_mode: SelectionMode::OnCueStart,
                    audio: vec![],
                }],
            },
        );
        assert!(matches!(
            session.validate(),
            Err(SessionValidationError::NonPositiveCueDuration { .. })
        ));
    }

    #[test]
    fn rejects_dangling_playback_key() {
        let mut session = base_session();
        session.cuelists.insert(
            "main".into(),
            Cuelist {
                name: "Main".into(),
                loop_mode: LoopMode::Once,
                cues: vec![Cue {
                    name: "c".into(),
                    duration_seconds: 5.0,
                    fade_in: 0.0,
                    fade_out: 0.0,
                    playback_pool: vec![PlaybackPoolEntry {
                        playback_key: "missing".into(),
                        weight: 1,
                        min_duration_s: None,
                        max_duration_s: None,
                        min_cycles: None,
                        max_cycles: None,
                    }],
                    selection_mode: SelectionMode::OnCueStart,
                    audio: vec![],
                }],
            },
        );
        assert!(matches!(
            session.validate(),
            Err(SessionValidationError::DanglingPlaybackKey { .. })
        ));
    }

    #[test]
    fn rejects_cycle_speed_out_of_range() {
        let mut session = base_session();
        session.playbacks.get_mut("pb1").unwrap().media.cycle_speed = 0;
        assert!(matches!(
            session.validate(),
            Err(SessionValidationError::CycleSpeedOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_dangling_media_bank_label() {
        let mut session = base_session();
        session.playbacks.get_mut("pb1").unwrap().media.paths =
            vec![crate::model::playback::MediaPathRef::BankLabel {
                label: "ghost".into(),
            }];
        assert!(matches!(
            session.validate(),
            Err(SessionValidationError::DanglingMediaBankLabel { .. })
        ));
    }
}
