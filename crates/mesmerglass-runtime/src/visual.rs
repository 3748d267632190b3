//! Visual: the instantiated runtime object built from a Playback (§3, §4.6).

use mesmerglass_core::{Cycler, CyclerEvent, Playback, RuntimeConfig, WeightedShuffler};
use mesmerglass_media::VideoCursor;

/// How the next media item is chosen as the cycler fires.
enum MediaSelection {
    Sequential,
    Shuffled(WeightedShuffler),
}

/// A resolved media path plus the kind the playback's `media.mode` assigns
/// it (§3 Media Item; kind comes from the playback's declared mode rather
/// than extension sniffing, except under `MediaMode::Both`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// Absolute path.
    pub path: String,
    /// Whether this item should be decoded as a video.
    pub is_video: bool,
}

/// The instantiated runtime object built from a [`Playback`] (glossary).
///
/// Owns the media cycler graph, the media/text selection state, and the
/// per-visual [`Self::cycle_marker`] that the Director's boundary detection
/// watches (§4.5).
pub struct Visual {
    playback_key: String,
    playback: Playback,
    media_items: Vec<ResolvedMedia>,
    media_selection: MediaSelection,
    media_index: usize,
    /// Cached so a config change can force a rebuild (§4.6 `reload_from_disk`,
    /// §9 historic bug class: a cached cycler must be invalidated, never
    /// silently reused, when its period-affecting config changes).
    media_cycler: Option<Cycler>,
    text_cycler: Option<Cycler>,
    text_index: usize,
    video_cursor: Option<VideoCursor>,
    cycle_marker: u64,
    shuffle_draw_count: usize,
    started: bool,
    /// An `Action` cycler fires on its very first `advance()` call (frame 0
    /// is due by construction, see `Cycler::action`). That first fire
    /// reflects the already-applied initial selection, not a real cycle
    /// boundary, so it is consumed here rather than advancing the index.
    media_cycler_primed: bool,
    text_cycler_primed: bool,
}

impl Visual {
    /// Build a Visual from a playback recipe and its already-resolved media
    /// list (resolving `MediaPathRef::BankLabel` entries against the session's
    /// Media Bank is the caller's job — see `Director::load_playback`).
    pub fn new(playback_key: impl Into<String>, playback: Playback, media_items: Vec<ResolvedMedia>) -> Self {
        let media_selection = if playback.media.shuffle && !media_items.is_empty() {
            MediaSelection::Shuffled(WeightedShuffler::new(media_items.len(), media_items.len().min(8)))
        } else {
            MediaSelection::Sequential
        };

        Self {
            playback_key: playback_key.into(),
            playback,
            media_items,
            media_selection,
            media_index: 0,
            media_cycler: None,
            text_cycler: None,
            text_index: 0,
            video_cursor: None,
            cycle_marker: 0,
            shuffle_draw_count: 0,
            started: false,
            media_cycler_primed: false,
            text_cycler_primed: false,
        }
    }

    /// The playback key this Visual was built from.
    pub fn playback_key(&self) -> &str {
        &self.playback_key
    }

    /// The underlying render recipe.
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    /// Current cycle marker (§4.5): increments whenever the media set wraps.
    pub fn cycle_marker(&self) -> u64 {
        self.cycle_marker
    }

    /// Currently-selected media item, if any.
    pub fn current_media(&self) -> Option<&ResolvedMedia> {
        self.media_items.get(self.media_index)
    }

    /// §4.6 `_apply_media_settings()`: clear the cached cycler so the next
    /// `media_cycler()` call rebuilds it with the live config's period.
    pub fn invalidate_media_cycler(&mut self) {
        self.media_cycler = None;
        self.media_cycler_primed = false;
    }

    /// §4.6 `start_playback()`: load the first media item and enable the
    /// cycler graph. Must be called before any frame shows content.
    pub fn start_playback(&mut self) {
        self.started = true;
        self.media_index = 0;
        self.media_cycler_primed = false;
        self.text_cycler_primed = false;
        self.video_cursor = self.current_video_frame_count().map(VideoCursor::new);
        let _ = self.media_cycler(); // force-build at the current config
    }

    /// Whether `start_playback` has been called since the last load.
    pub fn is_started(&self) -> bool {
        self.started
    }

    fn current_video_frame_count(&self) -> Option<u64> {
        match self.current_media() {
            Some(item) if item.is_video => Some(u64::MAX), // refined once the decoder reports real metadata
            _ => None,
        }
    }

    fn media_cycler(&mut self) -> &mut Cycler {
        if self.media_cycler.is_none() {
            let period = RuntimeConfig::frames_per_cycle(self.playback.media.cycle_speed);
            self.media_cycler = Some(Cycler::action(0, period, 0));
        }
        self.media_cycler.as_mut().expect("just initialized above")
    }

    fn text_cycler(&mut self) -> &mut Cycler {
        if self.text_cycler.is_none() {
            let speed = if self.playback.text.sync_with_media {
                self.playback.media.cycle_speed
            } else {
                self.playback.text.manual_cycle_speed
            };
            let period = RuntimeConfig::frames_per_cycle(speed);
            self.text_cycler = Some(Cycler::action(1, period, 0));
        }
        self.text_cycler.as_mut().expect("just initialized above")
    }

    fn advance_media_index(&mut self) {
        if self.media_items.is_empty() {
            return;
        }
        let wrapped = match &mut self.media_selection {
            MediaSelection::Sequential => {
                self.media_index = (self.media_index + 1) % self.media_items.len();
                self.media_index == 0
            }
            MediaSelection::Shuffled(shuffler) => {
                self.media_index = shuffler.next();
                // A shuffled sequence has no natural "index 0" wrap; treat
                // every draw after a full pass through the pool as a wrap,
                // approximated here as "every `len()` draws".
                self.shuffle_draw_count += 1;
                self.shuffle_draw_count % self.media_items.len().max(1) == 0
            }
        };
        self.video_cursor = self.current_video_frame_count().map(VideoCursor::new);
        if wrapped {
            self.cycle_marker += 1;
        }
    }

    /// Report the real frame count for the video item currently showing,
    /// once the renderer has opened it and knows (§4.3 `VideoSource::metadata`).
    /// Replaces the placeholder `u64::MAX` used until the first real frame
    /// arrives, so ping-pong reflection actually triggers at the true end.
    pub fn set_current_video_frame_count(&mut self, frame_count: u64) {
        if self.video_cursor.is_some() {
            self.video_cursor = Some(VideoCursor::new(frame_count.max(1)));
        }
    }

    /// Advance by one frame (§4.6 `update(dt)`, media-cycling portion).
    ///
    /// `target_fps` drives both the media cycler (frame-accurate, §4.1) and
    /// the current video's ping-pong cursor (§4.3 `frames_to_advance_per_render_tick`).
    pub fn advance(&mut self, target_fps: f64) {
        if !self.started {
            return;
        }

        if let Some(cursor) = &mut self.video_cursor {
            let before = cursor.cycle_marker();
            cursor.advance(VideoCursor::frames_to_advance_per_render_tick(target_fps));
            let after = cursor.cycle_marker();
            if after > before {
                self.cycle_marker += after - before;
            }
        }

        if matches!(self.media_cycler().advance(), CyclerEvent::Fire(_)) {
            if self.media_cycler_primed {
                self.advance_media_index();
            } else {
                self.media_cycler_primed = true;
            }
        }

        if self.playback.text.sync_with_media {
            // Text advances on the same boundary as media; no separate timer.
        } else if matches!(self.text_cycler().advance(), CyclerEvent::Fire(_)) {
            if self.text_cycler_primed {
                self.advance_text_index();
            } else {
                self.text_cycler_primed = true;
            }
        }
    }

    fn advance_text_index(&mut self) {
        if self.playback.text.library.is_empty() {
            return;
        }
        self.text_index = (self.text_index + 1) % self.playback.text.library.len();
    }

    /// The text line to show this frame, applying `sync_with_media` (text
    /// index mirrors the media index modulo library length) or the
    /// independently-advanced `text_index` otherwise.
    pub fn current_text_line(&self) -> Option<&str> {
        if !self.playback.text.enabled || self.playback.text.library.is_empty() {
            return None;
        }
        let index = if self.playback.text.sync_with_media {
            self.media_index % self.playback.text.library.len()
        } else {
            self.text_index
        };
        self.playback.text.library.get(index).map(String::as_str)
    }

    /// Current video frame index to display, if the current item is a video.
    pub fn current_video_frame_index(&self) -> Option<u64> {
        self.video_cursor.as_ref().map(VideoCursor::frame_index)
    }
}
