//! Visual Director (§4.6): playback lifecycle, media cycling, cycle-boundary
//! dispatch, and per-frame parameter drift (phase accumulation lives in the
//! compositor itself; zoom-progress animation lives here since it has no
//! GPU-side equivalent to delegate to).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use mesmerglass_core::{
    MediaBankKind, MediaBankResolver, MediaMode, MediaPathRef, Playback, RuntimeConfig, Session,
};
use mesmerglass_media::{PrefetchRing, Result as MediaResult, VideoDecoder, VideoFrame};
use tracing::{debug, warn};

use crate::image_pool::ImageWorkerPool;
use crate::renderer::{RenderBackground, RenderFrame, RenderText, VisualRenderer};
use crate::visual::{ResolvedMedia, Visual};
use crate::{Result, RuntimeError};

/// Per-phase time budgets for a single `update()` call (§5 resource model).
/// Exceeding one doesn't fail the tick, it's logged so a slow cue or a slow
/// renderer shows up in `tracing` output instead of just as dropped frames.
const BUDGET_TICK_MS: f32 = 16.7;
const BUDGET_CYCLER_ADVANCE_MS: f32 = 0.1;
const BUDGET_RENDER_MS: f32 = 5.0;
const BUDGET_BOUNDARY_CALLBACKS_MS: f32 = 1.0;

/// Opens a decoder for a video path. Decoupled from any concrete backend so
/// this crate's tests can supply `TestPatternDecoder` while the real bin
/// crate supplies `FFmpegDecoder::open` (feature-gated, not a dependency of
/// this crate).
pub type VideoDecoderFactory =
    Box<dyn Fn(&str) -> MediaResult<Box<dyn VideoDecoder>> + Send + Sync>;

/// Which kind of boundary a tick crossed (§4.5 cycle-boundary detection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// The active media index wrapped (images: back to 0; video: end or
    /// reverse) within the same playback.
    MediaCycle,
    /// A new playback was loaded while the previous one's marker was
    /// nonzero; the first cycle the new playback reports is treated as a
    /// boundary too (§4.5 "Critical edge case").
    PlaybackSwitch,
}

/// One boundary crossing observed this tick.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryEvent {
    /// Which kind of boundary this was.
    pub kind: BoundaryKind,
    /// The marker value observed when the boundary fired.
    pub marker: u64,
}

/// Forward-decoded frames for the currently-playing video, cached so the
/// ping-pong cursor's backward reads replay already-buffered frames instead
/// of asking the decode thread to seek backward (§4.3 `PrefetchRing` design
/// note).
struct VideoWindow {
    path: String,
    ring: PrefetchRing,
    cache: VecDeque<VideoFrame>,
    frame_count: Option<u64>,
}

impl VideoWindow {
    fn open(path: &str, factory: &VideoDecoderFactory, buf_cap: usize) -> MediaResult<Self> {
        let decoder = factory(path)?;
        let frame_count = decoder.frame_count();
        Ok(Self {
            path: path.to_string(),
            ring: PrefetchRing::spawn(decoder, buf_cap),
            cache: VecDeque::new(),
            frame_count,
        })
    }

    /// Opportunistically grow the cache, then serve `index` if buffered.
    /// Non-blocking: if the decode thread hasn't produced `index` yet this
    /// call, returns `None` and the caller tries again next tick.
    fn frame_for(&mut self, index: u64) -> Option<VideoFrame> {
        while (self.cache.len() as u64) <= index {
            match self.ring.try_recv() {
                Some(frame) => self.cache.push_back(frame),
                None => break,
            }
        }
        self.cache.get(index as usize).cloned()
    }
}

fn looks_like_video(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [".mp4", ".mov", ".mkv", ".webm", ".avi", ".m4v"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn classify_by_mode(mode: MediaMode, path: &str) -> bool {
    match mode {
        MediaMode::Videos => true,
        MediaMode::Images => false,
        MediaMode::Both | MediaMode::None => looks_like_video(path),
    }
}

fn resolve_media_items(
    playback: &Playback,
    session: &Session,
    resolver: &dyn MediaBankResolver,
) -> Vec<ResolvedMedia> {
    let mut items = Vec::new();
    for path_ref in &playback.media.paths {
        match path_ref {
            MediaPathRef::Path(path) => {
                let is_video = classify_by_mode(playback.media.mode, path);
                items.push(ResolvedMedia {
                    path: path.clone(),
                    is_video,
                });
            }
            MediaPathRef::BankLabel { label } => {
                let Some(entry) = session.media_bank.iter().find(|e| &e.label == label) else {
                    warn!(%label, "media bank label not found in session");
                    continue;
                };
                if entry.kind == MediaBankKind::Fonts {
                    warn!(%label, "media bank label is fonts-only, not usable for media cycling");
                    continue;
                }
                for member_path in resolver.list(&entry.path) {
                    let is_video = match entry.kind {
                        MediaBankKind::Images => false,
                        MediaBankKind::Videos => true,
                        MediaBankKind::Both => classify_by_mode(MediaMode::Both, &member_path),
                        MediaBankKind::Fonts => unreachable!("filtered above"),
                    };
                    items.push(ResolvedMedia {
                        path: member_path,
                        is_video,
                    });
                }
            }
        }
    }
    items
}

/// Background zoom progress, animated per `ZoomConfig::mode`/`rate` (§4.5).
/// The mapping from mode to curve shape is an implementer choice within the
/// documented parameter ranges; `accumulator` tracks raw elapsed "rate-time"
/// so the curve stays reproducible across frame-rate variation.
#[derive(Debug, Clone, Copy, Default)]
struct ZoomAnimator {
    accumulator: f32,
}

impl ZoomAnimator {
    fn advance(&mut self, mode: mesmerglass_core::ZoomMode, rate: f32, dt: f32) -> f32 {
        use mesmerglass_core::ZoomMode;
        match mode {
            ZoomMode::None => 0.0,
            ZoomMode::In => {
                self.accumulator = (self.accumulator + rate * dt).clamp(0.0, 1.0);
                self.accumulator
            }
            ZoomMode::Out => {
                self.accumulator = (self.accumulator + rate * dt).clamp(0.0, 1.0);
                1.0 - self.accumulator
            }
            ZoomMode::Pulse => {
                self.accumulator += rate * dt;
                (self.accumulator.sin() + 1.0) / 2.0
            }
        }
    }

    fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Text overlay opacity (and, for `Scroll`, a marquee window over the
/// line), animated per `TextConfig::mode` (§4.5). Mirrors [`ZoomAnimator`]:
/// the mapping from mode to curve shape is an implementer choice,
/// `accumulator` tracks raw elapsed time so the curve stays reproducible
/// across frame-rate variation and survives a mode switch without a
/// jump-cut.
#[derive(Debug, Clone, Copy, Default)]
struct TextAnimator {
    accumulator: f32,
}

impl TextAnimator {
    fn advance(&mut self, mode: mesmerglass_core::TextMode, base_opacity: f32, dt: f32) -> f32 {
        use mesmerglass_core::TextMode;
        self.accumulator += dt;
        match mode {
            TextMode::Off => 0.0,
            TextMode::Static | TextMode::CenteredSync | TextMode::Subtext | TextMode::Scroll => {
                base_opacity
            }
            TextMode::Flash => {
                if (self.accumulator % 1.0) < 0.5 {
                    base_opacity
                } else {
                    0.0
                }
            }
            TextMode::Fade => {
                let phase = (self.accumulator * 0.5) % 2.0;
                let triangle = if phase < 1.0 { phase } else { 2.0 - phase };
                base_opacity * triangle
            }
            TextMode::Pulse => base_opacity * ((self.accumulator.sin() + 1.0) / 2.0),
        }
    }

    /// Marquee window over `line` for `TextMode::Scroll`: slides a
    /// fixed-width view across the string plus wrap-around padding,
    /// advancing a few characters per second.
    fn scroll_window(&self, line: &str) -> String {
        const WINDOW: usize = 24;
        const CHARS_PER_SEC: f32 = 6.0;

        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= WINDOW {
            return line.to_string();
        }

        let padded: Vec<char> = chars.iter().copied().chain(std::iter::once(' ')).collect();
        let offset = (self.accumulator * CHARS_PER_SEC) as usize % padded.len();
        padded.iter().copied().cycle().skip(offset).take(WINDOW).collect()
    }

    fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// The Visual Director (§4.6): owns the active [`Visual`], drives it one
/// render tick at a time, and reports cycle-boundary crossings to the
/// Session Runner.
pub struct Director<R: VisualRenderer> {
    session: Arc<Session>,
    config: RuntimeConfig,
    renderer: R,
    resolver: Arc<dyn MediaBankResolver>,
    video_decoder_factory: VideoDecoderFactory,
    default_aspect_ratio: f32,

    visual: Option<Visual>,
    /// Preserved across `load_playback` (§4.5: "last_cycle_marker is
    /// preserved across the reset so that cross-playback switches still
    /// register as boundaries").
    last_marker: u64,
    boundary_callbacks: Vec<Box<dyn FnMut(BoundaryEvent) + Send>>,

    image_pool: ImageWorkerPool,
    image_cache: HashMap<String, RenderBackground>,
    pending_image_requests: HashSet<String>,
    video_window: Option<VideoWindow>,

    zoom: ZoomAnimator,
    text: TextAnimator,
    /// Non-fatal media errors accumulated this tick, drained by the caller
    /// (typically the Session Runner) via [`Self::take_media_errors`].
    media_errors: Vec<RuntimeError>,
}

impl<R: VisualRenderer> Director<R> {
    /// Build a Director over `session`, rendering through `renderer`.
    pub fn new(
        session: Arc<Session>,
        config: RuntimeConfig,
        renderer: R,
        resolver: Arc<dyn MediaBankResolver>,
        video_decoder_factory: VideoDecoderFactory,
        image_worker_count: usize,
    ) -> Self {
        Self {
            session,
            config,
            renderer,
            resolver,
            video_decoder_factory,
            default_aspect_ratio: 16.0 / 9.0,
            visual: None,
            last_marker: 0,
            boundary_callbacks: Vec::new(),
            image_pool: ImageWorkerPool::spawn(image_worker_count),
            image_cache: HashMap::new(),
            pending_image_requests: HashSet::new(),
            video_window: None,
            zoom: ZoomAnimator::default(),
            text: TextAnimator::default(),
            media_errors: Vec::new(),
        }
    }

    /// Override the aspect ratio used to build [`RenderFrame`]s (real
    /// per-surface aspect tracking belongs to the concrete `VisualRenderer`,
    /// which knows the attached `DisplaySurface`s this trait hides).
    pub fn set_default_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.default_aspect_ratio = aspect_ratio;
    }

    /// The currently-loaded playback's key, if any.
    pub fn current_playback_key(&self) -> Option<&str> {
        self.visual.as_ref().map(Visual::playback_key)
    }

    /// §4.6 `load_playback(key)`: builds a fresh [`Visual`] from the
    /// playback config. Does not start playback.
    pub fn load_playback(&mut self, key: &str) -> Result<()> {
        let playback = self
            .session
            .playbacks
            .get(key)
            .ok_or_else(|| RuntimeError::PlaybackLoadFailed {
                key: key.to_string(),
                cause: "no such playback in session".to_string(),
            })?
            .clone();

        let media_items = resolve_media_items(&playback, &self.session, self.resolver.as_ref());

        self.visual = Some(Visual::new(key, playback, media_items));
        self.video_window = None;
        self.image_cache.clear();
        self.pending_image_requests.clear();
        self.zoom.reset();
        self.text.reset();
        // last_marker is intentionally NOT reset here (§4.5).
        Ok(())
    }

    /// §4.6 `start_playback()`: load the first media item and enable the
    /// cycler graph.
    pub fn start_playback(&mut self) -> Result<()> {
        let visual = self
            .visual
            .as_mut()
            .ok_or_else(|| RuntimeError::PlaybackLoadFailed {
                key: String::new(),
                cause: "start_playback called with no playback loaded".to_string(),
            })?;
        visual.start_playback();
        Ok(())
    }

    /// §4.6 `register_cycle_boundary(callback)`.
    pub fn register_cycle_boundary(&mut self, callback: impl FnMut(BoundaryEvent) + Send + 'static) {
        self.boundary_callbacks.push(Box::new(callback));
    }

    /// §4.6 `reload_from_disk()`: re-applies the current playback's live
    /// config. In this architecture the session is held in memory (on-disk
    /// re-reading is the `FileReader` collaborator's job, §1), so this
    /// re-resolves media and invalidates the cached cyclers.
    pub fn reload_from_disk(&mut self) -> Result<()> {
        let key = self
            .visual
            .as_ref()
            .map(|v| v.playback_key().to_string())
            .ok_or_else(|| RuntimeError::PlaybackLoadFailed {
                key: String::new(),
                cause: "reload_from_disk called with no playback loaded".to_string(),
            })?;
        let started = self.visual.as_ref().map(Visual::is_started).unwrap_or(false);
        self.load_playback(&key)?;
        if started {
            self.start_playback()?;
        }
        Ok(())
    }

    /// §4.6 `_apply_media_settings()`: clears the cached media cycler so the
    /// next tick rebuilds it at the live `media.cycle_speed`.
    pub fn invalidate_cycler(&mut self) {
        if let Some(visual) = &mut self.visual {
            visual.invalidate_media_cycler();
        }
    }

    /// Drain non-fatal media errors accumulated since the last call.
    pub fn take_media_errors(&mut self) -> Vec<RuntimeError> {
        std::mem::take(&mut self.media_errors)
    }

    fn sync_media_for_current(&mut self) {
        let Some(current) = self.visual.as_ref().and_then(Visual::current_media).cloned() else {
            self.video_window = None;
            return;
        };

        if current.is_video {
            let needs_open = self
                .video_window
                .as_ref()
                .map(|w| w.path != current.path)
                .unwrap_or(true);
            if needs_open {
                match VideoWindow::open(
                    &current.path,
                    &self.video_decoder_factory,
                    self.config.video_buf_cap,
                ) {
                    Ok(window) => {
                        if let Some(frame_count) = window.frame_count {
                            if let Some(visual) = self.visual.as_mut() {
                                visual.set_current_video_frame_count(frame_count);
                            }
                        }
                        self.video_window = Some(window);
                    }
                    Err(e) => {
                        self.media_errors.push(RuntimeError::MediaDecodeFailed {
                            path: current.path.clone(),
                            cause: e.to_string(),
                        });
                        self.video_window = None;
                    }
                }
            }
        } else {
            self.video_window = None;
            if !self.image_cache.contains_key(&current.path)
                && !self.pending_image_requests.contains(&current.path)
            {
                self.image_pool.request(current.path.clone());
                self.pending_image_requests.insert(current.path.clone());
            }
        }

        for result in self.image_pool.poll() {
            match result {
                Ok(image) => {
                    self.pending_image_requests.remove(&image.path);
                    self.image_cache.insert(
                        image.path.clone(),
                        RenderBackground {
                            path: image.path,
                            frame_id: 0,
                            pixels: image.pixels,
                            width: image.width,
                            height: image.height,
                        },
                    );
                }
                Err((path, e)) => {
                    self.pending_image_requests.remove(&path);
                    self.media_errors
                        .push(RuntimeError::MediaDecodeFailed { path, cause: e.to_string() });
                }
            }
        }
    }

    fn current_background(&mut self) -> Option<RenderBackground> {
        let current = self.visual.as_ref().and_then(Visual::current_media)?.clone();
        if current.is_video {
            let index = self.visual.as_ref()?.current_video_frame_index()?;
            let window = self.video_window.as_mut()?;
            if window.path != current.path {
                return None;
            }
            let frame = window.frame_for(index)?;
            Some(RenderBackground {
                path: current.path,
                frame_id: index,
                pixels: frame.data,
                width: frame.format.width,
                height: frame.format.height,
            })
        } else {
            self.image_cache.get(&current.path).cloned()
        }
    }

    /// §4.6 `update(dt)`: advances cyclers, applies parameter drift, renders
    /// one frame per attached surface, then runs boundary detection.
    pub fn update(&mut self, dt: f32) -> Result<Vec<BoundaryEvent>> {
        let tick_start = Instant::now();

        let Some(visual) = self.visual.as_mut() else {
            return Ok(Vec::new());
        };
        if !visual.is_started() {
            return Ok(Vec::new());
        }

        let cycler_start = Instant::now();
        visual.advance(self.config.target_fps as f64);
        let cycler_advance_ms = cycler_start.elapsed().as_secs_f32() * 1000.0;
        if cycler_advance_ms > BUDGET_CYCLER_ADVANCE_MS {
            warn!(cycler_advance_ms, budget_ms = BUDGET_CYCLER_ADVANCE_MS, "cycler advance over budget");
        }

        self.sync_media_for_current();

        let visual = self.visual.as_mut().expect("checked above");
        let playback = visual.playback().clone();
        let text_opacity = self.text.advance(playback.text.mode, playback.text.opacity, dt);
        let text = visual.current_text_line().map(|line| {
            let line = if playback.text.mode == mesmerglass_core::TextMode::Scroll {
                self.text.scroll_window(line)
            } else {
                line.to_string()
            };
            RenderText { line, opacity: text_opacity }
        });
        let zoom_progress = self.zoom.advance(playback.zoom.mode, playback.zoom.rate, dt);
        let background = self.current_background();

        let spiral_type_index = (playback.spiral.spiral_type as usize).saturating_sub(1);
        let arms = mesmerglass_render::spiral::VALID_ARM_COUNTS
            .get(spiral_type_index)
            .copied()
            .unwrap_or(1);

        let frame = RenderFrame {
            aspect_ratio: self.default_aspect_ratio,
            spiral_type: playback.spiral.spiral_type as u8,
            arms,
            arm_color_a: [
                playback.spiral.arm_color.r,
                playback.spiral.arm_color.g,
                playback.spiral.arm_color.b,
                playback.spiral.arm_color.a,
            ],
            arm_color_b: [
                playback.spiral.gap_color.r,
                playback.spiral.gap_color.g,
                playback.spiral.gap_color.b,
                playback.spiral.gap_color.a,
            ],
            rotation_speed_rpm: playback.spiral.rotation_speed_rpm,
            reverse: playback.spiral.reverse,
            spiral_opacity: playback.spiral.opacity,
            target_fps: self.config.target_fps,
            zoom_origin: 1.0,
            zoom: 1.5,
            zoom_progress,
            background,
            text,
        };

        let render_start = Instant::now();
        for surface_index in 0..self.renderer.surface_count() {
            self.renderer.render(surface_index, &frame)?;
        }
        let render_ms = render_start.elapsed().as_secs_f32() * 1000.0;
        if render_ms > BUDGET_RENDER_MS {
            warn!(render_ms, budget_ms = BUDGET_RENDER_MS, "frame upload/render over budget");
        }

        let current_marker = self.visual.as_ref().expect("checked above").cycle_marker();
        let mut events = Vec::new();
        if current_marker > self.last_marker {
            events.push(BoundaryEvent {
                kind: BoundaryKind::MediaCycle,
                marker: current_marker,
            });
        } else if current_marker < self.last_marker && current_marker > 0 {
            events.push(BoundaryEvent {
                kind: BoundaryKind::PlaybackSwitch,
                marker: current_marker,
            });
        }
        if !events.is_empty() {
            self.last_marker = current_marker;
            debug!(?events, "cycle boundary crossed");
        }

        let callbacks_start = Instant::now();
        for event in &events {
            for callback in &mut self.boundary_callbacks {
                callback(*event);
            }
        }
        let callbacks_ms = callbacks_start.elapsed().as_secs_f32() * 1000.0;
        if callbacks_ms > BUDGET_BOUNDARY_CALLBACKS_MS {
            warn!(callbacks_ms, budget_ms = BUDGET_BOUNDARY_CALLBACKS_MS, "boundary callbacks over budget");
        }

        let tick_ms = tick_start.elapsed().as_secs_f32() * 1000.0;
        if tick_ms > BUDGET_TICK_MS {
            warn!(tick_ms, budget_ms = BUDGET_TICK_MS, "update() over frame budget");
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration as StdDuration;

    use mesmerglass_core::{Cuelist, MediaConfig, SessionMetadata, SpiralConfig, TextConfig, ZoomConfig};

    struct RecordingRenderer {
        frames: Arc<StdMutex<Vec<RenderFrame>>>,
    }

    impl VisualRenderer for RecordingRenderer {
        fn surface_count(&self) -> usize {
            1
        }

        fn render(&mut self, _surface_index: usize, frame: &RenderFrame) -> Result<()> {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    struct NoBankResolver;
    impl MediaBankResolver for NoBankResolver {
        fn list(&self, _bank_path: &str) -> Vec<String> {
            Vec::new()
        }
    }

    fn unused_video_factory() -> VideoDecoderFactory {
        Box::new(|path: &str| {
            Err(mesmerglass_media::MediaError::FileMissing(path.to_string()))
        })
    }

    fn images_playback(cycle_speed: u8, paths: &[&str]) -> Playback {
        Playback {
            spiral: SpiralConfig::default(),
            media: MediaConfig {
                mode: MediaMode::Images,
                cycle_speed,
                paths: paths.iter().map(|p| MediaPathRef::Path(p.to_string())).collect(),
                shuffle: false,
            },
            text: TextConfig::default(),
            zoom: ZoomConfig::default(),
        }
    }

    fn session_with(playbacks: Vec<(&str, Playback)>) -> Session {
        Session {
            version: "1.0".into(),
            metadata: SessionMetadata {
                name: "test".into(),
                created: None,
                modified: None,
            },
            playbacks: playbacks.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            cuelists: HashMap::<String, Cuelist>::new(),
            media_bank: vec![],
            runtime: Default::default(),
        }
    }

    fn write_png(path: &std::path::Path) {
        let img = image::RgbaImage::new(2, 2);
        img.save(path).unwrap();
    }

    fn test_director(session: Arc<Session>) -> (Director<RecordingRenderer>, Arc<StdMutex<Vec<RenderFrame>>>) {
        let frames = Arc::new(StdMutex::new(Vec::new()));
        let renderer = RecordingRenderer { frames: frames.clone() };
        let director = Director::new(
            session,
            RuntimeConfig::default(),
            renderer,
            Arc::new(NoBankResolver),
            unused_video_factory(),
            2,
        );
        (director, frames)
    }

    #[test]
    fn start_playback_eventually_renders_a_decoded_background() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        write_png(&a);

        let session = Arc::new(session_with(vec![(
            "pb1",
            images_playback(100, &[a.to_str().unwrap()]),
        )]));
        let (mut director, frames) = test_director(session);

        director.load_playback("pb1").unwrap();
        director.start_playback().unwrap();

        let mut saw_background = false;
        for _ in 0..200 {
            director.update(1.0 / 60.0).unwrap();
            if frames.lock().unwrap().iter().any(|f| f.background.is_some()) {
                saw_background = true;
                break;
            }
            std::thread::sleep(StdDuration::from_millis(5));
        }
        assert!(saw_background, "expected a decoded background within 1s");
        assert!(director.take_media_errors().is_empty());
    }

    #[test]
    fn missing_image_is_reported_as_a_media_error() {
        let session = Arc::new(session_with(vec![(
            "pb1",
            images_playback(100, &["/nonexistent/path/for/director/test.png"]),
        )]));
        let (mut director, _frames) = test_director(session);

        director.load_playback("pb1").unwrap();
        director.start_playback().unwrap();

        let mut saw_error = false;
        for _ in 0..50 {
            director.update(1.0 / 60.0).unwrap();
            if !director.take_media_errors().is_empty() {
                saw_error = true;
                break;
            }
            std::thread::sleep(StdDuration::from_millis(5));
        }
        assert!(saw_error, "expected a MediaDecodeFailed error for the missing file");
    }

    #[test]
    fn cycle_boundary_across_playback_switch_is_detected() {
        // §8 "Cycle-boundary across switches": loading a new playback while
        // cycle_marker was > 0 causes the next observed marker > 0 on the
        // new visual to be detected as a boundary crossing.
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a);
        write_png(&b);
        let a = a.to_str().unwrap();
        let b = b.to_str().unwrap();

        let session = Arc::new(session_with(vec![
            ("pb1", images_playback(100, &[a, b])),
            ("pb2", images_playback(100, &[a, b])),
        ]));
        let (mut director, _frames) = test_director(session);

        director.load_playback("pb1").unwrap();
        director.start_playback().unwrap();

        // frames_per_cycle(100) == 11; with 2 items, cycle_marker reaches 3
        // by the 67th advance (see mirrored timing in `visual.rs`'s tests).
        let mut saw_media_cycle = false;
        for _ in 0..70 {
            let events = director.update(1.0 / 60.0).unwrap();
            if events.iter().any(|e| e.kind == BoundaryKind::MediaCycle) {
                saw_media_cycle = true;
            }
        }
        assert!(saw_media_cycle, "expected at least one media-cycle boundary on pb1");

        director.load_playback("pb2").unwrap();
        director.start_playback().unwrap();

        let mut switch_events = Vec::new();
        for _ in 0..23 {
            let events = director.update(1.0 / 60.0).unwrap();
            switch_events.extend(events);
        }
        assert_eq!(switch_events.len(), 1);
        assert_eq!(switch_events[0].kind, BoundaryKind::PlaybackSwitch);
        assert_eq!(switch_events[0].marker, 1);
    }

    #[test]
    fn invalidate_cycler_rebuilds_with_the_live_period() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a);
        write_png(&b);

        let session = Arc::new(session_with(vec![(
            "pb1",
            images_playback(1, &[a.to_str().unwrap(), b.to_str().unwrap()]),
        )]));
        let (mut director, _frames) = test_director(session);

        director.load_playback("pb1").unwrap();
        director.start_playback().unwrap();

        for _ in 0..10 {
            director.update(1.0 / 60.0).unwrap();
        }
        assert_eq!(director.current_playback_key(), Some("pb1"));

        director.invalidate_cycler();
        // Rebuilding at the (unchanged) config here only proves the hook
        // doesn't panic and the director keeps ticking; live period changes
        // are exercised directly against `Visual` in `visual.rs`.
        for _ in 0..5 {
            director.update(1.0 / 60.0).unwrap();
        }
    }

    #[test]
    fn load_playback_rejects_unknown_key() {
        let session = Arc::new(session_with(vec![]));
        let (mut director, _frames) = test_director(session);
        let err = director.load_playback("missing").unwrap_err();
        assert!(matches!(err, RuntimeError::PlaybackLoadFailed { .. }));
    }
}
