//! Session Runner (§4.7): the cue state machine. Owns the cue timeline,
//! drives the Visual Director one tick at a time, and sequences audio role
//! lifecycle across transitions.

use std::collections::HashSet;
use std::sync::Arc;

use mesmerglass_audio::{AudioCommand, AudioEngine};
use mesmerglass_core::{AudioRole, Cue, LoopMode, RuntimeConfig, SelectionMode, Session};
use tracing::{info, warn};

use crate::director::Director;
use crate::events::{ErrorKind, RunnerEvent};
use crate::renderer::VisualRenderer;
use crate::selection::PoolSelector;
use crate::{Result, RuntimeError};

/// Runner lifecycle state (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Constructed, nothing loaded yet.
    Idle,
    /// `start()` called, first cue's playback and audio are being primed.
    Loading,
    /// Normal playback.
    Playing,
    /// Paused; the cue timer is frozen and the director is not ticked.
    Paused,
    /// Mid cue-to-cue transition (always momentary: entered and left within
    /// the same `tick()` call that authorized it).
    Transitioning,
    /// Terminal: the cuelist ran out (`loop_mode: once`) or `stop()` was
    /// called.
    Stopped,
}

/// External commands the runner accepts (§4.7, §6).
#[derive(Debug, Clone, Copy)]
pub enum Command {
    /// Resume a paused runner.
    Play,
    /// Pause playback in place.
    Pause,
    /// Stop the runner; terminal until a new `start()`.
    Stop,
    /// Force an immediate cue end, advancing forward, ignoring any pending
    /// cycle-boundary wait.
    SkipNext,
    /// Force an immediate cue end, advancing backward.
    SkipPrev,
    /// Jump directly to the given cue index, ignoring loop direction.
    SeekCue(usize),
}

fn role_key(role: &AudioRole) -> String {
    match role {
        AudioRole::Hypno => "hypno".to_string(),
        AudioRole::Background => "background".to_string(),
        AudioRole::Other(name) => name.clone(),
    }
}

/// Next cue index (and the direction to carry forward) per `loop_mode`
/// (§4.7 "Loop modes"). `None` means the cuelist has run out (`once` mode
/// past the last cue).
fn compute_next(loop_mode: LoopMode, len: usize, index: usize, direction: i32) -> Option<(usize, i32)> {
    if len == 0 {
        return None;
    }
    match loop_mode {
        LoopMode::Once => {
            let next = index as i32 + direction;
            if next < 0 || next as usize >= len {
                None
            } else {
                Some((next as usize, direction))
            }
        }
        LoopMode::Loop => {
            let len_i = len as i32;
            let next = ((index as i32 + direction) % len_i + len_i) % len_i;
            Some((next as usize, direction))
        }
        LoopMode::PingPong => {
            let next = index as i32 + direction;
            if next < 0 {
                Some((if len >= 2 { 1 } else { 0 }, 1))
            } else if next as usize >= len {
                Some((if len >= 2 { len - 2 } else { 0 }, -1))
            } else {
                Some((next as usize, direction))
            }
        }
    }
}

/// The Session Runner (§4.7): cue state machine, two-phase transitions,
/// audio role lifecycle, prefetch orchestration.
pub struct SessionRunner<R: VisualRenderer> {
    session: Arc<Session>,
    config: RuntimeConfig,
    director: Director<R>,
    audio: Arc<AudioEngine>,
    listeners: Vec<Box<dyn FnMut(RunnerEvent) + Send>>,

    cuelist_key: String,
    cue_index: usize,
    direction: i32,
    current_cue: Option<Cue>,
    selector: Option<PoolSelector>,
    state: RunnerState,

    elapsed_s: f32,
    cue_elapsed_s: f32,
    cycle_count: u32,
    cue_cycle_count: u32,

    /// Set when a transition request is outstanding (§4.7 two-phase
    /// transition, "request phase").
    pending_transition: bool,
    /// `cue_elapsed_s` at the moment the transition was requested, used by
    /// the `Transition Stuck` check (§7).
    transition_requested_at: Option<f32>,
}

impl<R: VisualRenderer> SessionRunner<R> {
    /// Build a runner over `session`, driving `director` and `audio`.
    pub fn new(session: Arc<Session>, config: RuntimeConfig, director: Director<R>, audio: Arc<AudioEngine>) -> Self {
        Self {
            session,
            config,
            director,
            audio,
            listeners: Vec::new(),
            cuelist_key: String::new(),
            cue_index: 0,
            direction: 1,
            current_cue: None,
            selector: None,
            state: RunnerState::Idle,
            elapsed_s: 0.0,
            cue_elapsed_s: 0.0,
            cycle_count: 0,
            cue_cycle_count: 0,
            pending_transition: false,
            transition_requested_at: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Index of the cue currently active (meaningless before `start()`).
    pub fn cue_index(&self) -> usize {
        self.cue_index
    }

    /// Subscribe to runner events (§6). Callbacks fire in registration order.
    pub fn on_event(&mut self, listener: impl FnMut(RunnerEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: RunnerEvent) {
        for listener in &mut self.listeners {
            listener(event.clone());
        }
    }

    fn emit_runtime_error(&mut self, err: RuntimeError) {
        let kind = match &err {
            RuntimeError::SessionInvalid(_) => ErrorKind::SessionInvalid,
            RuntimeError::PlaybackLoadFailed { .. } => ErrorKind::PlaybackLoadFailed,
            RuntimeError::MediaDecodeFailed { .. } => ErrorKind::MediaDecodeFailed,
            RuntimeError::AudioPrefetchTimeout(_) => ErrorKind::AudioPrefetchTimeout,
            RuntimeError::GpuUploadFailed(_) => ErrorKind::GpuUploadFailed,
            RuntimeError::TransitionStuck(_) => ErrorKind::TransitionStuck,
            RuntimeError::UnknownCue(_) => ErrorKind::PlaybackLoadFailed,
        };
        let detail = err.to_string();
        self.emit(RunnerEvent::Error { kind, detail });
    }

    /// §4.7 `start(cuelist_key)`.
    pub fn start(&mut self, cuelist_key: &str) -> Result<()> {
        self.state = RunnerState::Loading;
        let len = self
            .session
            .cuelists
            .get(cuelist_key)
            .ok_or_else(|| RuntimeError::UnknownCue(cuelist_key.to_string()))?
            .cues
            .len();
        if len == 0 {
            return Err(RuntimeError::UnknownCue(format!(
                "cuelist '{cuelist_key}' has no cues"
            )));
        }

        self.cuelist_key = cuelist_key.to_string();
        self.cue_index = 0;
        self.direction = 1;
        self.elapsed_s = 0.0;
        self.prefetch_lookahead(0);
        self.enter_cue(0)?;
        if self.state != RunnerState::Stopped {
            self.state = RunnerState::Playing;
        }
        Ok(())
    }

    /// Queue decode requests for the current cue plus `audio_lookahead_cues`
    /// ahead (§4.7 "audio lifecycle across transitions"). Uses a simple
    /// forward peek rather than projecting `ping_pong` direction/`once`
    /// bounds exactly; prefetching a cue the timeline never actually visits
    /// next just wastes a decode, it never blocks anything.
    fn prefetch_lookahead(&self, from_index: usize) {
        let Some(cuelist) = self.session.cuelists.get(&self.cuelist_key) else {
            return;
        };
        let len = cuelist.cues.len();
        if len == 0 {
            return;
        }
        for offset in 0..=self.config.audio_lookahead_cues {
            let cue = &cuelist.cues[(from_index + offset) % len];
            for audio in &cue.audio {
                self.audio.prefetch(&cue.name, &role_key(&audio.role), &audio.path);
            }
        }
    }

    /// Enter `index`, skipping forward past any cue whose playback fails to
    /// load (§7 "missing playback file -> skip cue with logged error"),
    /// bounded so a cuelist where every cue fails still reaches `Stopped`
    /// instead of looping forever.
    fn enter_cue(&mut self, index: usize) -> Result<()> {
        let len = self
            .session
            .cuelists
            .get(&self.cuelist_key)
            .expect("validated in start()")
            .cues
            .len();
        let mut index = index;
        for _ in 0..len {
            match self.start_cue(index) {
                Ok(()) => return Ok(()),
                Err(RuntimeError::PlaybackLoadFailed { key, cause }) => {
                    self.emit(RunnerEvent::Error {
                        kind: ErrorKind::PlaybackLoadFailed,
                        detail: format!("playback '{key}' failed to load: {cause}"),
                    });
                    let loop_mode = self
                        .session
                        .cuelists
                        .get(&self.cuelist_key)
                        .expect("validated in start()")
                        .loop_mode;
                    match compute_next(loop_mode, len, index, self.direction) {
                        Some((next_index, direction)) => {
                            self.direction = direction;
                            index = next_index;
                        }
                        None => {
                            self.state = RunnerState::Stopped;
                            return Ok(());
                        }
                    }
                }
                Err(other) => return Err(other),
            }
        }
        warn!(cuelist = %self.cuelist_key, "every cue failed to load, stopping");
        self.state = RunnerState::Stopped;
        Ok(())
    }

    fn start_cue(&mut self, index: usize) -> Result<()> {
        let cue = self
            .session
            .cuelists
            .get(&self.cuelist_key)
            .expect("validated in start()")
            .cues
            .get(index)
            .ok_or_else(|| RuntimeError::UnknownCue(format!("cue index {index} out of range")))?
            .clone();

        let selector = PoolSelector::new(cue.playback_pool.clone(), self.config.shuffle_window);
        let key = selector.current_playback_key().to_string();
        self.director.load_playback(&key)?;
        self.director.start_playback()?;
        self.selector = Some(selector);

        for audio in &cue.audio {
            if let Err(e) = self.audio.apply(AudioCommand::Play {
                cue_id: cue.name.clone(),
                role: role_key(&audio.role),
                path: audio.path.clone(),
                volume: audio.volume,
                looped: audio.looped,
                fade_in_s: audio.fade_in_s,
            }) {
                self.emit(RunnerEvent::Error {
                    kind: ErrorKind::AudioPrefetchTimeout,
                    detail: e.to_string(),
                });
            }
        }

        self.cue_index = index;
        self.cue_elapsed_s = 0.0;
        self.cue_cycle_count = 0;
        self.pending_transition = false;
        self.transition_requested_at = None;
        self.prefetch_lookahead(index);
        self.emit(RunnerEvent::CueStarted {
            cue_index: index,
            cue_name: cue.name.clone(),
        });
        self.current_cue = Some(cue);
        Ok(())
    }

    /// Fade out every role of `ending_cue` that the upcoming cue does not
    /// also use. Roles carried into the next cue are left alone here; the
    /// next cue's own `Play` call replaces the handle directly (this mixer
    /// has one handle per role key, so a true overlapping crossfade isn't
    /// representable — the new handle's own fade-in covers the seam).
    fn end_cue_audio(&mut self, ending_cue: &Cue, next_roles: &HashSet<String>) {
        for audio in &ending_cue.audio {
            let role = role_key(&audio.role);
            if next_roles.contains(&role) {
                continue;
            }
            if let Err(e) = self.audio.apply(AudioCommand::Stop {
                role,
                fade_out_s: audio.fade_out_s,
            }) {
                self.emit_runtime_error(RuntimeError::AudioPrefetchTimeout(e.to_string()));
            }
        }
    }

    fn execute_transition(&mut self) -> Result<()> {
        self.pending_transition = false;
        self.transition_requested_at = None;
        self.state = RunnerState::Transitioning;

        let ended_index = self.cue_index;
        let (loop_mode, len) = {
            let cuelist = self.session.cuelists.get(&self.cuelist_key).expect("validated in start()");
            (cuelist.loop_mode, cuelist.cues.len())
        };
        let next = compute_next(loop_mode, len, self.cue_index, self.direction);
        let ending_cue = self.current_cue.clone().expect("set by enter_cue");

        match next {
            Some((next_index, direction)) => {
                self.direction = direction;
                let next_roles: HashSet<String> = self
                    .session
                    .cuelists
                    .get(&self.cuelist_key)
                    .expect("validated in start()")
                    .cues[next_index]
                    .audio
                    .iter()
                    .map(|a| role_key(&a.role))
                    .collect();
                self.end_cue_audio(&ending_cue, &next_roles);
                self.emit(RunnerEvent::CueEnded { cue_index: ended_index });
                self.enter_cue(next_index)?;
                if self.state != RunnerState::Stopped {
                    self.state = RunnerState::Playing;
                }
                Ok(())
            }
            None => {
                self.end_cue_audio(&ending_cue, &HashSet::new());
                self.emit(RunnerEvent::CueEnded { cue_index: ended_index });
                self.stop()
            }
        }
    }

    fn check_transition_request(&mut self) {
        if self.pending_transition {
            return;
        }
        let Some(cue) = self.current_cue.as_ref() else {
            return;
        };
        if self.cue_elapsed_s >= cue.duration_seconds {
            self.pending_transition = true;
            self.transition_requested_at = Some(self.cue_elapsed_s);
            info!(cue = %cue.name, "cue duration reached, waiting for cycle boundary");
            self.emit(RunnerEvent::TransitionPending {
                reason: format!("cue '{}' reached its duration, waiting for cycle boundary", cue.name),
            });
        }
    }

    fn check_transition_stuck(&mut self) -> Result<()> {
        let Some(requested_at) = self.transition_requested_at else {
            return Ok(());
        };
        if self.cue_elapsed_s - requested_at >= self.config.max_transition_wait_s {
            warn!("transition stuck: forcing cue end without a cycle boundary");
            self.emit_runtime_error(RuntimeError::TransitionStuck(self.config.max_transition_wait_s));
            self.execute_transition()?;
        }
        Ok(())
    }

    /// Re-sample the current cue's playback pool once its current entry's
    /// `max_duration_s`/`max_cycles` is exceeded (§4.7 "Selecting a playback
    /// from a pool"). Only cues whose effective selection mode is
    /// `on_media_cycle` ever reselect mid-cue.
    fn maybe_reselect_pool(&mut self) {
        let Some(cue) = self.current_cue.clone() else {
            return;
        };
        if cue.effective_selection_mode() != SelectionMode::OnMediaCycle {
            return;
        }
        let Some(selector) = &mut self.selector else {
            return;
        };
        if selector.must_reselect(self.cue_elapsed_s, self.cue_cycle_count) {
            let new_key = selector.reselect(self.cue_elapsed_s, self.cue_cycle_count).to_string();
            if let Err(e) = self
                .director
                .load_playback(&new_key)
                .and_then(|_| self.director.start_playback())
            {
                self.emit_runtime_error(e);
            }
        }
    }

    /// Advance the render loop by `dt` seconds (§4.6/§4.7). No-op unless
    /// `Playing`.
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        if self.state != RunnerState::Playing {
            return Ok(());
        }
        self.elapsed_s += dt;
        self.cue_elapsed_s += dt;

        let events = self.director.update(dt)?;
        for err in self.director.take_media_errors() {
            self.emit_runtime_error(err);
        }

        let mut transitioned = false;
        for _event in &events {
            self.cycle_count += 1;
            self.cue_cycle_count += 1;
            // §4.7 "Playback-switch vs cue-transition priority": a pending
            // cue transition always wins the boundary; a competing pool
            // reselection on the same boundary is simply not attempted.
            if self.pending_transition {
                self.execute_transition()?;
                transitioned = true;
                break;
            } else {
                self.maybe_reselect_pool();
            }
        }

        if !transitioned {
            self.check_transition_request();
            self.check_transition_stuck()?;
        }
        Ok(())
    }

    /// Stop the runner, fading out all active audio roles (§4.7).
    pub fn stop(&mut self) -> Result<()> {
        if let Some(cue) = self.current_cue.take() {
            for audio in &cue.audio {
                let _ = self.audio.apply(AudioCommand::Stop {
                    role: role_key(&audio.role),
                    fade_out_s: audio.fade_out_s,
                });
            }
        }
        self.pending_transition = false;
        self.transition_requested_at = None;
        self.state = RunnerState::Stopped;
        Ok(())
    }

    fn skip(&mut self, direction: i32) -> Result<()> {
        if !matches!(
            self.state,
            RunnerState::Playing | RunnerState::Paused | RunnerState::Transitioning
        ) {
            return Ok(());
        }
        if self.pending_transition {
            warn!("skip requested mid-transition: ending cue immediately, ignoring cycle-boundary alignment");
        }
        self.direction = direction;
        self.pending_transition = false;
        self.transition_requested_at = None;
        let was_paused = self.state == RunnerState::Paused;
        self.execute_transition()?;
        if was_paused && self.state != RunnerState::Stopped {
            self.state = RunnerState::Paused;
        }
        Ok(())
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if !matches!(
            self.state,
            RunnerState::Playing | RunnerState::Paused | RunnerState::Transitioning
        ) {
            return Ok(());
        }
        let len = self
            .session
            .cuelists
            .get(&self.cuelist_key)
            .ok_or_else(|| RuntimeError::UnknownCue(self.cuelist_key.clone()))?
            .cues
            .len();
        if index >= len {
            return Err(RuntimeError::UnknownCue(format!("cue index {index} out of range")));
        }

        self.pending_transition = false;
        self.transition_requested_at = None;
        if let Some(cue) = self.current_cue.clone() {
            let next_roles: HashSet<String> = self
                .session
                .cuelists
                .get(&self.cuelist_key)
                .expect("checked above")
                .cues[index]
                .audio
                .iter()
                .map(|a| role_key(&a.role))
                .collect();
            self.end_cue_audio(&cue, &next_roles);
            self.emit(RunnerEvent::CueEnded { cue_index: self.cue_index });
        }
        let was_paused = self.state == RunnerState::Paused;
        self.enter_cue(index)?;
        if was_paused && self.state != RunnerState::Stopped {
            self.state = RunnerState::Paused;
        } else if self.state != RunnerState::Stopped {
            self.state = RunnerState::Playing;
        }
        Ok(())
    }

    /// Apply an external command (§4.7 "Commands").
    pub fn command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Play => {
                if self.state == RunnerState::Paused {
                    self.state = RunnerState::Playing;
                }
            }
            Command::Pause => {
                if matches!(self.state, RunnerState::Playing | RunnerState::Transitioning) {
                    self.state = RunnerState::Paused;
                }
            }
            Command::Stop => self.stop()?,
            Command::SkipNext => self.skip(1)?,
            Command::SkipPrev => self.skip(-1)?,
            Command::SeekCue(index) => self.seek(index)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use mesmerglass_core::{
        Cuelist, CueAudio, MediaConfig, MediaMode, MediaPathRef, Playback, PlaybackPoolEntry,
        Session, SessionMetadata, SpiralConfig, TextConfig, ZoomConfig,
    };

    use crate::director::Director;
    use crate::renderer::{RenderFrame, VisualRenderer};

    struct NullRenderer;
    impl VisualRenderer for NullRenderer {
        fn surface_count(&self) -> usize {
            1
        }
        fn render(&mut self, _surface_index: usize, _frame: &RenderFrame) -> Result<()> {
            Ok(())
        }
    }

    struct NoBankResolver;
    impl mesmerglass_core::MediaBankResolver for NoBankResolver {
        fn list(&self, _bank_path: &str) -> Vec<String> {
            Vec::new()
        }
    }

    fn unused_video_factory() -> crate::director::VideoDecoderFactory {
        Box::new(|path: &str| Err(mesmerglass_media::MediaError::FileMissing(path.to_string())))
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

    fn write_png(path: &std::path::Path) {
        let img = image::RgbaImage::new(2, 2);
        img.save(path).unwrap();
    }

    fn write_wav(path: &std::path::Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn pool(playback_key: &str) -> PlaybackPoolEntry {
        PlaybackPoolEntry {
            playback_key: playback_key.to_string(),
            weight: 1,
            min_duration_s: None,
            max_duration_s: None,
            min_cycles: None,
            max_cycles: None,
        }
    }

    fn cue(name: &str, duration_seconds: f32, pool: Vec<PlaybackPoolEntry>, audio: Vec<CueAudio>) -> Cue {
        Cue {
            name: name.to_string(),
            duration_seconds,
            fade_in: 0.0,
            fade_out: 0.0,
            playback_pool: pool,
            selection_mode: SelectionMode::OnCueStart,
            audio,
        }
    }

    fn session_with(playbacks: Vec<(&str, Playback)>, cuelists: Vec<(&str, Cuelist)>) -> Session {
        Session {
            version: "1.0".into(),
            metadata: SessionMetadata { name: "test".into(), created: None, modified: None },
            playbacks: playbacks.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            cuelists: cuelists.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            media_bank: vec![],
            runtime: Default::default(),
        }
    }

    fn test_runner(
        session: Arc<Session>,
        config: RuntimeConfig,
    ) -> (SessionRunner<NullRenderer>, Arc<StdMutex<Vec<RunnerEvent>>>) {
        let director = Director::new(
            session.clone(),
            config,
            NullRenderer,
            Arc::new(NoBankResolver),
            unused_video_factory(),
            2,
        );
        let audio = Arc::new(AudioEngine::new(44100, 350, 500));
        let mut runner = SessionRunner::new(session, config, director, audio);
        let events = Arc::new(StdMutex::new(Vec::new()));
        let recorded = events.clone();
        runner.on_event(move |event| recorded.lock().unwrap().push(event));
        (runner, events)
    }

    fn has_cue_started(events: &[RunnerEvent], index: usize) -> bool {
        events
            .iter()
            .any(|e| matches!(e, RunnerEvent::CueStarted { cue_index, .. } if *cue_index == index))
    }

    fn has_error(events: &[RunnerEvent], kind: ErrorKind) -> bool {
        events.iter().any(|e| matches!(e, RunnerEvent::Error { kind: k, .. } if *k == kind))
    }

    #[test]
    fn start_enters_the_first_cue_and_begins_playing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        write_png(&a);

        let session = Arc::new(session_with(
            vec![("pb0", images_playback(100, &[a.to_str().unwrap()]))],
            vec![("main", Cuelist { name: "main".into(), loop_mode: LoopMode::Loop, cues: vec![cue("c0", 100.0, vec![pool("pb0")], vec![])] })],
        ));
        let (mut runner, events) = test_runner(session, RuntimeConfig::default());

        runner.start("main").unwrap();
        assert_eq!(runner.state(), RunnerState::Playing);
        assert_eq!(runner.cue_index(), 0);
        assert!(has_cue_started(&events.lock().unwrap(), 0));
    }

    #[test]
    fn duration_elapsed_transitions_at_the_next_cycle_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a);
        write_png(&b);
        let a = a.to_str().unwrap();
        let b = b.to_str().unwrap();

        let session = Arc::new(session_with(
            vec![("pb0", images_playback(100, &[a, b])), ("pb1", images_playback(100, &[a, b]))],
            vec![(
                "main",
                Cuelist {
                    name: "main".into(),
                    loop_mode: LoopMode::Once,
                    cues: vec![
                        cue("c0", 0.001, vec![pool("pb0")], vec![]),
                        cue("c1", 100.0, vec![pool("pb1")], vec![]),
                    ],
                },
            )],
        ));
        let (mut runner, events) = test_runner(session, RuntimeConfig::default());
        runner.start("main").unwrap();

        let mut reached_cue1 = false;
        for _ in 0..150 {
            runner.tick(1.0 / 60.0).unwrap();
            if runner.cue_index() == 1 {
                reached_cue1 = true;
                break;
            }
        }
        assert!(reached_cue1, "expected a transition to cue 1 within 150 ticks");
        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(e, RunnerEvent::TransitionPending { .. })));
        assert!(events.iter().any(|e| matches!(e, RunnerEvent::CueEnded { cue_index: 0 })));
        assert!(has_cue_started(&events, 1));
    }

    #[test]
    fn missing_playback_skips_the_cue_and_logs_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        write_png(&a);

        let session = Arc::new(session_with(
            vec![("pb1", images_playback(100, &[a.to_str().unwrap()]))],
            vec![(
                "main",
                Cuelist {
                    name: "main".into(),
                    loop_mode: LoopMode::Once,
                    cues: vec![
                        cue("c0", 100.0, vec![pool("does_not_exist")], vec![]),
                        cue("c1", 100.0, vec![pool("pb1")], vec![]),
                    ],
                },
            )],
        ));
        let (mut runner, events) = test_runner(session, RuntimeConfig::default());
        runner.start("main").unwrap();

        assert_eq!(runner.state(), RunnerState::Playing);
        assert_eq!(runner.cue_index(), 1);
        let events = events.lock().unwrap();
        assert!(has_error(&events, ErrorKind::PlaybackLoadFailed));
        assert!(has_cue_started(&events, 1));
    }

    #[test]
    fn every_cue_failing_to_load_stops_the_runner() {
        let session = Arc::new(session_with(
            vec![],
            vec![(
                "main",
                Cuelist {
                    name: "main".into(),
                    loop_mode: LoopMode::Loop,
                    cues: vec![
                        cue("c0", 100.0, vec![pool("missing_a")], vec![]),
                        cue("c1", 100.0, vec![pool("missing_b")], vec![]),
                    ],
                },
            )],
        ));
        let (mut runner, _events) = test_runner(session, RuntimeConfig::default());
        runner.start("main").unwrap();
        assert_eq!(runner.state(), RunnerState::Stopped);
    }

    #[test]
    fn stuck_transition_forces_a_cue_end_without_a_cycle_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a);
        write_png(&b);
        let a = a.to_str().unwrap();
        let b = b.to_str().unwrap();

        // cycle_speed 1 => frames_per_cycle(1) == 600, far more advances
        // than this test ticks, so no cycle boundary will arrive on its own.
        let session = Arc::new(session_with(
            vec![("pb0", images_playback(1, &[a, b])), ("pb1", images_playback(1, &[a, b]))],
            vec![(
                "main",
                Cuelist {
                    name: "main".into(),
                    loop_mode: LoopMode::Once,
                    cues: vec![
                        cue("c0", 0.001, vec![pool("pb0")], vec![]),
                        cue("c1", 100.0, vec![pool("pb1")], vec![]),
                    ],
                },
            )],
        ));
        let config = RuntimeConfig { max_transition_wait_s: 0.05, ..RuntimeConfig::default() };
        let (mut runner, events) = test_runner(session, config);
        runner.start("main").unwrap();

        for _ in 0..30 {
            runner.tick(1.0 / 60.0).unwrap();
        }
        assert_eq!(runner.cue_index(), 1);
        let events = events.lock().unwrap();
        assert!(has_error(&events, ErrorKind::TransitionStuck));
    }

    #[test]
    fn skip_during_a_pending_transition_ends_the_cue_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a);
        write_png(&b);
        let a = a.to_str().unwrap();
        let b = b.to_str().unwrap();

        let session = Arc::new(session_with(
            vec![("pb0", images_playback(1, &[a, b])), ("pb1", images_playback(1, &[a, b]))],
            vec![(
                "main",
                Cuelist {
                    name: "main".into(),
                    loop_mode: LoopMode::Once,
                    cues: vec![
                        cue("c0", 0.001, vec![pool("pb0")], vec![]),
                        cue("c1", 100.0, vec![pool("pb1")], vec![]),
                    ],
                },
            )],
        ));
        let (mut runner, events) = test_runner(session, RuntimeConfig::default());
        runner.start("main").unwrap();

        // One tick is enough to exceed the 0.001s cue duration and arm the
        // pending transition; cycle_speed 1 means no boundary fires yet.
        runner.tick(1.0 / 60.0).unwrap();
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, RunnerEvent::TransitionPending { .. })));

        runner.command(Command::SkipNext).unwrap();
        assert_eq!(runner.cue_index(), 1);
        assert_eq!(runner.state(), RunnerState::Playing);
    }

    #[test]
    fn pause_then_play_resumes_without_advancing_the_cue() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        write_png(&a);

        let session = Arc::new(session_with(
            vec![("pb0", images_playback(100, &[a.to_str().unwrap()]))],
            vec![("main", Cuelist { name: "main".into(), loop_mode: LoopMode::Loop, cues: vec![cue("c0", 100.0, vec![pool("pb0")], vec![])] })],
        ));
        let (mut runner, _events) = test_runner(session, RuntimeConfig::default());
        runner.start("main").unwrap();

        runner.command(Command::Pause).unwrap();
        assert_eq!(runner.state(), RunnerState::Paused);
        for _ in 0..10 {
            runner.tick(1.0 / 60.0).unwrap();
        }
        assert_eq!(runner.cue_index(), 0);

        runner.command(Command::Play).unwrap();
        assert_eq!(runner.state(), RunnerState::Playing);
    }

    #[test]
    fn seek_jumps_directly_to_the_requested_cue() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        write_png(&a);
        let a = a.to_str().unwrap();

        let session = Arc::new(session_with(
            vec![("pb0", images_playback(100, &[a])), ("pb1", images_playback(100, &[a])), ("pb2", images_playback(100, &[a]))],
            vec![(
                "main",
                Cuelist {
                    name: "main".into(),
                    loop_mode: LoopMode::Loop,
                    cues: vec![
                        cue("c0", 100.0, vec![pool("pb0")], vec![]),
                        cue("c1", 100.0, vec![pool("pb1")], vec![]),
                        cue("c2", 100.0, vec![pool("pb2")], vec![]),
                    ],
                },
            )],
        ));
        let (mut runner, events) = test_runner(session, RuntimeConfig::default());
        runner.start("main").unwrap();

        runner.command(Command::SeekCue(2)).unwrap();
        assert_eq!(runner.cue_index(), 2);
        let events = events.lock().unwrap();
        assert!(has_cue_started(&events, 2));
        assert!(events.iter().any(|e| matches!(e, RunnerEvent::CueEnded { cue_index: 0 })));
    }

    #[test]
    fn stop_fades_out_audio_and_halts_the_runner() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let wav = dir.path().join("hypno.wav");
        write_png(&a);
        write_wav(&wav);

        let audio = vec![CueAudio {
            role: AudioRole::Hypno,
            path: wav.display().to_string(),
            volume: 1.0,
            looped: true,
            fade_in_s: 0.0,
            fade_out_s: 0.05,
        }];
        let session = Arc::new(session_with(
            vec![("pb0", images_playback(100, &[a.to_str().unwrap()]))],
            vec![("main", Cuelist { name: "main".into(), loop_mode: LoopMode::Loop, cues: vec![cue("c0", 100.0, vec![pool("pb0")], audio)] })],
        ));
        let (mut runner, _events) = test_runner(session, RuntimeConfig::default());
        runner.start("main").unwrap();
        assert_eq!(runner.state(), RunnerState::Playing);

        runner.command(Command::Stop).unwrap();
        assert_eq!(runner.state(), RunnerState::Stopped);
    }
}
