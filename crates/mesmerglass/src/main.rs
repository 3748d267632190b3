//! MesmerGlass runtime entry point.
//!
//! A thin wiring layer (§2): owns the `winit` event loop and a `wgpu`
//! surface, builds one [`SessionRunner`], pumps its `tick(dt)` every frame,
//! and forwards its events to `tracing`. It is not one of the four core
//! subsystems (Visual Director, Session Runner, Audio Engine, Media
//! Cache/Decoder) and stays small on purpose — everything with real logic
//! lives in the library crates.

mod resolver;
mod surface;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use mesmerglass_audio::AudioEngine;
use mesmerglass_core::interfaces::{FileReader, StdFileReader};
use mesmerglass_core::{MediaBankKind, RuntimeConfig, Session};
use mesmerglass_media::FFmpegDecoder;
use mesmerglass_render::TextRenderer;
use mesmerglass_runtime::director::{Director, VideoDecoderFactory};
use mesmerglass_runtime::{Command, RunnerEvent, RunnerState, SessionRunner};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::resolver::FsMediaBankResolver;
use crate::surface::GpuVisualRenderer;

const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn video_decoder_factory() -> VideoDecoderFactory {
    Box::new(|path: &str| {
        FFmpegDecoder::open(path).map(|decoder| Box::new(decoder) as Box<dyn mesmerglass_media::VideoDecoder>)
    })
}

/// Find the session's first `fonts`-kind Media Bank entry and read its
/// first member file, if any (§4.5 text overlay: fonts come from the
/// Media Bank, loading the bytes is this crate's `FileReader` job).
fn load_overlay_font(session: &Session, resolver: &FsMediaBankResolver, reader: &dyn FileReader) -> Option<TextRenderer> {
    use mesmerglass_core::interfaces::MediaBankResolver;

    let entry = session
        .media_bank
        .iter()
        .find(|e| e.kind == MediaBankKind::Fonts)?;
    let candidates = resolver.list(&entry.path);
    let font_path = candidates
        .iter()
        .find(|p| p.to_ascii_lowercase().ends_with(".ttf") || p.to_ascii_lowercase().ends_with(".otf"))?;

    match reader.read_file(Path::new(font_path)) {
        Ok(bytes) => match TextRenderer::load(&bytes) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                warn!(path = %font_path, error = %e, "font failed to parse, text overlay disabled");
                None
            }
        },
        Err(e) => {
            warn!(path = %font_path, error = %e, "font file could not be read, text overlay disabled");
            None
        }
    }
}

async fn create_gpu(surface: &wgpu::Surface<'_>) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(surface),
        })
        .await
        .map_err(|e| anyhow::anyhow!("no compatible GPU adapter: {e}"))?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("mesmerglass-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        })
        .await
        .context("failed to open GPU device")?;

    Ok((Arc::new(device), Arc::new(queue)))
}

/// Arguments parsed from the command line: a session JSON path and the
/// cuelist key to start (defaulting to `"main"`).
struct Args {
    session_path: String,
    cuelist_key: String,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let Some(session_path) = args.next() else {
        bail!("usage: mesmerglass <session.json> [cuelist_key]");
    };
    let cuelist_key = args.next().unwrap_or_else(|| "main".to_string());
    Ok(Args { session_path, cuelist_key })
}

/// Everything constructed once the first window exists, pumped once per
/// `AboutToWait`.
struct Running {
    window: Arc<Window>,
    runner: SessionRunner<GpuVisualRenderer>,
    _audio_stream: Option<cpal::Stream>,
    last_tick: Instant,
    target_frame: Duration,
}

struct App {
    cuelist_key: String,
    session: Arc<Session>,
    running: Option<Running>,
}

impl App {
    fn new(session: Arc<Session>, cuelist_key: String) -> Self {
        Self { cuelist_key, session, running: None }
    }

    fn build(&mut self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let window_attributes = Window::default_attributes().with_title("MesmerGlass");
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let (device, queue) = pollster::block_on(create_gpu(&surface))?;

        let resolver = FsMediaBankResolver;
        let file_reader = StdFileReader;
        let text_renderer = load_overlay_font(&self.session, &resolver, &file_reader);

        let mut renderer = GpuVisualRenderer::new(device.clone(), queue.clone(), text_renderer);
        renderer.add_surface(window.clone(), surface, SURFACE_FORMAT);

        let config = RuntimeConfig::default();
        let director = Director::new(
            self.session.clone(),
            config,
            renderer,
            Arc::new(resolver),
            video_decoder_factory(),
            2,
        );

        let audio = Arc::new(AudioEngine::new(48_000, config.slow_decode_stream_ms, config.prefetch_block_limit_ms));
        let audio_stream = match audio.start_output() {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(error = %e, "no audio output device, running silent");
                None
            }
        };

        let mut runner = SessionRunner::new(self.session.clone(), config, director, audio);
        runner.on_event(|event| match event {
            RunnerEvent::CueStarted { cue_index, cue_name } => {
                info!(cue_index, cue_name = %cue_name, "cue started")
            }
            RunnerEvent::CueEnded { cue_index } => info!(cue_index, "cue ended"),
            RunnerEvent::TransitionPending { reason } => info!(%reason, "transition pending"),
            RunnerEvent::Error { kind, detail } => error!(?kind, %detail, "runner error"),
        });
        runner.start(&self.cuelist_key)?;

        Ok(Running {
            window,
            runner,
            _audio_stream: audio_stream,
            last_tick: Instant::now(),
            target_frame: Duration::from_secs_f32(1.0 / config.target_fps),
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.build(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => {
                error!(error = %e, "failed to initialize runtime");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else { return };
        if running.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                let _ = running.runner.command(Command::Stop);
                event_loop.exit();
            }
            WindowEvent::Resized(_) => {
                // `GpuVisualRenderer` reconfigures its surface lazily on the
                // next `render` call by comparing against the window's
                // current size, so there's nothing to forward here.
            }
            WindowEvent::RedrawRequested => {
                running.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = &mut self.running else { return };
        if running.runner.state() == RunnerState::Stopped {
            event_loop.exit();
            return;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(running.last_tick);
        if elapsed < running.target_frame {
            event_loop.set_control_flow(ControlFlow::Poll);
            return;
        }
        running.last_tick = now;

        if let Err(e) = running.runner.tick(elapsed.as_secs_f32()) {
            error!(error = %e, "runner tick failed");
        }
        event_loop.set_control_flow(ControlFlow::Poll);
    }
}

fn main() -> Result<()> {
    init_logging();
    let args = parse_args()?;

    let raw = std::fs::read_to_string(&args.session_path)
        .with_context(|| format!("failed to read session file '{}'", args.session_path))?;
    let session = Arc::new(Session::from_json_str(&raw).context("session failed validation")?);

    info!(session = %args.session_path, cuelist = %args.cuelist_key, "starting MesmerGlass");

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(session, args.cuelist_key);
    event_loop.run_app(&mut app).context("event loop exited with an error")?;
    Ok(())
}
