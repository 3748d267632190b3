//! The Director's view of "render one frame" (§4.5, §4.6), decoupled from
//! `mesmerglass-render::Compositor` so Director logic is testable without a
//! GPU device.
//!
//! [`RenderFrame`] carries owned data only (no borrowed lifetimes), unlike
//! `mesmerglass_render::FrameInputs`; the concrete [`VisualRenderer`]
//! implementation (in the `mesmerglass` bin crate) is responsible for
//! rasterizing `RenderFrame::text` via `TextRenderer` and forwarding
//! everything else straight into `Compositor::render`.

use crate::Result;

/// The current background frame to upload, if any (§4.5 frame-dedup upload
/// policy: `(path, frame_id)` is the dedup key the compositor checks).
#[derive(Debug, Clone)]
pub struct RenderBackground {
    /// Source path, used as half of the dedup key.
    pub path: String,
    /// Monotonic frame identity within that path (e.g. a video frame index).
    pub frame_id: u64,
    /// Decoded RGBA8 pixels.
    pub pixels: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// The text line to overlay this frame, if text is enabled and non-empty.
#[derive(Debug, Clone)]
pub struct RenderText {
    /// The line to rasterize and overlay.
    pub line: String,
    /// Overlay opacity, `[0, 1]`, after any per-mode animation curve.
    pub opacity: f32,
}

/// Everything the Director knows about one frame for one surface, in a form
/// that carries no GPU handles and no borrowed data (§4.6 `update(dt)`).
#[derive(Debug, Clone)]
pub struct RenderFrame {
    /// Surface aspect ratio, width / height.
    pub aspect_ratio: f32,
    /// Spiral pattern variant, `1..=7`.
    pub spiral_type: u8,
    /// Arm count, derived from `spiral.spiral_type` via
    /// `mesmerglass_render::spiral::VALID_ARM_COUNTS`.
    pub arms: u32,
    /// Arm color.
    pub arm_color_a: [f32; 4],
    /// Gap color.
    pub arm_color_b: [f32; 4],
    /// Rotation speed in RPM; sign convention matches `SpiralConfig`.
    pub rotation_speed_rpm: f32,
    /// Whether rotation direction is reversed.
    pub reverse: bool,
    /// Spiral overlay opacity, `[0, 1]`.
    pub spiral_opacity: f32,
    /// Display refresh rate driving phase accumulation this tick.
    pub target_fps: f32,
    /// Zoom animation start value.
    pub zoom_origin: f32,
    /// Zoom animation end value.
    pub zoom: f32,
    /// Zoom animation progress, `[0, 1]`.
    pub zoom_progress: f32,
    /// Background frame to upload, if the media layer produced one this tick.
    pub background: Option<RenderBackground>,
    /// Text overlay line, if text is enabled.
    pub text: Option<RenderText>,
}

/// Renders one [`RenderFrame`] per attached surface (§4.6's "calls
/// compositor to render one frame per attached surface").
///
/// Implementations own the real `Compositor`/`DisplaySurface` pairs; a test
/// double can simply record the frames it was asked to render.
pub trait VisualRenderer: Send {
    /// Number of attached display surfaces (§B multi-surface output).
    fn surface_count(&self) -> usize;

    /// Render `frame` into the surface at `surface_index`.
    fn render(&mut self, surface_index: usize, frame: &RenderFrame) -> Result<()>;
}
