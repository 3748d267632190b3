//! Concrete `DisplaySurface` + [`VisualRenderer`] pair: a `winit` window
//! backed by a `wgpu::Surface`, composited through `mesmerglass-render`'s
//! `Compositor` (§6, §B "Multi-surface output").
//!
//! `Compositor` only knows how to render into its own internal output
//! texture (it never touches a `wgpu::Surface` directly, keeping it
//! windowing-toolkit-agnostic). Presenting that texture is this module's
//! job: once `Compositor::render` returns successfully, [`GpuVisualRenderer`]
//! blits the output texture into the swapchain image and presents it. A
//! failed `render` call returns before the blit ever runs, which is the same
//! "never present a half-drawn frame" invariant `GpuGuard` enforces one
//! level down, just realized here instead since the blit needs state
//! (the swapchain image) `Compositor` doesn't have.

use std::sync::Arc;

use mesmerglass_core::interfaces::DisplaySurface;
use mesmerglass_render::{BackgroundFrame, Compositor, FrameInputs, TextRenderer};
use mesmerglass_runtime::{RenderFrame, Result, RuntimeError, VisualRenderer};
use winit::window::Window;

/// Font size used to rasterize the text overlay. Fixed rather than
/// configurable: the spec's `TextConfig` carries no font-size field.
const TEXT_PIXEL_SIZE: f32 = 48.0;

/// A `winit` window as a [`DisplaySurface`]. `make_current`/`swap_buffers`
/// are no-ops here: `wgpu` has no thread-local GL context to bind, and
/// presentation happens in [`GpuVisualRenderer::render`] after the
/// compositor has produced an output texture to blit from.
pub struct WinitDisplaySurface {
    window: Arc<Window>,
}

impl DisplaySurface for WinitDisplaySurface {
    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width.max(1), size.height.max(1))
    }

    fn refresh_rate(&self) -> f32 {
        self.window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz())
            .map(|mhz| mhz as f32 / 1000.0)
            .unwrap_or(60.0)
    }

    fn make_current(&mut self) {}

    fn swap_buffers(&mut self) {}
}

/// Reconfigure a slot's surface if its window has changed size since the
/// last frame. Checked every `render` call rather than wired to
/// `WindowEvent::Resized` directly, since `Director` owns the renderer by
/// the time resize events arrive at the bin crate's event loop.
fn reconfigure_if_resized(device: &wgpu::Device, slot: &mut SurfaceSlot) {
    let (width, height) = slot.display.size();
    if slot.config.width != width || slot.config.height != height {
        slot.config.width = width;
        slot.config.height = height;
        slot.surface.configure(device, &slot.config);
    }
}

struct SurfaceSlot {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    display: WinitDisplaySurface,
    compositor: Compositor,
}

/// Owns one `(wgpu::Surface, Compositor)` pair per attached display and
/// implements [`VisualRenderer`] by rendering into each in turn (§B
/// "`Director` iterates surfaces and renders once per surface per tick").
pub struct GpuVisualRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surfaces: Vec<SurfaceSlot>,
    text_renderer: Option<TextRenderer>,
}

impl GpuVisualRenderer {
    /// Build an empty renderer; attach displays with [`Self::add_surface`].
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        text_renderer: Option<TextRenderer>,
    ) -> Self {
        Self {
            device,
            queue,
            surfaces: Vec::new(),
            text_renderer,
        }
    }

    /// Configure and attach a new display surface.
    pub fn add_surface(&mut self, window: Arc<Window>, surface: wgpu::Surface<'static>, format: wgpu::TextureFormat) {
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_DST,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: Vec::new(),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&self.device, &config);

        let compositor = Compositor::new(self.device.clone(), self.queue.clone(), format);
        self.surfaces.push(SurfaceSlot {
            surface,
            config,
            display: WinitDisplaySurface { window },
            compositor,
        });
    }

    fn present(&self, slot: &mut SurfaceSlot) -> std::result::Result<(), wgpu::SurfaceError> {
        let Some(output_texture) = slot.compositor.output_texture() else {
            return Ok(());
        };
        let surface_texture = slot.surface.get_current_texture()?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mesmerglass-present-blit"),
        });
        encoder.copy_texture_to_texture(
            output_texture.as_image_copy(),
            surface_texture.texture.as_image_copy(),
            wgpu::Extent3d {
                width: slot.config.width,
                height: slot.config.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

impl VisualRenderer for GpuVisualRenderer {
    fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    fn render(&mut self, surface_index: usize, frame: &RenderFrame) -> Result<()> {
        let rasterized = frame.text.as_ref().and_then(|text| {
            self.text_renderer.as_ref().map(|renderer| {
                let alpha = (text.opacity.clamp(0.0, 1.0) * 255.0) as u8;
                renderer.rasterize_line(&text.line, TEXT_PIXEL_SIZE, [255, 255, 255, alpha])
            })
        });

        let inputs = FrameInputs {
            aspect_ratio: frame.aspect_ratio,
            spiral_type: frame.spiral_type as u32,
            arms: frame.arms,
            arm_color_a: frame.arm_color_a,
            arm_color_b: frame.arm_color_b,
            rotation_speed_rpm: frame.rotation_speed_rpm,
            reverse: frame.reverse,
            spiral_opacity: frame.spiral_opacity,
            target_fps: frame.target_fps,
            zoom_origin: frame.zoom_origin,
            zoom: frame.zoom,
            zoom_progress: frame.zoom_progress,
            background: frame.background.as_ref().map(|b| BackgroundFrame {
                path: &b.path,
                frame_id: b.frame_id,
                pixels: &b.pixels,
                width: b.width,
                height: b.height,
            }),
            text: rasterized.as_ref(),
        };

        let slot = self.surfaces.get_mut(surface_index).ok_or_else(|| {
            RuntimeError::GpuUploadFailed(format!("no attached surface at index {surface_index}"))
        })?;

        reconfigure_if_resized(&self.device, slot);

        slot.compositor
            .render(&mut slot.display, &inputs)
            .map_err(|e| RuntimeError::GpuUploadFailed(e.to_string()))?;

        self.present(slot)
            .map_err(|e| RuntimeError::GpuUploadFailed(e.to_string()))
    }
}
