//! Ties the spiral shader, background media layer, and text overlay
//! together into one `Compositor` per attached `DisplaySurface` (§4.5).

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use mesmerglass_core::interfaces::DisplaySurface;
use wgpu::util::DeviceExt;

use crate::dedup::{DedupCache, UploadKey};
use crate::gpu_guard::GpuGuard;
use crate::phase::PhaseAccumulator;
use crate::spiral::SpiralUniforms;
use crate::text::RasterizedText;
use crate::texture::TexturePool;
use crate::{RenderError, Result};

const OUTPUT_SLOT: &str = "compositor_output";
const BACKGROUND_SLOT: &str = "background";
const TEXT_SLOT: &str = "text_overlay";

/// A decoded background frame ready for upload, as produced by the Visual
/// Director's cursor (§4.3 `VideoCursor`) or a still-image decode.
pub struct BackgroundFrame<'a> {
    /// Source asset path, part of the dedup key.
    pub path: &'a str,
    /// Decoder/cursor frame index, part of the dedup key.
    pub frame_id: u64,
    /// Tightly packed RGBA8 pixels.
    pub pixels: &'a [u8],
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// Everything the compositor needs to render one frame for one playback.
pub struct FrameInputs<'a> {
    /// Output aspect ratio (`width / height`).
    pub aspect_ratio: f32,
    /// Spiral pattern id, `1..=7`.
    pub spiral_type: u32,
    /// Arm count; must be one of [`crate::spiral::VALID_ARM_COUNTS`].
    pub arms: u32,
    /// Primary arm color, straight RGBA.
    pub arm_color_a: [f32; 4],
    /// Gap/secondary arm color, straight RGBA.
    pub arm_color_b: [f32; 4],
    /// Rotation speed in RPM; sign is applied via `reverse`, not here.
    pub rotation_speed_rpm: f32,
    /// Whether the spiral spins in reverse this tick.
    pub reverse: bool,
    /// Spiral layer opacity, `[0, 1]`.
    pub spiral_opacity: f32,
    /// Display refresh rate driving the phase accumulator.
    pub target_fps: f32,
    /// Background zoom origin scale.
    pub zoom_origin: f32,
    /// Background zoom target scale.
    pub zoom: f32,
    /// Interpolation factor between origin and target zoom.
    pub zoom_progress: f32,
    /// New background media frame, if the director decoded one this tick.
    pub background: Option<BackgroundFrame<'a>>,
    /// Rasterized text overlay, if the active playback has one enabled.
    pub text: Option<&'a RasterizedText>,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

const FULLSCREEN_QUAD: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
];

/// Renders the spiral + background + text stack into an internal output
/// texture sized to its `DisplaySurface`. Presentation of that texture is
/// the concrete `DisplaySurface` implementation's job — this crate never
/// touches a `wgpu::Surface` directly, keeping it windowing-toolkit-agnostic.
pub struct Compositor {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    texture_pool: TexturePool,
    dedup: DedupCache,
    phase: PhaseAccumulator,
    output_format: wgpu::TextureFormat,

    spiral_pipeline: wgpu::RenderPipeline,
    spiral_bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    quad_vertex_buffer: wgpu::Buffer,

    text_pipeline: wgpu::RenderPipeline,
    text_bind_group_layout: wgpu::BindGroupLayout,
}

impl Compositor {
    /// Build the compositor's pipelines against `device`/`queue`. These are
    /// shared with the rest of the runtime; a `Compositor` does not own the
    /// GPU connection, only the resources it renders with.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("spiral-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/spiral.wgsl").into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("compositor-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("spiral-uniforms"),
            size: std::mem::size_of::<SpiralUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let spiral_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("spiral-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let spiral_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("spiral-pipeline-layout"),
                bind_group_layouts: &[&spiral_bind_group_layout],
                push_constant_ranges: &[],
            });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
        };

        let spiral_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("spiral-pipeline"),
            layout: Some(&spiral_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout.clone()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let text_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("text-overlay-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text_overlay.wgsl").into()),
        });

        let text_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("text-overlay-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let text_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("text-overlay-pipeline-layout"),
                bind_group_layouts: &[&text_bind_group_layout],
                push_constant_ranges: &[],
            });

        let text_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("text-overlay-pipeline"),
            layout: Some(&text_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &text_shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &text_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen-quad"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let texture_pool = TexturePool::new(device.clone());

        Self {
            device,
            queue,
            texture_pool,
            dedup: DedupCache::new(),
            phase: PhaseAccumulator::new(),
            output_format,
            spiral_pipeline,
            spiral_bind_group_layout,
            uniform_buffer,
            sampler,
            quad_vertex_buffer,
            text_pipeline,
            text_bind_group_layout,
        }
    }

    /// Force the next background upload for this compositor to happen
    /// regardless of dedup key, e.g. after a playback switch invalidates
    /// the previous frame's numbering (§4.5 "Critical edge case").
    pub fn invalidate_background(&mut self) {
        self.dedup.invalidate(BACKGROUND_SLOT);
    }

    fn ensure_background_texture(&self, frame: &BackgroundFrame<'_>) {
        // Dedup gate happens in `render` (needs `&mut self`); this helper
        // only performs the actual upload once the caller has decided to.
        self.texture_pool.upload_data(
            &self.queue,
            BACKGROUND_SLOT,
            frame.pixels,
            frame.width,
            frame.height,
        );
    }

    /// Render one frame into this compositor's output texture and present
    /// it via `surface.swap_buffers()`. Returns without presenting if the
    /// render closure fails validation (`GpuGuard`'s invariant).
    pub fn render(&mut self, surface: &mut dyn DisplaySurface, inputs: &FrameInputs<'_>) -> Result<()> {
        self.phase
            .advance(inputs.rotation_speed_rpm as f64, inputs.target_fps as f64, inputs.reverse);

        if let Some(frame) = &inputs.background {
            let key = UploadKey {
                path: frame.path.to_string(),
                frame_id: frame.frame_id,
                width: frame.width,
                height: frame.height,
            };
            if self.dedup.should_upload(BACKGROUND_SLOT, key) {
                self.ensure_background_texture(frame);
            }
        }

        if !self.texture_pool.has_texture(BACKGROUND_SLOT) {
            // No background ever uploaded yet; still need a bindable
            // texture for the shader's sampler binding.
            self.texture_pool.upload_data(&self.queue, BACKGROUND_SLOT, &[0, 0, 0, 255], 1, 1);
        }

        let (surface_width, surface_height) = surface.size();
        self.texture_pool.release(OUTPUT_SLOT);
        self.texture_pool.create(
            OUTPUT_SLOT,
            surface_width.max(1),
            surface_height.max(1),
            self.output_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );

        let uniforms = SpiralUniforms::new(
            inputs.aspect_ratio,
            inputs.spiral_type,
            inputs.arms,
            inputs.arm_color_a,
            inputs.arm_color_b,
            self.phase.time_uniform(),
            inputs.rotation_speed_rpm,
            inputs.spiral_opacity,
            inputs.zoom_origin,
            inputs.zoom,
            inputs.zoom_progress,
        );
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        if let Some(text) = inputs.text {
            if text.width > 0 && text.height > 0 {
                self.texture_pool.upload_data(
                    &self.queue,
                    TEXT_SLOT,
                    &text.pixels,
                    text.width,
                    text.height,
                );
            }
        }

        let background_view = self.texture_pool.get_view(BACKGROUND_SLOT);
        let spiral_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("spiral-bind-group"),
            layout: &self.spiral_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&background_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let output_view = self.texture_pool.get_view(OUTPUT_SLOT);
        let text_bind_group = if self.texture_pool.has_texture(TEXT_SLOT) {
            let text_view = self.texture_pool.get_view(TEXT_SLOT);
            Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("text-overlay-bind-group"),
                layout: &self.text_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&text_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            }))
        } else {
            None
        };

        let device = self.device.clone();
        let queue = self.queue.clone();
        let spiral_pipeline = &self.spiral_pipeline;
        let text_pipeline = &self.text_pipeline;
        let quad_vertex_buffer = &self.quad_vertex_buffer;
        let has_text = inputs.text.map(|t| t.width > 0 && t.height > 0).unwrap_or(false);

        let guard = GpuGuard::enter(surface);
        guard.render(move |_surface| -> std::result::Result<(), RenderError> {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("compositor-frame"),
            });

            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("spiral-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &output_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(spiral_pipeline);
                pass.set_bind_group(0, &spiral_bind_group, &[]);
                pass.set_vertex_buffer(0, quad_vertex_buffer.slice(..));
                pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
            }

            if has_text {
                if let Some(bind_group) = &text_bind_group {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("text-overlay-pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &output_view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                    pass.set_pipeline(text_pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_vertex_buffer(0, quad_vertex_buffer.slice(..));
                    pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
                }
            }

            queue.submit(Some(encoder.finish()));
            Ok(())
        })
        .map_err(|_| RenderError::SurfaceNotConfigured)
    }

    /// Approximate pooled texture memory usage; exposed for diagnostics.
    pub fn texture_stats(&self) -> crate::texture::PoolStats {
        self.texture_pool.stats()
    }

    /// A view of the most recently rendered output texture, so a concrete
    /// `DisplaySurface` can blit it into its swapchain image on present.
    /// `None` until the first successful `render` call.
    pub fn output_view(&self) -> Option<Arc<wgpu::TextureView>> {
        self.texture_pool
            .has_texture(OUTPUT_SLOT)
            .then(|| self.texture_pool.get_view(OUTPUT_SLOT))
    }

    /// The backing texture behind [`Compositor::output_view`], for callers
    /// that need to `copy_texture_to_texture` into a swapchain image rather
    /// than bind it as a shader resource.
    pub fn output_texture(&self) -> Option<Arc<wgpu::Texture>> {
        self.texture_pool
            .has_texture(OUTPUT_SLOT)
            .then(|| self.texture_pool.get_texture(OUTPUT_SLOT))
    }

    /// The wgpu device this compositor was built with, shared by the bin
    /// crate's swapchain blit.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// The wgpu queue this compositor was built with.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }
}
