//! GPU spiral + background + text compositor with frame-dedup uploads (§4.5).

#![warn(missing_docs)]

pub mod compositor;
pub mod dedup;
pub mod gpu_guard;
pub mod phase;
pub mod spiral;
pub mod text;
pub mod texture;

use thiserror::Error;

pub use compositor::{BackgroundFrame, Compositor, FrameInputs};
pub use dedup::{DedupCache, UploadKey};
pub use gpu_guard::GpuGuard;
pub use phase::PhaseAccumulator;
pub use spiral::SpiralUniforms;
pub use text::{RasterizedText, TextRenderer};
pub use texture::TexturePool;

/// Compositor errors (§4.5, §7).
#[derive(Error, Debug)]
pub enum RenderError {
    /// No compatible GPU adapter could be found for a surface.
    #[error("no compatible GPU adapter for surface")]
    NoAdapter,
    /// Device creation or a GPU operation failed.
    #[error("GPU device error: {0}")]
    Device(String),
    /// A surface was used before being configured.
    #[error("surface not configured")]
    SurfaceNotConfigured,
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
