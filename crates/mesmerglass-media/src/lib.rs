//! Image and video decode/cache with double-buffered prefetch.
//!
//! Images decode eagerly to RGBA8 off the render thread; videos decode on a
//! dedicated worker thread per open clip into a double-buffered ring, so the
//! render thread only ever reads frames that are already in memory.

#![warn(missing_docs)]

pub mod cursor;
pub mod decoder;
pub mod frame;
pub mod image_decoder;
pub mod prefetch;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_decoder;

use thiserror::Error;

pub use cursor::VideoCursor;
pub use decoder::{TestPatternDecoder, VideoDecoder};
pub use frame::{PixelFormat, VideoFormat, VideoFrame};
pub use image_decoder::{GifDecoder, StillImageDecoder};
pub use prefetch::{PrefetchRing, PrefetchStats};

#[cfg(feature = "ffmpeg")]
pub use ffmpeg_decoder::FFmpegDecoder;

/// Media decode/cache errors (§4.3).
#[derive(Error, Debug)]
pub enum MediaError {
    /// The file referenced by a media path does not exist.
    #[error("media file not found: {0}")]
    FileMissing(String),
    /// The file exists but its format could not be recognized or decoded.
    #[error("unsupported media format: {0}")]
    UnsupportedFormat(String),
    /// Decoding took longer than the configured timeout.
    #[error("decode timed out after {0:?}")]
    DecodeTimeout(std::time::Duration),
    /// An underlying decoder reported an error not covered by the above.
    #[error("decoder error: {0}")]
    Decoder(String),
    /// The stream has no more frames to deliver.
    #[error("end of stream")]
    EndOfStream,
}

/// Result type for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;
