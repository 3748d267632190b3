//! Still image and animated GIF decoding via the `image` crate (§4.3 image path).

use std::path::Path;
use std::time::Duration;

use image::AnimationDecoder;
use tracing::{info, warn};

use crate::decoder::VideoDecoder;
use crate::frame::{PixelFormat, VideoFormat, VideoFrame};
use crate::{MediaError, Result};

/// Maximum number of frames to load from an animated GIF, bounding memory use
/// for pathologically long sequences.
#[cfg(not(test))]
pub const MAX_GIF_FRAMES: usize = 500;
#[cfg(test)]
pub const MAX_GIF_FRAMES: usize = 10;

/// A decoded still image, exposed as a single-frame `VideoDecoder`.
///
/// Still images carry the "infinite duration" convention from §4.3: once
/// read, subsequent calls return `EndOfStream` until `seek` rewinds.
#[derive(Clone)]
pub struct StillImageDecoder {
    width: u32,
    height: u32,
    frame_data: Vec<u8>,
    has_been_read: bool,
}

impl StillImageDecoder {
    /// Decode an image file to RGBA8 in memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileMissing(path.display().to_string()));
        }

        let image = image::open(path)
            .map_err(|e| MediaError::UnsupportedFormat(format!("{}: {e}", path.display())))?;

        let width = image.width();
        let height = image.height();
        let frame_data = image.to_rgba8().into_raw();

        info!(width, height, path = %path.display(), "decoded still image");

        Ok(Self {
            width,
            height,
            frame_data,
            has_been_read: false,
        })
    }

    /// Whether the given path's extension names a still-image format this
    /// decoder understands.
    pub fn supports_format<P: AsRef<Path>>(path: P) -> bool {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) => matches!(
                ext.to_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp"
            ),
            None => false,
        }
    }
}

impl VideoDecoder for StillImageDecoder {
    fn next_frame(&mut self) -> Result<VideoFrame> {
        if self.has_been_read {
            return Err(MediaError::EndOfStream);
        }
        self.has_been_read = true;
        Ok(VideoFrame::new(
            self.frame_data.clone(),
            VideoFormat {
                width: self.width,
                height: self.height,
                pixel_format: PixelFormat::Rgba8,
                frame_rate: 1.0,
            },
            Duration::ZERO,
        ))
    }

    fn seek(&mut self, _timestamp: Duration) -> Result<()> {
        self.has_been_read = false;
        Ok(())
    }

    fn duration(&self) -> Duration {
        Duration::from_secs(3600 * 24 * 365)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> f64 {
        1.0
    }

    fn frame_count(&self) -> Option<u64> {
        Some(1)
    }
}

/// A decoded animated GIF, frame-by-frame with per-frame delay timing.
#[derive(Clone)]
pub struct GifDecoder {
    frames: Vec<(Vec<u8>, Duration)>,
    width: u32,
    height: u32,
    current_frame: usize,
    current_time: Duration,
    total_duration: Duration,
    fps: f64,
}

impl GifDecoder {
    /// Decode every frame of an animated GIF up front.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileMissing(path.display().to_string()));
        }

        let file = std::fs::File::open(path)
            .map_err(|e| MediaError::FileMissing(format!("{}: {e}", path.display())))?;
        let decoder = image::codecs::gif::GifDecoder::new(file)
            .map_err(|e| MediaError::UnsupportedFormat(format!("{}: {e}", path.display())))?;

        let mut frames = Vec::new();
        let mut total_duration = Duration::ZERO;
        let mut width = 0;
        let mut height = 0;

        for frame_result in decoder.into_frames() {
            if frames.len() >= MAX_GIF_FRAMES {
                warn!(
                    limit = MAX_GIF_FRAMES,
                    path = %path.display(),
                    "GIF exceeded frame limit, truncating"
                );
                break;
            }
            let frame = frame_result
                .map_err(|e| MediaError::Decoder(format!("GIF frame decode failed: {e}")))?;

            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = Duration::from_millis((numer as f64 / denom as f64 * 1000.0) as u64);

            let buffer = frame.into_buffer();
            if width == 0 {
                width = buffer.width();
                height = buffer.height();
            }
            frames.push((buffer.into_raw(), delay));
            total_duration += delay;
        }

        if frames.is_empty() {
            return Err(MediaError::Decoder("GIF has no frames".into()));
        }

        let fps = frames.len() as f64 / total_duration.as_secs_f64().max(f64::EPSILON);

        info!(
            width,
            height,
            frames = frames.len(),
            duration_s = total_duration.as_secs_f64(),
            "decoded animated GIF"
        );

        Ok(Self {
            frames,
            width,
            height,
            current_frame: 0,
            current_time: Duration::ZERO,
            total_duration,
            fps,
        })
    }

    /// Whether the given path's extension names a GIF.
    pub fn supports_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("gif"))
            .unwrap_or(false)
    }
}

impl VideoDecoder for GifDecoder {
    fn next_frame(&mut self) -> Result<VideoFrame> {
        if self.current_time >= self.total_duration {
            return Err(MediaError::EndOfStream);
        }

        let (data, delay) = self.frames[self.current_frame].clone();
        let pts = self.current_time;
        self.current_time += delay;
        self.current_frame = (self.current_frame + 1) % self.frames.len();

        Ok(VideoFrame::new(
            data,
            VideoFormat {
                width: self.width,
                height: self.height,
                pixel_format: PixelFormat::Rgba8,
                frame_rate: self.fps as f32,
            },
            pts,
        ))
    }

    fn seek(&mut self, timestamp: Duration) -> Result<()> {
        if timestamp > self.total_duration {
            self.current_frame = self.frames.len() - 1;
            self.current_time = self.total_duration;
            return Ok(());
        }

        let mut accumulated = Duration::ZERO;
        for (index, (_, delay)) in self.frames.iter().enumerate() {
            if accumulated + *delay > timestamp {
                self.current_frame = index;
                self.current_time = accumulated;
                return Ok(());
            }
            accumulated += *delay;
        }
        self.current_frame = self.frames.len() - 1;
        self.current_time = self.total_duration;
        Ok(())
    }

    fn duration(&self) -> Duration {
        self.total_duration
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_image_format_detection() {
        assert!(StillImageDecoder::supports_format("a.png"));
        assert!(StillImageDecoder::supports_format("a.JPG"));
        assert!(!StillImageDecoder::supports_format("a.mp4"));
    }

    #[test]
    fn gif_format_detection() {
        assert!(GifDecoder::supports_format("a.gif"));
        assert!(!GifDecoder::supports_format("a.png"));
    }

    #[test]
    fn still_image_missing_file_is_file_missing_error() {
        let err = StillImageDecoder::open("does/not/exist.png").unwrap_err();
        assert!(matches!(err, MediaError::FileMissing(_)));
    }

    #[test]
    fn gif_missing_file_is_file_missing_error() {
        let err = GifDecoder::open("does/not/exist.gif").unwrap_err();
        assert!(matches!(err, MediaError::FileMissing(_)));
    }

    #[test]
    fn gif_frame_limit_is_enforced() {
        use image::codecs::gif::{GifEncoder, Repeat};
        use image::{Delay, Frame, RgbaImage};
        use std::fs::File;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limited.gif");
        let file = File::create(&path).unwrap();

        let mut encoder = GifEncoder::new(file);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        for _ in 0..15 {
            let frame = Frame::from_parts(
                RgbaImage::new(4, 4),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            );
            encoder.encode_frame(frame).unwrap();
        }
        drop(encoder);

        let decoder = GifDecoder::open(&path).unwrap();
        assert_eq!(decoder.frames.len(), MAX_GIF_FRAMES);
    }
}
