//! Decoder abstraction shared by every media backend.

use std::time::Duration;

use crate::frame::{PixelFormat, VideoFormat, VideoFrame};
use crate::Result;

/// A source of decoded video frames.
///
/// Implementations decode one frame at a time; callers drive the rate at
/// which frames are pulled (the prefetch ring in [`crate::prefetch`] pulls
/// ahead of playback, the render thread consumes from the ring).
pub trait VideoDecoder: Send {
    /// Decode and return the next frame, or `MediaError::EndOfStream` once
    /// the stream is exhausted (callers reverse direction for ping-pong
    /// playback rather than reopening the decoder).
    fn next_frame(&mut self) -> Result<VideoFrame>;

    /// Seek to the given timestamp.
    fn seek(&mut self, timestamp: Duration) -> Result<()>;

    /// Total stream duration.
    fn duration(&self) -> Duration;

    /// Frame `(width, height)`.
    fn resolution(&self) -> (u32, u32);

    /// Source frame rate.
    fn fps(&self) -> f64;

    /// Total frame count, when known.
    fn frame_count(&self) -> Option<u64> {
        None
    }
}

/// Forwards to the boxed trait object, so callers that only know which
/// decoder backend to use at runtime (selected by a factory closure) can
/// still hand a concrete, `'static` type to APIs generic over `VideoDecoder`
/// (e.g. [`crate::prefetch::PrefetchRing::spawn`]).
impl VideoDecoder for Box<dyn VideoDecoder> {
    fn next_frame(&mut self) -> Result<VideoFrame> {
        (**self).next_frame()
    }

    fn seek(&mut self, timestamp: Duration) -> Result<()> {
        (**self).seek(timestamp)
    }

    fn duration(&self) -> Duration {
        (**self).duration()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }

    fn fps(&self) -> f64 {
        (**self).fps()
    }

    fn frame_count(&self) -> Option<u64> {
        (**self).frame_count()
    }
}

/// A synthetic decoder that emits a solid color test pattern, used when no
/// real decode backend is available and in deterministic tests that would
/// otherwise depend on FFmpeg.
#[derive(Debug, Clone)]
pub struct TestPatternDecoder {
    width: u32,
    height: u32,
    duration: Duration,
    fps: f64,
    frame_count: u64,
    cursor: u64,
}

impl TestPatternDecoder {
    /// Construct a test pattern of the given size, duration, and frame rate.
    pub fn new(width: u32, height: u32, duration: Duration, fps: f64) -> Self {
        let frame_count = (duration.as_secs_f64() * fps).round().max(1.0) as u64;
        Self {
            width,
            height,
            duration,
            fps,
            frame_count,
            cursor: 0,
        }
    }

    fn frame_at(&self, index: u64) -> Vec<u8> {
        // Encode the frame index into the red channel so tests can
        // distinguish frames without decoding a real codec.
        let shade = (index % 256) as u8;
        let pixel = [shade, 128u8, 255u8 - shade, 255u8];
        pixel
            .iter()
            .copied()
            .cycle()
            .take(self.width as usize * self.height as usize * 4)
            .collect()
    }
}

impl VideoDecoder for TestPatternDecoder {
    fn next_frame(&mut self) -> Result<VideoFrame> {
        if self.cursor >= self.frame_count {
            return Err(crate::MediaError::EndOfStream);
        }
        let index = self.cursor;
        self.cursor += 1;
        Ok(VideoFrame::new(
            self.frame_at(index),
            VideoFormat {
                width: self.width,
                height: self.height,
                pixel_format: PixelFormat::Rgba8,
                frame_rate: self.fps as f32,
            },
            Duration::from_secs_f64(index as f64 / self.fps),
        ))
    }

    fn seek(&mut self, timestamp: Duration) -> Result<()> {
        self.cursor = (timestamp.as_secs_f64() * self.fps).round() as u64;
        Ok(())
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frame_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_emits_expected_frame_count() {
        let mut decoder = TestPatternDecoder::new(4, 4, Duration::from_secs(1), 10.0);
        let mut count = 0;
        while decoder.next_frame().is_ok() {
            count += 1;
        }
        assert_eq!(count, 10);
    }

    #[test]
    fn test_pattern_seek_repositions_cursor() {
        let mut decoder = TestPatternDecoder::new(2, 2, Duration::from_secs(2), 10.0);
        decoder.seek(Duration::from_secs(1)).unwrap();
        let frame = decoder.next_frame().unwrap();
        assert_eq!(frame.pts, Duration::from_secs(1));
    }
}
