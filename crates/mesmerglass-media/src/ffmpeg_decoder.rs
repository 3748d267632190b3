//! FFmpeg-backed video decoding (§4.3 video path).

use std::path::Path;
use std::time::Duration;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg_next::util::frame::video::Video as FfVideo;
use tracing::info;

use crate::decoder::VideoDecoder;
use crate::frame::{PixelFormat, VideoFormat, VideoFrame};
use crate::{MediaError, Result};

/// Decodes a video file frame-by-frame via FFmpeg, rescaling every frame to
/// RGBA8 for the compositor.
pub struct FFmpegDecoder {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ScalingContext,
    video_stream_index: usize,
    width: u32,
    height: u32,
    fps: f64,
    duration: Duration,
    frame_count: Option<u64>,
    cursor_pts: Duration,
    eof_sent: bool,
}

impl FFmpegDecoder {
    /// Open a video file for decoding.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileMissing(path.display().to_string()));
        }

        ffmpeg_next::init()
            .map_err(|e| MediaError::Decoder(format!("ffmpeg init failed: {e}")))?;

        let input = ffmpeg_next::format::input(&path)
            .map_err(|e| MediaError::UnsupportedFormat(format!("{}: {e}", path.display())))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| MediaError::UnsupportedFormat("no video stream".into()))?;
        let video_stream_index = stream.index();

        let fps_rational = stream.avg_frame_rate();
        let fps = if fps_rational.denominator() != 0 {
            fps_rational.numerator() as f64 / fps_rational.denominator() as f64
        } else {
            30.0
        };

        let duration = if stream.duration() > 0 {
            Duration::from_secs_f64(stream.duration() as f64 * f64::from(stream.time_base()))
        } else {
            Duration::ZERO
        };
        let frame_count = if stream.frames() > 0 {
            Some(stream.frames() as u64)
        } else {
            None
        };

        let context = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| MediaError::Decoder(e.to_string()))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| MediaError::Decoder(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGBA,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(|e| MediaError::Decoder(e.to_string()))?;

        info!(width, height, fps, path = %path.display(), "opened video with FFmpeg");

        Ok(Self {
            input,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            fps,
            duration,
            frame_count,
            cursor_pts: Duration::ZERO,
            eof_sent: false,
        })
    }

    fn scale_and_wrap(&mut self, decoded: &FfVideo) -> Result<VideoFrame> {
        let mut rgba = FfVideo::empty();
        self.scaler
            .run(decoded, &mut rgba)
            .map_err(|e| MediaError::Decoder(e.to_string()))?;

        let stride = rgba.stride(0);
        let expected_stride = self.width as usize * 4;
        let data = if stride == expected_stride {
            rgba.data(0).to_vec()
        } else {
            // Copy out padding inserted by the scaler's line alignment.
            let mut packed = Vec::with_capacity(expected_stride * self.height as usize);
            for row in 0..self.height as usize {
                let start = row * stride;
                packed.extend_from_slice(&rgba.data(0)[start..start + expected_stride]);
            }
            packed
        };

        self.cursor_pts = Duration::from_secs_f64(decoded.pts().unwrap_or(0) as f64 / self.fps);

        Ok(VideoFrame::new(
            data,
            VideoFormat {
                width: self.width,
                height: self.height,
                pixel_format: PixelFormat::Rgba8,
                frame_rate: self.fps as f32,
            },
            self.cursor_pts,
        ))
    }
}

impl VideoDecoder for FFmpegDecoder {
    fn next_frame(&mut self) -> Result<VideoFrame> {
        let mut decoded = FfVideo::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.scale_and_wrap(&decoded);
            }

            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.video_stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|e| MediaError::Decoder(e.to_string()))?;
                    }
                }
                None => {
                    if !self.eof_sent {
                        self.eof_sent = true;
                        let _ = self.decoder.send_eof();
                        continue;
                    }
                    return Err(MediaError::EndOfStream);
                }
            }
        }
    }

    fn seek(&mut self, timestamp: Duration) -> Result<()> {
        let ts = (timestamp.as_secs_f64() / f64::from(
            self.input
                .stream(self.video_stream_index)
                .map(|s| s.time_base())
                .unwrap_or(ffmpeg_next::Rational(1, 1)),
        )) as i64;
        self.input
            .seek(ts, ..ts)
            .map_err(|e| MediaError::Decoder(format!("seek failed: {e}")))?;
        self.decoder.flush();
        self.eof_sent = false;
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
        self.frame_count
    }
}
