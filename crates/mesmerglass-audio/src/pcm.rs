//! Decoded PCM storage and WAV loading via `hound`.

use std::path::Path;

use crate::{AudioError, Result};

/// A fully decoded audio asset, interleaved `f32` samples in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    /// Interleaved samples, `channels` per frame.
    pub samples: Vec<f32>,
    /// Sample rate, Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

impl PcmBuffer {
    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Duration of the decoded buffer.
    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Decode a WAV file eagerly into memory.
    pub fn decode_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AudioError::FileMissing(path.display().to_string()));
        }

        let mut reader = hound::WavReader::open(path)
            .map_err(|e| AudioError::UnsupportedFormat(format!("{}: {e}", path.display())))?;
        let spec = reader.spec();

        let samples: std::result::Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max))
                    .collect()
            }
        };
        let samples =
            samples.map_err(|e| AudioError::UnsupportedFormat(format!("{}: {e}", path.display())))?;

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}
