//! Audio engine: owns the mixer, prefetch worker, streaming worker, and the
//! `cpal` output stream (§4.4).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::mixer::{Mixer, RoleHandle};
use crate::prefetch::{AssetKey, PrefetchWorker, ResolvedAsset};
use crate::streaming::StreamingWorker;
use crate::{AudioError, Result};

/// A request to start or stop a role's playback.
#[derive(Debug, Clone)]
pub enum AudioCommand {
    /// Begin playing `path` under `role` for `cue_id`, with the given
    /// fade-in/volume/loop settings (§3 `CueAudio`).
    Play {
        /// Owning cue name, used to correlate with prefetch requests.
        cue_id: String,
        /// Mixer role.
        role: String,
        /// Asset path.
        path: String,
        /// Target volume, `[0, 1]`.
        volume: f32,
        /// Whether the track should loop.
        looped: bool,
        /// Fade-in duration in seconds.
        fade_in_s: f32,
    },
    /// Fade out and remove whatever is currently playing under `role`.
    Stop {
        /// Mixer role to stop.
        role: String,
        /// Fade-out duration in seconds.
        fade_out_s: f32,
    },
}

/// Ties the mixer, prefetch worker, and streaming worker together behind a
/// `cpal` output stream.
pub struct AudioEngine {
    mixer: Arc<Mutex<Mixer>>,
    prefetch: PrefetchWorker,
    streaming: StreamingWorker,
    sample_rate: u32,
    prefetch_block_limit_ms: u64,
}

impl AudioEngine {
    /// Construct an engine, prewarming the streaming worker and starting the
    /// prefetch worker, so the first cue's audio does not pay thread-spawn
    /// latency.
    pub fn new(sample_rate: u32, slow_decode_stream_ms: u64, prefetch_block_limit_ms: u64) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new())),
            prefetch: PrefetchWorker::spawn(slow_decode_stream_ms),
            streaming: StreamingWorker::spawn(),
            sample_rate,
            prefetch_block_limit_ms,
        }
    }

    /// Queue a decode request ahead of a role actually starting playback
    /// (§4.7 audio lookahead).
    pub fn prefetch(&self, cue_id: &str, role: &str, path: &str) {
        self.prefetch.request(AssetKey {
            cue_id: cue_id.to_string(),
            role: role.to_string(),
            path: path.to_string(),
        });
    }

    /// Assets still decoding for the given cue.
    pub fn pending_for_cue(&self, cue_id: &str) -> Vec<AssetKey> {
        self.prefetch.pending_for_cue(cue_id)
    }

    /// Apply a command, resolving a fully decoded buffer if the prefetch
    /// worker got to it in time, otherwise falling back to a streaming
    /// reader per §4.4.
    pub fn apply(&self, command: AudioCommand) -> Result<()> {
        match command {
            AudioCommand::Play {
                cue_id,
                role,
                path,
                volume,
                looped,
                fade_in_s,
            } => {
                let key = AssetKey {
                    cue_id: cue_id.clone(),
                    role: role.clone(),
                    path: path.clone(),
                };
                self.prefetch.request(key.clone());
                self.prefetch.wait_for_cues(
                    &[cue_id],
                    Duration::from_millis(self.prefetch_block_limit_ms),
                );

                let handle = match self.prefetch.resolved(&key) {
                    Some(ResolvedAsset::Buffered(buffer)) => {
                        RoleHandle::from_buffer(buffer, volume, fade_in_s, looped)
                    }
                    Some(ResolvedAsset::StreamOnly(path)) | None => {
                        if self.prefetch.resolved(&key).is_none() {
                            warn!(%role, %path, "prefetch timed out, falling back to streaming");
                        }
                        let stream = self.streaming.open(&path)?;
                        RoleHandle::from_stream(stream, volume, fade_in_s, looped)
                    }
                };

                self.mixer.lock().set_role(role, handle);
                Ok(())
            }
            AudioCommand::Stop { role, fade_out_s } => {
                self.mixer.lock().stop_role(&role, fade_out_s);
                Ok(())
            }
        }
    }

    /// Advance playback by `frames` frames and return the mixed mono buffer.
    pub fn tick(&self, frames: usize) -> Vec<f32> {
        let dt = frames as f32 / self.sample_rate as f32;
        self.mixer.lock().mix(frames, dt)
    }

    /// Whether a role is currently active.
    pub fn has_role(&self, role: &str) -> bool {
        self.mixer.lock().has_role(role)
    }

    /// Output sample rate this engine was configured with.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(feature = "cpal")]
mod output {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    impl AudioEngine {
        /// Open the system default output device and start streaming the
        /// mixer's output to it. Returns the live `cpal::Stream`; dropping
        /// it stops output.
        pub fn start_output(&self) -> Result<cpal::Stream> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| AudioError::Device("no default output device".into()))?;
            let config = device
                .default_output_config()
                .map_err(|e| AudioError::Device(e.to_string()))?;

            let channels = config.channels() as usize;
            let mixer = self.mixer.clone();
            let sample_rate = self.sample_rate;

            let stream = device
                .build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _| {
                        let frames = data.len() / channels.max(1);
                        let dt = frames as f32 / sample_rate as f32;
                        let mono = mixer.lock().mix(frames, dt);
                        for (frame_idx, sample) in mono.iter().enumerate() {
                            for ch in 0..channels {
                                data[frame_idx * channels + ch] = *sample;
                            }
                        }
                    },
                    |err| warn!(%err, "audio output stream error"),
                    None,
                )
                .map_err(|e| AudioError::Device(e.to_string()))?;

            stream
                .play()
                .map_err(|e| AudioError::Device(e.to_string()))?;
            info!("audio output stream started");
            Ok(stream)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &std::path::Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn play_command_activates_role_and_tick_mixes_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hypno.wav");
        write_test_wav(&path, &[i16::MAX; 100]);

        let engine = AudioEngine::new(44100, 350, 500);
        engine
            .apply(AudioCommand::Play {
                cue_id: "cue1".into(),
                role: "hypno".into(),
                path: path.display().to_string(),
                volume: 1.0,
                looped: true,
                fade_in_s: 0.0,
            })
            .unwrap();

        assert!(engine.has_role("hypno"));
        let mixed = engine.tick(10);
        assert_eq!(mixed.len(), 10);
        assert!(mixed.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn stop_command_fades_role_out_and_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.wav");
        write_test_wav(&path, &[1000; 1000]);

        let engine = AudioEngine::new(100, 350, 500);
        engine
            .apply(AudioCommand::Play {
                cue_id: "cue1".into(),
                role: "background".into(),
                path: path.display().to_string(),
                volume: 1.0,
                looped: true,
                fade_in_s: 0.0,
            })
            .unwrap();

        engine
            .apply(AudioCommand::Stop {
                role: "background".into(),
                fade_out_s: 0.1,
            })
            .unwrap();

        engine.tick(5); // 0.05s elapsed
        assert!(engine.has_role("background"));

        engine.tick(10); // another 0.1s elapsed, past the fade-out duration
        assert!(!engine.has_role("background"));
    }
}
