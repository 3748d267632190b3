//! Additive multi-role PCM mixing (§4.4 "Mix").

use std::collections::HashMap;
use std::sync::Arc;

use crate::fade::FadeState;
use crate::pcm::PcmBuffer;
use crate::streaming::StreamReader;

/// Where a role handle reads its samples from.
pub enum AudioSource {
    /// Fully decoded in memory.
    Buffered {
        /// Decoded samples.
        buffer: Arc<PcmBuffer>,
        /// Frame-granularity read position.
        cursor: usize,
    },
    /// Read progressively from disk.
    Streaming(StreamReader),
}

/// One active role's playback state.
pub struct RoleHandle {
    source: AudioSource,
    channels: u16,
    target_volume: f32,
    fade: FadeState,
    looped: bool,
    naturally_ended: bool,
}

impl RoleHandle {
    /// Start a role handle playing from a fully decoded buffer.
    pub fn from_buffer(
        buffer: Arc<PcmBuffer>,
        target_volume: f32,
        fade_in_s: f32,
        looped: bool,
    ) -> Self {
        let channels = buffer.channels;
        Self {
            source: AudioSource::Buffered { buffer, cursor: 0 },
            channels,
            target_volume,
            fade: FadeState::start_in(fade_in_s),
            looped,
            naturally_ended: false,
        }
    }

    /// Start a role handle playing from a progressive stream reader.
    pub fn from_stream(
        stream: StreamReader,
        target_volume: f32,
        fade_in_s: f32,
        looped: bool,
    ) -> Self {
        let channels = stream.channels();
        Self {
            source: AudioSource::Streaming(stream),
            channels,
            target_volume,
            fade: FadeState::start_in(fade_in_s),
            looped,
            naturally_ended: false,
        }
    }

    /// Begin a fade-out; the handle is dropped from the mixer once it
    /// reaches `FadeState::Finished`.
    pub fn begin_fade_out(&mut self, duration: f32) {
        self.fade = self.fade.begin_fade_out(duration);
    }

    /// Whether this handle should be removed from the mixer: either its
    /// fade finished, or (for non-looping buffered sources) playback ran out.
    pub fn is_done(&self) -> bool {
        self.fade.is_finished() || self.naturally_ended
    }

    fn read_frames(&mut self, frames: usize) -> Vec<f32> {
        let wanted = frames * self.channels.max(1) as usize;
        match &mut self.source {
            AudioSource::Buffered { buffer, cursor } => {
                let mut out = Vec::with_capacity(wanted);
                let total = buffer.samples.len();
                if total == 0 {
                    self.naturally_ended = true;
                    return vec![0.0; wanted];
                }
                while out.len() < wanted {
                    if *cursor >= total {
                        if self.looped {
                            *cursor = 0;
                        } else {
                            self.naturally_ended = true;
                            out.resize(wanted, 0.0);
                            break;
                        }
                    }
                    let take = (total - *cursor).min(wanted - out.len());
                    out.extend_from_slice(&buffer.samples[*cursor..*cursor + take]);
                    *cursor += take;
                }
                out
            }
            AudioSource::Streaming(stream) => {
                let out = stream.read_chunk(frames);
                if stream.is_exhausted() {
                    if self.looped {
                        // Progressive re-open is a caller-level concern; a
                        // stream-only loop simply holds at silence once
                        // exhausted rather than reopening mid-mix.
                        self.naturally_ended = true;
                    } else {
                        self.naturally_ended = true;
                    }
                }
                out
            }
        }
    }

    /// Downmix this handle's next `frames` frames to mono, scaled by the
    /// current fade envelope and target volume.
    fn next_mono(&mut self, frames: usize, dt: f32) -> Vec<f32> {
        let gain = self.fade.advance(dt) * self.target_volume;
        let channels = self.channels.max(1) as usize;
        let raw = self.read_frames(frames);
        (0..frames)
            .map(|i| {
                let start = i * channels;
                let frame_sum: f32 = raw[start..start + channels].iter().sum();
                (frame_sum / channels as f32) * gain
            })
            .collect()
    }
}

/// Mixes every active role's output additively into a single mono buffer.
#[derive(Default)]
pub struct Mixer {
    roles: HashMap<String, RoleHandle>,
}

impl Mixer {
    /// Construct an empty mixer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the handle for `role`.
    pub fn set_role(&mut self, role: impl Into<String>, handle: RoleHandle) {
        self.roles.insert(role.into(), handle);
    }

    /// Begin fading out and eventually removing the given role's handle.
    pub fn stop_role(&mut self, role: &str, fade_out_s: f32) {
        if let Some(handle) = self.roles.get_mut(role) {
            handle.begin_fade_out(fade_out_s);
        }
    }

    /// Whether a role currently has an active handle.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Advance every active role by `frames` frames (`dt` = `frames /
    /// sample_rate` seconds) and sum them additively into one mono buffer.
    /// Finished handles are dropped after mixing.
    pub fn mix(&mut self, frames: usize, dt: f32) -> Vec<f32> {
        let mut out = vec![0.0f32; frames];
        for handle in self.roles.values_mut() {
            let mixed = handle.next_mono(frames, dt);
            for (o, m) in out.iter_mut().zip(mixed.iter()) {
                *o += m;
            }
        }
        self.roles.retain(|_, handle| !handle.is_done());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_buffer(samples: &[f32]) -> Arc<PcmBuffer> {
        Arc::new(PcmBuffer {
            samples: samples.to_vec(),
            sample_rate: 10,
            channels: 1,
        })
    }

    #[test]
    fn mixes_two_roles_additively() {
        let mut mixer = Mixer::new();
        mixer.set_role(
            "hypno",
            RoleHandle::from_buffer(mono_buffer(&[0.5; 10]), 1.0, 0.0, true),
        );
        mixer.set_role(
            "background",
            RoleHandle::from_buffer(mono_buffer(&[0.25; 10]), 1.0, 0.0, true),
        );

        let out = mixer.mix(4, 0.4);
        for sample in out {
            assert!((sample - 0.75).abs() < 1e-5);
        }
    }

    #[test]
    fn fade_out_removes_handle_once_finished() {
        let mut mixer = Mixer::new();
        mixer.set_role(
            "hypno",
            RoleHandle::from_buffer(mono_buffer(&[1.0; 100]), 1.0, 0.0, true),
        );
        mixer.stop_role("hypno", 1.0);

        mixer.mix(1, 0.5);
        assert!(mixer.has_role("hypno"));

        mixer.mix(1, 0.6);
        assert!(!mixer.has_role("hypno"));
    }

    #[test]
    fn non_looping_buffer_ends_naturally_when_exhausted() {
        let mut mixer = Mixer::new();
        mixer.set_role(
            "other",
            RoleHandle::from_buffer(mono_buffer(&[1.0; 4]), 1.0, 0.0, false),
        );

        mixer.mix(4, 0.4);
        assert!(mixer.has_role("other"));

        mixer.mix(4, 0.4);
        assert!(!mixer.has_role("other"));
    }

    #[test]
    fn stereo_buffer_downmixes_to_mono() {
        let buffer = Arc::new(PcmBuffer {
            samples: vec![1.0, -1.0, 1.0, -1.0],
            sample_rate: 10,
            channels: 2,
        });
        let mut mixer = Mixer::new();
        mixer.set_role("hypno", RoleHandle::from_buffer(buffer, 1.0, 0.0, false));

        let out = mixer.mix(2, 0.2);
        assert_eq!(out, vec![0.0, 0.0]);
    }
}
