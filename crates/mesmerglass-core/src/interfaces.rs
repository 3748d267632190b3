//! Collaborator interfaces (§6): the core consumes these, never implements
//! their concrete backends. A bin crate (or test) supplies real adapters;
//! the BLE device stack and VR bridge in particular are intentionally left
//! with no shipped implementation here, per §1's "explicitly out of scope"
//! list.

use std::path::Path;

/// A single attached display surface the compositor renders into.
///
/// Mirrors the teacher's multi-output design (`mapmap-core::output`), but
/// reduced to the handful of operations the spec's §6 contract names.
pub trait DisplaySurface: Send {
    /// Current surface size in pixels.
    fn size(&self) -> (u32, u32);
    /// Surface's reported refresh rate in Hz.
    fn refresh_rate(&self) -> f32;
    /// Bind this surface's render target as current for the calling thread.
    fn make_current(&mut self);
    /// Present the frame most recently rendered into this surface.
    fn swap_buffers(&mut self);
}

/// Blocking file reads, exactly as named in §6 (`read_file(path) -> bytes | error`).
pub trait FileReader: Send + Sync {
    /// Read the entire contents of `path`.
    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Default `FileReader` backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileReader;

impl FileReader for StdFileReader {
    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Sink receiving mixed PCM frames at a fixed sample rate (§6).
pub trait AudioSink: Send {
    /// Push interleaved PCM samples for playback.
    fn push_samples(&mut self, samples: &[f32]);
    /// Sample rate this sink expects.
    fn sample_rate(&self) -> u32;
    /// Channel count this sink expects.
    fn channels(&self) -> u16;
}

/// Optional haptic device control (§6). The runner invokes `pulse` at
/// scripted moments; core has no other BLE logic.
pub trait DeviceControl: Send {
    /// Trigger a pulse of the given intensity for `duration_ms`.
    fn pulse(&mut self, intensity: f32, duration_ms: u32);
}

/// Lists the member files of a Media Bank label (§3 Media Bank).
///
/// Directory listing is file I/O, out of scope for the core per §1, so this
/// is a collaborator interface exactly like [`FileReader`]: the bin crate
/// supplies a `std::fs::read_dir` backed implementation, tests supply a
/// fixed in-memory list.
pub trait MediaBankResolver: Send + Sync {
    /// Resolve `bank_path` (a [`crate::MediaBankEntry::path`]) to the
    /// absolute paths of its member files, in a stable order.
    fn list(&self, bank_path: &str) -> Vec<String>;
}

/// A single decoded (or decodable) video source (§6).
pub trait VideoSource: Send {
    /// Source metadata: `(fps_src, frame_count, width, height)`.
    fn metadata(&self) -> (f64, u64, u32, u32);
    /// Decode and return the next frame, or `None` at end of stream.
    fn decode_next(&mut self) -> Option<Vec<u8>>;
    /// Seek to an absolute frame index.
    fn seek(&mut self, frame_idx: u64) -> std::io::Result<()>;
}
