//! Single background prefetch worker for `(cue_id, role, path)` decode
//! requests (§4.4).
//!
//! Uses the same bounded-channel-plus-`AtomicBool`-running-flag worker shape
//! as the media crate's decode thread, so cancellation and shutdown read
//! identically across the codebase.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::pcm::PcmBuffer;

/// Identifies one audio asset a cue wants mixed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    /// Owning cue name.
    pub cue_id: String,
    /// Mixer role this asset plays under.
    pub role: String,
    /// Path to the asset on disk.
    pub path: String,
}

/// Outcome of a prefetch decode.
#[derive(Debug, Clone)]
pub enum ResolvedAsset {
    /// Decoded fully into memory, ready for the mixer to read from.
    Buffered(Arc<PcmBuffer>),
    /// Decode took too long; playback falls back to progressive disk reads.
    StreamOnly(String),
}

struct PrefetchRequest {
    key: AssetKey,
}

/// Background worker that decodes queued assets ahead of when a cue needs
/// them, marking slow-decoding assets stream-only per §4.4.
pub struct PrefetchWorker {
    request_tx: Sender<PrefetchRequest>,
    results: Arc<Mutex<HashMap<AssetKey, ResolvedAsset>>>,
    requested: Arc<Mutex<HashSet<AssetKey>>>,
    notify_rx: Receiver<()>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PrefetchWorker {
    /// Start the worker. `slow_decode_stream_ms` is the §4.4 threshold above
    /// which a decode is abandoned in favor of stream-only playback.
    pub fn spawn(slow_decode_stream_ms: u64) -> Self {
        let (request_tx, request_rx): (Sender<PrefetchRequest>, Receiver<PrefetchRequest>) =
            bounded(64);
        let (notify_tx, notify_rx) = bounded(64);
        let results = Arc::new(Mutex::new(HashMap::new()));
        let requested = Arc::new(Mutex::new(HashSet::new()));
        let running = Arc::new(AtomicBool::new(true));

        let worker_results = results.clone();
        let worker_running = running.clone();

        let worker = thread::Builder::new()
            .name("mesmerglass-audio-prefetch".to_string())
            .spawn(move || {
                info!("audio prefetch worker started");
                while worker_running.load(Ordering::Relaxed) {
                    match request_rx.recv_timeout(Duration::from_millis(200)) {
                        Ok(request) => {
                            let resolved = decode_with_deadline(
                                &request.key.path,
                                Duration::from_millis(slow_decode_stream_ms),
                            );
                            worker_results.lock().insert(request.key, resolved);
                            let _ = notify_tx.try_send(());
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("failed to spawn audio prefetch thread");

        Self {
            request_tx,
            results,
            requested,
            notify_rx,
            running,
            worker: Some(worker),
        }
    }

    /// Queue a decode request; idempotent for a key already requested.
    pub fn request(&self, key: AssetKey) {
        let mut requested = self.requested.lock();
        if requested.contains(&key) {
            return;
        }
        requested.insert(key.clone());
        drop(requested);
        let _ = self.request_tx.try_send(PrefetchRequest { key });
    }

    /// Assets requested for `cue_id` that have not yet resolved.
    pub fn pending_for_cue(&self, cue_id: &str) -> Vec<AssetKey> {
        let requested = self.requested.lock();
        let results = self.results.lock();
        requested
            .iter()
            .filter(|key| key.cue_id == cue_id && !results.contains_key(key))
            .cloned()
            .collect()
    }

    /// Look up a resolved asset, if decoding has finished.
    pub fn resolved(&self, key: &AssetKey) -> Option<ResolvedAsset> {
        self.results.lock().get(key).cloned()
    }

    /// Block up to `timeout` for every asset requested under the given cue
    /// IDs to resolve. Returns `false` on timeout (§4.4: the caller falls
    /// back to streaming mode on the offending track).
    pub fn wait_for_cues(&self, cue_ids: &[String], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let all_resolved = cue_ids
                .iter()
                .all(|cue_id| self.pending_for_cue(cue_id).is_empty());
            if all_resolved {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(?cue_ids, "prefetch wait timed out");
                return false;
            }
            let _ = self.notify_rx.recv_timeout(remaining.min(Duration::from_millis(20)));
        }
    }

    /// Stop the worker thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for PrefetchWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Clone for ResolvedAsset {
    fn clone(&self) -> Self {
        match self {
            ResolvedAsset::Buffered(buf) => ResolvedAsset::Buffered(buf.clone()),
            ResolvedAsset::StreamOnly(path) => ResolvedAsset::StreamOnly(path.clone()),
        }
    }
}

fn decode_with_deadline(path: &str, deadline: Duration) -> ResolvedAsset {
    let start = Instant::now();
    match PcmBuffer::decode_wav(path) {
        Ok(pcm) if start.elapsed() <= deadline => ResolvedAsset::Buffered(Arc::new(pcm)),
        _ => ResolvedAsset::StreamOnly(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_test_wav(path: &std::path::Path, frame_count: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frame_count {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn request_resolves_into_buffered_asset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        write_test_wav(&path, 100);

        let worker = PrefetchWorker::spawn(350);
        let key = AssetKey {
            cue_id: "cue1".into(),
            role: "hypno".into(),
            path: path.display().to_string(),
        };
        worker.request(key.clone());

        assert!(worker.wait_for_cues(&["cue1".to_string()], Duration::from_secs(2)));
        match worker.resolved(&key).unwrap() {
            ResolvedAsset::Buffered(_) => {}
            ResolvedAsset::StreamOnly(_) => panic!("expected buffered asset"),
        }
    }

    #[test]
    fn missing_file_resolves_stream_only_rather_than_panicking() {
        let worker = PrefetchWorker::spawn(350);
        let key = AssetKey {
            cue_id: "cue1".into(),
            role: "background".into(),
            path: "does/not/exist.wav".into(),
        };
        worker.request(key.clone());
        assert!(worker.wait_for_cues(&["cue1".to_string()], Duration::from_secs(2)));
        assert!(matches!(
            worker.resolved(&key).unwrap(),
            ResolvedAsset::StreamOnly(_)
        ));
    }

    #[test]
    fn wait_for_cues_times_out_when_nothing_requested_resolves() {
        let mut worker = PrefetchWorker::spawn(350);
        worker.running.store(false, Ordering::Relaxed); // simulate a stalled worker
        let key = AssetKey {
            cue_id: "cue1".into(),
            role: "hypno".into(),
            path: "whatever.wav".into(),
        };
        worker.requested.lock().insert(key);
        assert!(!worker.wait_for_cues(&["cue1".to_string()], Duration::from_millis(50)));
    }
}
