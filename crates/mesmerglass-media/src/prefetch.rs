//! Double-buffered frame prefetch ring (§4.3).
//!
//! A dedicated decode thread keeps a bounded `crossbeam-channel` full of
//! decoded frames while the render thread drains it; the channel's capacity
//! *is* the ring (`BUF_CAP`), and backpressure from a full channel is what
//! keeps the worker from running away from the low-water mark (`BUF_LOW`)
//! the render side reports via [`PrefetchStats::buffered`]. This mirrors the
//! decode/upload thread split in the teacher's `FramePipeline`, collapsed to
//! a single decode→render hop since GPU upload in this system happens on the
//! render thread itself (§4.5).
//!
//! Ping-pong direction lives on [`crate::VideoCursor`], not here: when a
//! decoder backend cannot seek backward cheaply (the common case for
//! streamed formats), reversing is realized as the consumer re-reading
//! already-buffered frames in reverse order rather than the worker decoding
//! backward, so the worker thread here only ever decodes forward.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::decoder::VideoDecoder;
use crate::frame::VideoFrame;
use crate::{MediaError, Result};

/// Snapshot of prefetch worker health.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefetchStats {
    /// Total frames decoded since the ring was created.
    pub decoded_frames: u64,
    /// Frames currently sitting in the ring, awaiting a reader.
    pub buffered: usize,
    /// Times the decoder looped back to the start after end-of-stream.
    pub loops: u64,
}

/// A decode worker plus the bounded channel that acts as its frame ring.
pub struct PrefetchRing {
    rx: Receiver<VideoFrame>,
    running: Arc<AtomicBool>,
    decoded_frames: Arc<AtomicU64>,
    loops: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
    cap: usize,
}

impl PrefetchRing {
    /// Spawn a decode thread over `decoder`, filling a ring of `buf_cap`
    /// frames. The low-water mark is purely advisory (exposed via
    /// [`PrefetchStats::buffered`]) since the bounded channel already
    /// enforces the high-water mark.
    pub fn spawn<D: VideoDecoder + 'static>(mut decoder: D, buf_cap: usize) -> Self {
        let (tx, rx): (Sender<VideoFrame>, Receiver<VideoFrame>) = bounded(buf_cap.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let decoded_frames = Arc::new(AtomicU64::new(0));
        let loops = Arc::new(AtomicU64::new(0));

        let worker_running = running.clone();
        let worker_decoded = decoded_frames.clone();
        let worker_loops = loops.clone();

        let worker = thread::Builder::new()
            .name("mesmerglass-video-decode".to_string())
            .spawn(move || {
                info!("video decode worker started");
                while worker_running.load(Ordering::Relaxed) {
                    match decoder.next_frame() {
                        Ok(frame) => match tx.send(frame) {
                            Ok(()) => {
                                worker_decoded.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(_) => break, // receiver dropped
                        },
                        Err(MediaError::EndOfStream) => {
                            worker_loops.fetch_add(1, Ordering::Relaxed);
                            if decoder.seek(Duration::ZERO).is_err() {
                                warn!("video decoder failed to loop back to start");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "video decode failed, stopping worker");
                            break;
                        }
                    }
                }
                debug!("video decode worker stopped");
            })
            .expect("failed to spawn video decode thread");

        Self {
            rx,
            running,
            decoded_frames,
            loops,
            worker: Some(worker),
            cap: buf_cap.max(1),
        }
    }

    /// Pull the next buffered frame if one is ready, without blocking.
    pub fn try_recv(&self) -> Option<VideoFrame> {
        self.rx.try_recv().ok()
    }

    /// Pull the next buffered frame, blocking up to `timeout`; a timeout
    /// here is the §4.3 `DecodeTimeout` condition.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<VideoFrame> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(MediaError::DecodeTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(MediaError::EndOfStream),
        }
    }

    /// Current worker health.
    pub fn stats(&self) -> PrefetchStats {
        PrefetchStats {
            decoded_frames: self.decoded_frames.load(Ordering::Relaxed),
            buffered: self.rx.len(),
            loops: self.loops.load(Ordering::Relaxed),
        }
    }

    /// Ring capacity this instance was spawned with.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Stop the decode thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for PrefetchRing {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::TestPatternDecoder;

    #[test]
    fn ring_buffers_decoded_frames() {
        let decoder = TestPatternDecoder::new(4, 4, Duration::from_secs(1), 30.0);
        let ring = PrefetchRing::spawn(decoder, 8);

        let frame = ring.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(frame.format.width, 4);
    }

    #[test]
    fn ring_loops_back_at_end_of_stream() {
        let decoder = TestPatternDecoder::new(2, 2, Duration::from_millis(50), 100.0);
        let ring = PrefetchRing::spawn(decoder, 4);

        // Drain enough frames to guarantee at least one loop.
        for _ in 0..20 {
            let _ = ring.recv_timeout(Duration::from_secs(1)).unwrap();
        }
        assert!(ring.stats().loops >= 1);
    }

    #[test]
    fn stop_joins_worker_thread() {
        let decoder = TestPatternDecoder::new(2, 2, Duration::from_secs(10), 30.0);
        let mut ring = PrefetchRing::spawn(decoder, 4);
        let _ = ring.recv_timeout(Duration::from_secs(1)).unwrap();
        ring.stop();
        assert!(ring.worker.is_none());
    }
}
