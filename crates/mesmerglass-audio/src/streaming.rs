//! Streaming playback worker, warmed up at engine init (§4.4).
//!
//! Assets the prefetch worker marks stream-only are read progressively from
//! disk instead of fully decoded up front. The worker thread itself is
//! spawned once, at [`StreamingWorker::spawn`], so the first cue that needs
//! streaming playback does not pay thread-spawn latency — only opening the
//! file happens on demand.

use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::info;

use crate::{AudioError, Result};

struct OpenRequest {
    path: String,
    reply_tx: Sender<Result<StreamReader>>,
}

/// A progressively-read audio stream, pulled in fixed-size chunks.
pub struct StreamReader {
    reader: hound::WavReader<BufReader<File>>,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    sample_format: hound::SampleFormat,
    exhausted: bool,
}

impl StreamReader {
    /// Read up to `frames` frames (each `channels` samples), zero-padding if
    /// the stream runs out before filling the request.
    pub fn read_chunk(&mut self, frames: usize) -> Vec<f32> {
        let wanted = frames * self.channels as usize;
        let mut out = Vec::with_capacity(wanted);

        if !self.exhausted {
            match self.sample_format {
                hound::SampleFormat::Float => {
                    for sample in (&mut self.reader).samples::<f32>().take(wanted) {
                        match sample {
                            Ok(s) => out.push(s),
                            Err(_) => break,
                        }
                    }
                }
                hound::SampleFormat::Int => {
                    let max = (1i64 << (self.bits_per_sample - 1)) as f32;
                    for sample in (&mut self.reader).samples::<i32>().take(wanted) {
                        match sample {
                            Ok(s) => out.push(s as f32 / max),
                            Err(_) => break,
                        }
                    }
                }
            }
            if out.len() < wanted {
                self.exhausted = true;
            }
        }

        out.resize(wanted, 0.0);
        out
    }

    /// Whether the underlying file has been fully consumed.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Stream sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stream channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Background worker that opens stream-only assets on request.
pub struct StreamingWorker {
    request_tx: Sender<OpenRequest>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl StreamingWorker {
    /// Spawn the worker thread immediately, before any asset is known.
    pub fn spawn() -> Self {
        let (request_tx, request_rx): (Sender<OpenRequest>, Receiver<OpenRequest>) = bounded(16);
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();

        let worker = thread::Builder::new()
            .name("mesmerglass-audio-stream".to_string())
            .spawn(move || {
                info!("audio streaming worker started");
                while worker_running.load(Ordering::Relaxed) {
                    match request_rx.recv_timeout(Duration::from_millis(200)) {
                        Ok(request) => {
                            let result = open_stream(&request.path);
                            let _ = request.reply_tx.send(result);
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("failed to spawn audio streaming thread");

        Self {
            request_tx,
            running,
            worker: Some(worker),
        }
    }

    /// Open a file for progressive reading.
    pub fn open(&self, path: &str) -> Result<StreamReader> {
        let (reply_tx, reply_rx) = bounded(1);
        self.request_tx
            .send(OpenRequest {
                path: path.to_string(),
                reply_tx,
            })
            .map_err(|_| AudioError::Device("streaming worker unavailable".into()))?;
        reply_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| AudioError::Device("streaming worker did not respond".into()))?
    }

    /// Stop the worker thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for StreamingWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(path: &str) -> Result<StreamReader> {
    let path_ref = std::path::Path::new(path);
    if !path_ref.exists() {
        return Err(AudioError::FileMissing(path.to_string()));
    }
    let reader = hound::WavReader::open(path_ref)
        .map_err(|e| AudioError::UnsupportedFormat(format!("{path}: {e}")))?;
    let spec = reader.spec();
    Ok(StreamReader {
        reader,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        sample_format: spec.sample_format,
        exhausted: false,
    })
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
    fn reads_progressively_and_zero_pads_past_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.wav");
        write_test_wav(&path, &[100, 200, 300, 400]);

        let worker = StreamingWorker::spawn();
        let mut stream = worker.open(path.to_str().unwrap()).unwrap();

        let first = stream.read_chunk(2);
        assert_eq!(first.len(), 2);
        assert!(!stream.is_exhausted());

        let second = stream.read_chunk(10);
        assert_eq!(second.len(), 10);
        assert!(stream.is_exhausted());
    }

    #[test]
    fn open_missing_file_reports_file_missing() {
        let worker = StreamingWorker::spawn();
        let err = worker.open("does/not/exist.wav").unwrap_err();
        assert!(matches!(err, AudioError::FileMissing(_)));
    }
}
