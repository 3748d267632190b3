//! Small image decode worker pool (§5: "image decode worker pool, e.g. 2
//! workers"), decoupled from the render thread exactly as §4.3 requires for
//! the image path ("Decoding occurs off the render thread").
//!
//! Mirrors the request/worker-thread split in
//! `mesmerglass_media::prefetch::PrefetchRing`, collapsed to a fixed-size
//! pool of generic workers (decode jobs are independent, so no ring/ordering
//! guarantee is needed beyond "eventually delivered").

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use mesmerglass_media::{MediaError, StillImageDecoder, VideoDecoder};
use tracing::warn;

/// A decoded image, ready for GPU upload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Source path this image was decoded from.
    pub path: String,
    /// RGBA8 pixels.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

type JobResult = Result<DecodedImage, (String, MediaError)>;

/// A small, fixed-size pool of threads decoding still images off the render
/// thread.
pub struct ImageWorkerPool {
    jobs_tx: Option<Sender<String>>,
    results_rx: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
}

impl ImageWorkerPool {
    /// Spawn `worker_count` decode threads.
    pub fn spawn(worker_count: usize) -> Self {
        let (jobs_tx, jobs_rx): (Sender<String>, Receiver<String>) = unbounded();
        let (results_tx, results_rx) = unbounded();

        let workers = (0..worker_count.max(1))
            .map(|i| {
                let jobs_rx = jobs_rx.clone();
                let results_tx = results_tx.clone();
                thread::Builder::new()
                    .name(format!("mesmerglass-image-decode-{i}"))
                    .spawn(move || {
                        while let Ok(path) = jobs_rx.recv() {
                            let result = StillImageDecoder::open(&path).and_then(|mut decoder| {
                                decoder.next_frame()
                            });
                            let sent = match result {
                                Ok(frame) => results_tx.send(Ok(DecodedImage {
                                    path: path.clone(),
                                    pixels: frame.data,
                                    width: frame.format.width,
                                    height: frame.format.height,
                                })),
                                Err(e) => {
                                    warn!(%path, error = %e, "image decode failed");
                                    results_tx.send(Err((path.clone(), e)))
                                }
                            };
                            if sent.is_err() {
                                break; // receiver dropped
                            }
                        }
                    })
                    .expect("failed to spawn image decode thread")
            })
            .collect();

        Self {
            jobs_tx: Some(jobs_tx),
            results_rx,
            workers,
        }
    }

    /// Queue a decode request; does not block.
    pub fn request(&self, path: impl Into<String>) {
        if let Some(tx) = &self.jobs_tx {
            let _ = tx.send(path.into());
        }
    }

    /// Drain any decode results that have completed so far, without blocking.
    pub fn poll(&self) -> Vec<JobResult> {
        self.results_rx.try_iter().collect()
    }

    /// Block up to `timeout` for the next completed result.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<JobResult> {
        self.results_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for ImageWorkerPool {
    fn drop(&mut self) {
        // Dropping the last `Sender` closes the job channel; each worker's
        // `recv()` then returns `Err` and the loop exits.
        self.jobs_tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn write_png(path: &std::path::Path) {
        let img = image::RgbaImage::new(2, 2);
        img.save(path).unwrap();
    }

    #[test]
    fn decodes_requested_images_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path);

        let pool = ImageWorkerPool::spawn(2);
        pool.request(path.display().to_string());

        let result = pool
            .recv_timeout(Duration::from_secs(2))
            .expect("expected a decode result");
        let image = result.expect("decode should succeed");
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 2);
    }

    #[test]
    fn missing_file_reports_an_error_without_blocking_other_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        write_png(&good);

        let pool = ImageWorkerPool::spawn(2);
        pool.request("does/not/exist.png");
        pool.request(good.display().to_string());

        let mut saw_error = false;
        let mut saw_ok = false;
        for _ in 0..2 {
            match pool.recv_timeout(Duration::from_secs(2)) {
                Some(Err(_)) => saw_error = true,
                Some(Ok(_)) => saw_ok = true,
                None => panic!("expected two results"),
            }
        }
        assert!(saw_error && saw_ok);
    }

    #[test]
    fn write_test_helper_is_unused_without_image_feature() {
        // Keeps `std::io::Write` import meaningful if the `image` helper
        // above is ever swapped for raw byte writes.
        let _ = std::io::sink().write_all(b"");
    }
}
