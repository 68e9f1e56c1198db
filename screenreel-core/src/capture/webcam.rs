//! Webcam acquisition
//!
//! A background thread pulls samples from the camera and stores the latest
//! decoded BGRA frame in a single-slot cache. Readers only ever copy out of
//! the cache, so the engine never waits on the camera.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{ReelError, Result};
use crate::types::{Frame, BYTES_PER_PIXEL};

/// Sleep after an empty sample before asking again
pub const EMPTY_SAMPLE_BACKOFF: Duration = Duration::from_millis(2);

/// Consecutive read errors before the loop gives up
pub const MAX_CONSECUTIVE_ERRORS: u32 = 30;

/// Sleep after a read error before retrying
pub const ERROR_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Enumerates and opens cameras
pub trait CameraBackend: Send + Sync {
    /// Human-readable names of the attached cameras, in index order
    fn list_devices(&self) -> Result<Vec<String>>;

    /// Number of attached cameras
    fn device_count(&self) -> Result<usize> {
        Ok(self.list_devices()?.len())
    }

    /// Open camera `index` and start streaming in a BGRA-decodable format
    ///
    /// Called on the acquisition thread; the returned stream never leaves it.
    fn open(&self, index: usize) -> Result<Box<dyn CameraStream>>;
}

/// An open, streaming camera
pub trait CameraStream {
    /// Negotiated frame size
    fn resolution(&self) -> (u32, u32);

    /// Block for the next sample and decode it into `frame` as BGRA
    ///
    /// Returns `Ok(false)` when the device produced an empty sample.
    fn read_frame(&mut self, frame: &mut Frame) -> Result<bool>;
}

/// Single-slot "latest wins" frame cache
#[derive(Debug, Default)]
pub struct FrameCache {
    slot: Mutex<Option<Frame>>,
    updates: AtomicU64,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cached frame
    pub fn store(&self, frame: &Frame) {
        let mut slot = self.slot.lock();
        slot.get_or_insert_with(Frame::default).copy_from(frame);
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the cached frame, if any
    pub fn load(&self) -> Option<Frame> {
        self.slot.lock().clone()
    }

    /// Copy the cached frame into `out`, reusing its allocation
    pub fn copy_into(&self, out: &mut Frame) -> bool {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some(frame) => {
                out.copy_from(frame);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Number of frames stored so far
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

/// State shared with the acquisition thread
#[derive(Debug, Default)]
struct LoopState {
    running: AtomicBool,
    failure: Mutex<Option<String>>,
}

/// Webcam source with a background acquisition loop
pub struct WebcamSource {
    backend: Arc<dyn CameraBackend>,
    device_index: Option<usize>,
    mirror: bool,
    cache: Arc<FrameCache>,
    state: Arc<LoopState>,
    resolution: Option<(u32, u32)>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WebcamSource {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            device_index: None,
            mirror: false,
            cache: Arc::new(FrameCache::new()),
            state: Arc::new(LoopState::default()),
            resolution: None,
            shutdown_tx: None,
            thread: None,
        }
    }

    /// Flip frames horizontally. Takes effect on the next `start`.
    pub fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }

    /// Names of the attached cameras
    pub fn list_devices(&self) -> Result<Vec<String>> {
        self.backend.list_devices()
    }

    /// Select the camera to use
    ///
    /// An out-of-range index falls back to the first camera.
    pub fn initialize(&mut self, index: usize) -> Result<()> {
        if self.is_running() {
            self.stop();
        }

        let count = self.backend.device_count()?;
        if count == 0 {
            return Err(ReelError::device("No webcams found"));
        }

        let index = if index >= count {
            warn!(
                "Webcam index {} out of range ({} devices), using device 0",
                index, count
            );
            0
        } else {
            index
        };

        debug!("Webcam device {} selected", index);
        self.device_index = Some(index);
        Ok(())
    }

    pub fn device_index(&self) -> Option<usize> {
        self.device_index
    }

    /// Open the device and start the acquisition loop
    ///
    /// Opening happens on the acquisition thread; failures are reported
    /// here as `DeviceUnavailable`. No-op while running.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.reap();

        let index = self
            .device_index
            .ok_or_else(|| ReelError::device("Webcam is not initialized"))?;

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, u32)>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let backend = self.backend.clone();
        let cache = self.cache.clone();
        let state = self.state.clone();
        let mirror = self.mirror;

        *self.state.failure.lock() = None;
        self.state.running.store(true, Ordering::SeqCst);

        let thread = std::thread::Builder::new()
            .name("screenreel-webcam".to_string())
            .spawn(move || {
                let stream = match backend.open(index) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(stream.resolution()));
                        stream
                    }
                    Err(e) => {
                        state.running.store(false, Ordering::SeqCst);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_capture_loop(stream, &cache, &state, &shutdown_rx, mirror);
                state.running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.state.running.store(false, Ordering::SeqCst);
                ReelError::device(format!("Failed to spawn webcam thread: {}", e))
            })?;

        match ready_rx.recv() {
            Ok(Ok((width, height))) => {
                info!("Webcam {} streaming at {}x{}", index, width, height);
                self.resolution = Some((width, height));
                self.shutdown_tx = Some(shutdown_tx);
                self.thread = Some(thread);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(match e {
                    ReelError::DeviceUnavailable(_) => e,
                    other => ReelError::device(other.to_string()),
                })
            }
            Err(_) => {
                let _ = thread.join();
                self.state.running.store(false, Ordering::SeqCst);
                Err(ReelError::device("Webcam thread exited during startup"))
            }
        }
    }

    /// Stop the acquisition loop and join it. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Webcam thread panicked");
            }
            debug!("Webcam loop stopped");
        }
        self.state.running.store(false, Ordering::SeqCst);
    }

    /// Stop the loop, then forget the device and cached frame. Idempotent.
    pub fn cleanup(&mut self) {
        self.stop();
        self.device_index = None;
        self.resolution = None;
        self.cache.clear();
    }

    /// Whether the acquisition loop is alive
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
            && self
                .thread
                .as_ref()
                .map(|t| !t.is_finished())
                .unwrap_or(false)
    }

    /// Negotiated size of the running camera
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    /// Why the loop gave up, if it did
    pub fn failure(&self) -> Option<String> {
        self.state.failure.lock().clone()
    }

    /// Copy of the most recent frame
    pub fn get_frame(&self) -> Option<Frame> {
        self.cache.load()
    }

    /// Copy the most recent frame into `out` without allocating
    pub fn copy_frame_into(&self, out: &mut Frame) -> bool {
        self.cache.copy_into(out)
    }

    /// Frames acquired since creation
    pub fn frames_acquired(&self) -> u64 {
        self.cache.updates()
    }

    /// Join a loop that exited on its own
    fn reap(&mut self) {
        self.shutdown_tx = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn run_capture_loop(
    mut stream: Box<dyn CameraStream>,
    cache: &FrameCache,
    state: &LoopState,
    shutdown_rx: &mpsc::Receiver<()>,
    mirror: bool,
) {
    let mut frame = Frame::default();
    let mut consecutive_errors = 0u32;

    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match stream.read_frame(&mut frame) {
            Ok(true) => {
                consecutive_errors = 0;
                if mirror {
                    mirror_horizontal(&mut frame);
                }
                cache.store(&frame);
            }
            Ok(false) => std::thread::sleep(EMPTY_SAMPLE_BACKOFF),
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    error!(
                        "Webcam capture failed after {} consecutive errors: {}",
                        consecutive_errors, e
                    );
                    *state.failure.lock() = Some(e.to_string());
                    break;
                }
                if consecutive_errors == 1 || consecutive_errors % 10 == 0 {
                    warn!(
                        "Webcam frame error ({}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                }
                std::thread::sleep(ERROR_RETRY_DELAY);
            }
        }
    }
}

/// Swap R and B while copying RGBA into a BGRA buffer of the same length
pub fn rgba_to_bgra_into(rgba: &[u8], bgra: &mut [u8]) {
    for (src, dst) in rgba
        .chunks_exact(BYTES_PER_PIXEL)
        .zip(bgra.chunks_exact_mut(BYTES_PER_PIXEL))
    {
        dst[0] = src[2];
        dst[1] = src[1];
        dst[2] = src[0];
        dst[3] = src[3];
    }
}

/// Flip a frame left to right in place
pub fn mirror_horizontal(frame: &mut Frame) {
    let width = frame.width as usize;
    let stride = frame.stride();
    if width < 2 || stride == 0 {
        return;
    }
    for row in frame.data.chunks_exact_mut(stride) {
        for x in 0..width / 2 {
            let left = x * BYTES_PER_PIXEL;
            let right = (width - 1 - x) * BYTES_PER_PIXEL;
            for c in 0..BYTES_PER_PIXEL {
                row.swap(left + c, right + c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_to_bgra() {
        let rgba = [10, 20, 30, 40, 50, 60, 70, 80];
        let mut bgra = [0u8; 8];
        rgba_to_bgra_into(&rgba, &mut bgra);
        assert_eq!(bgra, [30, 20, 10, 40, 70, 60, 50, 80]);
    }

    #[test]
    fn test_mirror_horizontal() {
        let mut frame = Frame::from_bgra(
            vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 6],
            3,
            2,
        );
        mirror_horizontal(&mut frame);
        assert_eq!(frame.pixel(0, 0), Some([3, 3, 3, 3]));
        assert_eq!(frame.pixel(1, 0), Some([2, 2, 2, 2]));
        assert_eq!(frame.pixel(2, 1), Some([4, 4, 4, 4]));
    }

    #[test]
    fn test_cache_latest_wins() {
        let cache = FrameCache::new();
        let mut out = Frame::default();
        assert!(!cache.copy_into(&mut out));

        cache.store(&Frame::black(2, 2));
        cache.store(&Frame::from_bgra(vec![9; 16], 2, 2));
        assert!(cache.copy_into(&mut out));
        assert_eq!(out.pixel(1, 1), Some([9, 9, 9, 9]));
        assert_eq!(cache.updates(), 2);

        cache.clear();
        assert!(cache.load().is_none());
    }
}
