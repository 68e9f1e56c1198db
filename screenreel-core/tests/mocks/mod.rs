//! Mock infrastructure for testing
//!
//! Scriptable stand-ins for every engine collaborator, plus a manual clock
//! so pacing can be checked without sleeping.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use screenreel_core::backend::Backends;
use screenreel_core::capture::{
    CameraBackend, CameraStream, DeviceAudioResolver, DuplicationChannel, PointerSource,
    ScreenBackend, StagingSurface,
};
use screenreel_core::clock::Clock;
use screenreel_core::config::{RecordingSettings, Resolution};
use screenreel_core::encode::{EncoderParams, EncoderSink};
use screenreel_core::engine::RecordingEngine;
use screenreel_core::error::{ReelError, Result};
use screenreel_core::types::{AudioEndpointDescriptor, AudioFlow, CropRect, Frame, PointerState};

/// Create a frame with a solid BGRA color
pub fn solid_frame(width: u32, height: u32, color: [u8; 4]) -> Frame {
    let mut frame = Frame::black(width, height);
    frame.fill(color);
    frame
}

/// Settings with every overlay off, writing into `dir`
pub fn plain_settings(dir: &std::path::Path) -> RecordingSettings {
    RecordingSettings::default()
        .with_output_dir(dir)
        .with_resolution(Resolution::Native)
        .with_cursor(false)
        .with_highlight(false)
}

// ---------------------------------------------------------------------------
// Screen
// ---------------------------------------------------------------------------

/// What the next `acquire_next_frame` call does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenStep {
    /// Deliver the current color at the current size
    Fresh,
    /// Time out with `NoNewFrame`
    Unchanged,
    /// Fail with `AcquisitionLost`
    Lost,
    /// Change the desktop size, then deliver
    Resize(u32, u32),
    /// Change the color, then deliver
    Paint([u8; 4]),
}

#[derive(Debug)]
pub struct ScreenState {
    pub width: u32,
    pub height: u32,
    pub color: [u8; 4],
    pub script: VecDeque<ScreenStep>,
    /// Used once the script runs out
    pub default_step: ScreenStep,
    pub opens: u32,
    pub fail_open: bool,
    pub acquisitions: u64,
    /// Read back only the requested crop, like the DXGI channel
    pub crop_readback: bool,
    /// Paint each pixel as [x, y, 0, 255] in output coordinates instead of `color`
    pub gradient: bool,
    /// Crop requested by the last acquisition
    pub last_crop: Option<CropRect>,
}

pub type SharedScreen = Arc<Mutex<ScreenState>>;

pub struct MockScreen {
    state: SharedScreen,
}

impl MockScreen {
    pub fn new(width: u32, height: u32, color: [u8; 4]) -> (Self, SharedScreen) {
        let state = Arc::new(Mutex::new(ScreenState {
            width,
            height,
            color,
            script: VecDeque::new(),
            default_step: ScreenStep::Fresh,
            opens: 0,
            fail_open: false,
            acquisitions: 0,
            crop_readback: false,
            gradient: false,
            last_crop: None,
        }));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl ScreenBackend for MockScreen {
    fn open(&mut self, _monitor: usize) -> Result<Box<dyn DuplicationChannel>> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(ReelError::acquisition("mock duplication refused"));
        }
        state.opens += 1;
        Ok(Box::new(MockChannel {
            state: self.state.clone(),
        }))
    }
}

struct MockChannel {
    state: SharedScreen,
}

impl DuplicationChannel for MockChannel {
    fn dimensions(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.width, state.height)
    }

    fn acquire_next_frame(
        &mut self,
        _timeout: Duration,
        crop: Option<CropRect>,
        staging: &mut StagingSurface,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.acquisitions += 1;
        state.last_crop = crop;
        let step = state.script.pop_front().unwrap_or(state.default_step);
        match step {
            ScreenStep::Unchanged => return Err(ReelError::NoNewFrame),
            ScreenStep::Lost => return Err(ReelError::AcquisitionLost("mock access lost".into())),
            ScreenStep::Resize(width, height) => {
                state.width = width;
                state.height = height;
            }
            ScreenStep::Paint(color) => state.color = color,
            ScreenStep::Fresh => {}
        }

        let (width, height) = (state.width, state.height);
        let readback = crop.filter(|c| {
            state.crop_readback && c.x + c.width <= width && c.y + c.height <= height
        });
        let rect = readback.unwrap_or(CropRect {
            x: 0,
            y: 0,
            width,
            height,
        });
        let (color, gradient) = (state.color, state.gradient);
        let dst = match readback {
            Some(c) => staging.prepare_crop(c),
            None => staging.prepare(width, height),
        };
        for (i, px) in dst.chunks_exact_mut(4).enumerate() {
            if gradient {
                let x = rect.x + i as u32 % rect.width;
                let y = rect.y + i as u32 / rect.width;
                px.copy_from_slice(&[x as u8, y as u8, 0, 255]);
            } else {
                px.copy_from_slice(&color);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CameraState {
    pub devices: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub color: [u8; 4],
    pub fail_open: AtomicBool,
    /// Every read fails while set
    pub fail_reads: AtomicBool,
    pub live_streams: AtomicUsize,
    pub opened_index: Mutex<Option<usize>>,
}

pub struct MockCamera {
    state: Arc<CameraState>,
}

impl MockCamera {
    pub fn new(width: u32, height: u32, color: [u8; 4]) -> (Self, Arc<CameraState>) {
        let devices = vec!["Mock Camera".to_string(), "Mock Capture Card".to_string()];
        Self::with_devices(devices, width, height, color)
    }

    pub fn with_devices(
        devices: Vec<String>,
        width: u32,
        height: u32,
        color: [u8; 4],
    ) -> (Self, Arc<CameraState>) {
        let state = Arc::new(CameraState {
            devices,
            width,
            height,
            color,
            fail_open: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            live_streams: AtomicUsize::new(0),
            opened_index: Mutex::new(None),
        });
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl CameraBackend for MockCamera {
    fn list_devices(&self) -> Result<Vec<String>> {
        Ok(self.state.devices.clone())
    }

    fn open(&self, index: usize) -> Result<Box<dyn CameraStream>> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(ReelError::device("mock camera busy"));
        }
        *self.state.opened_index.lock() = Some(index);
        self.state.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCameraStream {
            state: self.state.clone(),
        }))
    }
}

struct MockCameraStream {
    state: Arc<CameraState>,
}

impl CameraStream for MockCameraStream {
    fn resolution(&self) -> (u32, u32) {
        (self.state.width, self.state.height)
    }

    fn read_frame(&mut self, frame: &mut Frame) -> Result<bool> {
        std::thread::sleep(Duration::from_millis(1));
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(ReelError::device("mock camera unplugged"));
        }
        frame.resize(self.state.width, self.state.height);
        frame.fill(self.state.color);
        Ok(true)
    }
}

impl Drop for MockCameraStream {
    fn drop(&mut self) {
        self.state.live_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Audio and pointer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MockAudio {
    pub capture: Option<String>,
    pub render: Option<String>,
}

impl MockAudio {
    pub fn with_devices() -> Self {
        Self {
            capture: Some("Microphone (Mock)".to_string()),
            render: Some("Speakers (Mock)".to_string()),
        }
    }
}

impl DeviceAudioResolver for MockAudio {
    fn resolve(&self, flow: AudioFlow) -> Result<AudioEndpointDescriptor> {
        let name = match flow {
            AudioFlow::Capture => self.capture.clone(),
            AudioFlow::Render => self.render.clone(),
        }
        .ok_or_else(|| ReelError::NoAudioDevice(format!("no {} endpoint", flow)))?;
        Ok(AudioEndpointDescriptor {
            name,
            flow,
            channels: Some(2),
            sample_rate: Some(48000),
        })
    }

    fn list(&self, flow: AudioFlow) -> Result<Vec<String>> {
        Ok(self.resolve(flow).map(|d| vec![d.name]).unwrap_or_default())
    }
}

pub type SharedPointer = Arc<Mutex<PointerState>>;

pub struct MockPointer {
    state: SharedPointer,
}

impl MockPointer {
    pub fn new() -> (Self, SharedPointer) {
        let state = Arc::new(Mutex::new(PointerState::default()));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl PointerSource for MockPointer {
    fn pointer(&self) -> PointerState {
        *self.state.lock()
    }
}

// ---------------------------------------------------------------------------
// Encoder sink
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SinkRecord {
    pub starts: Vec<EncoderParams>,
    pub frames: Vec<Vec<u8>>,
    pub finish_calls: u32,
    pub running: bool,
    pub fail_start: bool,
    /// Fail the write after this many frames have been accepted
    pub fail_write_after: Option<usize>,
}

pub type SharedSink = Arc<Mutex<SinkRecord>>;

pub struct MockSink {
    record: SharedSink,
}

impl MockSink {
    pub fn new() -> (Self, SharedSink) {
        let record = Arc::new(Mutex::new(SinkRecord::default()));
        (
            Self {
                record: record.clone(),
            },
            record,
        )
    }
}

impl EncoderSink for MockSink {
    fn start(&mut self, params: &EncoderParams) -> Result<()> {
        let mut record = self.record.lock();
        if record.fail_start {
            return Err(ReelError::SpawnFailed("mock encoder missing".into()));
        }
        record.starts.push(params.clone());
        record.frames.clear();
        record.running = true;
        Ok(())
    }

    fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        let mut record = self.record.lock();
        if !record.running {
            return Err(ReelError::sink_closed("mock sink not running"));
        }
        if record.fail_write_after == Some(record.frames.len()) {
            return Err(ReelError::sink_closed("mock pipe broken"));
        }
        record.frames.push(data.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut record = self.record.lock();
        record.finish_calls += 1;
        record.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.record.lock().running
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Clock that only moves when slept on or advanced
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// One engine wired to mocks, with handles to inspect them
pub struct Harness {
    pub screen: SharedScreen,
    pub camera: Arc<CameraState>,
    pub pointer: SharedPointer,
    pub sink: SharedSink,
    pub clock: Arc<ManualClock>,
    backends: Option<Backends>,
}

impl Harness {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_audio(width, height, MockAudio::with_devices())
    }

    pub fn with_audio(width: u32, height: u32, audio: MockAudio) -> Self {
        let (screen, screen_state) = MockScreen::new(width, height, [40, 80, 120, 255]);
        let (camera, camera_state) = MockCamera::new(8, 6, [0, 0, 255, 255]);
        let (pointer, pointer_state) = MockPointer::new();
        let (sink, sink_record) = MockSink::new();
        let clock = ManualClock::new();

        let backends = Backends {
            screen: Box::new(screen),
            camera: Arc::new(camera),
            audio: Box::new(audio),
            pointer: Box::new(pointer),
            encoder: Box::new(sink),
            clock: clock.clone(),
        };

        Self {
            screen: screen_state,
            camera: camera_state,
            pointer: pointer_state,
            sink: sink_record,
            clock,
            backends: Some(backends),
        }
    }

    /// Take the backends; panics if already taken
    pub fn backends(&mut self) -> Backends {
        self.backends.take().expect("backends already taken")
    }

    pub fn engine(&mut self) -> RecordingEngine {
        RecordingEngine::new(self.backends())
    }

    pub fn frames_written(&self) -> usize {
        self.sink.lock().frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_millis(40));
        assert_eq!(clock.now() - start, Duration::from_millis(40));
        clock.sleep_until(start);
        assert_eq!(clock.elapsed(), Duration::from_millis(40));
    }

    #[test]
    fn test_solid_frame() {
        let frame = solid_frame(3, 2, [1, 2, 3, 4]);
        assert_eq!(frame.data.len(), 24);
        assert_eq!(frame.pixel(2, 1), Some([1, 2, 3, 4]));
    }
}
