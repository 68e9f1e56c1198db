//! Recording engine
//!
//! Owns the session state machine and the per-tick pipeline:
//!
//! ```text
//!   Idle ──start──▶ Recording ◀──resume── Paused
//!    ▲                 │  └──────pause─────▶ │
//!    └──────stop───────┴─────────stop────────┘
//! ```
//!
//! Every tick captures one desktop frame (or reuses the last one), draws the
//! pointer overlays and webcam picture-in-picture, writes exactly one frame
//! to the encoder sink and then sleeps until the next slot. The engine is
//! driven from a single thread; see `Recorder` for the threaded handle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::backend::Backends;
use crate::capture::{DeviceAudioResolver, FrameSource, PointerSource, WebcamSource};
use crate::clock::Clock;
use crate::config::RecordingSettings;
use crate::encode::{AudioInput, EncoderParams, EncoderSink};
use crate::error::{ReelError, Result};
use crate::overlay::{composite_pip, draw_cursor, draw_highlight, Color};
use crate::session::{output_path_for, RecordingSession, SessionSummary};
use crate::types::{AudioEndpointDescriptor, Frame, Handle, PipPlacement, Point};

/// Sleep between polls while paused
pub const PAUSED_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Frames between progress log lines
const PROGRESS_LOG_FRAMES: u64 = 300;

const EVENT_CAPACITY: usize = 32;
const PREVIEW_CAPACITY: usize = 4;

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No session
    Idle,
    /// Frames are being captured and encoded
    Recording,
    /// Session open, no frames produced
    Paused,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Recording => write!(f, "recording"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Click highlight radius and color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightStyle {
    pub radius: u32,
    pub color: Color,
}

impl HighlightStyle {
    /// Primary button held
    pub const PRESSED: Self = Self {
        radius: 30,
        color: Color::rgba(255, 0, 0, 150),
    };

    /// Pointer idle
    pub const IDLE: Self = Self {
        radius: 25,
        color: Color::rgba(255, 255, 0, 100),
    };

    pub fn for_pointer(pressed: bool) -> Self {
        if pressed { Self::PRESSED } else { Self::IDLE }
    }
}

/// Notifications published by the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Started {
        handle: Handle,
        output_path: std::path::PathBuf,
        width: u32,
        height: u32,
    },
    Paused {
        handle: Handle,
    },
    Resumed {
        handle: Handle,
        paused_for: Duration,
    },
    Stopped(SessionSummary),
    /// The session was torn down after an encoder write failed
    Failed {
        handle: Handle,
        error: String,
    },
    /// The webcam loop died; recording continues without the PIP
    WebcamLost {
        reason: String,
    },
}

/// Result of one `tick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session
    Idle,
    /// Paused; no frame produced
    Paused,
    /// One frame written. `reused` is set when no fresh desktop frame was
    /// available and the previous one was repeated.
    Written { reused: bool },
}

/// Shared, live-updatable PIP position in desktop coordinates
pub type PipAnchor = Arc<Mutex<Point>>;

/// What `start` set up
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub handle: Handle,
    pub output_path: std::path::PathBuf,
    pub width: u32,
    pub height: u32,
    pub audio: Option<AudioEndpointDescriptor>,
    /// Negotiated webcam size, when the webcam is composited
    pub webcam: Option<(u32, u32)>,
}

/// Capture-compose-stream state machine
pub struct RecordingEngine {
    frame_source: FrameSource,
    webcam: WebcamSource,
    audio: Box<dyn DeviceAudioResolver>,
    pointer: Box<dyn PointerSource>,
    sink: Box<dyn EncoderSink>,
    clock: Arc<dyn Clock>,

    session: Option<RecordingSession>,
    webcam_active: bool,
    size_mismatch_logged: bool,

    /// Last good desktop frame, reused when no new one arrives
    raw: Frame,
    /// Capture target, swapped into `raw` on success
    capture: Frame,
    /// Composited frame handed to the sink
    output: Frame,
    webcam_frame: Frame,

    pip_anchor: PipAnchor,
    events: broadcast::Sender<EngineEvent>,
    preview: broadcast::Sender<Arc<Frame>>,
}

impl RecordingEngine {
    pub fn new(backends: Backends) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (preview, _) = broadcast::channel(PREVIEW_CAPACITY);
        Self {
            frame_source: FrameSource::new(backends.screen),
            webcam: WebcamSource::new(backends.camera),
            audio: backends.audio,
            pointer: backends.pointer,
            sink: backends.encoder,
            clock: backends.clock,
            session: None,
            webcam_active: false,
            size_mismatch_logged: false,
            raw: Frame::default(),
            capture: Frame::default(),
            output: Frame::default(),
            webcam_frame: Frame::default(),
            pip_anchor: Arc::new(Mutex::new(Point::default())),
            events,
            preview,
        }
    }

    /// Begin a session
    ///
    /// On failure everything started so far is released and the engine
    /// stays Idle, so a later `start` can succeed.
    pub fn start(&mut self, settings: RecordingSettings) -> Result<SessionInfo> {
        if self.session.is_some() {
            return Err(ReelError::SessionAlreadyRunning);
        }
        settings.validate()?;

        std::fs::create_dir_all(&settings.output_dir).map_err(|e| {
            ReelError::from(e).with_context(format!(
                "Failed to create output directory {}",
                settings.output_dir.display()
            ))
        })?;

        match self.start_inner(settings) {
            Ok(info) => Ok(info),
            Err(e) => {
                error!("Failed to start recording: {}", e);
                self.release_devices();
                Err(e)
            }
        }
    }

    fn start_inner(&mut self, settings: RecordingSettings) -> Result<SessionInfo> {
        self.frame_source.set_monitor(settings.monitor);
        self.frame_source.initialize()?;
        self.frame_source.set_region(settings.region);
        let (width, height) = self.frame_source.planned_dimensions()?;

        let audio = match settings.audio.flow() {
            Some(flow) => {
                let endpoint = self.audio.resolve(flow)?;
                info!("Audio endpoint: {}", endpoint);
                Some(endpoint)
            }
            None => None,
        };

        let webcam = if settings.webcam.enabled {
            self.webcam.set_mirror(settings.webcam.mirror);
            self.webcam.initialize(settings.webcam.device_index)?;
            self.webcam.start()?;
            *self.pip_anchor.lock() = settings.webcam.anchor;
            self.webcam_active = true;
            self.webcam.resolution()
        } else {
            None
        };

        self.probe_first_frame(width, height);
        let (width, height) = (self.raw.width, self.raw.height);

        let output_path =
            output_path_for(&settings.output_dir, chrono::Local::now().naive_local());
        let params = EncoderParams {
            output_path: output_path.clone(),
            width,
            height,
            fps: settings.fps,
            audio: audio.as_ref().map(AudioInput::from),
            scale: settings.resolution.scale_target(),
            options: settings.encoder.clone(),
        };
        self.sink.start(&params).map_err(|e| match e {
            ReelError::EncoderStartFailed(_) => e,
            other => ReelError::encoder_start(other.to_string()),
        })?;

        self.size_mismatch_logged = false;
        let session = RecordingSession::new(
            settings,
            output_path.clone(),
            width,
            height,
            self.clock.now(),
        );
        let handle = session.handle();
        self.session = Some(session);

        info!(
            "{} recording {}x{} to {}",
            handle,
            width,
            height,
            output_path.display()
        );
        self.emit(EngineEvent::Started {
            handle,
            output_path: output_path.clone(),
            width,
            height,
        });

        Ok(SessionInfo {
            handle,
            output_path,
            width,
            height,
            audio,
            webcam,
        })
    }

    /// Capture one frame to fix the session size, or fall back to a black
    /// frame of the planned size
    fn probe_first_frame(&mut self, width: u32, height: u32) {
        match self.frame_source.capture_frame(&mut self.raw) {
            Ok(()) => return,
            Err(e) if e.is_soft() => {
                debug!("No desktop update during probe, starting from black");
            }
            Err(e) => {
                warn!("Probe capture failed: {}", e);
                if matches!(e.root(), ReelError::AcquisitionLost(_)) {
                    if let Err(e) = self.frame_source.reinitialize() {
                        warn!("Reinitialize after probe failed: {}", e);
                    }
                }
            }
        }
        self.raw = Frame::black(width, height);
    }

    /// Produce one output slot
    ///
    /// Blocks until the slot's deadline. Returns an error only when the
    /// encoder rejected the frame; the session is torn down by then.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let Some(session) = self.session.as_ref() else {
            return Ok(TickOutcome::Idle);
        };
        if session.is_paused() {
            self.clock.sleep(PAUSED_POLL_INTERVAL);
            return Ok(TickOutcome::Paused);
        }

        let deadline = session.next_deadline();
        let (width, height) = session.dimensions();
        let settings = session.settings();
        let (show_cursor, show_highlight) = (settings.show_cursor, settings.show_highlight);
        let pip_fraction = settings.webcam.height_fraction;

        let reused = self.capture_into_raw(width, height);
        self.output.copy_from(&self.raw);

        let origin = self.frame_source.capture_origin();
        if show_cursor || show_highlight {
            let pointer = self.pointer.pointer();
            let position = pointer.position.relative_to(origin);
            if show_highlight {
                let style = HighlightStyle::for_pointer(pointer.primary_pressed);
                draw_highlight(
                    &mut self.output.data,
                    width,
                    height,
                    position,
                    style.radius,
                    style.color,
                );
            }
            if show_cursor {
                draw_cursor(&mut self.output.data, width, height, position);
            }
        }

        if self.webcam_active {
            self.composite_webcam(origin, width, height, pip_fraction);
        }

        if let Err(e) = self.sink.write_frame(&self.output.data) {
            self.fail_session(&e);
            return Err(e);
        }

        let Some(session) = self.session.as_mut() else {
            return Ok(TickOutcome::Idle);
        };
        session.record_frame(reused);
        if session.frames_written() % PROGRESS_LOG_FRAMES == 0 {
            debug!(
                "{}: {} frames written ({} reused), active {:.1}s",
                session.handle(),
                session.frames_written(),
                session.frames_reused(),
                session.active_time(self.clock.now()).as_secs_f64()
            );
        }

        self.clock.sleep_until(deadline);
        Ok(TickOutcome::Written { reused })
    }

    /// Refresh `raw` from the desktop. Returns true when `raw` was reused.
    fn capture_into_raw(&mut self, width: u32, height: u32) -> bool {
        match self.frame_source.capture_frame(&mut self.capture) {
            Ok(()) if self.capture.width == width && self.capture.height == height => {
                std::mem::swap(&mut self.raw, &mut self.capture);
                false
            }
            Ok(()) => {
                if !self.size_mismatch_logged {
                    warn!(
                        "Desktop frame is now {}x{}, session is {}x{}; repeating last frame",
                        self.capture.width, self.capture.height, width, height
                    );
                    self.size_mismatch_logged = true;
                }
                true
            }
            Err(e) if e.is_soft() => true,
            Err(e) if matches!(e.root(), ReelError::AcquisitionLost(_)) => {
                warn!("{}", e);
                if let Err(e) = self.frame_source.reinitialize() {
                    warn!("Screen duplication could not be reopened: {}", e);
                }
                true
            }
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                true
            }
        }
    }

    fn composite_webcam(&mut self, origin: Point, width: u32, height: u32, fraction: f64) {
        if self.webcam.copy_frame_into(&mut self.webcam_frame) {
            let placement = PipPlacement::new(*self.pip_anchor.lock(), origin);
            composite_pip(
                &mut self.output.data,
                width,
                height,
                &self.webcam_frame.data,
                self.webcam_frame.width,
                self.webcam_frame.height,
                placement.relative,
                fraction,
            );
            if self.preview.receiver_count() > 0 {
                let _ = self.preview.send(Arc::new(self.webcam_frame.clone()));
            }
        }

        if !self.webcam.is_running() {
            let reason = self
                .webcam
                .failure()
                .unwrap_or_else(|| "acquisition loop exited".to_string());
            warn!("Webcam lost, continuing without it: {}", reason);
            self.webcam_active = false;
            self.emit(EngineEvent::WebcamLost { reason });
        }
    }

    fn fail_session(&mut self, cause: &ReelError) {
        let Some(session) = self.session.take() else {
            return;
        };
        let handle = session.handle();
        error!(
            "{}: encoder write failed after {} frames, stopping: {}",
            handle,
            session.frames_written(),
            cause
        );

        if let Err(e) = self.sink.finish() {
            warn!("Encoder finish after failure: {}", e);
        }
        self.release_devices();
        self.emit(EngineEvent::Failed {
            handle,
            error: cause.to_string(),
        });
    }

    /// Pause the active session. No-op when already paused.
    pub fn pause(&mut self) -> Result<()> {
        let now = self.clock.now();
        let session = self.session.as_mut().ok_or(ReelError::NoActiveSession)?;
        if session.pause(now) {
            let handle = session.handle();
            info!("{} paused", handle);
            self.emit(EngineEvent::Paused { handle });
        }
        Ok(())
    }

    /// Resume the active session. No-op when not paused.
    pub fn resume(&mut self) -> Result<()> {
        let now = self.clock.now();
        let session = self.session.as_mut().ok_or(ReelError::NoActiveSession)?;
        if let Some(paused_for) = session.resume(now) {
            let handle = session.handle();
            info!("{} resumed after {:.1}s", handle, paused_for.as_secs_f64());
            self.emit(EngineEvent::Resumed { handle, paused_for });
        }
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        if paused { self.pause() } else { self.resume() }
    }

    /// End the session and finalize the encoder
    ///
    /// Returns `None` when there was nothing to stop.
    pub fn stop(&mut self) -> Result<Option<SessionSummary>> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        let summary = session.summary(self.clock.now());

        self.webcam.cleanup();
        self.webcam_active = false;
        let finished = self.sink.finish();
        self.frame_source.cleanup();

        info!(
            "{} stopped: {} frames ({} reused), {:.1}s active, {}",
            summary.handle,
            summary.frames_written,
            summary.frames_reused,
            summary.active_time.as_secs_f64(),
            summary.output_path.display()
        );
        self.emit(EngineEvent::Stopped(summary.clone()));

        finished
            .map(|()| Some(summary))
            .map_err(|e| e.with_context("Failed to finalize the recording"))
    }

    fn release_devices(&mut self) {
        self.webcam.cleanup();
        self.webcam_active = false;
        self.frame_source.cleanup();
    }

    fn emit(&self, event: EngineEvent) {
        // Err only means nobody is subscribed
        let _ = self.events.send(event);
    }

    pub fn state(&self) -> EngineState {
        match &self.session {
            None => EngineState::Idle,
            Some(s) if s.is_paused() => EngineState::Paused,
            Some(_) => EngineState::Recording,
        }
    }

    /// Recorded time excluding pauses; zero when Idle
    pub fn active_time(&self) -> Duration {
        self.session
            .as_ref()
            .map(|s| s.active_time(self.clock.now()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Whether the webcam is still being composited
    pub fn webcam_active(&self) -> bool {
        self.webcam_active
    }

    /// Handle for moving the PIP while recording
    pub fn pip_anchor(&self) -> PipAnchor {
        self.pip_anchor.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<EngineEvent> {
        self.events.clone()
    }

    pub(crate) fn preview_sender(&self) -> broadcast::Sender<Arc<Frame>> {
        self.preview.clone()
    }

    /// Webcam frames for display; published only while someone listens
    pub fn subscribe_preview(&self) -> broadcast::Receiver<Arc<Frame>> {
        self.preview.subscribe()
    }
}

impl Drop for RecordingEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop recording on drop: {}", e);
        }
    }
}
