//! Threaded recorder handle
//!
//! `Recorder` runs a `RecordingEngine` on its own thread. Commands travel
//! over a channel and are handled between ticks, so every device is opened
//! and torn down on the engine thread.

use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::backend::Backends;
use crate::config::RecordingSettings;
use crate::engine::{EngineEvent, EngineState, PipAnchor, RecordingEngine, SessionInfo};
use crate::error::{ReelError, Result};
use crate::session::SessionSummary;
use crate::types::Frame;

/// Start, stop and pause requests
pub trait RecordingControl {
    fn start(&self, settings: RecordingSettings) -> Result<SessionInfo>;
    fn stop(&self) -> Result<Option<SessionSummary>>;
    fn set_paused(&self, paused: bool) -> Result<()>;
}

/// Snapshot of the engine, refreshed after every tick and command
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub state: EngineState,
    pub active_time: Duration,
    pub frames_written: u64,
    pub output_path: Option<PathBuf>,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            state: EngineState::Idle,
            active_time: Duration::ZERO,
            frames_written: 0,
            output_path: None,
        }
    }
}

impl EngineStatus {
    fn capture(engine: &RecordingEngine) -> Self {
        match engine.session() {
            Some(session) => Self {
                state: engine.state(),
                active_time: engine.active_time(),
                frames_written: session.frames_written(),
                output_path: Some(session.output_path().to_path_buf()),
            },
            None => Self::default(),
        }
    }
}

enum Command {
    Start(RecordingSettings, mpsc::Sender<Result<SessionInfo>>),
    Stop(mpsc::Sender<Result<Option<SessionSummary>>>),
    SetPaused(bool, mpsc::Sender<Result<()>>),
    Shutdown,
}

/// Channels handed back by the engine thread once it is up
struct EngineLinks {
    events: broadcast::Sender<EngineEvent>,
    preview: broadcast::Sender<Arc<Frame>>,
    pip_anchor: PipAnchor,
}

/// Handle to a recording engine running on its own thread
pub struct Recorder {
    commands: Option<mpsc::Sender<Command>>,
    thread: Option<JoinHandle<()>>,
    status: Arc<Mutex<EngineStatus>>,
    events: broadcast::Sender<EngineEvent>,
    preview: broadcast::Sender<Arc<Frame>>,
    pip_anchor: PipAnchor,
}

impl Recorder {
    /// Start the engine thread
    pub fn spawn(backends: Backends) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let status = Arc::new(Mutex::new(EngineStatus::default()));
        let thread_status = status.clone();

        let thread = std::thread::Builder::new()
            .name("screenreel-engine".to_string())
            .spawn(move || {
                let engine = RecordingEngine::new(backends);
                let links = EngineLinks {
                    events: engine.event_sender(),
                    preview: engine.preview_sender(),
                    pip_anchor: engine.pip_anchor(),
                };
                if ready_tx.send(links).is_err() {
                    return;
                }
                run_engine_loop(engine, &command_rx, &thread_status);
            })
            .map_err(|e| {
                ReelError::Io(e).with_context("Failed to spawn recording engine thread")
            })?;

        let links = match ready_rx.recv() {
            Ok(links) => links,
            Err(_) => {
                let _ = thread.join();
                return Err(ReelError::EngineStopped);
            }
        };

        Ok(Self {
            commands: Some(command_tx),
            thread: Some(thread),
            status,
            events: links.events,
            preview: links.preview,
            pip_anchor: links.pip_anchor,
        })
    }

    /// Latest engine snapshot
    pub fn status(&self) -> EngineStatus {
        self.status.lock().clone()
    }

    pub fn pip_anchor(&self) -> PipAnchor {
        self.pip_anchor.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_preview(&self) -> broadcast::Receiver<Arc<Frame>> {
        self.preview.subscribe()
    }

    /// Stop any session and join the engine thread. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Shutdown);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Recording engine thread panicked");
            }
        }
    }

    fn request<T>(&self, make: impl FnOnce(mpsc::Sender<Result<T>>) -> Command) -> Result<T> {
        let commands = self.commands.as_ref().ok_or(ReelError::EngineStopped)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        commands
            .send(make(reply_tx))
            .map_err(|_| ReelError::EngineStopped)?;
        reply_rx.recv().map_err(|_| ReelError::EngineStopped)?
    }
}

impl RecordingControl for Recorder {
    fn start(&self, settings: RecordingSettings) -> Result<SessionInfo> {
        self.request(|reply| Command::Start(settings, reply))
    }

    fn stop(&self) -> Result<Option<SessionSummary>> {
        self.request(Command::Stop)
    }

    fn set_paused(&self, paused: bool) -> Result<()> {
        self.request(|reply| Command::SetPaused(paused, reply))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_engine_loop(
    mut engine: RecordingEngine,
    commands: &mpsc::Receiver<Command>,
    status: &Mutex<EngineStatus>,
) {
    loop {
        // Block while idle; poll between ticks otherwise
        let command = if engine.state() == EngineState::Idle {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        } else {
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        };

        // Status is published before the reply goes out
        match command {
            Some(Command::Start(settings, reply)) => {
                let result = engine.start(settings);
                *status.lock() = EngineStatus::capture(&engine);
                let _ = reply.send(result);
            }
            Some(Command::Stop(reply)) => {
                let result = engine.stop();
                *status.lock() = EngineStatus::capture(&engine);
                let _ = reply.send(result);
            }
            Some(Command::SetPaused(paused, reply)) => {
                let result = engine.set_paused(paused);
                *status.lock() = EngineStatus::capture(&engine);
                let _ = reply.send(result);
            }
            Some(Command::Shutdown) => break,
            None => {
                if let Err(e) = engine.tick() {
                    warn!("Recording ended: {}", e);
                }
                *status.lock() = EngineStatus::capture(&engine);
            }
        }
    }

    if let Err(e) = engine.stop() {
        error!("Failed to stop recording during shutdown: {}", e);
    }
    *status.lock() = EngineStatus::default();
    debug!("Recording engine thread exiting");
}
