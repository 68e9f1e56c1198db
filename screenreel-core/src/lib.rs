//! ScreenReel Core Library
//!
//! Screen recording with webcam picture-in-picture and pointer feedback.
//!
//! This library provides:
//! - Desktop duplication capture with region cropping
//! - Background webcam acquisition and nearest-neighbour PIP compositing
//! - Cursor and click-highlight overlays
//! - Fixed-rate pacing with stale-frame reuse into an ffmpeg subprocess
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │  FrameSource    │───▶│  Compositor  │───▶│  EncoderSink    │
//! │ (Desktop Dup.)  │    │ (overlay.rs) │    │ (ffmpeg stdin)  │
//! └─────────────────┘    └──────▲───────┘    └────────▲────────┘
//!                               │                     │
//!                      ┌────────┴────────┐   ┌────────┴────────┐
//!                      │  WebcamSource   │   │  Audio endpoint │
//!                      │ (own thread)    │   │ (name only)     │
//!                      └─────────────────┘   └─────────────────┘
//! ```

pub mod backend;
pub mod capture;
pub mod clock;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod overlay;
pub mod recorder;
pub mod session;
pub mod types;

pub use backend::Backends;
pub use config::{AudioMode, ConfigFile, RecordingSettings, Resolution, WebcamSettings};
pub use engine::{EngineEvent, EngineState, PipAnchor, RecordingEngine, SessionInfo, TickOutcome};
pub use error::{ReelError, Result};
pub use recorder::{EngineStatus, Recorder, RecordingControl};
pub use session::SessionSummary;
pub use types::{AudioEndpointDescriptor, AudioFlow, CaptureRegion, Frame, Handle, Point};
