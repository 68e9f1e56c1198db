//! Error types for ScreenReel

use thiserror::Error;

/// Result type alias using ReelError
pub type Result<T> = std::result::Result<T, ReelError>;

/// Main error type for ScreenReel operations
#[derive(Debug, Error)]
pub enum ReelError {
    /// No adapter, output or duplication interface could be obtained
    #[error("Screen acquisition unavailable: {0}")]
    AcquisitionUnavailable(String),

    /// The capture timeout elapsed without a desktop update
    #[error("No new frame available")]
    NoNewFrame,

    /// The duplication channel was invalidated (desktop switch, mode change)
    #[error("Screen acquisition lost: {0}")]
    AcquisitionLost(String),

    /// Webcam could not be enumerated, opened or negotiated
    #[error("Webcam unavailable: {0}")]
    DeviceUnavailable(String),

    /// No default audio endpoint for the requested flow
    #[error("No audio device: {0}")]
    NoAudioDevice(String),

    /// The encoder sink could not be started
    #[error("Encoder start failed: {0}")]
    EncoderStartFailed(String),

    /// The encoder process could not be created
    #[error("Failed to spawn encoder: {0}")]
    SpawnFailed(String),

    /// The encoder stopped accepting frame bytes
    #[error("Encoder sink closed: {0}")]
    SinkClosed(String),

    /// A frame of the wrong size was handed to the sink
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch {
        /// Bytes the sink expects per frame
        expected: usize,
        /// Bytes that were supplied
        actual: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No recording session is active
    #[error("No active recording session")]
    NoActiveSession,

    /// A recording session is already active
    #[error("Recording session already running")]
    SessionAlreadyRunning,

    /// The engine thread is gone
    #[error("Recording engine has stopped")]
    EngineStopped,

    /// Unsupported operation or platform
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReelError>,
    },
}

impl ReelError {
    /// Create an acquisition-unavailable error
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::AcquisitionUnavailable(msg.into())
    }

    /// Create a webcam device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    /// Create an encoder start error
    pub fn encoder_start(msg: impl Into<String>) -> Self {
        Self::EncoderStartFailed(msg.into())
    }

    /// Create a sink-closed error
    pub fn sink_closed(msg: impl Into<String>) -> Self {
        Self::SinkClosed(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &ReelError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Soft errors are absorbed by the pacing loop and never surfaced
    pub fn is_soft(&self) -> bool {
        matches!(self.root(), Self::NoNewFrame)
    }

    /// Whether the user can fix this without code changes
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::AcquisitionUnavailable(_)
                | Self::DeviceUnavailable(_)
                | Self::NoAudioDevice(_)
                | Self::SpawnFailed(_)
                | Self::EncoderStartFailed(_)
                | Self::Config(_)
                | Self::NoActiveSession
                | Self::SessionAlreadyRunning
        )
    }

    /// A short hint for the user, if one applies
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::AcquisitionUnavailable(_) => Some(
                "Another application may be duplicating the desktop; close it or try again",
            ),
            Self::DeviceUnavailable(_) => {
                Some("Check that a webcam is connected and not in use by another application")
            }
            Self::NoAudioDevice(_) => {
                Some("Connect an audio device or record with audio disabled")
            }
            Self::SpawnFailed(_) | Self::EncoderStartFailed(_) => Some(
                "Make sure ffmpeg is installed, on PATH, or set encoder.ffmpeg_path in config.toml",
            ),
            Self::SinkClosed(_) => Some("The encoder exited early; run with -vv to see its output"),
            Self::Config(_) => Some("Check your config.toml and command-line flags"),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
