//! Configuration types for ScreenReel
//!
//! Provides the settings snapshot handed to the engine at session start,
//! resolution presets and encoder options.

mod file;

pub use file::{sample_config, ConfigFile};

use crate::encode::ScaleTarget;
use crate::error::{ReelError, Result};
use crate::types::{AudioFlow, CaptureRegion, Point};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default output frame rate
pub const DEFAULT_FPS: u32 = 30;

/// Default PIP height as a fraction of the screen frame height
pub const DEFAULT_PIP_FRACTION: f64 = 0.2;

/// Output resolution preset
///
/// Presets fix the output height and let the encoder pick an even width
/// that preserves the captured aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Encode at the captured size
    Native,
    /// 1080 lines
    #[serde(rename = "1080p")]
    P1080,
    /// 720 lines (default)
    #[default]
    #[serde(rename = "720p")]
    P720,
    /// 480 lines
    #[serde(rename = "480p")]
    P480,
    /// Explicit output size
    Custom { width: u32, height: u32 },
}

impl Resolution {
    /// Scale filter target for the encoder, `None` for native size
    pub fn scale_target(&self) -> Option<ScaleTarget> {
        match self {
            Self::Native => None,
            Self::P1080 => Some(ScaleTarget::height(1080)),
            Self::P720 => Some(ScaleTarget::height(720)),
            Self::P480 => Some(ScaleTarget::height(480)),
            Self::Custom { width, height } => Some(ScaleTarget::exact(*width, *height)),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::P1080 => write!(f, "1080p"),
            Self::P720 => write!(f, "720p"),
            Self::P480 => write!(f, "480p"),
            Self::Custom { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "source" => Ok(Self::Native),
            "1080p" | "1080" => Ok(Self::P1080),
            "720p" | "720" => Ok(Self::P720),
            "480p" | "480" => Ok(Self::P480),
            other => {
                let (w, h) = other
                    .split_once('x')
                    .ok_or_else(|| format!("Unknown resolution: {}", s))?;
                let width = w
                    .parse()
                    .map_err(|_| format!("Invalid resolution width: {}", w))?;
                let height = h
                    .parse()
                    .map_err(|_| format!("Invalid resolution height: {}", h))?;
                Ok(Self::Custom { width, height })
            }
        }
    }
}

/// Which audio endpoint the encoder should record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    /// No audio track
    #[default]
    None,
    /// Default capture endpoint
    Microphone,
    /// Default render endpoint in loopback
    System,
}

impl AudioMode {
    /// Endpoint direction to resolve, if audio is requested
    pub fn flow(&self) -> Option<AudioFlow> {
        match self {
            Self::None => None,
            Self::Microphone => Some(AudioFlow::Capture),
            Self::System => Some(AudioFlow::Render),
        }
    }
}

impl std::fmt::Display for AudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Microphone => write!(f, "microphone"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for AudioMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "mic" | "microphone" => Ok(Self::Microphone),
            "system" | "desktop" | "loopback" => Ok(Self::System),
            _ => Err(format!("Unknown audio mode: {}", s)),
        }
    }
}

/// Webcam picture-in-picture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebcamSettings {
    /// Composite the webcam into the recording
    pub enabled: bool,
    /// Camera index; out-of-range values fall back to the first camera
    pub device_index: usize,
    /// PIP top-left in desktop coordinates
    pub anchor: Point,
    /// PIP height as a fraction of the screen frame height
    pub height_fraction: f64,
    /// Flip the webcam image horizontally
    pub mirror: bool,
}

impl Default for WebcamSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            device_index: 0,
            anchor: Point::new(20, 20),
            height_fraction: DEFAULT_PIP_FRACTION,
            mirror: false,
        }
    }
}

/// Encoder subprocess options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderOptions {
    /// Explicit ffmpeg binary; searched for when unset
    pub ffmpeg_path: Option<PathBuf>,
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_codec: String,
    /// Audio bitrate in kbps
    pub audio_bitrate: u32,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: 192,
        }
    }
}

/// Settings snapshot taken at session start
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSettings {
    /// Region to record, `CaptureRegion::FULL` for the whole output
    pub region: CaptureRegion,
    /// Monitor index for the duplication channel
    pub monitor: usize,
    pub resolution: Resolution,
    pub fps: u32,
    pub audio: AudioMode,
    pub webcam: WebcamSettings,
    pub show_cursor: bool,
    pub show_highlight: bool,
    pub output_dir: PathBuf,
    pub encoder: EncoderOptions,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            region: CaptureRegion::FULL,
            monitor: 0,
            resolution: Resolution::default(),
            fps: DEFAULT_FPS,
            audio: AudioMode::default(),
            webcam: WebcamSettings::default(),
            show_cursor: true,
            show_highlight: true,
            output_dir: default_output_dir(),
            encoder: EncoderOptions::default(),
        }
    }
}

/// `<videos>/ScreenReel`, or the current directory when there is no videos folder
pub fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .map(|dir| dir.join("ScreenReel"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl RecordingSettings {
    /// Set the capture region
    pub fn with_region(mut self, region: CaptureRegion) -> Self {
        self.region = region;
        self
    }

    /// Set the monitor index
    pub fn with_monitor(mut self, monitor: usize) -> Self {
        self.monitor = monitor;
        self
    }

    /// Set the output resolution preset
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the output frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the audio mode
    pub fn with_audio(mut self, audio: AudioMode) -> Self {
        self.audio = audio;
        self
    }

    /// Enable the webcam PIP at the given desktop position
    pub fn with_webcam(mut self, device_index: usize, anchor: Point) -> Self {
        self.webcam.enabled = true;
        self.webcam.device_index = device_index;
        self.webcam.anchor = anchor;
        self
    }

    /// Replace all webcam settings
    pub fn with_webcam_settings(mut self, webcam: WebcamSettings) -> Self {
        self.webcam = webcam;
        self
    }

    /// Toggle the cursor glyph
    pub fn with_cursor(mut self, enabled: bool) -> Self {
        self.show_cursor = enabled;
        self
    }

    /// Toggle the click highlight
    pub fn with_highlight(mut self, enabled: bool) -> Self {
        self.show_highlight = enabled;
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the encoder options
    pub fn with_encoder(mut self, encoder: EncoderOptions) -> Self {
        self.encoder = encoder;
        self
    }

    /// Frame interval derived from the frame rate
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.fps.max(1)
    }

    /// Reject settings that cannot produce a recording
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 || self.fps > 240 {
            return Err(ReelError::config(format!(
                "Frame rate {} out of range (1-240)",
                self.fps
            )));
        }

        if !self.region.is_valid() {
            return Err(ReelError::config(format!(
                "Invalid capture region: right/bottom must exceed left/top ({:?})",
                self.region
            )));
        }

        if let Resolution::Custom { width, height } = self.resolution {
            if width == 0 || height == 0 || width > 7680 || height > 4320 {
                return Err(ReelError::config(format!(
                    "Resolution {}x{} out of range",
                    width, height
                )));
            }
        }

        if self.webcam.enabled
            && !(self.webcam.height_fraction > 0.0 && self.webcam.height_fraction <= 1.0)
        {
            return Err(ReelError::config(format!(
                "Webcam size fraction {} must be in (0, 1]",
                self.webcam.height_fraction
            )));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(ReelError::config("Output directory is empty"));
        }

        Ok(())
    }
}
