//! Configuration file loading
//!
//! Loads user configuration from `<config dir>/screenreel/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{
    default_output_dir, AudioMode, EncoderOptions, RecordingSettings, Resolution,
    WebcamSettings, DEFAULT_FPS, DEFAULT_PIP_FRACTION,
};
use crate::error::{ReelError, Result};
use crate::types::{CaptureRegion, Point};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Recording defaults
    #[serde(default)]
    pub recording: RecordingSection,

    /// Webcam picture-in-picture
    #[serde(default)]
    pub webcam: WebcamSection,

    /// Encoder subprocess
    #[serde(default)]
    pub encoder: EncoderSection,
}

/// Default recording settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSection {
    /// Output resolution (native, 1080p, 720p, 480p or WxH)
    #[serde(default = "default_resolution")]
    pub resolution: String,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Audio mode (none, microphone, system)
    #[serde(default = "default_audio")]
    pub audio: String,

    /// Capture region as "x,y,width,height" or "full"
    #[serde(default = "default_region")]
    pub region: String,

    /// Monitor index
    #[serde(default)]
    pub monitor: usize,

    /// Draw the cursor glyph
    #[serde(default = "default_true")]
    pub show_cursor: bool,

    /// Draw the click highlight
    #[serde(default = "default_true")]
    pub show_highlight: bool,

    /// Output directory (empty = Videos/ScreenReel)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Webcam settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebcamSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub device: usize,

    /// PIP position in desktop coordinates
    #[serde(default = "default_pip_x")]
    pub x: i32,

    #[serde(default = "default_pip_y")]
    pub y: i32,

    /// PIP height as a fraction of the recording height
    #[serde(default = "default_pip_fraction")]
    pub size: f64,

    #[serde(default)]
    pub mirror: bool,
}

/// Encoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSection {
    /// Path to ffmpeg (empty = search next to the executable, then PATH)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_encoder_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate in kbps
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: u32,
}

fn default_resolution() -> String {
    "720p".to_string()
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_audio() -> String {
    "none".to_string()
}

fn default_region() -> String {
    "full".to_string()
}

fn default_true() -> bool {
    true
}

fn default_pip_x() -> i32 {
    WebcamSettings::default().anchor.x
}

fn default_pip_y() -> i32 {
    WebcamSettings::default().anchor.y
}

fn default_pip_fraction() -> f64 {
    DEFAULT_PIP_FRACTION
}

fn default_video_codec() -> String {
    EncoderOptions::default().video_codec
}

fn default_encoder_preset() -> String {
    EncoderOptions::default().preset
}

fn default_crf() -> u32 {
    EncoderOptions::default().crf
}

fn default_audio_codec() -> String {
    EncoderOptions::default().audio_codec
}

fn default_audio_bitrate() -> u32 {
    EncoderOptions::default().audio_bitrate
}

impl Default for RecordingSection {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            fps: default_fps(),
            audio: default_audio(),
            region: default_region(),
            monitor: 0,
            show_cursor: true,
            show_highlight: true,
            output_dir: None,
        }
    }
}

impl Default for WebcamSection {
    fn default() -> Self {
        Self {
            enabled: false,
            device: 0,
            x: default_pip_x(),
            y: default_pip_y(),
            size: default_pip_fraction(),
            mirror: false,
        }
    }
}

impl Default for EncoderSection {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            video_codec: default_video_codec(),
            preset: default_encoder_preset(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("screenreel").join("config.toml")
        } else {
            PathBuf::from("screenreel.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelError::config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| ReelError::config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Convert into a validated settings snapshot
    pub fn to_settings(&self) -> Result<RecordingSettings> {
        let rec = &self.recording;
        let resolution: Resolution = rec.resolution.parse().map_err(ReelError::config)?;
        let audio: AudioMode = rec.audio.parse().map_err(ReelError::config)?;
        let region: CaptureRegion = rec.region.parse().map_err(ReelError::config)?;

        let settings = RecordingSettings {
            region,
            monitor: rec.monitor,
            resolution,
            fps: rec.fps,
            audio,
            webcam: WebcamSettings {
                enabled: self.webcam.enabled,
                device_index: self.webcam.device,
                anchor: Point::new(self.webcam.x, self.webcam.y),
                height_fraction: self.webcam.size,
                mirror: self.webcam.mirror,
            },
            show_cursor: rec.show_cursor,
            show_highlight: rec.show_highlight,
            output_dir: rec
                .output_dir
                .clone()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(default_output_dir),
            encoder: EncoderOptions {
                ffmpeg_path: self
                    .encoder
                    .ffmpeg_path
                    .clone()
                    .filter(|p| !p.as_os_str().is_empty()),
                video_codec: self.encoder.video_codec.clone(),
                preset: self.encoder.preset.clone(),
                crf: self.encoder.crf,
                audio_codec: self.encoder.audio_codec.clone(),
                audio_bitrate: self.encoder.audio_bitrate,
            },
        };

        settings.validate()?;
        Ok(settings)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# ScreenReel Configuration

[recording]
# Output resolution: native, 1080p, 720p, 480p or WIDTHxHEIGHT
resolution = "720p"

# Frames per second
fps = 30

# Audio: none, microphone, system
audio = "none"

# Region to record: "full" or "x,y,width,height" in desktop coordinates
region = "full"

# Monitor index (0 = primary)
monitor = 0

# Draw a cursor arrow and a halo that turns red while the left button is held
show_cursor = true
show_highlight = true

# Where recordings go (defaults to Videos/ScreenReel)
# output_dir = "D:/Recordings"

[webcam]
enabled = false
device = 0

# Picture-in-picture position in desktop coordinates
x = 20
y = 20

# PIP height as a fraction of the recording height
size = 0.2

# Flip the webcam horizontally
mirror = false

[encoder]
# Path to ffmpeg (defaults to the executable's directory, then PATH)
# ffmpeg_path = "C:/ffmpeg/bin/ffmpeg.exe"

video_codec = "libx264"
preset = "ultrafast"
crf = 23
audio_codec = "aac"

# Audio bitrate in kbps
audio_bitrate = 192
"#
    .to_string()
}
