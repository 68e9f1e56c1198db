//! Encoder sink
//!
//! This module provides:
//! - The `EncoderSink` boundary the engine writes raw BGRA frames to
//! - An ffmpeg subprocess implementation fed on stdin
//! - Forwarding of the encoder's stderr into tracing

mod ffmpeg;
mod monitor;

pub use ffmpeg::{build_ffmpeg_args, find_ffmpeg, FfmpegSink, FINISH_TIMEOUT};
pub use monitor::{extract_value, is_progress_line};

use std::path::PathBuf;

use crate::config::EncoderOptions;
use crate::error::Result;
use crate::types::{AudioEndpointDescriptor, AudioFlow};

/// Output scale requested from the encoder
///
/// A `None` side is derived by the encoder from the other side, keeping the
/// aspect ratio and an even value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleTarget {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ScaleTarget {
    /// Fixed height, automatic width
    pub const fn height(height: u32) -> Self {
        Self {
            width: None,
            height: Some(height),
        }
    }

    /// Exact output size
    pub const fn exact(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    /// ffmpeg `scale` filter expression
    pub fn filter(&self) -> String {
        let side = |v: Option<u32>| match v {
            Some(v) if v > 0 => v.to_string(),
            _ => "-2".to_string(),
        };
        format!("scale={}:{}:flags=bicubic", side(self.width), side(self.height))
    }
}

/// Audio device the encoder should open itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInput {
    pub device_name: String,
    pub flow: AudioFlow,
}

impl From<&AudioEndpointDescriptor> for AudioInput {
    fn from(endpoint: &AudioEndpointDescriptor) -> Self {
        Self {
            device_name: endpoint.name.clone(),
            flow: endpoint.flow,
        }
    }
}

/// Everything the sink needs to start a session
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderParams {
    pub output_path: PathBuf,
    /// Width of every frame written
    pub width: u32,
    /// Height of every frame written
    pub height: u32,
    pub fps: u32,
    pub audio: Option<AudioInput>,
    pub scale: Option<ScaleTarget>,
    pub options: EncoderOptions,
}

impl EncoderParams {
    /// Bytes per frame handed to `write_frame`
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Consumer of the raw frame stream
pub trait EncoderSink: Send {
    /// Start a new encode. Fails if already running.
    fn start(&mut self, params: &EncoderParams) -> Result<()>;

    /// Write exactly one frame of `width * height * 4` bytes
    ///
    /// Any failure is fatal to the session: the stream is out of sync.
    fn write_frame(&mut self, data: &[u8]) -> Result<()>;

    /// Close the input and let the encoder finalize. No-op when not running.
    fn finish(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;
}
