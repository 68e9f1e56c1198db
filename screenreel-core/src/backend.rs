//! Platform backend bundle
//!
//! The engine never talks to an OS API directly. Everything it touches is
//! handed over in a `Backends` value, so tests can swap in mocks.

use std::sync::Arc;

use crate::capture::{CameraBackend, DeviceAudioResolver, PointerSource, ScreenBackend};
use crate::clock::Clock;
use crate::encode::EncoderSink;
use crate::error::Result;

/// Collaborators of one `RecordingEngine`
pub struct Backends {
    pub screen: Box<dyn ScreenBackend>,
    pub camera: Arc<dyn CameraBackend>,
    pub audio: Box<dyn DeviceAudioResolver>,
    pub pointer: Box<dyn PointerSource>,
    pub encoder: Box<dyn EncoderSink>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Desktop duplication, Media Foundation webcams, WASAPI endpoints and
    /// an ffmpeg subprocess
    #[cfg(windows)]
    pub fn native() -> Result<Self> {
        use crate::capture::{CpalAudioResolver, DeviceQueryPointer, DxgiScreen, NokhwaCameras};
        use crate::clock::SystemClock;
        use crate::encode::FfmpegSink;

        Ok(Self {
            screen: Box::new(DxgiScreen),
            camera: Arc::new(NokhwaCameras),
            audio: Box::new(CpalAudioResolver),
            pointer: Box::new(DeviceQueryPointer),
            encoder: Box::new(FfmpegSink::new()),
            clock: Arc::new(SystemClock),
        })
    }

    #[cfg(not(windows))]
    pub fn native() -> Result<Self> {
        Err(crate::error::ReelError::Unsupported(format!(
            "screen recording is only available on Windows (running on {})",
            std::env::consts::OS
        )))
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
