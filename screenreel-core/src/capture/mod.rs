//! Capture sources
//!
//! This module handles:
//! - Desktop duplication with region cropping
//! - Webcam acquisition on a background thread
//! - Default audio endpoint discovery
//! - Pointer position and button polling
//!
//! Each source sits behind a trait; the Windows implementations are compiled
//! only on Windows.

pub mod audio;
pub mod frame_source;
pub mod pointer;
pub mod webcam;

#[cfg(windows)]
pub mod dxgi;
#[cfg(windows)]
pub mod nokhwa_camera;

pub use audio::DeviceAudioResolver;
pub use frame_source::{
    DuplicationChannel, FrameSource, ScreenBackend, StagingSurface, ACQUIRE_TIMEOUT,
};
pub use pointer::PointerSource;
pub use webcam::{CameraBackend, CameraStream, FrameCache, WebcamSource};

#[cfg(windows)]
pub use audio::CpalAudioResolver;
#[cfg(windows)]
pub use dxgi::DxgiScreen;
#[cfg(windows)]
pub use nokhwa_camera::NokhwaCameras;
#[cfg(windows)]
pub use pointer::DeviceQueryPointer;
