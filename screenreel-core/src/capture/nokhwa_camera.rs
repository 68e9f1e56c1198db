//! Media Foundation webcam backend via nokhwa

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{debug, info};

use super::webcam::{rgba_to_bgra_into, CameraBackend, CameraStream};
use crate::error::{ReelError, Result};
use crate::types::Frame;

/// Enumerates and opens cameras through nokhwa
#[derive(Debug, Default)]
pub struct NokhwaCameras;

impl CameraBackend for NokhwaCameras {
    fn list_devices(&self) -> Result<Vec<String>> {
        let cameras = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| ReelError::device(format!("Failed to enumerate webcams: {}", e)))?;
        Ok(cameras.iter().map(|info| info.human_name()).collect())
    }

    fn open(&self, index: usize) -> Result<Box<dyn CameraStream>> {
        let camera_index = CameraIndex::Index(
            u32::try_from(index).map_err(|_| ReelError::device("Webcam index out of range"))?,
        );
        let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);

        let mut camera = Camera::new(camera_index, requested)
            .map_err(|e| ReelError::device(format!("Failed to open webcam: {}", e)))?;
        camera
            .open_stream()
            .map_err(|e| ReelError::device(format!("Failed to open webcam stream: {}", e)))?;

        let resolution = camera.resolution();
        info!(
            "Camera opened: {} ({}x{})",
            camera.info().human_name(),
            resolution.width(),
            resolution.height()
        );

        Ok(Box::new(NokhwaStream {
            camera,
            width: resolution.width(),
            height: resolution.height(),
        }))
    }
}

struct NokhwaStream {
    camera: Camera,
    width: u32,
    height: u32,
}

impl CameraStream for NokhwaStream {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_frame(&mut self, frame: &mut Frame) -> Result<bool> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| ReelError::device(format!("Webcam read failed: {}", e)))?;
        if buffer.buffer().is_empty() {
            return Ok(false);
        }

        let image = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| ReelError::device(format!("Webcam decode failed: {}", e)))?;
        let (width, height) = (image.width(), image.height());
        let rgba = image.as_raw();
        if rgba.len() != Frame::byte_len_for(width, height) {
            return Ok(false);
        }

        if frame.width != width || frame.height != height {
            frame.resize(width, height);
        }
        rgba_to_bgra_into(rgba, &mut frame.data);
        Ok(true)
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            debug!("Webcam stream stop failed: {}", e);
        }
    }
}
