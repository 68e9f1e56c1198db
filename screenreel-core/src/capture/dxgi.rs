//! DXGI desktop duplication backend

use std::time::Duration;

use tracing::debug;
use windows_capture::dxgi_duplication_api::{DxgiDuplicationApi, Error as DxgiError};
use windows_capture::monitor::Monitor;

use super::frame_source::{DuplicationChannel, ScreenBackend, StagingSurface};
use crate::error::{ReelError, Result};
use crate::types::CropRect;

/// Opens DXGI duplication on a monitor (0 = primary)
#[derive(Debug, Default)]
pub struct DxgiScreen;

impl ScreenBackend for DxgiScreen {
    fn open(&mut self, monitor: usize) -> Result<Box<dyn DuplicationChannel>> {
        let target = if monitor == 0 {
            Monitor::primary()
                .map_err(|e| ReelError::acquisition(format!("No primary monitor: {}", e)))?
        } else {
            let monitors = Monitor::enumerate().map_err(|e| {
                ReelError::acquisition(format!("Failed to enumerate monitors: {}", e))
            })?;
            monitors
                .get(monitor)
                .cloned()
                .ok_or_else(|| ReelError::acquisition(format!("Monitor {} not found", monitor)))?
        };

        let api = DxgiDuplicationApi::new(target).map_err(|e| {
            ReelError::acquisition(format!("Failed to create DXGI duplication: {:?}", e))
        })?;
        debug!("DXGI duplication created ({}x{})", api.width(), api.height());

        Ok(Box::new(DxgiChannel {
            api,
            scratch: Vec::new(),
        }))
    }
}

struct DxgiChannel {
    api: DxgiDuplicationApi,
    /// Reused by `as_nopadding_buffer` when the mapped rows are padded
    scratch: Vec<u8>,
}

impl DuplicationChannel for DxgiChannel {
    fn dimensions(&self) -> (u32, u32) {
        (self.api.width(), self.api.height())
    }

    fn acquire_next_frame(
        &mut self,
        timeout: Duration,
        crop: Option<CropRect>,
        staging: &mut StagingSurface,
    ) -> Result<()> {
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let (width, height) = (self.api.width(), self.api.height());
        // Only a strict sub-rectangle is worth a cropped readback
        let crop = crop.filter(|c| {
            (c.width, c.height) != (width, height)
                && c.x + c.width <= width
                && c.y + c.height <= height
        });

        match self.api.acquire_next_frame(timeout_ms) {
            Ok(mut frame) => {
                let mapped = match crop {
                    Some(c) => frame.buffer_crop(c.x, c.y, c.x + c.width, c.y + c.height),
                    None => frame.buffer(),
                };
                let buffer = mapped.map_err(|e| {
                    ReelError::AcquisitionLost(format!("Failed to map desktop frame: {:?}", e))
                })?;
                let pixels = buffer.as_nopadding_buffer(&mut self.scratch);

                let dst = match crop {
                    Some(c) => staging.prepare_crop(c),
                    None => staging.prepare(width, height),
                };
                if pixels.len() != dst.len() {
                    return Err(ReelError::AcquisitionLost(format!(
                        "Desktop frame is {} bytes, expected {}",
                        pixels.len(),
                        dst.len()
                    )));
                }
                dst.copy_from_slice(pixels);
                Ok(())
            }
            Err(DxgiError::Timeout) => Err(ReelError::NoNewFrame),
            Err(DxgiError::AccessLost) => Err(ReelError::AcquisitionLost(
                "Desktop duplication access lost".to_string(),
            )),
            Err(e) => Err(ReelError::AcquisitionLost(format!("{:?}", e))),
        }
    }
}
