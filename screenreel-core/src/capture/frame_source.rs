//! Duplication-based screen grabber
//!
//! `FrameSource` owns a duplication channel and a CPU-readable staging
//! surface. The channel is told which crop is wanted so it can read back
//! only that rectangle; each capture then copies the clamped, even-aligned
//! crop out of the staging surface into a caller-owned `Frame`.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::error::{ReelError, Result};
use crate::types::{CaptureRegion, CropRect, Frame, Point, BYTES_PER_PIXEL};

/// How long a capture waits for the next desktop update
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

/// CPU-side copy of the last duplicated desktop image
///
/// Holds either the whole output or, when the channel reads back only the
/// requested crop, just that rectangle. Reallocated only when its size
/// changes.
#[derive(Debug, Default)]
pub struct StagingSurface {
    data: Vec<u8>,
    width: u32,
    height: u32,
    /// Position of the surface inside the output; zero for a full frame
    x: u32,
    y: u32,
    cropped: bool,
    recreations: u64,
}

impl StagingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writable storage for a full `width`×`height` BGRA output image
    pub fn prepare(&mut self, width: u32, height: u32) -> &mut [u8] {
        self.x = 0;
        self.y = 0;
        self.cropped = false;
        self.ensure(width, height)
    }

    /// Writable storage for the `crop` rectangle of the output
    pub fn prepare_crop(&mut self, crop: CropRect) -> &mut [u8] {
        self.x = crop.x;
        self.y = crop.y;
        self.cropped = true;
        self.ensure(crop.width, crop.height)
    }

    fn ensure(&mut self, width: u32, height: u32) -> &mut [u8] {
        if self.data.is_empty() || self.width != width || self.height != height {
            debug!(
                "Recreating staging surface: {}x{} -> {}x{}",
                self.width, self.height, width, height
            );
            self.data = vec![0; Frame::byte_len_for(width, height)];
            self.width = width;
            self.height = height;
            self.recreations += 1;
        }
        &mut self.data
    }

    /// Whether the surface holds only a crop of the output
    pub fn is_cropped(&self) -> bool {
        self.cropped
    }

    /// The rectangle of the output this surface holds
    pub fn rect(&self) -> CropRect {
        CropRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of times the surface has been (re)allocated
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    fn release(&mut self) {
        self.data = Vec::new();
        self.width = 0;
        self.height = 0;
        self.x = 0;
        self.y = 0;
        self.cropped = false;
    }
}

/// Opens duplication channels on a display
pub trait ScreenBackend: Send {
    /// Open exclusive duplication of monitor `monitor`
    fn open(&mut self, monitor: usize) -> Result<Box<dyn DuplicationChannel>>;
}

/// A live duplication channel
pub trait DuplicationChannel {
    /// Native size of the duplicated output
    fn dimensions(&self) -> (u32, u32);

    /// Desktop coordinates of the output's top-left corner
    fn desktop_origin(&self) -> Point {
        Point::default()
    }

    /// Wait up to `timeout` for a desktop update and copy it into `staging`
    ///
    /// `crop` is the part of the output the caller will use. A channel may
    /// read back just that rectangle with `StagingSurface::prepare_crop`, or
    /// the whole output with `StagingSurface::prepare`.
    ///
    /// Timeout yields `ReelError::NoNewFrame`; an invalidated channel yields
    /// `ReelError::AcquisitionLost`.
    fn acquire_next_frame(
        &mut self,
        timeout: Duration,
        crop: Option<CropRect>,
        staging: &mut StagingSurface,
    ) -> Result<()>;
}

/// Screen grabber with region cropping
pub struct FrameSource {
    backend: Box<dyn ScreenBackend>,
    monitor: usize,
    channel: Option<Box<dyn DuplicationChannel>>,
    staging: StagingSurface,
    region: CaptureRegion,
    frames_captured: u64,
}

impl FrameSource {
    pub fn new(backend: Box<dyn ScreenBackend>) -> Self {
        Self {
            backend,
            monitor: 0,
            channel: None,
            staging: StagingSurface::new(),
            region: CaptureRegion::FULL,
            frames_captured: 0,
        }
    }

    /// Select the monitor used by the next `initialize`
    pub fn set_monitor(&mut self, monitor: usize) {
        self.monitor = monitor;
    }

    /// Acquire the duplication channel. No-op when already initialized.
    pub fn initialize(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Ok(());
        }

        let channel = self.backend.open(self.monitor).map_err(|e| match e {
            ReelError::AcquisitionUnavailable(_) => e,
            other => ReelError::acquisition(other.to_string()),
        })?;

        let (width, height) = channel.dimensions();
        info!(
            "Screen duplication opened on monitor {} ({}x{} at {})",
            self.monitor,
            width,
            height,
            channel.desktop_origin()
        );
        self.channel = Some(channel);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.channel.is_some()
    }

    /// Change the crop used by later captures
    pub fn set_region(&mut self, region: CaptureRegion) {
        if region != self.region {
            debug!("Capture region set to {}", region);
        }
        self.region = region;
    }

    pub fn region(&self) -> CaptureRegion {
        self.region
    }

    /// Native output size, if initialized
    pub fn native_dimensions(&self) -> Option<(u32, u32)> {
        self.channel.as_ref().map(|c| c.dimensions())
    }

    /// Crop for the current region against the channel's native size
    pub fn crop(&self) -> Result<CropRect> {
        let channel = self.channel()?;
        let (width, height) = channel.dimensions();
        self.crop_for(channel.desktop_origin(), width, height)
    }

    /// Output frame size without capturing
    pub fn planned_dimensions(&self) -> Result<(u32, u32)> {
        self.crop().map(|c| (c.width, c.height))
    }

    /// Desktop coordinates of the crop's top-left
    pub fn capture_origin(&self) -> Point {
        let Some(channel) = self.channel.as_ref() else {
            return Point::new(self.region.left, self.region.top);
        };
        let origin = channel.desktop_origin();
        match self.crop() {
            Ok(crop) => Point::new(origin.x + crop.x as i32, origin.y + crop.y as i32),
            Err(_) => origin,
        }
    }

    /// Staging surface allocations so far
    pub fn staging_recreations(&self) -> u64 {
        self.staging.recreations()
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    /// Capture the next desktop update into `out`
    ///
    /// `out` is resized only when the crop size changes.
    pub fn capture_frame(&mut self, out: &mut Frame) -> Result<()> {
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| ReelError::acquisition("Frame source is not initialized"))?;

        let origin = channel.desktop_origin();
        let (nw, nh) = channel.dimensions();
        let hint = self.region.clamp_to(origin, nw, nh);
        channel.acquire_next_frame(ACQUIRE_TIMEOUT, hint, &mut self.staging)?;

        let held = self.staging.rect();
        let crop = if self.staging.is_cropped() {
            held
        } else {
            self.crop_for(origin, held.width, held.height)?
        };
        if crop.x < held.x
            || crop.y < held.y
            || crop.x + crop.width > held.x + held.width
            || crop.y + crop.height > held.y + held.height
        {
            return Err(ReelError::AcquisitionLost(format!(
                "Staged area {:?} does not cover crop {:?}",
                held, crop
            )));
        }

        if out.width != crop.width || out.height != crop.height {
            out.resize(crop.width, crop.height);
        }

        let src_stride = held.width as usize * BYTES_PER_PIXEL;
        let row_bytes = crop.width as usize * BYTES_PER_PIXEL;
        let (dx, dy) = ((crop.x - held.x) as usize, (crop.y - held.y) as usize);
        let src = self.staging.data();
        for (row, dst) in out.data.chunks_exact_mut(row_bytes).enumerate() {
            let start = (dy + row) * src_stride + dx * BYTES_PER_PIXEL;
            dst.copy_from_slice(&src[start..start + row_bytes]);
        }

        self.frames_captured += 1;
        trace!("Captured frame {} ({}x{})", self.frames_captured, crop.width, crop.height);
        Ok(())
    }

    /// Drop and reopen the duplication channel
    pub fn reinitialize(&mut self) -> Result<()> {
        warn!("Reinitializing screen duplication");
        self.channel = None;
        self.initialize()
    }

    /// Release the duplication channel and staging surface. Idempotent.
    pub fn cleanup(&mut self) {
        if self.channel.take().is_some() {
            debug!("Screen duplication released");
        }
        self.staging.release();
    }

    fn channel(&self) -> Result<&dyn DuplicationChannel> {
        self.channel
            .as_deref()
            .ok_or_else(|| ReelError::acquisition("Frame source is not initialized"))
    }

    fn crop_for(&self, origin: Point, width: u32, height: u32) -> Result<CropRect> {
        self.region.clamp_to(origin, width, height).ok_or_else(|| {
            ReelError::config(format!(
                "Capture region {} does not overlap the {}x{} display",
                self.region, width, height
            ))
        })
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.cleanup();
    }
}
