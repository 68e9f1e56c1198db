//! Core types for ScreenReel
//!
//! These types represent the fundamental data structures shared by the
//! capture sources, the compositor and the encoder sink.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes per BGRA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Global handle counter for unique session IDs
static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Create a new unique handle
    pub fn new() -> Self {
        Self(HANDLE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// A point in desktop or frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate into the coordinate space whose origin is `origin`
    pub fn relative_to(self, origin: Point) -> Point {
        Point::new(
            self.x.saturating_sub(origin.x),
            self.y.saturating_sub(origin.y),
        )
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An owned BGRA8 frame, stride = width * 4 with no padding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Create an opaque black frame
    pub fn black(width: u32, height: u32) -> Self {
        let mut frame = Self::default();
        frame.resize(width, height);
        frame.fill([0, 0, 0, 255]);
        frame
    }

    /// Create a frame from existing BGRA bytes
    pub fn from_bgra(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), Self::byte_len_for(width, height));
        Self {
            data,
            width,
            height,
        }
    }

    /// Byte length of a packed BGRA frame of the given size
    pub fn byte_len_for(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// Row stride in bytes
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Whether the frame holds no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Change dimensions, reusing the existing allocation when it is large enough
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.resize(Self::byte_len_for(width, height), 0);
    }

    /// Fill every pixel with one BGRA value
    pub fn fill(&mut self, bgra: [u8; 4]) {
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&bgra);
        }
    }

    /// Copy another frame's content into this one without reallocating
    /// when the sizes already match
    pub fn copy_from(&mut self, other: &Frame) {
        if self.width != other.width || self.height != other.height {
            self.resize(other.width, other.height);
        }
        self.data.copy_from_slice(&other.data);
    }

    /// BGRA value at (x, y), if inside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        let px = self.data.get(idx..idx + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// A capture rectangle in desktop coordinates
///
/// The all-zero value is the sentinel for "the whole output".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl CaptureRegion {
    /// The full-output sentinel
    pub const FULL: CaptureRegion = CaptureRegion {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from an origin and a size
    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(
            x,
            y,
            x.saturating_add(width as i32),
            y.saturating_add(height as i32),
        )
    }

    /// Whether this is the full-output sentinel
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// A non-sentinel region must have positive extent
    pub fn is_valid(&self) -> bool {
        self.is_full() || (self.right > self.left && self.bottom > self.top)
    }

    /// Clamp to an output of `width`×`height` whose top-left sits at
    /// `origin` in desktop coordinates, rounding the size down to even.
    ///
    /// Returns `None` when nothing of the region remains on the output.
    pub fn clamp_to(&self, origin: Point, width: u32, height: u32) -> Option<CropRect> {
        let (w, h) = (i64::from(width), i64::from(height));
        let (x0, y0, x1, y1) = if self.is_full() {
            (0, 0, w, h)
        } else {
            (
                (i64::from(self.left) - i64::from(origin.x)).clamp(0, w),
                (i64::from(self.top) - i64::from(origin.y)).clamp(0, h),
                (i64::from(self.right) - i64::from(origin.x)).clamp(0, w),
                (i64::from(self.bottom) - i64::from(origin.y)).clamp(0, h),
            )
        };

        let crop_w = (x1 - x0).max(0) as u32 & !1;
        let crop_h = (y1 - y0).max(0) as u32 & !1;
        if crop_w == 0 || crop_h == 0 {
            return None;
        }

        Some(CropRect {
            x: x0 as u32,
            y: y0 as u32,
            width: crop_w,
            height: crop_h,
        })
    }
}

impl std::fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_full() {
            write!(f, "full screen")
        } else {
            write!(
                f,
                "{}x{} at ({}, {})",
                self.right - self.left,
                self.bottom - self.top,
                self.left,
                self.top
            )
        }
    }
}

impl std::str::FromStr for CaptureRegion {
    type Err = String;

    /// Parse `full` or `x,y,width,height`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("full") {
            return Ok(Self::FULL);
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("Invalid region '{}': expected x,y,width,height", s));
        }

        let x: i32 = parts[0].parse().map_err(|_| format!("Invalid x: {}", parts[0]))?;
        let y: i32 = parts[1].parse().map_err(|_| format!("Invalid y: {}", parts[1]))?;
        let width: u32 = parts[2]
            .parse()
            .map_err(|_| format!("Invalid width: {}", parts[2]))?;
        let height: u32 = parts[3]
            .parse()
            .map_err(|_| format!("Invalid height: {}", parts[3]))?;

        if width == 0 || height == 0 {
            return Err("Region width and height must be positive".to_string());
        }

        Ok(Self::from_origin_size(x, y, width, height))
    }
}

/// A crop rectangle relative to the duplicated output's top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where the webcam picture-in-picture goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipPlacement {
    /// Desired position in desktop coordinates
    pub anchor: Point,
    /// Same position relative to the capture origin
    pub relative: Point,
}

impl PipPlacement {
    /// Derive the frame-relative placement for a capture origin
    pub fn new(anchor: Point, capture_origin: Point) -> Self {
        Self {
            anchor,
            relative: anchor.relative_to(capture_origin),
        }
    }
}

/// Direction of an audio endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFlow {
    /// A capture device such as a microphone
    Capture,
    /// A render device tapped in loopback (system audio)
    Render,
}

impl std::fmt::Display for AudioFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capture => write!(f, "capture"),
            Self::Render => write!(f, "render"),
        }
    }
}

/// Identity of an audio endpoint, handed to the encoder at session start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEndpointDescriptor {
    /// Friendly device name the encoder can open directly
    pub name: String,
    pub flow: AudioFlow,
    /// Channel count of the default format, if known
    pub channels: Option<u16>,
    /// Sample rate of the default format, if known
    pub sample_rate: Option<u32>,
}

impl std::fmt::Display for AudioEndpointDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.flow)?;
        if let (Some(rate), Some(channels)) = (self.sample_rate, self.channels) {
            write!(f, " {}Hz, {} channels", rate, channels)?;
        }
        Ok(())
    }
}

/// Pointer position and primary-button state in desktop coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerState {
    pub position: Point,
    pub primary_pressed: bool,
}
