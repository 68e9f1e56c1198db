//! Software compositing onto BGRA frames
//!
//! Click highlight, cursor glyph and webcam picture-in-picture. Every
//! function works in place on a packed BGRA buffer (`width * height * 4`
//! bytes), clips to the buffer bounds, never resizes it and never allocates.

use crate::types::{Point, BYTES_PER_PIXEL};

/// Straight-alpha RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Cursor glyph width in pixels
pub const CURSOR_WIDTH: usize = 12;
/// Cursor glyph height in pixels
pub const CURSOR_HEIGHT: usize = 19;

/// Arrow cursor: `B` border (black), `W` fill (white), `.` transparent
const CURSOR_GLYPH: [&[u8; CURSOR_WIDTH]; CURSOR_HEIGHT] = [
    b"B...........",
    b"BB..........",
    b"BWB.........",
    b"BWWB........",
    b"BWWWB.......",
    b"BWWWWB......",
    b"BWWWWWB.....",
    b"BWWWWWWB....",
    b"BWWWWWWWB...",
    b"BWWWWWWWWB..",
    b"BWWWWWBBBB..",
    b"BWWBWWB.....",
    b"BWB.BWWB....",
    b"BB..BWWB....",
    b"B....BWWB...",
    b".....BWWB...",
    b"......BB....",
    b"............",
    b"............",
];

/// Alpha-blend a filled disc centred on `center`
///
/// Pixels with `dx² + dy² <= radius²` are blended as
/// `dst * (1 - a) + src * a` on B, G and R. The alpha byte is left as is.
pub fn draw_highlight(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: Point,
    radius: u32,
    color: Color,
) {
    if width == 0 || height == 0 || frame.len() < width as usize * height as usize * 4 {
        return;
    }

    let r = i64::from(radius);
    let (cx, cy) = (i64::from(center.x), i64::from(center.y));
    let x0 = (cx - r).max(0);
    let x1 = (cx + r).min(i64::from(width) - 1);
    let y0 = (cy - r).max(0);
    let y1 = (cy + r).min(i64::from(height) - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }

    let alpha = f32::from(color.a) / 255.0;
    let inv = 1.0 - alpha;
    let src = [
        f32::from(color.b) * alpha,
        f32::from(color.g) * alpha,
        f32::from(color.r) * alpha,
    ];
    let stride = width as usize * BYTES_PER_PIXEL;
    let r2 = r * r;

    for y in y0..=y1 {
        let dy = y - cy;
        let row = y as usize * stride;
        for x in x0..=x1 {
            let dx = x - cx;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let idx = row + x as usize * BYTES_PER_PIXEL;
            for c in 0..3 {
                frame[idx + c] = (f32::from(frame[idx + c]) * inv + src[c]) as u8;
            }
        }
    }
}

/// Stamp the arrow glyph with its tip at `position`
///
/// Color channels are overwritten; the alpha byte is left as is.
pub fn draw_cursor(frame: &mut [u8], width: u32, height: u32, position: Point) {
    if frame.len() < width as usize * height as usize * 4 {
        return;
    }
    let stride = width as usize * BYTES_PER_PIXEL;

    for (gy, row) in CURSOR_GLYPH.iter().enumerate() {
        let py = i64::from(position.y) + gy as i64;
        if py < 0 || py >= i64::from(height) {
            continue;
        }
        for (gx, &cell) in row.iter().enumerate() {
            let value = match cell {
                b'B' => 0,
                b'W' => 255,
                _ => continue,
            };
            let px = i64::from(position.x) + gx as i64;
            if px < 0 || px >= i64::from(width) {
                continue;
            }
            let idx = py as usize * stride + px as usize * BYTES_PER_PIXEL;
            frame[idx..idx + 3].fill(value);
        }
    }
}

/// Size of the PIP rectangle for a screen and webcam size
///
/// Height is `floor(screen_height * fraction)`; width keeps the webcam's
/// aspect ratio using integer division.
pub fn pip_size(
    screen_height: u32,
    pip_width: u32,
    pip_height: u32,
    height_fraction: f64,
) -> (u32, u32) {
    if pip_width == 0 || pip_height == 0 || !(height_fraction > 0.0) {
        return (0, 0);
    }
    // Epsilon keeps exact fractions such as 0.2 * 1000 from flooring to 199
    let target_h = (f64::from(screen_height) * height_fraction + 1e-6).floor();
    let target_h = target_h.clamp(0.0, f64::from(u32::MAX)) as u64;
    let target_w = u64::from(pip_width) * target_h / u64::from(pip_height);
    (
        u32::try_from(target_w).unwrap_or(u32::MAX),
        target_h as u32,
    )
}

/// Nearest-neighbour blit of a webcam frame onto the screen frame
///
/// The PIP's top-left lands on `origin` (frame-relative, may be negative or
/// past the edge). Destination pixel `(x, y)` samples source
/// `(x * pw / target_w, y * ph / target_h)`. Pixels outside
/// `[0, sw) x [0, sh)` are skipped. The copy is opaque with alpha forced
/// to 255.
#[allow(clippy::too_many_arguments)]
pub fn composite_pip(
    screen: &mut [u8],
    sw: u32,
    sh: u32,
    pip: &[u8],
    pw: u32,
    ph: u32,
    origin: Point,
    height_fraction: f64,
) {
    if screen.len() < sw as usize * sh as usize * 4 || pip.len() < pw as usize * ph as usize * 4
    {
        return;
    }

    let (target_w, target_h) = pip_size(sh, pw, ph, height_fraction);
    if target_w == 0 || target_h == 0 {
        return;
    }

    let (ox, oy) = (i64::from(origin.x), i64::from(origin.y));
    let x_start = (-ox).max(0);
    let x_end = (i64::from(sw) - ox).min(i64::from(target_w));
    let y_start = (-oy).max(0);
    let y_end = (i64::from(sh) - oy).min(i64::from(target_h));
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let screen_stride = sw as usize * BYTES_PER_PIXEL;
    let pip_stride = pw as usize * BYTES_PER_PIXEL;
    let (pw, ph) = (u64::from(pw), u64::from(ph));
    let (tw, th) = (u64::from(target_w), u64::from(target_h));

    for y in y_start..y_end {
        let src_y = (y as u64 * ph / th) as usize;
        let src_row = src_y * pip_stride;
        let dst_row = (oy + y) as usize * screen_stride;

        for x in x_start..x_end {
            let src_x = (x as u64 * pw / tw) as usize;
            let s = src_row + src_x * BYTES_PER_PIXEL;
            let d = dst_row + (ox + x) as usize * BYTES_PER_PIXEL;
            screen[d..d + 3].copy_from_slice(&pip[s..s + 3]);
            screen[d + 3] = 255;
        }
    }
}
