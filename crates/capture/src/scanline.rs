//! Cached reference scanline holding the double color-bar pattern.
use std::ops::Range;

use smallvec::SmallVec;

use framefeed_core::prelude::*;

use crate::colorbar::{Palette, build_palette, pack_pixel};

/// Number of bar segments across the cached line (two periods of eight).
pub const SEGMENTS: usize = 16;

/// Pre-packed scanline reused for every row of every frame.
///
/// The line spans `2 * width` pixels: two full eight-bar periods. Any
/// horizontal shift in `[0, width)` therefore leaves a complete `width`
/// pixel window to copy from.
///
/// # Example
/// ```rust
/// use framefeed_capture::scanline::Scanline;
/// use framefeed_core::prelude::{FourCc, PixelFormat};
///
/// let fmt = PixelFormat::lookup(FourCc::RGB24).unwrap();
/// let line = Scanline::rebuild(fmt, 64, 0);
/// assert_eq!(line.row(0).len(), 64 * 3);
/// assert_eq!(&line.row(0)[..3], &[0xFF, 0xFF, 0xFF]);
/// ```
#[derive(Debug, Clone)]
pub struct Scanline {
    line: Vec<u8>,
    width: usize,
    bytes_per_pixel: usize,
    palette: Palette,
}

/// Pixel range covered by `segment` for a frame `width` pixels wide.
///
/// Both ends are rounded down to an even column so 4:2:2 pairs never
/// straddle a bar edge.
pub fn segment_bounds(width: usize, segment: usize) -> Range<usize> {
    let start = segment * width / 8 / 2 * 2;
    let end = (segment + 1) * width / 8 / 2 * 2;
    start..end
}

impl Scanline {
    /// Pack the palette of `format` into a fresh line for `width`.
    pub fn rebuild(format: &PixelFormat, width: u32, alpha: u8) -> Self {
        let width = width as usize;
        let bytes_per_pixel = format.bytes_per_pixel();
        let palette = build_palette(format);
        let mut line = vec![0u8; 2 * width * bytes_per_pixel];

        for segment in 0..SEGMENTS {
            let entry = palette[segment % palette.len()];
            let mut pair: SmallVec<[u8; 8]> = pack_pixel(format, entry, alpha, false)
                .into_iter()
                .collect();
            pair.extend(pack_pixel(format, entry, alpha, true));

            let pixels = segment_bounds(width, segment);
            let bytes = &mut line[pixels.start * bytes_per_pixel..pixels.end * bytes_per_pixel];
            for unit in bytes.chunks_exact_mut(pair.len()) {
                unit.copy_from_slice(&pair);
            }
        }

        Self {
            line,
            width,
            bytes_per_pixel,
            palette,
        }
    }

    /// One visible row starting `shift` pixels into the pattern.
    ///
    /// The shift wraps at the frame width and odd values round down to the
    /// even column.
    pub fn row(&self, shift: usize) -> &[u8] {
        let shift = (shift % self.width) & !1;
        let start = shift * self.bytes_per_pixel;
        &self.line[start..start + self.width * self.bytes_per_pixel]
    }

    /// Entire cached line (`2 * width` pixels).
    pub fn as_bytes(&self) -> &[u8] {
        &self.line
    }

    /// Palette the line was packed from.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}
