//! Color-bar palette and per-format pixel packing.
use smallvec::SmallVec;

use framefeed_core::prelude::*;

/// One palette entry: `R, G, B` or `Y, Cb, Cr` depending on the format.
pub type PaletteEntry = [u8; 3];

/// Eight-entry palette in bar order.
pub type Palette = [PaletteEntry; 8];

/// Packed bytes of a single pixel; length is the format's bytes per pixel.
pub type PackedPixel = SmallVec<[u8; 4]>;

/// White, yellow, cyan, green, magenta, red, blue, black at full amplitude.
pub const COLOR_BARS: Palette = [
    [0xFF, 0xFF, 0xFF],
    [0xFF, 0xFF, 0x00],
    [0x00, 0xFF, 0xFF],
    [0x00, 0xFF, 0x00],
    [0xFF, 0x00, 0xFF],
    [0xFF, 0x00, 0x00],
    [0x00, 0x00, 0xFF],
    [0x00, 0x00, 0x00],
];

/// Fixed-point BT.601 limited-range RGB → YCbCr.
///
/// Intermediates are signed 32-bit with an arithmetic right shift; the result
/// is truncated to eight bits.
///
/// # Example
/// ```rust
/// use framefeed_capture::colorbar::rgb_to_ycbcr;
///
/// assert_eq!(rgb_to_ycbcr([0xFF, 0xFF, 0xFF]), [235, 128, 128]);
/// assert_eq!(rgb_to_ycbcr([0x00, 0x00, 0x00]), [16, 128, 128]);
/// ```
pub fn rgb_to_ycbcr([r, g, b]: PaletteEntry) -> PaletteEntry {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let y = ((16829 * r + 33039 * g + 6416 * b + 32768) >> 16) + 16;
    let cb = ((-9714 * r - 19070 * g + 28784 * b + 32768) >> 16) + 128;
    let cr = ((28784 * r - 24103 * g - 4681 * b + 32768) >> 16) + 128;
    [y as u8, cb as u8, cr as u8]
}

/// Convert the canonical bars into the final per-format palette.
///
/// Sub-byte RGB formats are first reduced to their native channel widths;
/// luma/chroma formats go through [`rgb_to_ycbcr`]. No further conversion
/// happens when packing.
pub fn build_palette(format: &PixelFormat) -> Palette {
    COLOR_BARS.map(|[r, g, b]| {
        let native = match format.packing {
            Packing::Rgb565 { .. } => [r >> 3, g >> 2, b >> 3],
            Packing::Rgb555 { .. } => [r >> 3, g >> 3, b >> 3],
            _ => [r, g, b],
        };
        if format.is_yuv {
            rgb_to_ycbcr(native)
        } else {
            native
        }
    })
}

/// Pack one palette entry into the byte layout of `format`.
///
/// `odd` selects the second pixel of a 4:2:2 pair (which carries the other
/// chroma sample). `alpha` feeds the alpha byte of the 32-bit formats and the
/// top bit of the 555 formats.
///
/// # Example
/// ```rust
/// use framefeed_capture::colorbar::{build_palette, pack_pixel};
/// use framefeed_core::prelude::{FourCc, PixelFormat};
///
/// let fmt = PixelFormat::lookup(FourCc::YUYV).unwrap();
/// let white = build_palette(fmt)[0];
/// assert_eq!(pack_pixel(fmt, white, 0, false).as_slice(), &[235, 128]);
/// ```
pub fn pack_pixel(format: &PixelFormat, entry: PaletteEntry, alpha: u8, odd: bool) -> PackedPixel {
    let [c0, c1, c2] = entry;
    let mut px = PackedPixel::new();
    match format.packing {
        Packing::Yuv422(order) => {
            // c0 = Y, c1 = Cb (U), c2 = Cr (V)
            let (y, u, v) = (c0, c1, c2);
            match order {
                ChromaOrder::Yuyv => px.extend([y, if odd { v } else { u }]),
                ChromaOrder::Uyvy => px.extend([if odd { v } else { u }, y]),
                ChromaOrder::Yvyu => px.extend([y, if odd { u } else { v }]),
                ChromaOrder::Vyuy => px.extend([if odd { u } else { v }, y]),
            }
        }
        Packing::Rgb565 { big_endian } => {
            let (r, g, b) = (c0, c1, c2);
            let lo = (g << 5) | b;
            let hi = (r << 3) | (g >> 3);
            px.extend(if big_endian { [hi, lo] } else { [lo, hi] });
        }
        Packing::Rgb555 { big_endian } => {
            let (r, g, b) = (c0, c1, c2);
            let lo = (g << 5) | b;
            let hi = (alpha & 0x80) | (r << 2) | (g >> 3);
            px.extend(if big_endian { [hi, lo] } else { [lo, hi] });
        }
        Packing::Rgb24 { bgr: false } => px.extend([c0, c1, c2]),
        Packing::Rgb24 { bgr: true } => px.extend([c2, c1, c0]),
        Packing::Rgb32 { bgr: false } => px.extend([alpha, c0, c1, c2]),
        Packing::Rgb32 { bgr: true } => px.extend([c2, c1, c0, alpha]),
    }
    debug_assert_eq!(px.len(), format.bytes_per_pixel());
    px
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(fourcc: FourCc) -> &'static PixelFormat {
        PixelFormat::lookup(fourcc).unwrap()
    }

    #[test]
    fn packed_length_matches_depth_for_every_format() {
        for fmt in PixelFormat::catalog() {
            let palette = build_palette(fmt);
            for entry in palette {
                for odd in [false, true] {
                    assert_eq!(
                        pack_pixel(fmt, entry, 0xFF, odd).len(),
                        fmt.depth as usize / 8,
                        "{}",
                        fmt.fourcc
                    );
                }
            }
        }
    }

    #[test]
    fn yuv_palette_is_bit_exact() {
        let palette = build_palette(format(FourCc::YUYV));
        assert_eq!(
            palette,
            [
                [235, 128, 128],
                [210, 16, 146],
                [170, 166, 16],
                [145, 54, 34],
                [106, 202, 222],
                [81, 90, 240],
                [41, 240, 110],
                [16, 128, 128],
            ]
        );
    }

    #[test]
    fn rgb_palettes_reduce_channel_width() {
        assert_eq!(build_palette(format(FourCc::RGB565))[0], [31, 63, 31]);
        assert_eq!(build_palette(format(FourCc::RGB555X))[0], [31, 31, 31]);
        assert_eq!(build_palette(format(FourCc::RGB24))[1], [255, 255, 0]);
    }

    #[test]
    fn chroma_orders_alternate_u_and_v() {
        // yellow: Y=210, U=16, V=146
        let cases: [(FourCc, [u8; 2], [u8; 2]); 4] = [
            (FourCc::YUYV, [210, 16], [210, 146]),
            (FourCc::UYVY, [16, 210], [146, 210]),
            (FourCc::YVYU, [210, 146], [210, 16]),
            (FourCc::VYUY, [146, 210], [16, 210]),
        ];
        for (fourcc, even, odd) in cases {
            let fmt = format(fourcc);
            let yellow = build_palette(fmt)[1];
            assert_eq!(pack_pixel(fmt, yellow, 0, false).as_slice(), &even, "{fourcc}");
            assert_eq!(pack_pixel(fmt, yellow, 0, true).as_slice(), &odd, "{fourcc}");
        }
    }

    #[test]
    fn rgb565_packs_red_and_green() {
        let le = format(FourCc::RGB565);
        let be = format(FourCc::RGB565X);
        let red = build_palette(le)[5];
        let green = build_palette(le)[3];
        assert_eq!(pack_pixel(le, red, 0, false).as_slice(), &[0x00, 0xF8]);
        assert_eq!(pack_pixel(be, red, 0, false).as_slice(), &[0xF8, 0x00]);
        assert_eq!(pack_pixel(le, green, 0, false).as_slice(), &[0xE0, 0x07]);
    }

    #[test]
    fn rgb555_carries_alpha_top_bit() {
        let le = format(FourCc::RGB555);
        let be = format(FourCc::RGB555X);
        let red = build_palette(le)[5];
        assert_eq!(pack_pixel(le, red, 0x00, false).as_slice(), &[0x00, 0x7C]);
        assert_eq!(pack_pixel(le, red, 0x80, false).as_slice(), &[0x00, 0xFC]);
        assert_eq!(pack_pixel(be, red, 0x7F, false).as_slice(), &[0x7C, 0x00]);
    }

    #[test]
    fn rgb32_places_alpha_byte() {
        let rgb = format(FourCc::RGB32);
        let bgr = format(FourCc::BGR32);
        let cyan = [0x00, 0xFF, 0xFF];
        assert_eq!(pack_pixel(rgb, cyan, 0xAA, false).as_slice(), &[0xAA, 0x00, 0xFF, 0xFF]);
        assert_eq!(pack_pixel(bgr, cyan, 0xAA, true).as_slice(), &[0xFF, 0xFF, 0x00, 0xAA]);
    }

    #[test]
    fn rgb24_orders_channels() {
        let magenta_ish = [0x11, 0x22, 0x33];
        assert_eq!(
            pack_pixel(format(FourCc::RGB24), magenta_ish, 0, false).as_slice(),
            &[0x11, 0x22, 0x33]
        );
        assert_eq!(
            pack_pixel(format(FourCc::BGR24), magenta_ish, 0, false).as_slice(),
            &[0x33, 0x22, 0x11]
        );
    }
}
