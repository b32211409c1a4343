use std::{fmt, num::NonZeroU32, str::FromStr, time::Duration};

/// Smallest frame width the emulator produces.
pub const MIN_WIDTH: u32 = 48;
/// Largest frame width the emulator produces.
pub const MAX_WIDTH: u32 = 1920;
/// Smallest frame height the emulator produces.
pub const MIN_HEIGHT: u32 = 32;
/// Largest frame height the emulator produces.
pub const MAX_HEIGHT: u32 = 1080;
/// Upper frame-rate bound; also the denominator of the shortest interval.
pub const MAX_FPS: u32 = 1000;

/// Errors produced while parsing or validating format values.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::{FormatError, FourCc};
///
/// let err = "YUV".parse::<FourCc>().unwrap_err();
/// assert!(matches!(err, FormatError::FourCcLength(3)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// A fourcc string did not contain exactly four bytes.
    #[error("fourcc must be four ASCII bytes, got {0}")]
    FourCcLength(usize),
    /// Identifier not present in the pixel format catalog.
    #[error("unsupported pixel format {0}")]
    Unsupported(FourCc),
}

/// Four-character code describing a pixel packing.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::FourCc;
///
/// let fcc = FourCc::new(*b"YUYV");
/// assert_eq!(fcc.to_string(), "YUYV");
/// assert_eq!(FourCc::from(fcc.to_u32()), fcc);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const YUYV: FourCc = FourCc::new(*b"YUYV");
    pub const UYVY: FourCc = FourCc::new(*b"UYVY");
    pub const YVYU: FourCc = FourCc::new(*b"YVYU");
    pub const VYUY: FourCc = FourCc::new(*b"VYUY");
    pub const RGB565: FourCc = FourCc::new(*b"RGBP");
    pub const RGB565X: FourCc = FourCc::new(*b"RGBR");
    pub const RGB555: FourCc = FourCc::new(*b"RGBO");
    pub const RGB555X: FourCc = FourCc::new(*b"RGBQ");
    pub const RGB24: FourCc = FourCc::new(*b"RGB3");
    pub const BGR24: FourCc = FourCc::new(*b"BGR3");
    pub const RGB32: FourCc = FourCc::new(*b"RGB4");
    pub const BGR32: FourCc = FourCc::new(*b"BGR4");

    /// Construct from raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Little-endian u32 encoding, as used on the V4L2 wire.
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Printable form when all four bytes are UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<u32> for FourCc {
    fn from(value: u32) -> Self {
        Self(value.to_le_bytes())
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => write!(f, "0x{:08x}", self.to_u32()),
        }
    }
}

impl FromStr for FourCc {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| FormatError::FourCcLength(s.len()))?;
        Ok(FourCc(bytes))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FourCc {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.as_str() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_u32(self.to_u32()),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FourCc {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct FourCcVisitor;

        impl serde::de::Visitor<'_> for FourCcVisitor {
            type Value = FourCc;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 4-character fourcc string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                FourCc::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FourCcVisitor)
    }
}

/// Chroma byte order of a 4:2:2 packed format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaOrder {
    /// `Y U Y V`
    Yuyv,
    /// `U Y V Y`
    Uyvy,
    /// `Y V Y U`
    Yvyu,
    /// `V Y U Y`
    Vyuy,
}

/// How a format lays a single pixel out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// 4:2:2 luma/chroma, two bytes per pixel.
    Yuv422(ChromaOrder),
    /// 5-6-5 RGB in two bytes.
    Rgb565 { big_endian: bool },
    /// 1-5-5-5 (alpha, R, G, B) in two bytes.
    Rgb555 { big_endian: bool },
    /// Three bytes; `bgr` swaps the red and blue positions.
    Rgb24 { bgr: bool },
    /// Four bytes with one alpha byte; `bgr` reverses the byte order.
    Rgb32 { bgr: bool },
}

/// Immutable descriptor of a supported pixel encoding.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::{FourCc, PixelFormat};
///
/// let fmt = PixelFormat::lookup(FourCc::RGB24).unwrap();
/// assert_eq!(fmt.bytes_per_pixel(), 3);
/// assert!(!fmt.is_yuv);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    /// Human-readable description.
    pub name: &'static str,
    /// Identifier used on the control surface.
    pub fourcc: FourCc,
    /// Bits per pixel.
    pub depth: u8,
    /// Luma/chroma format (palette goes through the YCbCr transform).
    pub is_yuv: bool,
    /// Byte layout used when packing pixels.
    pub packing: Packing,
}

static FORMATS: [PixelFormat; 12] = [
    PixelFormat {
        name: "4:2:2, packed, YUYV",
        fourcc: FourCc::YUYV,
        depth: 16,
        is_yuv: true,
        packing: Packing::Yuv422(ChromaOrder::Yuyv),
    },
    PixelFormat {
        name: "4:2:2, packed, UYVY",
        fourcc: FourCc::UYVY,
        depth: 16,
        is_yuv: true,
        packing: Packing::Yuv422(ChromaOrder::Uyvy),
    },
    PixelFormat {
        name: "4:2:2, packed, YVYU",
        fourcc: FourCc::YVYU,
        depth: 16,
        is_yuv: true,
        packing: Packing::Yuv422(ChromaOrder::Yvyu),
    },
    PixelFormat {
        name: "4:2:2, packed, VYUY",
        fourcc: FourCc::VYUY,
        depth: 16,
        is_yuv: true,
        packing: Packing::Yuv422(ChromaOrder::Vyuy),
    },
    PixelFormat {
        name: "RGB565 (LE)",
        fourcc: FourCc::RGB565,
        depth: 16,
        is_yuv: false,
        packing: Packing::Rgb565 { big_endian: false },
    },
    PixelFormat {
        name: "RGB565 (BE)",
        fourcc: FourCc::RGB565X,
        depth: 16,
        is_yuv: false,
        packing: Packing::Rgb565 { big_endian: true },
    },
    PixelFormat {
        name: "RGB555 (LE)",
        fourcc: FourCc::RGB555,
        depth: 16,
        is_yuv: false,
        packing: Packing::Rgb555 { big_endian: false },
    },
    PixelFormat {
        name: "RGB555 (BE)",
        fourcc: FourCc::RGB555X,
        depth: 16,
        is_yuv: false,
        packing: Packing::Rgb555 { big_endian: true },
    },
    PixelFormat {
        name: "RGB24 (LE)",
        fourcc: FourCc::RGB24,
        depth: 24,
        is_yuv: false,
        packing: Packing::Rgb24 { bgr: false },
    },
    PixelFormat {
        name: "RGB24 (BE)",
        fourcc: FourCc::BGR24,
        depth: 24,
        is_yuv: false,
        packing: Packing::Rgb24 { bgr: true },
    },
    PixelFormat {
        name: "RGB32 (LE)",
        fourcc: FourCc::RGB32,
        depth: 32,
        is_yuv: false,
        packing: Packing::Rgb32 { bgr: false },
    },
    PixelFormat {
        name: "RGB32 (BE)",
        fourcc: FourCc::BGR32,
        depth: 32,
        is_yuv: false,
        packing: Packing::Rgb32 { bgr: true },
    },
];

impl PixelFormat {
    /// Every supported format, in enumeration order.
    pub fn catalog() -> &'static [PixelFormat] {
        &FORMATS
    }

    /// Format at an enumeration index; `None` past the end.
    pub fn at(index: usize) -> Option<&'static PixelFormat> {
        FORMATS.get(index)
    }

    /// Find a format by identifier.
    pub fn lookup(fourcc: FourCc) -> Option<&'static PixelFormat> {
        FORMATS.iter().find(|f| f.fourcc == fourcc)
    }

    /// Like [`PixelFormat::lookup`] but reports the miss as an error.
    pub fn require(fourcc: FourCc) -> Result<&'static PixelFormat, FormatError> {
        Self::lookup(fourcc).ok_or(FormatError::Unsupported(fourcc))
    }

    /// The format used when nothing else was requested.
    pub fn default_format() -> &'static PixelFormat {
        &FORMATS[0]
    }

    /// Packed bytes per pixel (`depth / 8`).
    pub fn bytes_per_pixel(&self) -> usize {
        self.depth as usize / 8
    }

    /// Colorimetry reported alongside frames of this format.
    pub fn color_space(&self) -> ColorSpace {
        if self.is_yuv {
            ColorSpace::Smpte170m
        } else {
            ColorSpace::Srgb
        }
    }
}

/// Resolution of a frame.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::Resolution;
///
/// let res = Resolution::new(640, 360).unwrap();
/// assert_eq!(res.width.get(), 640);
/// assert!(Resolution::new(0, 360).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    /// Width in pixels (non-zero).
    pub width: NonZeroU32,
    /// Height in pixels (non-zero).
    pub height: NonZeroU32,
}

impl Resolution {
    /// Create a resolution, returning `None` if width or height are zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    /// Whether the geometry is inside the emulator's supported range.
    pub fn in_range(&self) -> bool {
        (MIN_WIDTH..=MAX_WIDTH).contains(&self.width.get())
            && (MIN_HEIGHT..=MAX_HEIGHT).contains(&self.height.get())
    }
}

/// Stepwise frame-size range advertised for every format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameSizeStepwise {
    /// Narrowest accepted width.
    pub min_width: u32,
    /// Widest accepted width.
    pub max_width: u32,
    /// Width increment above the minimum.
    pub step_width: u32,
    /// Shortest accepted height.
    pub min_height: u32,
    /// Tallest accepted height.
    pub max_height: u32,
    /// Height increment above the minimum.
    pub step_height: u32,
}

impl FrameSizeStepwise {
    /// Range shared by all emulated formats.
    pub const fn supported() -> Self {
        Self {
            min_width: MIN_WIDTH,
            max_width: MAX_WIDTH,
            step_width: 4,
            min_height: MIN_HEIGHT,
            max_height: MAX_HEIGHT,
            step_height: 1,
        }
    }

    /// Whether `res` lies inside the range and on its steps.
    pub fn contains(&self, res: Resolution) -> bool {
        let (w, h) = (res.width.get(), res.height.get());
        (self.min_width..=self.max_width).contains(&w)
            && (self.min_height..=self.max_height).contains(&h)
            && (w - self.min_width) % self.step_width == 0
            && (h - self.min_height) % self.step_height == 0
    }
}

/// Time per frame expressed as a rational number of seconds.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::Interval;
///
/// let interval = Interval::from_raw(1, 30).unwrap();
/// assert_eq!(interval.period().as_millis(), 33);
/// assert!(Interval::from_raw(1, 0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    /// Seconds numerator.
    pub numerator: NonZeroU32,
    /// Seconds denominator.
    pub denominator: NonZeroU32,
}

impl Interval {
    /// 1/1000 s, the shortest supported interval.
    pub const MIN: Interval = Interval::from_parts(1, MAX_FPS);
    /// 1000/1 s, the longest supported interval.
    pub const MAX: Interval = Interval::from_parts(MAX_FPS, 1);
    /// 1/30 s.
    pub const DEFAULT: Interval = Interval::from_parts(1, 30);

    const fn from_parts(numerator: u32, denominator: u32) -> Self {
        match (NonZeroU32::new(numerator), NonZeroU32::new(denominator)) {
            (Some(numerator), Some(denominator)) => Self {
                numerator,
                denominator,
            },
            _ => panic!("interval parts must be non-zero"),
        }
    }

    /// Build from raw parts; `None` when either part is zero.
    pub fn from_raw(numerator: u32, denominator: u32) -> Option<Self> {
        Some(Self {
            numerator: NonZeroU32::new(numerator)?,
            denominator: NonZeroU32::new(denominator)?,
        })
    }

    /// Frames per second as floating point.
    pub fn fps(&self) -> f32 {
        self.denominator.get() as f32 / self.numerator.get() as f32
    }

    /// Pacing period in whole milliseconds, truncated like the producer expects.
    pub fn period(&self) -> Duration {
        let millis = self.numerator.get() as u64 * 1000 / self.denominator.get() as u64;
        Duration::from_millis(millis)
    }

    /// Compare as rationals without floating point.
    fn cmp_rational(&self, other: &Interval) -> std::cmp::Ordering {
        let lhs = self.numerator.get() as u64 * other.denominator.get() as u64;
        let rhs = other.numerator.get() as u64 * self.denominator.get() as u64;
        lhs.cmp(&rhs)
    }

    /// Whether the interval lies in `[min, max]`.
    pub fn within(&self, min: Interval, max: Interval) -> bool {
        self.cmp_rational(&min).is_ge() && self.cmp_rational(&max).is_le()
    }

    /// Snap to `[min, max]`.
    pub fn clamp(self, min: Interval, max: Interval) -> Interval {
        if self.cmp_rational(&min).is_lt() {
            min
        } else if self.cmp_rational(&max).is_gt() {
            max
        } else {
            self
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Continuous interval range (min/max with a nominal step).
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::{Interval, IntervalStepwise};
///
/// let range = IntervalStepwise::supported();
/// assert!(range.contains(Interval::DEFAULT));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalStepwise {
    /// Shortest interval (highest frame rate).
    pub min: Interval,
    /// Longest interval (lowest frame rate).
    pub max: Interval,
    /// Nominal step between the bounds.
    pub step: Interval,
}

impl IntervalStepwise {
    /// The continuous 1/1000 s .. 1000 s range with a 1/1 step.
    pub const fn supported() -> Self {
        Self {
            min: Interval::MIN,
            max: Interval::MAX,
            step: Interval::from_parts(1, 1),
        }
    }

    /// Continuous ranges accept anything between the bounds.
    pub fn contains(&self, candidate: Interval) -> bool {
        candidate.within(self.min, self.max)
    }
}

/// Colorimetry hint attached to a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    /// SMPTE 170M (BT.601) for luma/chroma formats.
    Smpte170m,
    /// sRGB for RGB formats.
    Srgb,
}

/// Frame field ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Field {
    /// Not yet assigned.
    #[default]
    Any,
    /// Progressive frame.
    None,
    /// Both fields interleaved line by line.
    Interlaced,
}

/// Negotiated single-plane frame format as reported to clients.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::{FourCc, FrameFormat, PixelFormat, Resolution};
///
/// let fmt = PixelFormat::lookup(FourCc::YUYV).unwrap();
/// let frame = FrameFormat::new(fmt, Resolution::new(640, 360).unwrap());
/// assert_eq!(frame.bytes_per_line, 1280);
/// assert_eq!(frame.size_image, 1280 * 360);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameFormat {
    pub fourcc: FourCc,
    pub resolution: Resolution,
    pub field: Field,
    pub bytes_per_line: u32,
    pub size_image: u32,
    pub color: ColorSpace,
}

impl FrameFormat {
    /// Derive stride, image size, and colorimetry for `format` at `resolution`.
    pub fn new(format: &PixelFormat, resolution: Resolution) -> Self {
        let bytes_per_line = (resolution.width.get() * format.depth as u32) >> 3;
        Self {
            fourcc: format.fourcc,
            resolution,
            field: Field::Interlaced,
            bytes_per_line,
            size_image: resolution.height.get() * bytes_per_line,
            color: format.color_space(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_twelve_unique_entries() {
        let catalog = PixelFormat::catalog();
        assert_eq!(catalog.len(), 12);
        for (i, fmt) in catalog.iter().enumerate() {
            assert_eq!(PixelFormat::at(i), Some(fmt));
            assert_eq!(PixelFormat::lookup(fmt.fourcc), Some(fmt));
        }
        assert!(PixelFormat::at(catalog.len()).is_none());
    }

    #[test]
    fn lookup_misses_unknown_codes() {
        let mjpg = FourCc::new(*b"MJPG");
        assert!(PixelFormat::lookup(mjpg).is_none());
        assert_eq!(
            PixelFormat::require(mjpg),
            Err(FormatError::Unsupported(mjpg))
        );
    }

    #[test]
    fn fourcc_matches_v4l2_encoding() {
        // v4l2_fourcc('Y','U','Y','V')
        assert_eq!(FourCc::YUYV.to_u32(), 0x5659_5559);
        assert_eq!("RGB4".parse::<FourCc>().unwrap(), FourCc::RGB32);
    }

    #[test]
    fn bytes_per_pixel_follows_depth() {
        for fmt in PixelFormat::catalog() {
            assert_eq!(fmt.bytes_per_pixel() * 8, fmt.depth as usize);
        }
    }

    #[test]
    fn interval_period_truncates_to_millis() {
        assert_eq!(Interval::DEFAULT.period(), Duration::from_millis(33));
        assert_eq!(Interval::MIN.period(), Duration::from_millis(1));
        assert_eq!(Interval::DEFAULT.fps(), 30.0);
        assert_eq!(Interval::MIN.fps(), 1000.0);
        assert_eq!(
            Interval::from_raw(2, 3).unwrap().period(),
            Duration::from_millis(666)
        );
    }

    #[test]
    fn interval_clamps_to_bounds() {
        let fast = Interval::from_raw(1, 5000).unwrap();
        let slow = Interval::from_raw(5000, 1).unwrap();
        assert_eq!(fast.clamp(Interval::MIN, Interval::MAX), Interval::MIN);
        assert_eq!(slow.clamp(Interval::MIN, Interval::MAX), Interval::MAX);
        assert_eq!(
            Interval::DEFAULT.clamp(Interval::MIN, Interval::MAX),
            Interval::DEFAULT
        );
    }

    #[test]
    fn frame_sizes_step_width_by_four() {
        let sizes = FrameSizeStepwise::supported();
        assert!(sizes.contains(Resolution::new(640, 360).unwrap()));
        assert!(!sizes.contains(Resolution::new(642, 360).unwrap()));
        assert!(!sizes.contains(Resolution::new(16, 360).unwrap()));
    }

    #[test]
    fn color_space_tracks_yuv_flag() {
        let yuv = PixelFormat::lookup(FourCc::UYVY).unwrap();
        let rgb = PixelFormat::lookup(FourCc::BGR32).unwrap();
        assert_eq!(yuv.color_space(), ColorSpace::Smpte170m);
        assert_eq!(rgb.color_space(), ColorSpace::Srgb);
    }
}
