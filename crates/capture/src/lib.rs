#![doc = include_str!("../README.md")]

use std::num::NonZeroU32;

use smallvec::SmallVec;
use thiserror::Error;

use framefeed_core::prelude::*;

pub mod colorbar;
pub mod pacer;
pub mod scanline;
pub mod synth;

/// Number of inputs the emulated device exposes.
pub const INPUT_COUNT: u32 = 1;

/// Why a requested capture configuration was refused.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pixel format {0} is not supported")]
    UnknownFormat(FourCc),
    #[error("{width}x{height} is outside 48x32..1920x1080")]
    Geometry { width: u32, height: u32 },
    #[error("frame interval denominator must be non-zero")]
    ZeroDenominator,
    #[error("width {0} is not a multiple of 4")]
    Alignment(u32),
}

/// Requested format, geometry, and frame interval.
///
/// Interval parts are kept raw so a zero denominator can be reported rather
/// than silently replaced.
///
/// # Example
/// ```rust
/// use framefeed_capture::prelude::*;
///
/// let cfg = CaptureConfig {
///     fourcc: FourCc::RGB24,
///     width: 320,
///     height: 240,
///     ..CaptureConfig::default()
/// };
/// let settings = cfg.validate().unwrap();
/// assert_eq!(settings.frame_bytes(), 320 * 240 * 3);
///
/// let tiny = CaptureConfig { width: 16, ..CaptureConfig::default() };
/// assert!(tiny.validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CaptureConfig {
    pub fourcc: FourCc,
    pub width: u32,
    pub height: u32,
    pub interval_numerator: u32,
    pub interval_denominator: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fourcc: FourCc::YUYV,
            width: 640,
            height: 360,
            interval_numerator: Interval::DEFAULT.numerator.get(),
            interval_denominator: Interval::DEFAULT.denominator.get(),
        }
    }
}

impl CaptureConfig {
    /// Check the request and resolve it to concrete settings.
    ///
    /// The interval is clamped into the supported range; a zero numerator
    /// snaps to the shortest interval.
    pub fn validate(&self) -> Result<StreamSettings, ConfigError> {
        let format =
            PixelFormat::lookup(self.fourcc).ok_or(ConfigError::UnknownFormat(self.fourcc))?;
        let resolution = checked_resolution(self.width, self.height)?;
        let interval = clamp_interval(self.interval_numerator, self.interval_denominator)?;
        Ok(StreamSettings {
            format,
            resolution,
            interval,
        })
    }
}

/// Validated configuration the producer runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub format: &'static PixelFormat,
    pub resolution: Resolution,
    pub interval: Interval,
}

impl StreamSettings {
    /// Bytes in one frame (`width * height * bytes_per_pixel`).
    pub fn frame_bytes(&self) -> usize {
        self.resolution.width.get() as usize
            * self.resolution.height.get() as usize
            * self.format.bytes_per_pixel()
    }

    /// Client-facing format description.
    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat::new(self.format, self.resolution)
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            format: PixelFormat::default_format(),
            resolution: DEFAULT_RESOLUTION,
            interval: Interval::DEFAULT,
        }
    }
}

const DEFAULT_RESOLUTION: Resolution = match (NonZeroU32::new(640), NonZeroU32::new(360)) {
    (Some(width), Some(height)) => Resolution { width, height },
    _ => panic!("default resolution must be non-zero"),
};

/// Geometry check shared by configuration and descriptor queries.
pub fn checked_resolution(width: u32, height: u32) -> Result<Resolution, ConfigError> {
    Resolution::new(width, height)
        .filter(Resolution::in_range)
        .ok_or(ConfigError::Geometry { width, height })
}

/// Resolve raw interval parts into the supported range.
///
/// # Example
/// ```rust
/// use framefeed_capture::prelude::*;
///
/// assert_eq!(clamp_interval(1, 5000).unwrap(), Interval::MIN);
/// assert_eq!(clamp_interval(0, 30).unwrap(), Interval::MIN);
/// assert_eq!(clamp_interval(5000, 1).unwrap(), Interval::MAX);
/// assert!(clamp_interval(1, 0).is_err());
/// ```
pub fn clamp_interval(numerator: u32, denominator: u32) -> Result<Interval, ConfigError> {
    if denominator == 0 {
        return Err(ConfigError::ZeroDenominator);
    }
    let Some(interval) = Interval::from_raw(numerator, denominator) else {
        return Ok(Interval::MIN);
    };
    let bounds = IntervalStepwise::supported();
    Ok(interval.clamp(bounds.min, bounds.max))
}

/// One entry of the format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FormatDescriptor {
    pub index: usize,
    pub description: &'static str,
    pub fourcc: FourCc,
}

impl From<(usize, &'static PixelFormat)> for FormatDescriptor {
    fn from((index, fmt): (usize, &'static PixelFormat)) -> Self {
        Self {
            index,
            description: fmt.name,
            fourcc: fmt.fourcc,
        }
    }
}

/// All formats in enumeration order.
///
/// # Example
/// ```rust
/// use framefeed_capture::prelude::*;
///
/// let formats = describe_formats();
/// assert_eq!(formats.len(), 12);
/// assert_eq!(formats[0].fourcc, FourCc::YUYV);
/// ```
pub fn describe_formats() -> SmallVec<[FormatDescriptor; 12]> {
    PixelFormat::catalog()
        .iter()
        .enumerate()
        .map(FormatDescriptor::from)
        .collect()
}

/// Restartable enumeration: the descriptor at `index`, `None` past the end.
pub fn format_at(index: usize) -> Option<FormatDescriptor> {
    PixelFormat::at(index).map(|fmt| FormatDescriptor::from((index, fmt)))
}

/// Frame-size range for a supported format.
pub fn frame_sizes(fourcc: FourCc) -> Result<FrameSizeStepwise, ConfigError> {
    PixelFormat::lookup(fourcc)
        .map(|_| FrameSizeStepwise::supported())
        .ok_or(ConfigError::UnknownFormat(fourcc))
}

/// Continuous interval range for a format at a given size.
///
/// Widths must additionally be a multiple of four.
pub fn frame_interval_bounds(
    fourcc: FourCc,
    width: u32,
    height: u32,
) -> Result<IntervalStepwise, ConfigError> {
    PixelFormat::lookup(fourcc).ok_or(ConfigError::UnknownFormat(fourcc))?;
    checked_resolution(width, height)?;
    if width % 4 != 0 {
        return Err(ConfigError::Alignment(width));
    }
    Ok(IntervalStepwise::supported())
}

/// Kind of an emulated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum InputKind {
    Camera,
}

/// One selectable input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InputDescriptor {
    pub index: u32,
    pub name: String,
    pub kind: InputKind,
}

/// Inputs exposed by the device.
///
/// # Example
/// ```rust
/// use framefeed_capture::prelude::*;
///
/// let inputs = inputs();
/// assert_eq!(inputs.len(), 1);
/// assert_eq!(inputs[0].name, "Camera 0");
/// ```
pub fn inputs() -> Vec<InputDescriptor> {
    (0..INPUT_COUNT)
        .map(|index| InputDescriptor {
            index,
            name: format!("Camera {index}"),
            kind: InputKind::Camera,
        })
        .collect()
}

/// Normalize a format request the way a trial negotiation does.
///
/// Unknown codes fall back to the default format; geometry is reported as
/// given.
pub fn negotiate_format(fourcc: FourCc, width: u32, height: u32) -> Option<FrameFormat> {
    let format = PixelFormat::lookup(fourcc).unwrap_or_else(PixelFormat::default_format);
    Resolution::new(width, height).map(|res| FrameFormat::new(format, res))
}

pub mod prelude {
    pub use crate::{
        CaptureConfig, ConfigError, FormatDescriptor, INPUT_COUNT, InputDescriptor, InputKind,
        StreamSettings, checked_resolution, clamp_interval,
        colorbar::{COLOR_BARS, Palette, PaletteEntry, build_palette, pack_pixel, rgb_to_ycbcr},
        describe_formats, format_at, frame_interval_bounds, frame_sizes, inputs,
        negotiate_format,
        pacer::{Pacer, PacerContext, PacerSignal},
        scanline::{SEGMENTS, Scanline},
        synth::{FillError, FrameSynth, StreamSession},
    };
    pub use framefeed_core::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_enumerated_format_validates() {
        for desc in describe_formats() {
            let cfg = CaptureConfig {
                fourcc: desc.fourcc,
                ..CaptureConfig::default()
            };
            let settings = cfg.validate().unwrap();
            assert_eq!(settings.format.fourcc, desc.fourcc);
        }
        assert!(format_at(12).is_none());
        assert_eq!(format_at(4).map(|d| d.fourcc), Some(FourCc::RGB565));
    }

    #[test]
    fn geometry_outside_range_is_rejected() {
        for (width, height) in [(16, 360), (47, 32), (1922, 360), (640, 31), (640, 1081), (0, 0)] {
            let cfg = CaptureConfig {
                width,
                height,
                ..CaptureConfig::default()
            };
            assert_eq!(cfg.validate(), Err(ConfigError::Geometry { width, height }));
        }
    }

    #[test]
    fn unknown_format_and_zero_denominator_are_rejected() {
        let mjpg = FourCc::new(*b"MJPG");
        let cfg = CaptureConfig {
            fourcc: mjpg,
            ..CaptureConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::UnknownFormat(mjpg)));

        let cfg = CaptureConfig {
            interval_denominator: 0,
            ..CaptureConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDenominator));
    }

    #[test]
    fn interval_is_clamped_into_range() {
        assert_eq!(clamp_interval(1, 30).unwrap(), Interval::DEFAULT);
        assert_eq!(clamp_interval(1, 2000).unwrap(), Interval::MIN);
        assert_eq!(clamp_interval(2000, 1).unwrap(), Interval::MAX);
    }

    #[test]
    fn interval_bounds_need_aligned_width() {
        assert_eq!(
            frame_interval_bounds(FourCc::YUYV, 640, 360),
            Ok(IntervalStepwise::supported())
        );
        assert_eq!(
            frame_interval_bounds(FourCc::YUYV, 642, 360),
            Err(ConfigError::Alignment(642))
        );
        assert!(frame_interval_bounds(FourCc::YUYV, 44, 360).is_err());
        assert!(frame_interval_bounds(FourCc::new(*b"NV12"), 640, 360).is_err());
    }

    #[test]
    fn negotiation_falls_back_to_yuyv() {
        let fmt = negotiate_format(FourCc::new(*b"H264"), 320, 240).unwrap();
        assert_eq!(fmt.fourcc, FourCc::YUYV);
        assert_eq!(fmt.bytes_per_line, 640);
        assert_eq!(fmt.color, ColorSpace::Smpte170m);

        let rgb = negotiate_format(FourCc::RGB32, 320, 240).unwrap();
        assert_eq!(rgb.size_image, 320 * 240 * 4);
        assert_eq!(rgb.color, ColorSpace::Srgb);
    }

    #[test]
    fn frame_sizes_cover_known_formats_only() {
        let sizes = frame_sizes(FourCc::BGR24).unwrap();
        assert_eq!((sizes.min_width, sizes.max_width, sizes.step_width), (48, 1920, 4));
        assert!(frame_sizes(FourCc::new(*b"GREY")).is_err());
    }
}
