use framefeed_capture::CaptureConfig;
use framefeed_core::prelude::*;

/// Default name of the producer thread.
pub const DEFAULT_THREAD_NAME: &str = "framefeed-pacer";
/// Default alpha byte for formats that carry one.
pub const DEFAULT_ALPHA: u8 = 0;

/// Initial device settings.
///
/// # Example
/// ```rust
/// use framefeed::prelude::*;
///
/// let cfg = FeedConfig::new()
///     .format(FourCc::RGB32)
///     .resolution(1280, 720)
///     .frame_interval(1, 60)
///     .alpha(0xFF);
/// let device = Device::new(cfg).unwrap();
/// assert_eq!(device.format().fourcc, FourCc::RGB32);
/// assert_eq!(device.frame_interval().denominator.get(), 60);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeedConfig {
    pub capture: CaptureConfig,
    pub alpha: u8,
    pub thread_name: String,
}

impl FeedConfig {
    /// Start from the defaults: YUYV 640x360 at 1/30 s.
    pub fn new() -> Self {
        Self {
            capture: CaptureConfig::default(),
            alpha: DEFAULT_ALPHA,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    pub fn format(mut self, fourcc: FourCc) -> Self {
        self.capture.fourcc = fourcc;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.capture.width = width;
        self.capture.height = height;
        self
    }

    /// Seconds per frame as `numerator / denominator`.
    pub fn frame_interval(mut self, numerator: u32, denominator: u32) -> Self {
        self.capture.interval_numerator = numerator;
        self.capture.interval_denominator = denominator;
        self
    }

    /// Alpha byte for RGB32/BGR32 (bit 7 also feeds the RGB555 top bit).
    pub fn alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }

    /// Name given to the producer thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = FeedConfig::new()
            .format(FourCc::BGR24)
            .resolution(800, 600)
            .frame_interval(1, 25)
            .thread_name("bars");
        assert_eq!(cfg.capture.fourcc, FourCc::BGR24);
        assert_eq!((cfg.capture.width, cfg.capture.height), (800, 600));
        assert_eq!(cfg.capture.interval_denominator, 25);
        assert_eq!(cfg.thread_name, "bars");
        assert_eq!(cfg.alpha, DEFAULT_ALPHA);
    }

    #[test]
    fn default_matches_new() {
        assert_eq!(FeedConfig::default(), FeedConfig::new());
        assert_eq!(FeedConfig::default().capture.fourcc, FourCc::YUYV);
    }
}
