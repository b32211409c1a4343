use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight counters describing producer activity.
///
/// # Example
/// ```rust
/// use framefeed_core::metrics::StreamMetrics;
///
/// let metrics = StreamMetrics::default();
/// metrics.produced();
/// assert_eq!(metrics.snapshot().frames, 1);
/// ```
#[derive(Debug, Default)]
pub struct StreamMetrics {
    ticks: AtomicU64,
    frames: AtomicU64,
    empty_ticks: AtomicU64,
    fill_errors: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of [`StreamMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Pacing ticks executed.
    pub ticks: u64,
    /// Buffers filled successfully.
    pub frames: u64,
    /// Ticks that found no pending buffer.
    pub empty_ticks: u64,
    /// Buffers returned with an error outcome.
    pub fill_errors: u64,
    /// Buffers released by a stream stop.
    pub cancelled: u64,
}

impl StreamMetrics {
    /// Count one pacing tick.
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one filled buffer.
    pub fn produced(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a tick that found nothing pending.
    pub fn empty_tick(&self) {
        self.empty_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a buffer returned in the error state.
    pub fn fill_error(&self) {
        self.fill_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count buffers released by a stop.
    pub fn cancelled(&self, count: u64) {
        self.cancelled.fetch_add(count, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            empty_ticks: self.empty_ticks.load(Ordering::Relaxed),
            fill_errors: self.fill_errors.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
