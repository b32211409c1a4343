#![doc = include_str!("../README.md")]

pub mod buffer;
pub mod format;
pub mod metrics;
pub mod queue;

pub mod prelude {
    pub use crate::{
        buffer::{
            BufferLease, BufferMeta, BufferPool, BufferState, CaptureBuffer, FrameMemory,
        },
        format::{
            ChromaOrder, ColorSpace, Field, FormatError, FourCc, FrameFormat, FrameSizeStepwise,
            Interval, IntervalStepwise, MAX_FPS, MAX_HEIGHT, MAX_WIDTH, MIN_HEIGHT, MIN_WIDTH,
            Packing, PixelFormat, Resolution,
        },
        metrics::{MetricsSnapshot, StreamMetrics},
        queue::BufferQueue,
    };
}
