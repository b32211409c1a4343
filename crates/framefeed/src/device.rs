use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use smallvec::SmallVec;

use framefeed_capture::prelude::*;

use crate::config::FeedConfig;
use crate::error::DeviceError;

/// Driver name reported by [`Device::capabilities`].
pub const DRIVER_NAME: &str = "framefeed";

/// Whether the producer is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Stopped,
    Running,
}

/// A single configuration change applied while stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconfigure {
    Format(FourCc),
    Resolution { width: u32, height: u32 },
    Input(u32),
    FrameInterval { numerator: u32, denominator: u32 },
    Alpha(u8),
}

/// Identity and capability flags of the emulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub driver: &'static str,
    pub card: &'static str,
    pub bus_info: String,
    pub video_capture: bool,
    pub streaming: bool,
    pub read_write: bool,
}

/// Mutable device configuration plus the cached pattern derived from it.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub settings: StreamSettings,
    pub input: u32,
    pub alpha: u8,
    synth: Arc<FrameSynth>,
}

impl DeviceState {
    fn new(settings: StreamSettings, alpha: u8) -> Self {
        Self {
            synth: Arc::new(FrameSynth::new(settings.format, settings.resolution, alpha)),
            settings,
            input: 0,
            alpha,
        }
    }

    fn rebuild(&mut self) {
        self.synth = Arc::new(FrameSynth::new(
            self.settings.format,
            self.settings.resolution,
            self.alpha,
        ));
    }

    /// Cached pattern and geometry the producer paints from.
    pub fn synth(&self) -> &FrameSynth {
        &self.synth
    }
}

struct Session {
    state: DeviceState,
    pacer: Option<Pacer>,
    pool: Option<BufferPool>,
}

/// Emulated capture device: configuration surface, buffer queues, and the
/// stream controller driving the producer thread.
///
/// Buffers go in with [`Device::queue_buffer`] and come back, filled or
/// with a terminal state, through [`Device::dequeue_buffer`]. Dropping the
/// device stops a running stream.
///
/// # Example
/// ```rust
/// use framefeed::prelude::*;
///
/// let device = Device::new(FeedConfig::default()).unwrap();
/// assert_eq!(device.enumerate_formats().len(), 12);
/// assert!(matches!(device.stop_stream(), Err(DeviceError::NotRunning)));
/// assert!(matches!(device.dequeue_buffer(), Err(DeviceError::WouldBlock)));
/// ```
pub struct Device {
    session: Mutex<Session>,
    pending: Arc<BufferQueue<CaptureBuffer>>,
    done: Arc<BufferQueue<CaptureBuffer>>,
    metrics: Arc<StreamMetrics>,
    // Written under the session lock, read lock-free at submission.
    frame_bytes: AtomicUsize,
    thread_name: String,
}

impl Device {
    /// Create a stopped device from validated initial settings.
    pub fn new(config: FeedConfig) -> Result<Self, DeviceError> {
        let settings = config.capture.validate()?;
        tracing::info!(
            format = %settings.format.fourcc,
            width = settings.resolution.width.get(),
            height = settings.resolution.height.get(),
            interval = %settings.interval,
            "device created"
        );
        Ok(Self {
            session: Mutex::new(Session {
                state: DeviceState::new(settings, config.alpha),
                pacer: None,
                pool: None,
            }),
            pending: Arc::new(BufferQueue::new()),
            done: Arc::new(BufferQueue::new()),
            metrics: Arc::new(StreamMetrics::default()),
            frame_bytes: AtomicUsize::new(settings.frame_bytes()),
            thread_name: config.thread_name,
        })
    }

    /// Replace format, geometry, and frame interval in one step.
    ///
    /// Nothing changes when the request is rejected.
    #[tracing::instrument(skip(self))]
    pub fn configure(&self, config: CaptureConfig) -> Result<(), DeviceError> {
        let settings = config.validate()?;
        let mut session = self.session.lock();
        if session.pacer.is_some() {
            return Err(DeviceError::Busy);
        }
        session.state.settings = settings;
        session.state.rebuild();
        self.frame_bytes
            .store(settings.frame_bytes(), Ordering::Release);
        tracing::info!(
            format = %settings.format.fourcc,
            width = settings.resolution.width.get(),
            height = settings.resolution.height.get(),
            interval = %settings.interval,
            "configured"
        );
        Ok(())
    }

    /// Apply a single change while the stream is stopped.
    #[tracing::instrument(skip(self))]
    pub fn reconfigure(&self, change: Reconfigure) -> Result<(), DeviceError> {
        let mut session = self.session.lock();
        if session.pacer.is_some() {
            return Err(DeviceError::Busy);
        }
        let state = &mut session.state;
        match change {
            Reconfigure::Format(fourcc) => {
                state.settings.format = PixelFormat::lookup(fourcc)
                    .ok_or(ConfigError::UnknownFormat(fourcc))?;
            }
            Reconfigure::Resolution { width, height } => {
                state.settings.resolution = checked_resolution(width, height)?;
            }
            Reconfigure::Input(index) => {
                if index >= INPUT_COUNT {
                    return Err(DeviceError::InvalidArgument(format!(
                        "input {index} does not exist"
                    )));
                }
                if index == state.input {
                    return Ok(());
                }
                state.input = index;
            }
            Reconfigure::FrameInterval {
                numerator,
                denominator,
            } => {
                // Pacing only; the pattern is unaffected.
                state.settings.interval = clamp_interval(numerator, denominator)?;
                tracing::info!(interval = %state.settings.interval, "frame interval set");
                return Ok(());
            }
            Reconfigure::Alpha(alpha) => state.alpha = alpha,
        }
        state.rebuild();
        self.frame_bytes
            .store(state.settings.frame_bytes(), Ordering::Release);
        tracing::info!(?change, "reconfigured");
        Ok(())
    }

    /// Hand a buffer to the producer.
    ///
    /// Buffers whose memory is too small for one frame are refused; buffers
    /// without memory are accepted and come back in the `Error` state.
    pub fn queue_buffer(&self, mut buffer: CaptureBuffer) -> Result<(), DeviceError> {
        let needed = self.buffer_size();
        if let Some(capacity) = buffer.capacity()
            && capacity < needed
        {
            return Err(DeviceError::InvalidArgument(format!(
                "buffer {} holds {capacity} bytes, frame needs {needed}",
                buffer.index()
            )));
        }
        buffer.requeue();
        self.pending.submit(buffer);
        Ok(())
    }

    /// Oldest completed buffer, or `WouldBlock` when none is ready.
    pub fn dequeue_buffer(&self) -> Result<CaptureBuffer, DeviceError> {
        self.done.take_oldest().ok_or(DeviceError::WouldBlock)
    }

    /// Like [`Device::dequeue_buffer`] but waits up to `timeout`.
    pub fn dequeue_buffer_timeout(&self, timeout: Duration) -> Result<CaptureBuffer, DeviceError> {
        self.done.wait_oldest(timeout).ok_or(DeviceError::WouldBlock)
    }

    /// Launch the producer; the first frame is requested immediately.
    ///
    /// If the thread cannot be spawned, every pending buffer is handed back
    /// still `Queued` and the spawn error is returned.
    #[tracing::instrument(skip(self))]
    pub fn start_stream(&self) -> Result<(), DeviceError> {
        let mut session = self.session.lock();
        if session.pacer.is_some() {
            return Err(DeviceError::AlreadyRunning);
        }
        session.state.rebuild();

        let ctx = PacerContext {
            synth: Arc::clone(&session.state.synth),
            pending: Arc::clone(&self.pending),
            done: Arc::clone(&self.done),
            metrics: Arc::clone(&self.metrics),
            interval: session.state.settings.interval,
        };
        let pacer = match Pacer::spawn(self.thread_name.clone(), ctx) {
            Ok(pacer) => pacer,
            Err(err) => {
                let returned = self.release_pending(BufferState::Queued);
                tracing::error!(error = %err, returned, "producer spawn failed");
                return Err(DeviceError::Spawn(err));
            }
        };
        pacer.wake();
        session.pacer = Some(pacer);

        let settings = session.state.settings;
        tracing::info!(
            format = %settings.format.fourcc,
            width = settings.resolution.width.get(),
            height = settings.resolution.height.get(),
            interval = %settings.interval,
            fps = settings.interval.fps(),
            pending = self.pending.len(),
            "stream started"
        );
        Ok(())
    }

    /// Stop and join the producer, then cancel whatever is still pending.
    #[tracing::instrument(skip(self))]
    pub fn stop_stream(&self) -> Result<(), DeviceError> {
        let mut session = self.session.lock();
        let mut pacer = session.pacer.take().ok_or(DeviceError::NotRunning)?;
        let totals = pacer.stop();
        let cancelled = self.release_pending(BufferState::Cancelled);
        self.metrics.cancelled(cancelled as u64);

        match totals {
            Some(totals) => tracing::info!(
                ticks = totals.ticks,
                frames = totals.sequence,
                cancelled,
                "stream stopped"
            ),
            None => tracing::warn!(cancelled, "stream stopped; producer thread panicked"),
        }
        Ok(())
    }

    fn release_pending(&self, state: BufferState) -> usize {
        let mut drained = self.pending.drain_all();
        for buffer in &mut drained {
            buffer.set_state(state);
        }
        let count = drained.len();
        self.done.submit_all(drained);
        count
    }

    pub fn stream_state(&self) -> StreamState {
        if self.session.lock().pacer.is_some() {
            StreamState::Running
        } else {
            StreamState::Stopped
        }
    }

    /// Supported formats, in enumeration order.
    pub fn enumerate_formats(&self) -> SmallVec<[FormatDescriptor; 12]> {
        describe_formats()
    }

    /// Restartable enumeration by index.
    pub fn format_at(&self, index: usize) -> Option<FormatDescriptor> {
        format_at(index)
    }

    pub fn frame_sizes(&self, fourcc: FourCc) -> Result<FrameSizeStepwise, DeviceError> {
        Ok(frame_sizes(fourcc)?)
    }

    pub fn frame_interval_bounds(
        &self,
        fourcc: FourCc,
        width: u32,
        height: u32,
    ) -> Result<IntervalStepwise, DeviceError> {
        Ok(frame_interval_bounds(fourcc, width, height)?)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            driver: DRIVER_NAME,
            card: DRIVER_NAME,
            bus_info: format!("platform:{DRIVER_NAME}"),
            video_capture: true,
            streaming: true,
            read_write: true,
        }
    }

    /// Currently active frame format.
    pub fn format(&self) -> FrameFormat {
        self.session.lock().state.settings.frame_format()
    }

    /// Describe the format a request would negotiate to, without applying it.
    ///
    /// Unknown codes fall back to YUYV.
    pub fn try_format(
        &self,
        fourcc: FourCc,
        width: u32,
        height: u32,
    ) -> Result<FrameFormat, DeviceError> {
        negotiate_format(fourcc, width, height).ok_or_else(|| {
            DeviceError::InvalidArgument(format!("{width}x{height} has a zero dimension"))
        })
    }

    pub fn inputs(&self) -> Vec<InputDescriptor> {
        inputs()
    }

    /// Index of the active input.
    pub fn input(&self) -> u32 {
        self.session.lock().state.input
    }

    pub fn set_input(&self, index: u32) -> Result<(), DeviceError> {
        self.reconfigure(Reconfigure::Input(index))
    }

    pub fn frame_interval(&self) -> Interval {
        self.session.lock().state.settings.interval
    }

    /// Set the frame interval and return the value actually applied.
    pub fn set_frame_interval(
        &self,
        numerator: u32,
        denominator: u32,
    ) -> Result<Interval, DeviceError> {
        self.reconfigure(Reconfigure::FrameInterval {
            numerator,
            denominator,
        })?;
        Ok(self.frame_interval())
    }

    pub fn alpha(&self) -> u8 {
        self.session.lock().state.alpha
    }

    /// Bytes one buffer must hold for the active configuration.
    pub fn buffer_size(&self) -> usize {
        self.frame_bytes.load(Ordering::Acquire)
    }

    /// Allocate `count` frame-sized buffers from an internal pool.
    ///
    /// The pool is recreated whenever the frame size changes; dropped
    /// buffers return their memory to it.
    pub fn allocate_buffers(&self, count: u32) -> Vec<CaptureBuffer> {
        let mut session = self.session.lock();
        let frame = session.state.settings.frame_format();
        let size = frame.size_image as usize;
        let pool = match &session.pool {
            Some(pool) if pool.frame_size() == size => pool.clone(),
            _ => {
                let pool = BufferPool::for_frame(&frame, count as usize);
                session.pool = Some(pool.clone());
                pool
            }
        };
        drop(session);
        tracing::debug!(count, size, "buffers allocated");
        (0..count)
            .map(|index| CaptureBuffer::new(index, pool.lease()))
            .collect()
    }

    /// Snapshot of the producer counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Copy of the current configuration state.
    pub fn state(&self) -> DeviceState {
        self.session.lock().state.clone()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.session.get_mut().pacer.is_some() {
            let _ = self.stop_stream();
        }
    }
}
