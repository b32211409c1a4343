//! Background producer thread paced at the configured frame interval.
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use framefeed_core::prelude::*;

use crate::synth::{FrameSynth, StreamSession};

/// Control messages understood by the producer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerSignal {
    /// Produce a frame now instead of waiting out the period.
    Wake,
    /// Exit after the current tick.
    Stop,
}

/// Shared state handed to the producer thread.
#[derive(Clone)]
pub struct PacerContext {
    pub synth: Arc<FrameSynth>,
    pub pending: Arc<BufferQueue<CaptureBuffer>>,
    pub done: Arc<BufferQueue<CaptureBuffer>>,
    pub metrics: Arc<StreamMetrics>,
    pub interval: Interval,
}

/// Handle to a running producer thread.
///
/// Dropping the handle stops and joins the thread.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use framefeed_capture::pacer::{Pacer, PacerContext};
/// use framefeed_capture::synth::FrameSynth;
/// use framefeed_core::prelude::*;
///
/// let fmt = PixelFormat::lookup(FourCc::RGB24).unwrap();
/// let synth = Arc::new(FrameSynth::new(fmt, Resolution::new(48, 32).unwrap(), 0));
/// let ctx = PacerContext {
///     pending: Arc::new(BufferQueue::new()),
///     done: Arc::new(BufferQueue::new()),
///     metrics: Arc::new(StreamMetrics::default()),
///     interval: Interval::from_raw(1, 100).unwrap(),
///     synth: synth.clone(),
/// };
/// ctx.pending.submit(CaptureBuffer::new(0, vec![0u8; synth.frame_bytes()]));
///
/// let mut pacer = Pacer::spawn("doc-pacer", ctx.clone()).unwrap();
/// pacer.wake();
/// let buf = ctx.done.wait_oldest(Duration::from_secs(2)).unwrap();
/// assert_eq!(buf.meta().sequence, 0);
/// let session = pacer.stop().unwrap();
/// assert_eq!(session.sequence, 1);
/// ```
pub struct Pacer {
    signal: Sender<PacerSignal>,
    worker: Option<JoinHandle<StreamSession>>,
}

impl Pacer {
    /// Launch a named producer thread. The first tick happens after one
    /// period unless [`Pacer::wake`] is called.
    pub fn spawn(name: impl Into<String>, ctx: PacerContext) -> io::Result<Self> {
        let (signal, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(name.into())
            .spawn(move || run(ctx, rx))?;
        Ok(Self {
            signal,
            worker: Some(worker),
        })
    }

    /// Request an immediate tick.
    pub fn wake(&self) {
        let _ = self.signal.send(PacerSignal::Wake);
    }

    /// Whether the thread has not been joined yet.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop and join the thread, returning its session counters.
    ///
    /// Returns `None` if the thread was already joined or panicked.
    pub fn stop(&mut self) -> Option<StreamSession> {
        let worker = self.worker.take()?;
        let _ = self.signal.send(PacerSignal::Stop);
        worker.join().ok()
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run(ctx: PacerContext, rx: mpsc::Receiver<PacerSignal>) -> StreamSession {
    let period = ctx.interval.period();
    let mut session = StreamSession::new();
    tracing::debug!(
        interval = %ctx.interval,
        period_ms = period.as_millis() as u64,
        "pacer started"
    );

    loop {
        match rx.recv_timeout(wait_for(period)) {
            Ok(PacerSignal::Wake) | Err(RecvTimeoutError::Timeout) => tick(&ctx, &mut session),
            Ok(PacerSignal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!(
        ticks = session.ticks,
        frames = session.sequence,
        motion = session.motion,
        "pacer exited"
    );
    session
}

// A zero period would spin; one millisecond is the shortest supported interval anyway.
fn wait_for(period: Duration) -> Duration {
    period.max(Duration::from_millis(1))
}

/// Run one production step against the shared queues.
pub fn tick(ctx: &PacerContext, session: &mut StreamSession) {
    session.ticks += 1;
    ctx.metrics.tick();

    let Some(mut buffer) = ctx.pending.take_oldest() else {
        ctx.metrics.empty_tick();
        tracing::debug!(tick = session.ticks, "no pending buffer");
        return;
    };

    match ctx.synth.fill(&mut buffer, session) {
        Ok(sequence) => {
            ctx.metrics.produced();
            tracing::debug!(
                index = buffer.index(),
                sequence,
                bytes = buffer.meta().bytes_used,
                "buffer filled"
            );
        }
        Err(err) => {
            ctx.metrics.fill_error();
            tracing::error!(error = %err, "buffer unavailable");
        }
    }
    ctx.done.submit(buffer);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(interval: Interval) -> PacerContext {
        let fmt = PixelFormat::lookup(FourCc::YUYV).unwrap();
        PacerContext {
            synth: Arc::new(FrameSynth::new(fmt, Resolution::new(48, 32).unwrap(), 0)),
            pending: Arc::new(BufferQueue::new()),
            done: Arc::new(BufferQueue::new()),
            metrics: Arc::new(StreamMetrics::default()),
            interval,
        }
    }

    fn frame_buffer(ctx: &PacerContext, index: u32) -> CaptureBuffer {
        CaptureBuffer::new(index, vec![0u8; ctx.synth.frame_bytes()])
    }

    #[test]
    fn tick_on_empty_queue_is_counted_not_fatal() {
        let ctx = context(Interval::DEFAULT);
        let mut session = StreamSession::new();
        tick(&ctx, &mut session);
        tick(&ctx, &mut session);
        let snap = ctx.metrics.snapshot();
        assert_eq!(snap.ticks, 2);
        assert_eq!(snap.empty_ticks, 2);
        assert!(ctx.done.is_empty());
        assert_eq!(session.sequence, 0);
    }

    #[test]
    fn tick_fills_in_submission_order() {
        let ctx = context(Interval::DEFAULT);
        for index in 0..3 {
            ctx.pending.submit(frame_buffer(&ctx, index));
        }
        let mut session = StreamSession::new();
        for _ in 0..3 {
            tick(&ctx, &mut session);
        }
        let done = ctx.done.drain_all();
        let order: Vec<_> = done.iter().map(|b| (b.index(), b.meta().sequence)).collect();
        assert_eq!(order, vec![(0, 0), (1, 1), (2, 2)]);
        assert!(done.iter().all(|b| b.meta().state == BufferState::Done));
    }

    #[test]
    fn unmapped_buffer_returns_with_error_state() {
        let ctx = context(Interval::DEFAULT);
        ctx.pending.submit(CaptureBuffer::unmapped(7));
        let mut session = StreamSession::new();
        tick(&ctx, &mut session);
        let buf = ctx.done.take_oldest().unwrap();
        assert_eq!(buf.index(), 7);
        assert_eq!(buf.meta().state, BufferState::Error);
        assert_eq!(ctx.metrics.snapshot().fill_errors, 1);
    }

    #[test]
    fn wake_produces_before_the_period_elapses() {
        // One frame per ten seconds: only the wake can explain a fast result.
        let ctx = context(Interval::from_raw(10, 1).unwrap());
        ctx.pending.submit(frame_buffer(&ctx, 0));
        let mut pacer = Pacer::spawn("pacer-wake", ctx.clone()).unwrap();
        pacer.wake();
        let buf = ctx.done.wait_oldest(Duration::from_secs(2));
        assert!(buf.is_some());
        pacer.stop();
    }

    #[test]
    fn timer_keeps_producing_without_wakes() {
        let ctx = context(Interval::from_raw(1, 200).unwrap());
        for index in 0..4 {
            ctx.pending.submit(frame_buffer(&ctx, index));
        }
        let mut pacer = Pacer::spawn("pacer-timer", ctx.clone()).unwrap();
        let mut sequences = Vec::new();
        while sequences.len() < 4 {
            let buf = ctx
                .done
                .wait_oldest(Duration::from_secs(2))
                .expect("timer tick");
            sequences.push(buf.meta().sequence);
        }
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        let session = pacer.stop().unwrap();
        assert_eq!(session.sequence, 4);
    }

    #[test]
    fn stop_is_idempotent_and_prompt() {
        let ctx = context(Interval::from_raw(1, 10).unwrap());
        let mut pacer = Pacer::spawn("pacer-stop", ctx).unwrap();
        let started = std::time::Instant::now();
        assert!(pacer.stop().is_some());
        assert!(pacer.stop().is_none());
        assert!(!pacer.is_running());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
