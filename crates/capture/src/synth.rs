//! Frame synthesizer: stamps shifted copies of the reference line into buffers.
use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;

use framefeed_core::prelude::*;

use crate::scanline::Scanline;

/// Pixels the pattern scrolls per produced frame.
pub const MOTION_STEP: usize = 2;

/// Reasons a pending buffer could not be filled.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FillError {
    /// The buffer has no memory attached.
    #[error("buffer {0} has no memory attached")]
    MissingMemory(u32),
    /// The buffer memory cannot hold one frame.
    #[error("buffer {index} holds {actual} bytes, frame needs {needed}")]
    ShortMemory {
        index: u32,
        needed: usize,
        actual: usize,
    },
}

/// Per-session counters owned by the producer thread.
///
/// Created fresh at every stream start and handed back when the producer
/// joins.
#[derive(Debug, Clone)]
pub struct StreamSession {
    /// Pacing ticks executed.
    pub ticks: u64,
    /// Cumulative horizontal motion in pixels.
    pub motion: usize,
    /// Sequence number given to the next filled buffer.
    pub sequence: u32,
    started: Instant,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            motion: 0,
            sequence: 0,
            started: Instant::now(),
        }
    }

    /// Nanoseconds since the session started.
    pub fn elapsed_nanos(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of everything needed to synthesize frames.
///
/// # Example
/// ```rust
/// use framefeed_capture::synth::{FrameSynth, StreamSession};
/// use framefeed_core::prelude::*;
///
/// let fmt = PixelFormat::lookup(FourCc::YUYV).unwrap();
/// let synth = FrameSynth::new(fmt, Resolution::new(48, 32).unwrap(), 0);
/// let mut session = StreamSession::new();
/// let mut buf = CaptureBuffer::new(0, vec![0u8; synth.frame_bytes()]);
///
/// assert_eq!(synth.fill(&mut buf, &mut session), Ok(0));
/// assert_eq!(buf.meta().state, BufferState::Done);
/// assert_eq!(buf.meta().field, Field::Interlaced);
/// ```
#[derive(Debug, Clone)]
pub struct FrameSynth {
    format: &'static PixelFormat,
    resolution: Resolution,
    scanline: Scanline,
}

impl FrameSynth {
    /// Build the reference line for `format` at `resolution`.
    pub fn new(format: &'static PixelFormat, resolution: Resolution, alpha: u8) -> Self {
        let scanline = Scanline::rebuild(format, resolution.width.get(), alpha);
        Self {
            format,
            resolution,
            scanline,
        }
    }

    pub fn format(&self) -> &'static PixelFormat {
        self.format
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn scanline(&self) -> &Scanline {
        &self.scanline
    }

    /// Bytes in one visible row.
    pub fn row_bytes(&self) -> usize {
        self.resolution.width.get() as usize * self.format.bytes_per_pixel()
    }

    /// Bytes in one full frame.
    pub fn frame_bytes(&self) -> usize {
        self.row_bytes() * self.resolution.height.get() as usize
    }

    /// Fill `buffer` with the next frame of the session.
    ///
    /// Motion advances on every call. The sequence counter only advances
    /// when the frame is actually written, so filled buffers always carry
    /// consecutive numbers. The buffer state is set to `Done` or `Error`.
    pub fn fill(
        &self,
        buffer: &mut CaptureBuffer,
        session: &mut StreamSession,
    ) -> Result<u32, FillError> {
        let shift = session.motion % self.resolution.width.get() as usize;
        session.motion = session.motion.wrapping_add(MOTION_STEP);

        let row_bytes = self.row_bytes();
        let frame_bytes = self.frame_bytes();
        let index = buffer.index();

        let Some(data) = buffer.data_mut() else {
            buffer.set_state(BufferState::Error);
            return Err(FillError::MissingMemory(index));
        };
        if data.len() < frame_bytes {
            let actual = data.len();
            buffer.set_state(BufferState::Error);
            return Err(FillError::ShortMemory {
                index,
                needed: frame_bytes,
                actual,
            });
        }

        let row = self.scanline.row(shift);
        data[..frame_bytes]
            .par_chunks_exact_mut(row_bytes)
            .for_each(|dst| dst.copy_from_slice(row));

        let sequence = session.sequence;
        session.sequence = session.sequence.wrapping_add(1);
        buffer.complete(sequence, frame_bytes, session.elapsed_nanos());
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(fourcc: FourCc, width: u32, height: u32) -> FrameSynth {
        let fmt = PixelFormat::lookup(fourcc).unwrap();
        FrameSynth::new(fmt, Resolution::new(width, height).unwrap(), 0)
    }

    #[test]
    fn every_row_matches_the_shifted_line() {
        let synth = synth(FourCc::RGB24, 64, 40);
        let mut session = StreamSession::new();
        session.motion = 10;
        let mut buf = CaptureBuffer::new(3, vec![0u8; synth.frame_bytes()]);

        synth.fill(&mut buf, &mut session).unwrap();

        let expected = synth.scanline().row(10).to_vec();
        for row in buf.payload().chunks_exact(synth.row_bytes()) {
            assert_eq!(row, expected.as_slice());
        }
        assert_eq!(buf.meta().bytes_used, 64 * 40 * 3);
        assert_eq!(session.motion, 12);
    }

    #[test]
    fn consecutive_fills_number_sequentially_and_scroll() {
        let synth = synth(FourCc::YUYV, 48, 32);
        let mut session = StreamSession::new();
        let mut first_rows = Vec::new();
        for expected in 0..5u32 {
            let mut buf = CaptureBuffer::new(expected, vec![0u8; synth.frame_bytes()]);
            assert_eq!(synth.fill(&mut buf, &mut session), Ok(expected));
            assert_eq!(buf.meta().sequence, expected);
            first_rows.push(buf.payload()[..synth.row_bytes()].to_vec());
        }
        assert_eq!(session.motion, 10);
        assert_ne!(first_rows[0], first_rows[3]);
    }

    #[test]
    fn missing_memory_keeps_sequence_but_moves_pattern() {
        let synth = synth(FourCc::RGB565, 48, 32);
        let mut session = StreamSession::new();
        let mut unmapped = CaptureBuffer::unmapped(0);

        assert_eq!(
            synth.fill(&mut unmapped, &mut session),
            Err(FillError::MissingMemory(0))
        );
        assert_eq!(unmapped.meta().state, BufferState::Error);
        assert_eq!(session.sequence, 0);
        assert_eq!(session.motion, MOTION_STEP);

        let mut buf = CaptureBuffer::new(1, vec![0u8; synth.frame_bytes()]);
        assert_eq!(synth.fill(&mut buf, &mut session), Ok(0));
    }

    #[test]
    fn short_memory_is_rejected() {
        let synth = synth(FourCc::BGR32, 48, 32);
        let mut session = StreamSession::new();
        let mut buf = CaptureBuffer::new(2, vec![0u8; 16]);
        assert_eq!(
            synth.fill(&mut buf, &mut session),
            Err(FillError::ShortMemory {
                index: 2,
                needed: 48 * 32 * 4,
                actual: 16
            })
        );
        assert!(buf.payload().is_empty());
    }

    #[test]
    fn oversized_memory_only_reports_frame_bytes() {
        let synth = synth(FourCc::UYVY, 48, 32);
        let mut session = StreamSession::new();
        let mut buf = CaptureBuffer::new(0, vec![0xAAu8; synth.frame_bytes() + 100]);
        synth.fill(&mut buf, &mut session).unwrap();
        assert_eq!(buf.meta().bytes_used, synth.frame_bytes());
        assert_eq!(buf.data().unwrap()[synth.frame_bytes()], 0xAA);
    }
}
