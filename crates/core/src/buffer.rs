use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::format::{Field, FrameFormat};

/// Writable memory region backing a capture buffer.
///
/// Allocation and mapping belong to the caller; the emulator only ever
/// writes through this trait.
pub trait FrameMemory: Send {
    /// Borrow the region immutably.
    fn as_slice(&self) -> &[u8];

    /// Borrow the region for writing.
    fn as_mut_slice(&mut self) -> &mut [u8];
}

impl FrameMemory for Vec<u8> {
    fn as_slice(&self) -> &[u8] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

impl FrameMemory for Box<[u8]> {
    fn as_slice(&self) -> &[u8] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

/// Lifecycle state of a capture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// Owned by the caller or waiting in the pending queue.
    #[default]
    Queued,
    /// Filled with a frame.
    Done,
    /// Could not be filled (memory missing or too small).
    Error,
    /// Released unfilled because streaming stopped.
    Cancelled,
}

impl BufferState {
    /// Whether the state ends a submission.
    pub fn is_terminal(self) -> bool {
        !matches!(self, BufferState::Queued)
    }
}

/// Metadata reported with a returned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferMeta {
    /// Frame sequence number within the streaming session.
    pub sequence: u32,
    /// Field order of the payload.
    pub field: Field,
    /// Payload bytes written.
    pub bytes_used: usize,
    /// Nanoseconds since the streaming session started.
    pub timestamp: u64,
    /// Outcome of the submission.
    pub state: BufferState,
}

/// Caller buffer travelling through the pending and completed queues.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::{BufferState, CaptureBuffer};
///
/// let buf = CaptureBuffer::new(0, vec![0u8; 64]);
/// assert_eq!(buf.capacity(), Some(64));
/// assert_eq!(buf.meta().state, BufferState::Queued);
/// ```
pub struct CaptureBuffer {
    index: u32,
    memory: Option<Box<dyn FrameMemory>>,
    meta: BufferMeta,
}

impl CaptureBuffer {
    /// Wrap caller memory under a slot index.
    pub fn new(index: u32, memory: impl FrameMemory + 'static) -> Self {
        Self {
            index,
            memory: Some(Box::new(memory)),
            meta: BufferMeta::default(),
        }
    }

    /// A buffer whose memory is not mapped (yet).
    pub fn unmapped(index: u32) -> Self {
        Self {
            index,
            memory: None,
            meta: BufferMeta::default(),
        }
    }

    /// Slot index chosen by the caller.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Outcome metadata of the latest submission.
    pub fn meta(&self) -> &BufferMeta {
        &self.meta
    }

    /// Size of the backing memory, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.memory.as_ref().map(|m| m.as_slice().len())
    }

    /// Whole backing memory, `None` when unmapped.
    pub fn data(&self) -> Option<&[u8]> {
        self.memory.as_deref().map(|m| m.as_slice())
    }

    /// Whole backing memory for writing, `None` when unmapped.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        self.memory.as_deref_mut().map(|m| m.as_mut_slice())
    }

    /// Filled payload (`bytes_used` prefix of the memory).
    pub fn payload(&self) -> &[u8] {
        self.data()
            .and_then(|d| d.get(..self.meta.bytes_used))
            .unwrap_or(&[])
    }

    /// Reset metadata so the buffer can be submitted again.
    pub fn requeue(&mut self) {
        self.meta = BufferMeta::default();
    }

    /// Record a successful fill.
    pub fn complete(&mut self, sequence: u32, bytes_used: usize, timestamp: u64) {
        self.meta = BufferMeta {
            sequence,
            field: Field::Interlaced,
            bytes_used,
            timestamp,
            state: BufferState::Done,
        };
    }

    /// Set the outcome without touching the payload metadata.
    pub fn set_state(&mut self, state: BufferState) {
        self.meta.state = state;
    }
}

impl fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("index", &self.index)
            .field("capacity", &self.capacity())
            .field("meta", &self.meta)
            .finish()
    }
}

/// Frame-sized allocation on loan from a [`BufferPool`].
///
/// Dropping it parks the memory in the pool for the next
/// [`BufferPool::lease`].
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::*;
///
/// let fmt = PixelFormat::lookup(FourCc::RGB565).unwrap();
/// let frame = FrameFormat::new(fmt, Resolution::new(64, 48).unwrap());
/// let pool = BufferPool::for_frame(&frame, 2);
/// let lease = pool.lease();
/// assert_eq!(lease.as_slice().len(), 64 * 48 * 2);
/// ```
pub struct BufferLease {
    pool: Arc<PoolInner>,
    frame: Option<Box<[u8]>>,
}

impl FrameMemory for BufferLease {
    fn as_slice(&self) -> &[u8] {
        self.frame.as_deref().unwrap_or_default()
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self.frame.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.pool.park(frame);
        }
    }
}

/// Recycling allocator handing out memory for exactly one frame.
///
/// The frame size comes from [`FrameFormat::size_image`]. `count`
/// allocations are made up front and at most `count` are kept idle, so a
/// device reallocating the same buffer set never touches the heap again.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Pool for `count` buffers of the frame described by `frame`.
    pub fn for_frame(frame: &FrameFormat, count: usize) -> Self {
        let frame_size = frame.size_image as usize;
        let idle = (0..count).map(|_| zeroed(frame_size)).collect();
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(idle),
                frame_size,
                retain: count,
            }),
        }
    }

    /// Take an idle allocation, or allocate once the idle set is exhausted.
    pub fn lease(&self) -> BufferLease {
        let frame = self.inner.idle.lock().pop();
        BufferLease {
            frame: Some(frame.unwrap_or_else(|| zeroed(self.inner.frame_size))),
            pool: Arc::clone(&self.inner),
        }
    }

    /// Bytes in each allocation.
    pub fn frame_size(&self) -> usize {
        self.inner.frame_size
    }

    /// Allocations parked and ready to lease.
    pub fn idle(&self) -> usize {
        self.inner.idle.lock().len()
    }
}

fn zeroed(len: usize) -> Box<[u8]> {
    vec![0u8; len].into_boxed_slice()
}

struct PoolInner {
    idle: Mutex<Vec<Box<[u8]>>>,
    frame_size: usize,
    retain: usize,
}

impl PoolInner {
    fn park(&self, frame: Box<[u8]>) {
        let mut idle = self.idle.lock();
        if idle.len() < self.retain {
            idle.push(frame);
        }
    }
}
