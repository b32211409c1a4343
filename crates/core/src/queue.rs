use std::{collections::VecDeque, time::Duration};

use parking_lot::{Condvar, Mutex};

/// FIFO of buffers shared between submitting callers and the producer.
///
/// The lock is held only for the `VecDeque` operation itself, never across
/// pixel work, so submitters contend with the producer for a few
/// instructions at most.
///
/// # Example
/// ```rust
/// use framefeed_core::prelude::BufferQueue;
///
/// let queue = BufferQueue::new();
/// queue.submit(1u8);
/// queue.submit(2u8);
/// assert_eq!(queue.take_oldest(), Some(1));
/// assert_eq!(queue.drain_all(), vec![2]);
/// assert_eq!(queue.take_oldest(), None);
/// ```
pub struct BufferQueue<T> {
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> BufferQueue<T> {
    /// Empty queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    /// Append to the tail and wake one waiter.
    pub fn submit(&self, item: T) {
        self.items.lock().push_back(item);
        self.ready.notify_one();
    }

    /// Append several items in order under a single lock hold.
    pub fn submit_all(&self, items: impl IntoIterator<Item = T>) {
        let mut guard = self.items.lock();
        let before = guard.len();
        guard.extend(items);
        let added = guard.len() - before;
        drop(guard);
        for _ in 0..added {
            self.ready.notify_one();
        }
    }

    /// Remove the head; `None` means nothing is pending right now.
    pub fn take_oldest(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Remove the head, waiting up to `timeout` for one to arrive.
    pub fn wait_oldest(&self, timeout: Duration) -> Option<T> {
        let mut guard = self.items.lock();
        if guard.is_empty() {
            // Spurious wakeups only cost another empty check.
            let _ = self
                .ready
                .wait_while_for(&mut guard, |items| items.is_empty(), timeout);
        }
        guard.pop_front()
    }

    /// Remove everything, oldest first.
    pub fn drain_all(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for BufferQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Instant};

    #[test]
    fn take_oldest_preserves_submission_order() {
        let queue = BufferQueue::new();
        for i in 0..5 {
            queue.submit(i);
        }
        let taken: Vec<_> = std::iter::from_fn(|| queue.take_oldest()).collect();
        assert_eq!(taken, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_queue_stays_empty_on_repeated_take() {
        let queue = BufferQueue::<u32>::new();
        assert_eq!(queue.take_oldest(), None);
        assert_eq!(queue.take_oldest(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_all_empties_queue() {
        let queue = BufferQueue::new();
        queue.submit_all(["a", "b", "c"]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain_all(), vec!["a", "b", "c"]);
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn wait_oldest_times_out_when_empty() {
        let queue = BufferQueue::<u8>::new();
        let start = Instant::now();
        assert_eq!(queue.wait_oldest(Duration::from_millis(20)), None);
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn wait_oldest_wakes_on_submit() {
        let queue = Arc::new(BufferQueue::new());
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                queue.submit(42u32);
            })
        };
        assert_eq!(queue.wait_oldest(Duration::from_secs(5)), Some(42));
        producer.join().unwrap();
    }

    #[test]
    fn concurrent_submit_and_take_loses_nothing() {
        let queue = Arc::new(BufferQueue::new());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.submit(w * 1000 + i);
                    }
                })
            })
            .collect();
        let mut seen = Vec::new();
        while seen.len() < 1000 {
            if let Some(v) = queue.take_oldest() {
                seen.push(v);
            }
        }
        for w in writers {
            w.join().unwrap();
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 1000);
        assert!(queue.is_empty());
    }
}
