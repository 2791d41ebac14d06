//! Lock-free work queue shared by every pipeline
//!
//! Unbounded multi-producer queue: producers never block and never fail.
//! Each pipeline has a single consumer that polls it.

use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unbounded FIFO queue with enqueue/dequeue counters
pub struct WorkQueue<T> {
    queue: SegQueue<T>,
    enqueued: AtomicU64,
    dequeued: AtomicU64,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
        }
    }

    /// Append an item
    pub fn push(&self, item: T) {
        self.queue.push(item);
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the oldest item, if any
    pub fn pop(&self) -> Option<T> {
        let item = self.queue.pop()?;
        self.dequeued.fetch_add(1, Ordering::Relaxed);
        Some(item)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Counters since creation
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            pending: self.queue.len(),
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub pending: usize,
}

/// Thread-safe handle to a work queue
pub type SharedQueue<T> = Arc<WorkQueue<T>>;

/// Create a new shared queue
pub fn create_shared_queue<T>() -> SharedQueue<T> {
    Arc::new(WorkQueue::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_queue_fifo() {
        let queue = WorkQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());

        let stats = queue.stats();
        assert_eq!(stats.enqueued, 3);
        assert_eq!(stats.dequeued, 3);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn test_concurrent_producers() {
        let queue = create_shared_queue::<(usize, usize)>();

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push((p, i));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        // Per-producer order survives interleaving
        let mut last = [None::<usize>; 4];
        let mut count = 0;
        while let Some((p, i)) = queue.pop() {
            if let Some(prev) = last[p] {
                assert!(i > prev);
            }
            last[p] = Some(i);
            count += 1;
        }
        assert_eq!(count, 1000);
    }
}
