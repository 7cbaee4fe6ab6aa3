//! Bounded relay queue with drop-oldest backpressure
//!
//! Decouples the ingest path from uplink health: pushing never waits,
//! so the sensor-facing read loop stays responsive no matter how long
//! the uplink is down, trading staleness for liveness. At capacity the
//! longest-queued frame is discarded to admit the new one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, Notify};

/// Bounded FIFO with drop-oldest overflow
///
/// Capacity is fixed at construction and never grows. One producer and
/// one consumer share it through an `Arc`.
#[derive(Debug)]
pub struct RelayQueue<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> RelayQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue an item.
    ///
    /// Never waits for capacity and never fails: at capacity the oldest
    /// item is evicted first and the drop counter increments.
    pub async fn push(&self, item: T) {
        {
            let mut items = self.items.lock().await;
            if items.len() == self.capacity {
                items.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            items.push_back(item);
        }
        self.notify.notify_one();
    }

    /// Dequeue the oldest item, suspending until one exists.
    ///
    /// Cancel-safe: dropping the future never loses an item.
    pub async fn pop(&self) -> T {
        loop {
            {
                let mut items = self.items.lock().await;
                if let Some(item) = items.pop_front() {
                    return item;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Items currently queued.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether the queue is currently empty.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items evicted by drop-oldest so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_drop_oldest_at_capacity() {
        let queue = RelayQueue::new(3);

        queue.push("A").await;
        queue.push("B").await;
        queue.push("C").await;
        queue.push("D").await;

        assert_eq!(queue.len().await, 3);
        assert_eq!(queue.dropped(), 1);

        assert_eq!(queue.pop().await, "B");
        assert_eq!(queue.pop().await, "C");
        assert_eq!(queue.pop().await, "D");
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(RelayQueue::new(8));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        // Give the consumer a chance to park first
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(42u32).await;

        assert_eq!(consumer.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_capacity_never_grows() {
        let queue = RelayQueue::new(2);

        for i in 0..100u32 {
            queue.push(i).await;
        }

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.capacity(), 2);
        assert_eq!(queue.dropped(), 98);
        assert_eq!(queue.pop().await, 98);
        assert_eq!(queue.pop().await, 99);
    }
}
