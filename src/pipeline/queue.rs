//! Bounded FIFO queue connecting pipeline stages
//!
//! Enqueue never blocks: a full queue is reported to the producer as
//! backpressure instead of parking its task. Dequeue suspends until an item
//! arrives. After `close()` producers are refused, buffered items drain, and
//! then `dequeue` yields `None` forever.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("queue is full")]
    Full,

    #[error("queue is closed")]
    Closed,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity FIFO for any number of producers and one consumer task.
///
/// The single-consumer shape matters: `Notify` stores at most one pending
/// wake-up, which is exactly enough for one consumer that re-checks the
/// queue before every await.
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    capacity: usize,
    available: Notify,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            available: Notify::new(),
        }
    }

    /// Appends an item, failing fast when the queue is full or closed.
    /// Never awaits and never blocks beyond the internal lock.
    pub fn enqueue(&self, item: T) -> Result<(), EnqueueError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(EnqueueError::Closed);
            }
            if state.items.len() >= self.capacity {
                return Err(EnqueueError::Full);
            }
            state.items.push_back(item);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Removes the oldest item, suspending while the queue is empty.
    /// Returns `None` once the queue is closed and drained.
    pub async fn dequeue(&self) -> Option<T> {
        loop {
            // Register for a wake-up before checking state so a notify
            // landing between the check and the await is not lost.
            let available = self.available.notified();
            {
                let mut state = self.state.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            available.await;
        }
    }

    /// Stops accepting new items and wakes the consumer. Idempotent.
    /// Items already buffered remain dequeueable.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.available.notify_waiters();
        // A consumer between dequeue() calls has no registered waiter yet;
        // the stored permit from notify_one covers that window.
        self.available.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
