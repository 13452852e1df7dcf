use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::core::error::QueueError;

/// core FIFO sequence: handles only enqueue/dequeue logic, no locking
#[derive(Debug)]
pub(crate) struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Queue<T> {
    /// Create a new, empty queue
    pub(crate) fn new() -> Self {
        Self { items: VecDeque::new() }
    }

    /// Enqueue an item at the tail
    pub(crate) fn enqueue(&mut self, item: T) {
        let len_before = self.items.len();
        self.items.push_back(item);
        // -- post op assertion: exactly one item appended
        debug_assert_eq!(self.items.len(), len_before + 1, "Queue length should grow by 1");
    }

    /// Dequeue the head item
    pub(crate) fn dequeue(&mut self) -> Option<T> {
        let len_before = self.items.len();
        let result = self.items.pop_front();
        // -- post op assertion: queue size decreases if dequeue succeeded
        match result {
            Some(_) => debug_assert_eq!(self.items.len(), len_before - 1, "Queue length should decrease by 1"),
            None => debug_assert_eq!(len_before, 0, "Queue length unchanged when empty"),
        }
        result
    }

    /// Exchange the whole sequence with `other`
    pub(crate) fn swap_items(&mut self, other: &mut VecDeque<T>) {
        std::mem::swap(&mut self.items, other);
    }

    /// Get the current queue length
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Thread-safe FIFO queue.
///
/// Every operation, including the read-only `len` and `is_empty`, takes the
/// same exclusive guard for the duration of its work on the sequence, so no
/// caller ever observes a partially applied push, pop or swap. `pop` never
/// waits for an item: an empty queue yields `None` and consumers re-poll.
///
/// The type is not `Clone`. Owned moves always carry every item across; see
/// [`ConcurrentQueue::relocate_from`] for relocating out of a shared instance.
pub struct ConcurrentQueue<T> {
    inner: Mutex<Queue<T>>,
}

impl<T> ConcurrentQueue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Queue::new()) }
    }

    /// Number of items at the instant the guard was taken.
    ///
    /// Other threads may push or pop as soon as the guard is released, so the
    /// value can be stale by the time the caller looks at it.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the queue was empty at the instant the guard was taken.
    /// Subject to the same staleness as [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Append `item` at the tail. Never fails and wakes no one.
    pub fn push(&self, item: T) {
        self.inner.lock().enqueue(item);
    }

    /// Remove and return the head item, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().dequeue()
    }

    /// Exchange the queue's entire contents with `other` in one critical
    /// section. After the call the queue yields the former contents of
    /// `other` in order, and `other` holds what the queue held.
    ///
    /// `other` is borrowed mutably, so the caller owns it exclusively for the
    /// duration of the swap; only this queue's guard is taken.
    pub fn swap(&self, other: &mut VecDeque<T>) {
        let mut queue = self.inner.lock();
        trace!(incoming = other.len(), outgoing = queue.len(), "swapping queue contents");
        queue.swap_items(other);
    }

    /// Relocate a shared queue into a new instance.
    ///
    /// Only an empty `other` may be relocated: if it holds items when its
    /// guard is taken, this returns [`QueueError::NonEmptySource`] and `other`
    /// is left exactly as it was. Use [`swap`](Self::swap) to drain a
    /// non-empty queue instead.
    pub fn relocate_from(other: &Self) -> Result<Self, QueueError> {
        let mut source = other.inner.lock();
        if !source.is_empty() {
            let len = source.len();
            warn!(len, "rejected relocation from non-empty queue");
            return Err(QueueError::NonEmptySource { len });
        }
        Ok(Self::from(std::mem::take(&mut source.items)))
    }

    /// Consume the queue and return its items in FIFO order.
    pub fn into_inner(self) -> VecDeque<T> {
        self.inner.into_inner().items
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<VecDeque<T>> for ConcurrentQueue<T> {
    fn from(items: VecDeque<T>) -> Self {
        Self { inner: Mutex::new(Queue { items }) }
    }
}

impl<T> FromIterator<T> for ConcurrentQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<VecDeque<T>>())
    }
}

impl<T> fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentQueue").field("len", &self.len()).finish()
    }
}
