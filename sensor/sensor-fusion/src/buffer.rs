//! Time-ordered buffer for pending stream items.

use std::collections::VecDeque;

use sensor_types::Timestamp;

/// A bounded buffer that keeps items sorted by timestamp.
///
/// Items may be pushed out of order; each push lands at its sorted
/// position, after any existing items with the same timestamp. When the
/// buffer is full, the oldest of the buffered items and the incoming one is
/// evicted.
///
/// # Example
///
/// ```
/// use sensor_fusion::StreamBuffer;
/// use sensor_types::Timestamp;
///
/// let mut buffer = StreamBuffer::new(8);
/// buffer.push(Timestamp::from_nanos(20), "b");
/// buffer.push(Timestamp::from_nanos(10), "a");
///
/// assert_eq!(buffer.oldest().map(|(_, v)| *v), Some("a"));
/// assert_eq!(buffer.latest().map(|(_, v)| *v), Some("b"));
/// ```
#[derive(Debug, Clone)]
pub struct StreamBuffer<T> {
    capacity: usize,
    items: VecDeque<(Timestamp, T)>,
}

impl<T> StreamBuffer<T> {
    /// Creates a buffer holding at most `capacity` items (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::with_capacity(capacity.clamp(1, 64)),
        }
    }

    /// Returns the capacity of the buffer.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if the buffer is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Inserts an item at its sorted position.
    ///
    /// Returns the evicted oldest item if the buffer was full. An incoming
    /// item older than everything buffered is returned without being stored.
    pub fn push(&mut self, timestamp: Timestamp, value: T) -> Option<(Timestamp, T)> {
        let evicted = if self.is_full() {
            if self.items.front().is_some_and(|(t, _)| timestamp < *t) {
                return Some((timestamp, value));
            }
            self.items.pop_front()
        } else {
            None
        };
        let index = self.items.partition_point(|(t, _)| *t <= timestamp);
        self.items.insert(index, (timestamp, value));
        evicted
    }

    /// Returns the oldest item.
    #[must_use]
    pub fn oldest(&self) -> Option<&(Timestamp, T)> {
        self.items.front()
    }

    /// Returns the newest item.
    #[must_use]
    pub fn latest(&self) -> Option<&(Timestamp, T)> {
        self.items.back()
    }

    /// Removes and returns the oldest item.
    pub fn pop_oldest(&mut self) -> Option<(Timestamp, T)> {
        self.items.pop_front()
    }

    /// Returns the timestamp range `(min, max)`, or `None` if empty.
    #[must_use]
    pub fn timestamp_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((self.items.front()?.0, self.items.back()?.0))
    }

    /// Returns an iterator over items in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = &(Timestamp, T)> {
        self.items.iter()
    }
}
