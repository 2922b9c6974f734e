/// Fixed-capacity history of averaged records
use crate::models::HistoryRecord;

/// Ring buffer holding at most `capacity` items, newest first on read
///
/// Inserting into a full history overwrites the oldest slot in place.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T = HistoryRecord> {
    slots: Vec<T>,
    capacity: usize,
    /// Slot the next insert writes to
    next: usize,
}

impl<T: Clone> BoundedHistory<T> {
    /// Panics if `capacity` is zero; configuration rejects that earlier.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    pub fn insert(&mut self, record: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(record);
        } else {
            // evicts the oldest
            self.slots[self.next] = record;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let len = self.slots.len();
        (1..=len).map(move |back| &self.slots[(self.next + self.capacity - back) % self.capacity])
    }

    /// Owned copy, newest to oldest
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
