//! buffer.rs
//! Bounded in-memory FIFO with overflow-purge-oldest discipline.

use std::collections::VecDeque;

use crate::record::Record;

/// Lock-protected ring of records. `push` purges from the head until there is
/// room, so the buffer never holds more than `capacity` records and callers never
/// block on a full buffer.
pub struct RecordBuffer {
    capacity: usize,
    records: VecDeque<Record>,
}

impl RecordBuffer {
    pub fn new(capacity: usize) -> Self {
        RecordBuffer {
            capacity: capacity.max(1),
            records: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    /// Pushes `record` onto the tail, purging the oldest entries first if needed.
    /// Returns the number of records dropped to make room.
    pub fn push(&mut self, record: Record) -> usize {
        let mut dropped = 0;
        while self.records.len() >= self.capacity {
            self.records.pop_front();
            dropped += 1;
        }
        self.records.push_back(record);
        dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drains every record into a freshly-ordered vector, emptying the buffer.
    pub fn drain_all(&mut self) -> Vec<Record> {
        self.records.drain(..).collect()
    }

    /// Restores previously-drained records to the head, preserving their original
    /// order, ahead of anything ingested while the buffer was locked for a flush.
    /// If the combined size still exceeds capacity, the oldest records (at the
    /// front) are purged, same as `push`'s overflow discipline. Returns the number
    /// purged so the caller can account them in `droppedCount`.
    pub fn restore_to_head(&mut self, records: Vec<Record>) -> usize {
        for record in records.into_iter().rev() {
            self.records.push_front(record);
        }
        let mut dropped = 0;
        while self.records.len() > self.capacity {
            self.records.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
