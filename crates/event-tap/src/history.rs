//! Bounded, order-preserving store of committed records.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::model::EventRecord;

/// Append-only ring trimmed back to its bound in one step per append.
#[derive(Debug)]
pub(crate) struct HistoryBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<EventRecord>>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Appends `record`, dropping the oldest entries once the bound is
    /// crossed. Returns how many entries the trim removed.
    pub fn push(&self, record: EventRecord) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(record);
        let excess = entries.len().saturating_sub(self.capacity);
        if excess > 0 {
            entries.drain(..excess);
        }
        excess
    }

    /// Oldest-to-newest copy of the current contents.
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventPhase;
    use chrono::Utc;

    fn record(event_type: &str, ts_mono: u128) -> EventRecord {
        EventRecord {
            event_type: event_type.into(),
            target: "unknown".into(),
            ts_mono,
            ts_wall: Utc::now(),
            duration_us: None,
            phase: EventPhase::Bubbling,
            bubbles: true,
            cancelled: false,
            synthetic: false,
        }
    }

    #[test]
    fn keeps_newest_entries_in_order() {
        let buffer = HistoryBuffer::new(3);
        for i in 0..5u128 {
            buffer.push(record("click", i));
        }
        let kept: Vec<u128> = buffer.snapshot().iter().map(|r| r.ts_mono).collect();
        assert_eq!(kept, vec![2, 3, 4]);
    }

    #[test]
    fn push_reports_trimmed_count() {
        let buffer = HistoryBuffer::new(2);
        assert_eq!(buffer.push(record("click", 0)), 0);
        assert_eq!(buffer.push(record("click", 1)), 0);
        assert_eq!(buffer.push(record("click", 2)), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let buffer = HistoryBuffer::new(0);
        buffer.push(record("click", 0));
        buffer.push(record("click", 1));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.snapshot()[0].ts_mono, 1);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let buffer = HistoryBuffer::new(4);
        buffer.push(record("scroll", 0));
        buffer.clear();
        assert_eq!(buffer.len(), 0);
        assert!(buffer.snapshot().is_empty());
    }
}
