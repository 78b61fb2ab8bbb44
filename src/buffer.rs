use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::batch::GaugeRecord;

/// Fixed-capacity FIFO of pending gauges, shared between any number of
/// producers and the single background drainer.
///
/// Uses `std::sync::Mutex` (not tokio) because the lock is never held across
/// an await — every operation is a short queue manipulation.
#[derive(Clone)]
pub struct GaugeBuffer {
    queue: Arc<Mutex<VecDeque<GaugeRecord>>>,
    capacity: usize,
}

impl GaugeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a record, rejecting it when the buffer is at capacity.
    ///
    /// Returns `false` immediately on a full buffer — producers are never
    /// blocked; reporting the drop is the caller's job.
    pub fn push(&self, record: GaugeRecord) -> bool {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(record);
        true
    }

    /// Remove and return up to `max` records in FIFO order. Non-blocking:
    /// returns whatever is currently available, possibly nothing.
    pub fn drain_up_to(&self, max: usize) -> Vec<GaugeRecord> {
        let mut queue = self.queue.lock().unwrap();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    #[allow(dead_code)] // used by tests
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}
