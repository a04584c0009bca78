use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::model::DiagEntry;

#[derive(Debug, Default)]
pub struct DiagRing {
    capacity: usize,
    queue: Mutex<VecDeque<DiagEntry>>,
}

impl DiagRing {
    /// The ring always holds at least one entry; a zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, entry: DiagEntry) {
        let mut guard = self.queue.lock();
        while guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> Vec<DiagEntry> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Last `limit` entries whose type equals `kind`, oldest first.
    pub fn tail_of_kind(&self, kind: &str, limit: usize) -> Vec<DiagEntry> {
        let guard = self.queue.lock();
        let mut out: Vec<DiagEntry> = guard
            .iter()
            .rev()
            .filter(|entry| entry.kind == kind)
            .take(limit)
            .cloned()
            .collect();
        out.reverse();
        out
    }
}
