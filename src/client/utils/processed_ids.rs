use std::collections::{HashSet, VecDeque};

pub const DEFAULT_CAPACITY: usize = 300;
pub const DEFAULT_TRIM_TO: usize = 200;

/// Bounded, insertion-ordered set of ids already applied. Makes "apply
/// inbound event" idempotent under at-least-once delivery and reconnect
/// replay. Once it grows past `capacity` the oldest ids are evicted until
/// `trim_to` remain.
#[derive(Debug, Clone)]
pub struct ProcessedIdWindow {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
    trim_to: usize,
}

impl Default for ProcessedIdWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TRIM_TO)
    }
}

impl ProcessedIdWindow {
    pub fn new(capacity: usize, trim_to: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity + 1),
            seen: HashSet::with_capacity(capacity + 1),
            capacity,
            trim_to: trim_to.min(capacity),
        }
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Returns `true` the first time an id is recorded.
    pub fn mark_seen(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        if self.order.len() > self.capacity {
            while self.order.len() > self.trim_to {
                if let Some(oldest) = self.order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
