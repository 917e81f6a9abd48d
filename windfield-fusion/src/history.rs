//! Bounded history of fused estimates
//!
//! Fixed-capacity ring buffer: appends overwrite the oldest slot once the
//! buffer is full, so eviction is O(1) and the length never exceeds the
//! capacity. Iteration is always oldest-first.

use crate::FusedEstimate;

/// Time-ordered, capacity-bounded sequence of fused estimates.
#[derive(Debug, Clone)]
pub struct EstimationHistory {
    /// Backing slots, `capacity` long once full
    slots: Vec<FusedEstimate>,
    /// Slot the next append writes to
    write_index: usize,
    /// Maximum number of retained estimates
    capacity: usize,
}

impl EstimationHistory {
    /// Creates an empty history. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            write_index: 0,
            capacity,
        }
    }

    /// Appends an estimate, evicting the oldest one when full.
    pub fn push(&mut self, estimate: FusedEstimate) {
        if self.slots.len() < self.capacity {
            self.slots.push(estimate);
        } else {
            self.slots[self.write_index] = estimate;
        }
        self.write_index = (self.write_index + 1) % self.capacity;
    }

    /// Number of retained estimates
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of retained estimates
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Position of the oldest estimate in `slots`
    fn oldest_index(&self) -> usize {
        if self.slots.len() < self.capacity {
            0
        } else {
            self.write_index
        }
    }

    /// Estimate at chronological position `index` (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&FusedEstimate> {
        if index >= self.slots.len() {
            return None;
        }
        let slot = (self.oldest_index() + index) % self.slots.len();
        self.slots.get(slot)
    }

    /// Iterates oldest-first
    pub fn iter(
        &self,
    ) -> impl DoubleEndedIterator<Item = &FusedEstimate> + ExactSizeIterator + '_ {
        let len = self.slots.len();
        let oldest = self.oldest_index();
        (0..len).map(move |i| &self.slots[(oldest + i) % len])
    }

    /// Most recently appended estimate
    pub fn latest(&self) -> Option<&FusedEstimate> {
        self.slots.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// The `n` most recent estimates, oldest-first
    pub fn recent(&self, n: usize) -> Vec<&FusedEstimate> {
        let skip = self.slots.len().saturating_sub(n);
        self.iter().skip(skip).collect()
    }

    /// Estimates whose timestamp lies within `window_ms` of `instant_ms`,
    /// oldest-first.
    pub fn within(&self, instant_ms: u64, window_ms: u64) -> Vec<&FusedEstimate> {
        self.iter()
            .filter(|e| e.timestamp_ms.abs_diff(instant_ms) <= window_ms)
            .collect()
    }

    /// Drops every estimate, keeping the capacity
    pub fn clear(&mut self) {
        self.slots.clear();
        self.write_index = 0;
    }
}

impl Default for EstimationHistory {
    fn default() -> Self {
        Self::new(100)
    }
}
