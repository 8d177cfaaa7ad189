use std::collections::VecDeque;

use crate::pipeline::Reading;

/// Default number of readings kept for display
pub const DEFAULT_CAPACITY: usize = 20;

/// Bounded buffer of the most recent readings, oldest first.
///
/// Appending past capacity evicts from the front; nothing else is ever evicted.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RollingWindow {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Discard the current contents and store `readings` in the given order.
    ///
    /// Callers pass at most `capacity` readings; anything beyond that is cut
    /// from the oldest end so the length invariant still holds.
    pub fn replace(&mut self, readings: Vec<Reading>) {
        let skip = readings.len().saturating_sub(self.capacity);
        self.readings.clear();
        self.readings.extend(readings.into_iter().skip(skip));
    }

    /// Push to the back, evicting the oldest entry when over capacity.
    pub fn append(&mut self, reading: Reading) {
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    #[must_use]
    pub fn contains_record(&self, record_id: &str) -> bool {
        self.readings
            .iter()
            .any(|r| r.record_id.as_deref() == Some(record_id))
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
