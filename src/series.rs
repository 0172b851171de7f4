use std::collections::VecDeque;

/// Fixed-capacity FIFO of the most recent values, for charting only
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSeries<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> RollingSeries<T> {
    /// Empty series; a zero capacity is raised to 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Series pre-filled to capacity with `value`, so charts start flat
    pub fn filled(capacity: usize, value: T) -> Self {
        let mut series = Self::new(capacity);
        series.values.extend(std::iter::repeat(value).take(series.capacity));
        series
    }

    /// Append, evicting the oldest value when full
    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn latest(&self) -> Option<T> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Values oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
