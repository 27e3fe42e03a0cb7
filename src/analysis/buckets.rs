//! Ordered grouping of values by key.
//!
//! Keys are kept in the order they were first seen; each key owns a running
//! count and sum.

use std::collections::HashMap;
use std::hash::Hash;

/// Running count and sum for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    pub count: usize,
    pub sum: f64,
}

impl Accumulator {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    /// Arithmetic mean, 0 when nothing was added.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Key to accumulator mapping that iterates in first-insertion order.
#[derive(Debug, Clone)]
pub struct OrderedBuckets<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, Accumulator)>,
}

impl<K: Eq + Hash + Clone> OrderedBuckets<K> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Add `value` to the bucket for `key`, creating it on first sight.
    pub fn record(&mut self, key: K, value: f64) {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(key.clone(), slot);
                self.entries.push((key, Accumulator::default()));
                slot
            }
        };
        self.entries[slot].1.add(value);
    }

    /// Consume the buckets, yielding entries in first-insertion order.
    pub fn into_entries(self) -> Vec<(K, Accumulator)> {
        self.entries
    }
}

impl<K: Eq + Hash + Clone> Default for OrderedBuckets<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> FromIterator<(K, f64)> for OrderedBuckets<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut buckets = Self::new();
        for (key, value) in iter {
            buckets.record(key, value);
        }
        buckets
    }
}
