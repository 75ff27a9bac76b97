//! Half-open intervals and the sorted sweep that finds overlapping pairs.

use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord + Copy> Interval<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    /// Zero-length (or inverted) intervals cover no time.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// `s1 < e2 && s2 < e1`; back-to-back intervals do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Self { start, end })
    }
}

/// Find every overlapping pair among `items`.
///
/// Items are sorted by start, then swept once while keeping the set of
/// intervals still open at the current start. Each reported pair lists the
/// earlier-starting item first (input order on ties). Empty intervals never
/// overlap anything.
///
/// O(n log n + k) for n items and k reported pairs.
pub fn find_overlaps<K: Clone, T: Ord + Copy>(
    items: &[(K, Interval<T>)],
) -> Vec<(K, K, Interval<T>)> {
    let mut order: Vec<usize> = (0..items.len())
        .filter(|&i| !items[i].1.is_empty())
        .collect();
    // Stable sort keeps input order for identical starts
    order.sort_by_key(|&i| items[i].1.start);

    let mut active: Vec<usize> = Vec::new();
    let mut pairs = Vec::new();

    for i in order {
        let current = items[i].1;
        // Drop intervals that ended at or before this start
        active.retain(|&j| items[j].1.end > current.start);

        for &j in &active {
            // Invariant: items[j] starts no later and ends after current.start
            if let Some(overlap) = items[j].1.intersection(&current) {
                pairs.push((items[j].0.clone(), items[i].0.clone(), overlap));
            }
        }
        active.push(i);
    }

    pairs
}
