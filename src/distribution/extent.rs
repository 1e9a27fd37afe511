//! Ordered, coalescing set of issued record ranges
//!
//! An [`Extent`] is a half-open range `[start, start + count)` of record indices.
//! The [`ExtentSet`] keeps extents keyed by start in a `BTreeMap` and maintains,
//! after every mutation:
//!
//! ```text
//! for A, B in set with A.start < B.start:  A.start + A.count < B.start
//! ```
//!
//! i.e. extents never overlap and never touch. Two extents that end up adjacent
//! are merged immediately, which bounds the node count by the number of gaps
//! rather than by the number of issued records.
//!
//! Growth only happens at the right edge (new singleton, or `count += 1`), so
//! merging only ever has to look at the right neighbour.

use super::tracker::TrackerError;
use std::collections::BTreeMap;
use std::fmt;

/// Contiguous run of record indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub start: u64,
    pub count: u64,
}

impl Extent {
    pub fn new(start: u64, count: u64) -> Self {
        Self { start, count }
    }

    /// First index past the extent
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.count
    }

    /// True if `index` is inside the extent or immediately past its end
    #[inline]
    pub fn touches(&self, index: u64) -> bool {
        self.start <= index && index <= self.end()
    }

    /// Byte range covered by this extent for a given record size
    pub fn to_bytes(&self, record_size: u64) -> (u64, u64) {
        (self.start * record_size, self.count * record_size)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}({})", self.start, self.end(), self.count)
    }
}

/// Ordered set of non-overlapping, non-adjacent extents
#[derive(Debug, Clone)]
pub struct ExtentSet {
    /// start -> count
    extents: BTreeMap<u64, u64>,

    /// Total records covered by all extents
    covered: u64,

    /// Maximum number of extent nodes that may exist at once
    node_limit: usize,
}

impl ExtentSet {
    /// Create an empty set with no node budget
    pub fn new() -> Self {
        Self::with_node_limit(usize::MAX)
    }

    /// Create an empty set that refuses to hold more than `node_limit` extents
    pub fn with_node_limit(node_limit: usize) -> Self {
        Self {
            extents: BTreeMap::new(),
            covered: 0,
            node_limit,
        }
    }

    /// Number of extent nodes
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Total number of records covered
    pub fn covered(&self) -> u64 {
        self.covered
    }

    pub fn node_limit(&self) -> usize {
        self.node_limit
    }

    /// Drop every extent
    pub fn clear(&mut self) {
        self.extents.clear();
        self.covered = 0;
    }

    /// Extent that contains `index` or ends exactly at it
    ///
    /// Because extents never touch, at most one extent can match.
    pub fn find_touching(&self, index: u64) -> Option<Extent> {
        self.extents
            .range(..=index)
            .next_back()
            .map(|(&start, &count)| Extent::new(start, count))
            .filter(|extent| extent.touches(index))
    }

    /// Extent starting exactly at `start`
    pub fn get(&self, start: u64) -> Option<Extent> {
        self.extents.get(&start).map(|&count| Extent::new(start, count))
    }

    /// Insert the singleton `(index, 1)` and merge it with its right neighbour
    ///
    /// The caller guarantees no extent touches `index`.
    pub fn insert_single(&mut self, index: u64) -> Result<Extent, TrackerError> {
        debug_assert!(self.find_touching(index).is_none());

        // A singleton that merges right never needs a node of its own
        let merges_right = index
            .checked_add(1)
            .map_or(false, |next| self.extents.contains_key(&next));
        if !merges_right && self.extents.len() >= self.node_limit {
            return Err(TrackerError::ExtentLimit {
                limit: self.node_limit,
            });
        }

        self.extents.insert(index, 1);
        self.covered += 1;
        Ok(self.merge_right(index))
    }

    /// Grow the extent starting at `start` by one record and merge right
    ///
    /// Returns the index that was added (the old end) and the resulting extent.
    pub fn extend_right(&mut self, start: u64) -> Option<(u64, Extent)> {
        let count = self.extents.get_mut(&start)?;
        let added = start + *count;
        *count += 1;
        self.covered += 1;
        Some((added, self.merge_right(start)))
    }

    /// Fold the successor of `start` into it when they became adjacent
    fn merge_right(&mut self, start: u64) -> Extent {
        let count = self.extents[&start];
        let end = start + count;

        match self.extents.remove(&end) {
            Some(next_count) => {
                let merged = count + next_count;
                self.extents.insert(start, merged);
                Extent::new(start, merged)
            }
            None => Extent::new(start, count),
        }
    }

    /// Extents in ascending start order
    ///
    /// The iterator borrows the set, so a fresh call after further mutation
    /// sees the new state.
    pub fn iter(&self) -> impl Iterator<Item = Extent> + '_ {
        self.extents
            .iter()
            .map(|(&start, &count)| Extent::new(start, count))
    }

    /// Verify ordering, non-adjacency, non-empty extents and the coverage count
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut prev: Option<Extent> = None;
        let mut covered = 0u64;

        for extent in self.iter() {
            if extent.count == 0 {
                return Err(format!("empty extent at {}", extent.start));
            }
            if let Some(prev) = prev {
                if prev.end() >= extent.start {
                    return Err(format!("prev {} cur {}", prev, extent));
                }
            }
            covered += extent.count;
            prev = Some(extent);
        }

        if covered != self.covered {
            return Err(format!(
                "extents cover {} records, counter says {}",
                covered, self.covered
            ));
        }
        Ok(())
    }
}

impl Default for ExtentSet {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a ExtentSet {
    type Item = Extent;
    type IntoIter = Box<dyn Iterator<Item = Extent> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
