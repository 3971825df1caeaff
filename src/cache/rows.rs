//! Sparse cache of loaded rows for one dataset (the root table or a single
//! leaf group), keyed by absolute row index.

use std::collections::BTreeMap;

use super::chunks::{chunk_index, ChunkStates, CHUNK_SIZE};
use crate::types::Row;

/// Holds whatever window of rows is currently loaded. May contain holes;
/// the renderer paints a loading placeholder for absent indices.
///
/// A chunk marked `Loaded` guarantees its rows were present at the moment
/// it was marked; eviction removes rows without resetting the chunk state,
/// so readers must re-check presence (`chunk_missing`).
#[derive(Debug, Default)]
pub struct RowCache {
    rows: BTreeMap<usize, Row>,
    pub chunk_states: ChunkStates,
    total_rows: usize,
}

impl RowCache {
    pub fn get(&self, row_index: usize) -> Option<&Row> {
        self.rows.get(&row_index)
    }

    pub fn get_mut(&mut self, row_index: usize) -> Option<&mut Row> {
        self.rows.get_mut(&row_index)
    }

    pub fn contains(&self, row_index: usize) -> bool {
        self.rows.contains_key(&row_index)
    }

    /// Insert a row keyed by its own reported index.
    pub fn insert(&mut self, row: Row) {
        self.rows.insert(row.meta.row_index, row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn set_total_rows(&mut self, total: usize) {
        self.total_rows = total;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &Row)> {
        self.rows.iter()
    }

    /// True if any index of the chunk (clamped to `total_rows`) is absent.
    /// `Loaded` chunks that were partially evicted report missing here and
    /// become eligible for refetch.
    pub fn chunk_missing(&self, chunk_id: usize) -> bool {
        let start = chunk_id * CHUNK_SIZE;
        let end = ((chunk_id + 1) * CHUNK_SIZE).min(self.total_rows);
        if start >= end {
            return false;
        }
        (start..end).any(|i| !self.rows.contains_key(&i))
    }

    /// Drop every cached row outside `[start, end]`. Chunk states are left
    /// untouched; stale `Loaded` markers are resolved by `chunk_missing`.
    pub fn evict_outside(&mut self, start: usize, end: usize) {
        self.rows.retain(|&i, _| i >= start && i <= end);
    }

    /// Full reset (filter/sort/group-spec change).
    pub fn clear(&mut self) {
        self.rows.clear();
        self.chunk_states.clear();
    }

    /// Maximal runs of contiguous cached indices, as inclusive bounds.
    pub fn continuous_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut iter = self.rows.keys();
        let Some(&first) = iter.next() else {
            return ranges;
        };
        let mut run_start = first;
        let mut prev = first;
        for &i in iter {
            if i != prev + 1 {
                ranges.push((run_start, prev));
                run_start = i;
            }
            prev = i;
        }
        ranges.push((run_start, prev));
        ranges
    }

    /// Insert a new row at `index`, shifting cached rows at or past it up
    /// by one and growing the dataset count.
    pub fn insert_row(&mut self, index: usize, mut row: Row) {
        let to_shift: Vec<usize> = self.rows.range(index..).map(|(&i, _)| i).collect();
        for &i in to_shift.iter().rev() {
            if let Some(mut shifted) = self.rows.remove(&i) {
                shifted.meta.row_index = i + 1;
                self.rows.insert(i + 1, shifted);
            }
        }
        row.meta.row_index = index;
        self.rows.insert(index, row);
        self.total_rows += 1;
    }

    /// Remove the row at `index`, shifting subsequent cached rows down by
    /// one. The chunk covering the last shifted row is reset so the gap at
    /// the tail of the window is refetched.
    pub fn remove_row(&mut self, index: usize) -> Option<Row> {
        let removed = self.rows.remove(&index)?;
        let to_shift: Vec<usize> = self.rows.range(index + 1..).map(|(&i, _)| i).collect();
        for &i in &to_shift {
            if let Some(mut shifted) = self.rows.remove(&i) {
                shifted.meta.row_index = i - 1;
                self.rows.insert(i - 1, shifted);
            }
        }
        if let Some(&last) = to_shift.last() {
            self.chunk_states.reset(chunk_index(last));
        }
        self.total_rows = self.total_rows.saturating_sub(1);
        Some(removed)
    }

    /// Reindex the cached window for a row move. `target` of `None` means
    /// append to the end of the dataset. Returns the final index the row
    /// landed on, or `None` when the source row is not cached.
    pub fn move_row(&mut self, from: usize, target: Option<usize>) -> Option<usize> {
        let moved = self.rows.remove(&from)?;

        let final_target = match target {
            None => self.total_rows.saturating_sub(1),
            Some(t) if t > from => t - 1,
            Some(t) => t,
        };

        if final_target < from {
            let to_shift: Vec<usize> = self
                .rows
                .range(final_target..from)
                .map(|(&i, _)| i)
                .collect();
            for &i in to_shift.iter().rev() {
                if let Some(mut row) = self.rows.remove(&i) {
                    row.meta.row_index = i + 1;
                    self.rows.insert(i + 1, row);
                }
            }
        } else {
            let to_shift: Vec<usize> = self
                .rows
                .range(from + 1..=final_target)
                .map(|(&i, _)| i)
                .collect();
            for &i in &to_shift {
                if let Some(mut row) = self.rows.remove(&i) {
                    row.meta.row_index = i - 1;
                    self.rows.insert(i - 1, row);
                }
            }
        }

        let mut moved = moved;
        moved.meta.row_index = final_target;
        moved.meta.is_dragging = false;
        self.rows.insert(final_target, moved);

        debug_assert!(
            self.rows.iter().all(|(&i, r)| i == r.meta.row_index),
            "row index drift after move"
        );

        Some(final_target)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::cache::chunks::ChunkState;
    use crate::types::Row;

    fn seed(cache: &mut RowCache, range: std::ops::Range<usize>) {
        for i in range {
            cache.insert(Row::new(i, crate::types::RowValues::new()));
        }
    }

    #[test]
    fn eviction_leaves_chunk_states_untouched() {
        let mut cache = RowCache::default();
        cache.set_total_rows(500);
        seed(&mut cache, 0..200);
        cache.chunk_states.set(0, ChunkState::Loaded);
        cache.chunk_states.set(1, ChunkState::Loaded);

        cache.evict_outside(100, 180);
        assert!(!cache.contains(99));
        assert!(cache.contains(100));
        assert!(!cache.contains(181));
        // State survives the eviction; presence must be re-checked.
        assert_eq!(cache.chunk_states.get(0), ChunkState::Loaded);
        assert!(cache.chunk_missing(0));
        assert!(!cache.chunk_missing(2));
    }

    #[test]
    fn chunk_missing_clamps_to_total() {
        let mut cache = RowCache::default();
        cache.set_total_rows(60);
        seed(&mut cache, 50..60);
        // Chunk 1 covers [50, 60) only; all present.
        assert!(!cache.chunk_missing(1));
        // Chunk past the dataset is trivially complete.
        assert!(!cache.chunk_missing(5));
    }

    #[test]
    fn insert_row_shifts_following_indices() {
        let mut cache = RowCache::default();
        cache.set_total_rows(3);
        seed(&mut cache, 0..3);
        cache.insert_row(1, Row::new(0, crate::types::RowValues::new()));
        assert_eq!(cache.total_rows(), 4);
        assert_eq!(cache.get(1).unwrap().meta.row_index, 1);
        assert_eq!(cache.get(3).unwrap().meta.row_index, 3);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn remove_row_shifts_down_and_resets_tail_chunk() {
        let mut cache = RowCache::default();
        cache.set_total_rows(120);
        seed(&mut cache, 0..120);
        for c in 0..3 {
            cache.chunk_states.set(c, ChunkState::Loaded);
        }
        cache.remove_row(10);
        assert_eq!(cache.total_rows(), 119);
        assert_eq!(cache.get(10).unwrap().meta.row_index, 10);
        assert!(!cache.contains(119));
        // Tail chunk is invalidated for refetch.
        assert_eq!(cache.chunk_states.get(2), ChunkState::Unloaded);
        assert_eq!(cache.chunk_states.get(0), ChunkState::Loaded);
    }

    #[test]
    fn move_row_down_reindexes_span() {
        let mut cache = RowCache::default();
        cache.set_total_rows(10);
        seed(&mut cache, 0..10);
        let landed = cache.move_row(2, Some(6)).unwrap();
        assert_eq!(landed, 5);
        for (&i, row) in cache.iter() {
            assert_eq!(i, row.meta.row_index);
        }
    }

    #[test]
    fn move_row_none_appends_to_end() {
        let mut cache = RowCache::default();
        cache.set_total_rows(10);
        seed(&mut cache, 0..10);
        let landed = cache.move_row(3, None).unwrap();
        assert_eq!(landed, 9);
    }

    #[test]
    fn continuous_ranges_reports_runs() {
        let mut cache = RowCache::default();
        seed(&mut cache, 0..5);
        seed(&mut cache, 50..53);
        assert_eq!(cache.continuous_ranges(), vec![(0, 4), (50, 52)]);
    }
}
