//! Anchor/focus cell range: the entire selection surface other
//! components are allowed to depend on.

use serde::{Deserialize, Serialize};

/// A single cell address (absolute row index, column index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Rectangular cell range described by an un-ordered anchor/focus pair.
///
/// `start` is the anchor, `end` the focus; min/max are normalized on read,
/// never on write, so extending a selection upward keeps the anchor intact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRange {
    start: Option<CellCoord>,
    end: Option<CellCoord>,
    /// Group path of the dataset the range lives in; empty for the root.
    pub path: Vec<usize>,
}

impl SelectionRange {
    /// Begin a new range: anchor and focus both move to `cell`.
    pub fn start_range(&mut self, cell: CellCoord) {
        self.start = Some(cell);
        self.end = Some(cell);
    }

    /// Move the focus end, keeping the anchor. No-op on an empty range.
    pub fn end_range(&mut self, cell: CellCoord) {
        if self.start.is_some() {
            self.end = Some(cell);
        }
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
        self.path.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() || self.end.is_none()
    }

    pub fn is_single_cell(&self) -> bool {
        match (self.start, self.end) {
            (Some(s), Some(e)) => s == e,
            _ => false,
        }
    }

    /// Interval test against the normalized bounds.
    pub fn is_cell_in_range(&self, cell: CellCoord) -> bool {
        let Some((min_row, min_col, max_row, max_col)) = self.normalized() else {
            return false;
        };
        cell.row >= min_row && cell.row <= max_row && cell.col >= min_col && cell.col <= max_col
    }

    pub fn anchor(&self) -> Option<CellCoord> {
        self.start
    }

    pub fn focus(&self) -> Option<CellCoord> {
        self.end
    }

    /// `(min_row, min_col, max_row, max_col)` of the current range.
    pub fn normalized(&self) -> Option<(usize, usize, usize, usize)> {
        let (s, e) = (self.start?, self.end?);
        Some((
            s.row.min(e.row),
            s.col.min(e.col),
            s.row.max(e.row),
            s.col.max(e.col),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn end_range_keeps_anchor() {
        let mut sel = SelectionRange::default();
        sel.start_range(CellCoord::new(5, 2));
        sel.end_range(CellCoord::new(1, 4));
        assert_eq!(sel.anchor(), Some(CellCoord::new(5, 2)));
        assert_eq!(sel.normalized(), Some((1, 2, 5, 4)));
        assert!(!sel.is_single_cell());
    }

    #[test]
    fn end_range_on_empty_is_noop() {
        let mut sel = SelectionRange::default();
        sel.end_range(CellCoord::new(1, 1));
        assert!(sel.is_empty());
    }

    #[test]
    fn membership_normalizes_reversed_ranges() {
        let mut sel = SelectionRange::default();
        sel.start_range(CellCoord::new(9, 6));
        sel.end_range(CellCoord::new(3, 1));
        assert!(sel.is_cell_in_range(CellCoord::new(5, 3)));
        assert!(!sel.is_cell_in_range(CellCoord::new(2, 3)));
        assert!(!sel.is_cell_in_range(CellCoord::new(5, 7)));
    }

    #[test]
    fn clear_empties_the_range() {
        let mut sel = SelectionRange::default();
        sel.start_range(CellCoord::new(0, 0));
        assert!(sel.is_single_cell());
        sel.clear();
        assert!(sel.is_empty());
        assert!(!sel.is_cell_in_range(CellCoord::new(0, 0)));
    }
}
