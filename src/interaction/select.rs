//! Mouse range selection.

use super::{Effect, MAX_SELECTION_LIMIT};
use crate::hittest::{HitFilter, HitKind, HitTestIndex};
use crate::layout::ColumnLayout;
use crate::types::{CellCoord, SelectionRange};

/// Active drag-selection gesture; the anchor never moves.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectSession {
    pub anchor: CellCoord,
    pub path: Vec<usize>,
}

/// Resolve a viewport pixel to `(row, col, path)`: the column from the
/// layout (fixed columns by absolute offset first), the row from the
/// hit-test index.
pub fn cell_at_point(
    layout: &ColumnLayout,
    hit_index: &HitTestIndex,
    scroll_left: f64,
    x: f64,
    y: f64,
) -> Option<(CellCoord, Vec<usize>)> {
    let col = layout.column_at_point(x, scroll_left)?;
    let hit = hit_index.find_element_at(x, y, Some(HitFilter::Row))?;
    match &hit.kind {
        HitKind::Row { row_index, path } => {
            Some((CellCoord::new(*row_index, col), path.clone()))
        }
        _ => None,
    }
}

/// Clamp a candidate focus row to the selection span cap, shifting the far
/// edge rather than rejecting the move; the anchor is never clamped.
pub fn clamp_to_span_limit(anchor_row: usize, row: usize) -> usize {
    if row > anchor_row {
        row.min(anchor_row + MAX_SELECTION_LIMIT - 1)
    } else {
        row.max(anchor_row.saturating_sub(MAX_SELECTION_LIMIT - 1))
    }
}

/// Pointer down on a cell. A plain click starts a new single-cell
/// selection and moves the active cell; shift-click only extends the end
/// of an existing selection.
pub fn mouse_down(
    selection: &mut SelectionRange,
    active_cell: &mut Option<CellCoord>,
    cell: CellCoord,
    path: Vec<usize>,
    shift: bool,
) -> (Option<SelectSession>, Vec<Effect>) {
    if shift && !selection.is_empty() {
        let anchor_row = selection.anchor().map_or(cell.row, |a| a.row);
        let clamped = CellCoord::new(clamp_to_span_limit(anchor_row, cell.row), cell.col);
        selection.end_range(clamped);
        return (None, vec![Effect::Redraw]);
    }

    selection.start_range(cell);
    selection.path = path.clone();
    *active_cell = Some(cell);
    (
        Some(SelectSession { anchor: cell, path }),
        vec![Effect::Redraw],
    )
}

/// Pointer move while selecting: clamp the candidate to the dataset and
/// the span cap, then move the focus end.
pub fn mouse_move(
    session: &SelectSession,
    selection: &mut SelectionRange,
    total_rows: usize,
    cell: CellCoord,
) -> Vec<Effect> {
    if total_rows == 0 {
        return Vec::new();
    }
    let row = cell.row.min(total_rows - 1);
    let row = clamp_to_span_limit(session.anchor.row, row);
    let clamped = CellCoord::new(row, cell.col);
    if selection.focus() == Some(clamped) {
        return Vec::new();
    }
    selection.end_range(clamped);
    vec![Effect::Redraw]
}
