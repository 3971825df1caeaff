//! Fill-handle drag: replicate the selected range across adjacent rows.

use super::{select::clamp_to_span_limit, Effect};
use crate::types::{CellCoord, SelectionRange};

/// Geometry of the fill handle (circle at the selection's corner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillHandle {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Handle sits inside the pinned column band.
    pub fixed_col: bool,
}

/// Active fill drag; the source range is frozen at gesture start.
#[derive(Debug, Clone, PartialEq)]
pub struct FillSession {
    pub start: CellCoord,
    pub end: CellCoord,
    /// Row the dashed preview currently extends to.
    pub preview_end_row: usize,
    pub path: Vec<usize>,
}

/// Start a fill drag from the current selection.
pub fn begin(selection: &SelectionRange) -> Option<FillSession> {
    let (min_row, min_col, max_row, max_col) = selection.normalized()?;
    Some(FillSession {
        start: CellCoord::new(min_row, min_col),
        end: CellCoord::new(max_row, max_col),
        preview_end_row: max_row,
        path: selection.path.clone(),
    })
}

/// Pointer move: extend the dashed preview, clamped to the dataset and the
/// selection span cap (relative to the source range's top edge).
pub fn on_move(session: &mut FillSession, total_rows: usize, candidate_row: usize) -> Vec<Effect> {
    if total_rows == 0 {
        return Vec::new();
    }
    let row = candidate_row.min(total_rows - 1);
    let row = clamp_to_span_limit(session.start.row, row);
    if row == session.preview_end_row {
        return Vec::new();
    }
    session.preview_end_row = row;
    vec![Effect::Redraw]
}

/// Release: commit the fill when the preview grew past the source range,
/// and extend the selection over the filled rows.
pub fn on_drop(session: &FillSession, selection: &mut SelectionRange) -> Vec<Effect> {
    if session.preview_end_row <= session.end.row {
        return vec![Effect::Redraw];
    }
    selection.end_range(CellCoord::new(session.preview_end_row, session.end.col));
    vec![
        Effect::CommitFill {
            start: session.start,
            end: session.end,
            target_end_row: session.preview_end_row,
            path: session.path.clone(),
        },
        Effect::Redraw,
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::interaction::MAX_SELECTION_LIMIT;

    fn selection(start: CellCoord, end: CellCoord) -> SelectionRange {
        let mut sel = SelectionRange::default();
        sel.start_range(start);
        sel.end_range(end);
        sel
    }

    #[test]
    fn begin_freezes_the_source_range() {
        let sel = selection(CellCoord::new(7, 3), CellCoord::new(4, 1));
        let session = begin(&sel).unwrap();
        assert_eq!(session.start, CellCoord::new(4, 1));
        assert_eq!(session.end, CellCoord::new(7, 3));
        assert!(begin(&SelectionRange::default()).is_none());
    }

    #[test]
    fn preview_clamps_to_span_cap() {
        let sel = selection(CellCoord::new(0, 0), CellCoord::new(2, 0));
        let mut session = begin(&sel).unwrap();
        on_move(&mut session, 10_000, 5_000);
        assert_eq!(session.preview_end_row, MAX_SELECTION_LIMIT - 1);
    }

    #[test]
    fn drop_commits_and_extends_selection() {
        let mut sel = selection(CellCoord::new(2, 1), CellCoord::new(3, 2));
        let mut session = begin(&sel).unwrap();
        on_move(&mut session, 100, 9);
        let effects = on_drop(&session, &mut sel);
        assert_eq!(
            effects.first(),
            Some(&Effect::CommitFill {
                start: CellCoord::new(2, 1),
                end: CellCoord::new(3, 2),
                target_end_row: 9,
                path: Vec::new(),
            })
        );
        assert_eq!(sel.focus(), Some(CellCoord::new(9, 2)));
    }

    #[test]
    fn drop_inside_source_range_is_a_noop() {
        let mut sel = selection(CellCoord::new(2, 1), CellCoord::new(6, 2));
        let session = begin(&sel).unwrap();
        let effects = on_drop(&session, &mut sel);
        assert_eq!(effects, vec![Effect::Redraw]);
        assert_eq!(sel.focus(), Some(CellCoord::new(6, 2)));
    }
}
