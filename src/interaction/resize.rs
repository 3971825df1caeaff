//! Column resize gesture: `Idle → Resizing → Idle`.

use super::{Effect, RESIZE_HANDLE_WIDTH};
use crate::error::{GridError, Result};
use crate::layout::ColumnLayout;
use crate::types::{ColumnType, GridColumn};

/// Hard floor applied to the raw drag width before the per-type clamp.
const MIN_DRAG_WIDTH: f64 = 50.0;

/// Per-type `[min, max]` width bounds.
fn width_bounds(uidt: Option<ColumnType>) -> (f64, f64) {
    match uidt {
        Some(ColumnType::Attachment) => (100.0, f64::INFINITY),
        Some(ColumnType::Button) => (100.0, 320.0),
        _ => (80.0, f64::INFINITY),
    }
}

/// Clamp a requested width into the column type's allowed range.
pub fn normalize_width(uidt: Option<ColumnType>, width: f64) -> f64 {
    let (min, max) = width_bounds(uidt);
    width.clamp(min, max)
}

/// Active resize drag.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub column_index: usize,
    pub column_id: String,
    pub start_x: f64,
    pub initial_width: f64,
    pub preview_width: f64,
}

/// Find the column whose trailing edge sits under `x`, within half the
/// handle width. Fixed columns are checked first at absolute offsets,
/// scrollable columns second at scroll-adjusted offsets. Columns without a
/// type tag (the row-number column) are not resizable.
pub fn find_resize_target(
    columns: &[GridColumn],
    layout: &ColumnLayout,
    scroll_left: f64,
    x: f64,
) -> Option<usize> {
    let half = RESIZE_HANDLE_WIDTH / 2.0;

    for (i, col) in columns.iter().enumerate() {
        if !col.fixed {
            continue;
        }
        let edge = layout.x_offset(i) + layout.width(i);
        if (x - edge).abs() <= half {
            return col.uidt.is_some().then_some(i);
        }
    }

    for (i, col) in columns.iter().enumerate() {
        if col.fixed {
            continue;
        }
        let edge = layout.x_offset(i) + layout.width(i) - scroll_left;
        if (x - edge).abs() <= half {
            return col.uidt.is_some().then_some(i);
        }
    }
    None
}

/// Start a resize session for the column at `column_index`.
pub fn begin(columns: &[GridColumn], column_index: usize, x: f64) -> Option<ResizeSession> {
    let col = columns.get(column_index)?;
    col.uidt?;
    Some(ResizeSession {
        column_index,
        column_id: col.id.clone(),
        start_x: x,
        initial_width: col.width_px(),
        preview_width: col.width_px(),
    })
}

/// Pointer move while resizing: recompute the clamped width and emit the
/// live preview. Fails (for the caller to log and tear the session down)
/// when the column vanished mid-drag.
pub fn on_move(
    session: &mut ResizeSession,
    columns: &[GridColumn],
    x: f64,
) -> Result<Vec<Effect>> {
    let col = columns.get(session.column_index).ok_or_else(|| {
        GridError::Other(format!("resize target {} out of range", session.column_index))
    })?;
    let requested = (session.initial_width + (x - session.start_x)).max(MIN_DRAG_WIDTH);
    let width = normalize_width(col.uidt, requested);
    session.preview_width = width;
    Ok(vec![
        Effect::ResizePreview {
            column_id: session.column_id.clone(),
            width,
        },
        Effect::Redraw,
    ])
}

/// Pointer release: commit the final width.
pub fn on_up(session: &ResizeSession) -> Vec<Effect> {
    vec![
        Effect::ResizeCommit {
            column_id: session.column_id.clone(),
            width: session.preview_width,
        },
        Effect::Redraw,
    ]
}
