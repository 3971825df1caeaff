//! Pointer/keyboard interaction controllers.
//!
//! Each gesture is a state machine over decoded input events; controllers
//! mutate the selection/column/cache state and return [`Effect`]s for the
//! host to execute (redraws, scrolls, persistence callbacks). All gestures
//! hang off one [`InteractionMode`], so mutually-exclusive gestures cannot
//! be simultaneously active.

pub mod fill;
pub mod keyboard;
pub mod reorder_column;
pub mod reorder_row;
pub mod resize;
pub mod select;

pub use fill::FillSession;
pub use keyboard::{handle_key, Key, KeyInput, KeyThrottle, NavContext};
pub use reorder_column::{compute_new_order, renormalize_orders, ColumnDrag, MIN_ORDER_GAP};
pub use reorder_row::RowDrag;
pub use resize::{normalize_width, ResizeSession};
pub use select::SelectSession;

use crate::types::CellCoord;

/// Maximum rows a selection may span when extended by shift-click,
/// shift-arrow, or drag; the far edge is clamped, never the anchor.
pub const MAX_SELECTION_LIMIT: usize = 100;

/// Width of the column-resize hit band centered on a column's trailing edge.
pub const RESIZE_HANDLE_WIDTH: f64 = 8.0;

/// Distance from the viewport's top/bottom edge that triggers auto-scroll
/// during a row drag.
pub const EDGE_SCROLL_MARGIN: f64 = 100.0;

/// The single gesture slot. At most one controller owns the pointer at a
/// time; pointer-down handlers are tried in fixed priority order.
#[derive(Debug, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Resizing(ResizeSession),
    ReorderingColumn(ColumnDrag),
    ReorderingRow(RowDrag),
    Selecting(SelectSession),
    Filling(FillSession),
}

impl InteractionMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Decoded pointer event in viewport coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerInput {
    pub x: f64,
    pub y: f64,
    pub shift: bool,
    pub alt: bool,
    pub cmd_or_ctrl: bool,
}

/// Inline editor overlay geometry; present while a cell is being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Editor anchored over a pinned column (ignores horizontal scroll).
    pub fixed: bool,
}

/// Side effects requested by a controller, executed by the host viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Redraw,
    ScrollIntoView { row: usize, col: usize },
    ScrollBy { dx: f64, dy: f64 },
    /// Live width preview, fired on every resize move.
    ResizePreview { column_id: String, width: f64 },
    /// Final width commit on release.
    ResizeCommit { column_id: String, width: f64 },
    /// Insert column `from` before column `to`.
    ReorderColumn { from: usize, to: usize },
    /// Commit a row move; `to` of `None` appends to the end of its group.
    MoveRow { from: usize, to: Option<usize>, path: Vec<usize> },
    /// Replicate the source range down/up to `target_end_row`.
    CommitFill { start: CellCoord, end: CellCoord, target_end_row: usize, path: Vec<usize> },
    AppendRow { path: Vec<usize> },
    AddColumn,
    ExpandRow { row: usize, path: Vec<usize> },
    ClearCell { row: usize, col: usize, path: Vec<usize> },
    /// Clear every cell of the current selection range.
    ClearSelection,
    BeginEdit { row: usize, col: usize },
    EndEdit,
}
