//! Shared grid state mutated by the interaction controllers and read by
//! the renderer. DOM wiring lives in the viewer; everything here compiles
//! and tests natively.

use crate::hittest::HitTestIndex;
use crate::interaction::reorder_column::{
    compute_new_order, needs_renormalize, renormalize_orders,
};
use crate::interaction::{EditState, InteractionMode, KeyThrottle};
use crate::layout::{ColumnLayout, Viewport};
use crate::types::{row_number_column, CellCoord, GridColumn, GridConfig, SelectionRange, Slice};
use crate::undo::UndoStack;

/// Everything the grid tracks outside the data caches.
pub struct GridState {
    pub columns: Vec<GridColumn>,
    pub layout: ColumnLayout,
    pub config: GridConfig,
    pub viewport: Viewport,
    pub row_slice: Slice,
    pub col_slice: Slice,
    pub selection: SelectionRange,
    pub active_cell: Option<CellCoord>,
    pub hover_row: Option<usize>,
    pub editing: Option<EditState>,
    pub mode: InteractionMode,
    pub hit_index: HitTestIndex,
    pub undo: UndoStack,
    pub key_throttle: KeyThrottle,
    pub allow_row_add: bool,
}

impl Default for GridState {
    fn default() -> Self {
        let columns = vec![row_number_column()];
        let layout = ColumnLayout::new(&columns);
        Self {
            columns,
            layout,
            config: GridConfig::default(),
            viewport: Viewport::default(),
            row_slice: Slice::default(),
            col_slice: Slice::default(),
            selection: SelectionRange::default(),
            active_cell: None,
            hover_row: None,
            editing: None,
            mode: InteractionMode::Idle,
            hit_index: HitTestIndex::default(),
            undo: UndoStack::default(),
            key_throttle: KeyThrottle::default(),
            allow_row_add: true,
        }
    }
}

impl GridState {
    /// Install the field list: sorted by fractional order, with the
    /// synthetic row-number column forced to index 0.
    pub fn set_columns(&mut self, mut fields: Vec<GridColumn>) {
        fields.retain(|c| c.id != "row_number");
        fields.sort_by(|a, b| a.order.partial_cmp(&b.order).unwrap_or(std::cmp::Ordering::Equal));
        let mut columns = vec![row_number_column()];
        columns.extend(fields);
        self.columns = columns;
        self.rebuild_layout();
    }

    pub fn rebuild_layout(&mut self) {
        self.layout = ColumnLayout::new(&self.columns);
    }

    /// Recompute both visible slices from the current scroll offsets.
    pub fn update_slices(&mut self, total_rows: usize) {
        self.row_slice = self.viewport.row_slice(
            self.config.header_height,
            self.config.row_height,
            total_rows,
        );
        self.col_slice = self.viewport.col_slice(&self.layout);
    }

    /// Apply a scroll delta, clamped against the content extents.
    pub fn scroll_by(&mut self, dx: f64, dy: f64, content_height: f64) {
        self.viewport.scroll_left += dx;
        self.viewport.scroll_top += dy;
        self.viewport.clamp_scroll(
            self.layout.total_width(),
            content_height,
            self.config.header_height,
        );
    }

    /// Set a column's width (live preview and commit share this path).
    pub fn set_column_width(&mut self, column_id: &str, width: f64) {
        if let Some(col) = self.columns.iter_mut().find(|c| c.id == column_id) {
            col.set_width_px(width);
        }
        self.rebuild_layout();
    }

    /// Apply an insert-before reorder. Returns `(column_id, old_order,
    /// new_order)` for the undo stack and the persistence callback, or
    /// `None` when the drop is a no-op.
    pub fn apply_column_reorder(&mut self, from: usize, to: usize) -> Option<(String, f64, f64)> {
        if from == to || from >= self.columns.len() || to >= self.columns.len() {
            return None;
        }
        let orders: Vec<f64> = self.columns.iter().map(|c| c.order).collect();
        let new_order = compute_new_order(&orders, to)?;
        let column = self.columns.get(from)?;
        let column_id = column.id.clone();
        let old_order = column.order;

        self.set_column_order(&column_id, new_order);

        Some((column_id, old_order, new_order))
    }

    /// Assign an order value and re-sort; renormalizes the whole list when
    /// fractional precision has run out.
    pub fn set_column_order(&mut self, column_id: &str, order: f64) {
        if let Some(col) = self.columns.iter_mut().find(|c| c.id == column_id) {
            col.order = order;
        }
        let mut fields = self.columns.split_off(1);
        fields.sort_by(|a, b| a.order.partial_cmp(&b.order).unwrap_or(std::cmp::Ordering::Equal));
        self.columns.extend(fields);

        let orders: Vec<f64> = self.columns.iter().map(|c| c.order).collect();
        if needs_renormalize(&orders) {
            renormalize_orders(&mut self.columns);
        }
        self.rebuild_layout();
    }

    /// Editor overlay geometry for a cell, mirroring how cells are placed
    /// by the renderer (fixed columns at absolute x, scrollable columns at
    /// slice-relative x).
    pub fn edit_state_for(&self, row: usize, col: usize) -> Option<EditState> {
        let column = self.columns.get(col)?;
        let uidt = column.uidt?;
        if !uidt.is_editable() || column.readonly {
            return None;
        }
        let fixed = column.fixed;
        let x = if fixed {
            self.layout.x_offset(col)
        } else {
            self.layout.x_offset(col) - self.viewport.scroll_left
        };
        let y = row_screen_y(
            row,
            self.viewport.scroll_top,
            self.config.header_height,
            self.config.row_height,
        );
        Some(EditState {
            row,
            col,
            x,
            y,
            width: column.width_px() + 2.0,
            height: self.config.row_height,
            fixed,
        })
    }
}

/// Viewport y of a row's top edge in a flat view.
pub fn row_screen_y(row: usize, scroll_top: f64, header_height: f64, row_height: f64) -> f64 {
    let row = u32::try_from(row).map_or(f64::MAX, f64::from);
    row * row_height - scroll_top + header_height
}
