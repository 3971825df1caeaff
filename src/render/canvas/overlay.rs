//! Interaction overlays: fill handle, fill preview, column drag ghost and
//! drop indicator, row drag target line.

use web_sys::CanvasRenderingContext2d;

use super::crisp;
use crate::interaction::fill::FillHandle;
use crate::interaction::InteractionMode;
use crate::render::backend::RenderParams;
use crate::state::GridState;

/// Diameter of the fill-handle circle.
const FILL_HANDLE_SIZE: f64 = 8.0;

/// Viewport position of the fill handle: the bottom-right corner of the
/// selection, or `None` while the focus row is outside the visible slice.
pub fn fill_handle_position(state: &GridState) -> Option<FillHandle> {
    let (_, _, max_row, max_col) = state.selection.normalized()?;
    if !state.row_slice.contains(max_row) {
        return None;
    }
    let cfg = &state.config;
    let fixed_col = state.layout.is_fixed(max_col);
    let mut x = state.layout.x_offset(max_col) + state.layout.width(max_col);
    if !fixed_col {
        x -= state.viewport.scroll_left;
    }
    let partial = state.viewport.partial_row_height(cfg.row_height);
    let rows_below = max_row + 1 - state.row_slice.start;
    let y = -partial + cfg.header_height + 1.0 + to_f64(rows_below) * cfg.row_height;
    Some(FillHandle {
        x,
        y,
        size: FILL_HANDLE_SIZE,
        fixed_col,
    })
}

pub(super) fn render_overlays(
    ctx: &CanvasRenderingContext2d,
    params: &RenderParams<'_>,
    width: f64,
    height: f64,
) {
    let state = params.state;
    render_fill_handle(ctx, state);
    render_column_drag(ctx, state, height);
    render_row_drag(ctx, state, width);
}

fn render_fill_handle(ctx: &CanvasRenderingContext2d, state: &GridState) {
    let Some(handle) = fill_handle_position(state) else {
        return;
    };
    let cfg = &state.config;

    ctx.set_fill_style_str(&cfg.fill_handle_color);
    ctx.begin_path();
    let _ = ctx.arc(
        handle.x,
        handle.y,
        handle.size / 2.0,
        0.0,
        std::f64::consts::TAU,
    );
    ctx.fill();

    // Dashed preview rectangle while a fill drag is underway.
    if let InteractionMode::Filling(session) = &state.mode {
        let Some((min_row, min_col, _, max_col)) = state.selection.normalized() else {
            return;
        };
        let partial = state.viewport.partial_row_height(cfg.row_height);
        let x0 = state.layout.x_offset(min_col)
            - if state.layout.is_fixed(min_col) {
                0.0
            } else {
                state.viewport.scroll_left
            };
        let y0 = -partial
            + cfg.header_height
            + 1.0
            + to_f64(min_row.saturating_sub(state.row_slice.start)) * cfg.row_height;
        let x1 = state.layout.x_offset(max_col) + state.layout.width(max_col)
            - if state.layout.is_fixed(max_col) {
                0.0
            } else {
                state.viewport.scroll_left
            };
        let rows = session.preview_end_row.saturating_sub(min_row) + 1;
        let dash = js_sys::Array::of2(&2.0.into(), &2.0.into());
        let _ = ctx.set_line_dash(&dash);
        ctx.set_stroke_style_str(&cfg.active_border);
        ctx.stroke_rect(x0, y0, x1 - x0, to_f64(rows) * cfg.row_height);
        let _ = ctx.set_line_dash(&js_sys::Array::new());
    }
}

/// Ghost column + blue drop indicator while a column drag is active.
fn render_column_drag(ctx: &CanvasRenderingContext2d, state: &GridState, height: f64) {
    let InteractionMode::ReorderingColumn(drag) = &state.mode else {
        return;
    };
    let Some(target) = drag.drag_over else {
        return;
    };
    let cfg = &state.config;
    let x = state.layout.x_offset(target) - state.viewport.scroll_left;
    let ghost_width = state.layout.width(drag.from_index);

    ctx.set_fill_style_str(&cfg.header_bg);
    ctx.set_global_alpha(0.6);
    ctx.fill_rect(x, 0.0, ghost_width, height);
    ctx.set_global_alpha(1.0);

    ctx.set_stroke_style_str(&cfg.drag_indicator_color);
    ctx.set_line_width(2.0);
    ctx.begin_path();
    ctx.move_to(crisp(x), 0.0);
    ctx.line_to(crisp(x), height);
    ctx.stroke();
    ctx.set_line_width(1.0);
}

/// Target line for an active row drag.
fn render_row_drag(ctx: &CanvasRenderingContext2d, state: &GridState, width: f64) {
    let InteractionMode::ReorderingRow(drag) = &state.mode else {
        return;
    };
    let Some(target) = drag.target else {
        return;
    };
    let cfg = &state.config;
    if !state.row_slice.contains(target) && target != state.row_slice.end {
        return;
    }
    let partial = state.viewport.partial_row_height(cfg.row_height);
    let y = -partial
        + cfg.header_height
        + 1.0
        + to_f64(target.saturating_sub(state.row_slice.start)) * cfg.row_height;

    ctx.set_stroke_style_str(&cfg.drag_indicator_color);
    ctx.set_line_width(2.0);
    ctx.begin_path();
    ctx.move_to(0.0, crisp(y));
    ctx.line_to(width, crisp(y));
    ctx.stroke();
    ctx.set_line_width(1.0);
}

fn to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::MAX, f64::from)
}
