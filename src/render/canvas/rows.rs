//! Row band rendering (flat views) and the shared per-row draw used by
//! grouped views.

use web_sys::CanvasRenderingContext2d;

use super::{hline, vline, with_pinned_shadow};
use crate::hittest::{HitKind, HitRegion, HitTestIndex};
use crate::render::backend::RenderParams;
use crate::render::cells::{CellProps, CellRegistry};
use crate::types::{CellCoord, Row};

/// Flat (ungrouped) row band for the current row slice. Rows absent from
/// the cache paint as blank placeholders so the fetch pipeline may lag the
/// paint without erroring.
pub(super) fn render_rows(
    ctx: &CanvasRenderingContext2d,
    cells: &CellRegistry,
    params: &RenderParams<'_>,
    hit_index: &mut HitTestIndex,
    width: f64,
    height: f64,
) {
    let state = params.state;
    let cfg = &state.config;
    let row_height = cfg.row_height;
    let partial = state.viewport.partial_row_height(row_height);
    let mut y = -partial + cfg.header_height + 1.0;

    let Some(cache) = params.data.root() else {
        return;
    };

    for row_idx in state.row_slice.start..state.row_slice.end {
        if y + row_height <= 0.0 || y >= height {
            y += row_height;
            continue;
        }
        draw_row(
            ctx,
            cells,
            params,
            hit_index,
            cache.get(row_idx),
            row_idx,
            y,
            &[],
            0,
            width,
        );
        y += row_height;
    }
}

/// Draw one full-width row band at `y` and register its hit region.
#[allow(clippy::too_many_arguments)]
pub(super) fn draw_row(
    ctx: &CanvasRenderingContext2d,
    cells: &CellRegistry,
    params: &RenderParams<'_>,
    hit_index: &mut HitTestIndex,
    row: Option<&Row>,
    row_idx: usize,
    y: f64,
    path: &[usize],
    level: usize,
    width: f64,
) {
    let state = params.state;
    let cfg = &state.config;
    let row_height = cfg.row_height;
    let hovered = state.hover_row == Some(row_idx);

    ctx.set_fill_style_str(if hovered { &cfg.row_bg_hover } else { &cfg.row_bg });
    ctx.fill_rect(0.0, y, width, row_height);

    if let Some(row) = row {
        if row.meta.is_dragging {
            ctx.set_global_alpha(0.5);
        }
        draw_scrollable_cells(ctx, cells, params, row, row_idx, y, path);
        draw_fixed_cells(ctx, cells, params, row, row_idx, y, path, hovered);
        if row.meta.is_dragging {
            ctx.set_global_alpha(1.0);
        }
    }

    ctx.set_stroke_style_str(&cfg.border_color);
    ctx.set_line_width(1.0);
    hline(ctx, 0.0, width, y + row_height);

    hit_index.push(HitRegion {
        x: None,
        y,
        height: row_height,
        level,
        kind: HitKind::Row {
            row_index: row_idx,
            path: path.to_vec(),
        },
    });
}

fn in_selection(params: &RenderParams<'_>, row_idx: usize, col_idx: usize, path: &[usize]) -> bool {
    let selection = &params.state.selection;
    selection.path == path && selection.is_cell_in_range(CellCoord::new(row_idx, col_idx))
}

fn is_active(params: &RenderParams<'_>, row_idx: usize, col_idx: usize) -> bool {
    params.state.active_cell == Some(CellCoord::new(row_idx, col_idx))
}

fn draw_scrollable_cells(
    ctx: &CanvasRenderingContext2d,
    cells: &CellRegistry,
    params: &RenderParams<'_>,
    row: &Row,
    row_idx: usize,
    y: f64,
    path: &[usize],
) {
    let state = params.state;
    let cfg = &state.config;
    let row_height = cfg.row_height;
    let scroll_left = state.viewport.scroll_left;
    let slice = state.col_slice;

    let mut x_offset: f64 = (0..slice.start).map(|i| state.layout.width(i)).sum();
    x_offset += 1.0;

    for i in slice.start..slice.end {
        let col_width = state.layout.width(i);
        let Some(column) = state.columns.get(i) else {
            break;
        };
        if column.fixed {
            x_offset += col_width;
            continue;
        }
        let x = x_offset - scroll_left;

        if in_selection(params, row_idx, i, path) {
            ctx.set_fill_style_str(&cfg.selection_fill);
            ctx.fill_rect(x, y, col_width, row_height);
        }

        ctx.set_stroke_style_str(&cfg.row_border_color);
        ctx.set_line_width(1.0);
        vline(ctx, x, y, y + row_height);

        let active = is_active(params, row_idx, i);
        cells.renderer_for(column.uidt).render(
            ctx,
            &CellProps {
                value: row.value(&column.title),
                row,
                column,
                x,
                y,
                width: col_width,
                height: row_height,
                selected: active,
                config: cfg,
            },
        );

        if active {
            // Clip the outline so it never bleeds under the pinned band.
            if x >= state.layout.fixed_width() {
                draw_active_outline(ctx, cfg, x, y, col_width, row_height);
            }
        }
        x_offset += col_width;
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_fixed_cells(
    ctx: &CanvasRenderingContext2d,
    cells: &CellRegistry,
    params: &RenderParams<'_>,
    row: &Row,
    row_idx: usize,
    y: f64,
    path: &[usize],
    hovered: bool,
) {
    let state = params.state;
    let cfg = &state.config;
    let row_height = cfg.row_height;
    let scrolled = state.viewport.scroll_left > 0.0;

    let mut x = 0.0;
    for (i, column) in state.columns.iter().enumerate() {
        if !column.fixed {
            continue;
        }
        let col_width = state.layout.width(i);

        if in_selection(params, row_idx, i, path) {
            ctx.set_fill_style_str(&cfg.selection_fill);
        } else {
            ctx.set_fill_style_str(if hovered { &cfg.row_bg_hover } else { &cfg.row_bg });
        }
        ctx.fill_rect(x, y, col_width, row_height);

        if i == 0 {
            draw_row_number(ctx, params, row_idx, x, y, col_width);
        } else {
            cells.renderer_for(column.uidt).render(
                ctx,
                &CellProps {
                    value: row.value(&column.title),
                    row,
                    column,
                    x,
                    y,
                    width: col_width,
                    height: row_height,
                    selected: is_active(params, row_idx, i),
                    config: cfg,
                },
            );
        }

        ctx.set_stroke_style_str(&cfg.row_border_color);
        ctx.set_line_width(1.0);
        vline(ctx, x, y, y + row_height);

        if is_active(params, row_idx, i) {
            draw_active_outline(ctx, cfg, x, y, col_width, row_height);
        }
        x += col_width;
    }

    if x > 0.0 {
        with_pinned_shadow(ctx, scrolled, || {
            ctx.set_stroke_style_str(&cfg.row_border_color);
            vline(ctx, x, y, y + row_height);
        });
    }
}

fn draw_row_number(
    ctx: &CanvasRenderingContext2d,
    params: &RenderParams<'_>,
    row_idx: usize,
    x: f64,
    y: f64,
    _width: f64,
) {
    let cfg = &params.state.config;
    ctx.set_fill_style_str(&cfg.row_text);
    ctx.set_font("500 13px Manrope");
    ctx.set_text_baseline("middle");
    let label = format!("{}", row_idx + 1);
    let _ = ctx.fill_text(&label, x + 10.0, y + cfg.row_height / 2.0);
}

pub(super) fn draw_active_outline(
    ctx: &CanvasRenderingContext2d,
    cfg: &crate::types::GridConfig,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) {
    ctx.set_stroke_style_str(&cfg.active_border);
    ctx.set_line_width(2.0);
    ctx.stroke_rect(x, y + 1.0, width, height - 2.0);
    ctx.set_line_width(1.0);
}
