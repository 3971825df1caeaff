//! Frozen header band.

use web_sys::CanvasRenderingContext2d;

use super::{hline, truncate_text, vline, with_pinned_shadow};
use crate::render::backend::RenderParams;

pub(super) fn render_header(ctx: &CanvasRenderingContext2d, params: &RenderParams<'_>, width: f64) {
    let state = params.state;
    let cfg = &state.config;
    let header_height = cfg.header_height;
    let scroll_left = state.viewport.scroll_left;

    ctx.set_fill_style_str(&cfg.header_bg);
    ctx.fill_rect(0.0, 0.0, width, header_height);

    ctx.set_stroke_style_str(&cfg.border_color);
    ctx.set_line_width(1.0);
    hline(ctx, 0.0, width, header_height);

    ctx.set_fill_style_str(&cfg.header_text);
    ctx.set_font("550 12px Manrope");
    ctx.set_text_baseline("middle");

    // Scrollable columns for the current column slice.
    let slice = state.col_slice;
    let mut x_offset: f64 = (0..slice.start).map(|i| state.layout.width(i)).sum();
    x_offset += 1.0;
    for i in slice.start..slice.end {
        let col_width = state.layout.width(i);
        if let Some(column) = state.columns.get(i) {
            if !column.fixed {
                let title = truncate_text(ctx, &column.title, col_width - 20.0);
                let _ = ctx.fill_text(&title, x_offset + 10.0 - scroll_left, header_height / 2.0);
            }
        }
        x_offset += col_width;
        vline(ctx, x_offset - scroll_left, 0.0, header_height);
    }

    // Fixed columns again, at absolute x.
    let mut x_offset = 0.0;
    for (i, column) in state.columns.iter().enumerate() {
        if !column.fixed {
            continue;
        }
        let col_width = state.layout.width(i);
        ctx.set_fill_style_str(&cfg.header_bg);
        ctx.fill_rect(x_offset, 0.0, col_width, header_height);
        ctx.set_fill_style_str(&cfg.header_text);
        let title = truncate_text(ctx, &column.title, col_width - 20.0);
        let _ = ctx.fill_text(&title, x_offset + 10.0, header_height / 2.0);
        ctx.set_stroke_style_str(&cfg.border_color);
        vline(ctx, x_offset, 0.0, header_height);
        x_offset += col_width;
    }

    let pinned_edge = state.layout.fixed_width();
    if pinned_edge > 0.0 {
        with_pinned_shadow(ctx, scroll_left > 0.0, || {
            ctx.set_stroke_style_str(&cfg.border_color);
            vline(ctx, pinned_edge, 0.0, header_height);
        });
    }
}
