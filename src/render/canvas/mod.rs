//! Canvas 2D backend.

mod groups;
mod header;
mod overlay;
pub mod renderer;
mod rows;

pub use overlay::fill_handle_position;
pub use renderer::CanvasRenderer;

use web_sys::CanvasRenderingContext2d;

/// Crisp pixel position for 1px lines.
pub(crate) fn crisp(x: f64) -> f64 {
    x.floor() + 0.5
}

/// Measured text width; `None` when measurement is unavailable (headless).
pub(crate) fn text_width(ctx: &CanvasRenderingContext2d, text: &str) -> Option<f64> {
    ctx.measure_text(text).ok().map(|m| m.width())
}

/// Truncate `text` with an ellipsis so it fits `max_width` in the current
/// font. Returns the input unchanged when it fits or cannot be measured.
pub fn truncate_text(ctx: &CanvasRenderingContext2d, text: &str, max_width: f64) -> String {
    if max_width <= 0.0 {
        return String::new();
    }
    let Some(full) = text_width(ctx, text) else {
        return text.to_string();
    };
    if full <= max_width {
        return text.to_string();
    }

    let ellipsis = '\u{2026}';
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let mut candidate: String = chars.iter().collect();
        candidate.push(ellipsis);
        match text_width(ctx, &candidate) {
            Some(w) if w <= max_width => return candidate,
            Some(_) => {}
            None => return candidate,
        }
    }
    ellipsis.to_string()
}

/// Draw a vertical separator line.
pub(crate) fn vline(ctx: &CanvasRenderingContext2d, x: f64, y0: f64, y1: f64) {
    ctx.begin_path();
    ctx.move_to(crisp(x), y0);
    ctx.line_to(crisp(x), y1);
    ctx.stroke();
}

/// Draw a horizontal separator line.
pub(crate) fn hline(ctx: &CanvasRenderingContext2d, x0: f64, x1: f64, y: f64) {
    ctx.begin_path();
    ctx.move_to(x0, crisp(y));
    ctx.line_to(x1, crisp(y));
    ctx.stroke();
}

/// Drop-shadow settings for the pinned column edge while scrolled.
pub(crate) fn with_pinned_shadow(ctx: &CanvasRenderingContext2d, scrolled: bool, f: impl FnOnce()) {
    if scrolled {
        ctx.set_shadow_color("rgba(0, 0, 0, 0.3)");
        ctx.set_shadow_blur(2.0);
        ctx.set_shadow_offset_x(1.0);
        ctx.set_shadow_offset_y(0.0);
    }
    f();
    if scrolled {
        ctx.set_shadow_color("transparent");
        ctx.set_shadow_blur(0.0);
        ctx.set_shadow_offset_x(0.0);
        ctx.set_shadow_offset_y(0.0);
    }
}
