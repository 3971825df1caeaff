//! Per-column-type cell renderer registry.
//!
//! Cell-type-specific rendering lives behind this contract; the grid core
//! only knows how to call it. A handler returning `Ok(true)` means the
//! event was fully handled and dispatch stops.

use std::collections::HashMap;

use serde_json::Value;
use web_sys::CanvasRenderingContext2d;

use super::canvas::truncate_text;
use crate::datasource::LocalFuture;
use crate::error::Result;
use crate::types::{ColumnType, GridColumn, GridConfig, Row};

/// Cell geometry and data handed to a renderer.
pub struct CellProps<'a> {
    pub value: Option<&'a Value>,
    pub row: &'a Row,
    pub column: &'a GridColumn,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub selected: bool,
    pub config: &'a GridConfig,
}

/// Owned event payload for the async cell handlers.
#[derive(Debug, Clone)]
pub struct CellEvent {
    pub row_index: usize,
    pub column_id: String,
    pub value: Option<Value>,
    pub path: Vec<usize>,
}

/// The cell plugin contract.
pub trait CellRenderer {
    fn render(&self, ctx: &CanvasRenderingContext2d, props: &CellProps<'_>);

    /// Returning `Ok(true)` stops further key dispatch.
    fn handle_key_down(&self, _event: CellEvent) -> LocalFuture<'_, Result<bool>> {
        Box::pin(std::future::ready(Ok(false)))
    }

    /// Returning `Ok(true)` stops further click dispatch.
    fn handle_click(&self, _event: CellEvent) -> LocalFuture<'_, Result<bool>> {
        Box::pin(std::future::ready(Ok(false)))
    }

    fn handle_hover(&self, _event: CellEvent) -> LocalFuture<'_, Result<()>> {
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Default renderer: the value's display text, truncated to the cell.
struct TextCell;

impl TextCell {
    fn display(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl CellRenderer for TextCell {
    fn render(&self, ctx: &CanvasRenderingContext2d, props: &CellProps<'_>) {
        let Some(value) = props.value else {
            return;
        };
        let text = Self::display(value);
        if text.is_empty() {
            return;
        }
        ctx.set_fill_style_str(&props.config.row_text);
        let weight = if props.column.primary { "600" } else { "500" };
        ctx.set_font(&format!("{weight} 13px Manrope"));
        ctx.set_text_baseline("middle");
        let truncated = truncate_text(ctx, &text, props.width - 20.0);
        let _ = ctx.fill_text(&truncated, props.x + 10.0, props.y + props.height / 2.0);
    }
}

/// Checkbox renderer: a filled square when checked.
struct CheckboxCell;

impl CheckboxCell {
    fn is_checked(value: Option<&Value>) -> bool {
        match value {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::String(s)) => s == "1" || s == "true",
            _ => false,
        }
    }
}

impl CellRenderer for CheckboxCell {
    fn render(&self, ctx: &CanvasRenderingContext2d, props: &CellProps<'_>) {
        let size = 14.0;
        let x = props.x + 10.0;
        let y = props.y + (props.height - size) / 2.0;
        ctx.set_stroke_style_str(&props.config.header_text);
        ctx.set_line_width(1.0);
        ctx.stroke_rect(x, y, size, size);
        if Self::is_checked(props.value) {
            ctx.set_fill_style_str(&props.config.active_border);
            ctx.fill_rect(x + 3.0, y + 3.0, size - 6.0, size - 6.0);
        }
    }
}

/// Registry keyed by column type, with a text fallback.
pub struct CellRegistry {
    renderers: HashMap<ColumnType, Box<dyn CellRenderer>>,
    fallback: Box<dyn CellRenderer>,
}

impl CellRegistry {
    pub fn new() -> Self {
        let mut renderers: HashMap<ColumnType, Box<dyn CellRenderer>> = HashMap::new();
        renderers.insert(ColumnType::Checkbox, Box::new(CheckboxCell));
        Self {
            renderers,
            fallback: Box::new(TextCell),
        }
    }

    /// Install or replace the renderer for a column type.
    pub fn register(&mut self, uidt: ColumnType, renderer: Box<dyn CellRenderer>) {
        self.renderers.insert(uidt, renderer);
    }

    pub fn renderer_for(&self, uidt: Option<ColumnType>) -> &dyn CellRenderer {
        uidt.and_then(|t| self.renderers.get(&t))
            .map_or(self.fallback.as_ref(), Box::as_ref)
    }
}

impl Default for CellRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_value_coercion() {
        assert!(CheckboxCell::is_checked(Some(&Value::Bool(true))));
        assert!(CheckboxCell::is_checked(Some(&serde_json::json!(1))));
        assert!(CheckboxCell::is_checked(Some(&Value::String("1".into()))));
        assert!(!CheckboxCell::is_checked(Some(&Value::Bool(false))));
        assert!(!CheckboxCell::is_checked(None));
    }

    #[test]
    fn registry_falls_back_to_text() {
        let registry = CellRegistry::new();
        // No panic and distinct handlers for registered types.
        let _ = registry.renderer_for(Some(ColumnType::Checkbox));
        let _ = registry.renderer_for(Some(ColumnType::SingleLineText));
        let _ = registry.renderer_for(None);
    }

    #[test]
    fn default_handlers_do_not_consume_events() {
        use std::future::Future;

        let registry = CellRegistry::new();
        let renderer = registry.renderer_for(None);
        let event = CellEvent {
            row_index: 0,
            column_id: "c".to_string(),
            value: None,
            path: Vec::new(),
        };
        let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
        let mut fut = renderer.handle_click(event);
        match fut.as_mut().poll(&mut cx) {
            std::task::Poll::Ready(Ok(handled)) => assert!(!handled),
            _ => panic!("default click handler must resolve immediately"),
        }
    }
}
