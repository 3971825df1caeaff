//! Keyboard navigation state machine.
//!
//! A single handler dispatches on modifier+key. Key-repeat is coalesced
//! with a 50ms throttle; every branch that changes the active cell or the
//! selection re-requests scroll-into-view and a redraw.

use super::{select::clamp_to_span_limit, EditState, Effect};
use crate::types::{CellCoord, GridColumn, SelectionRange};

/// Minimum interval between handled key events.
const KEY_THROTTLE_MS: f64 = 50.0;

/// Coalesces key-repeat bursts.
#[derive(Debug, Default)]
pub struct KeyThrottle {
    last_ms: Option<f64>,
}

impl KeyThrottle {
    pub fn allow(&mut self, now_ms: f64) -> bool {
        match self.last_ms {
            Some(last) if now_ms - last < KEY_THROTTLE_MS => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }
}

/// Keys the navigation handler cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Tab,
    Enter,
    Escape,
    Delete,
    Backspace,
    Space,
    KeyR,
    KeyC,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowUp" => Some(Self::ArrowUp),
            "ArrowDown" => Some(Self::ArrowDown),
            "ArrowLeft" => Some(Self::ArrowLeft),
            "ArrowRight" => Some(Self::ArrowRight),
            "Tab" => Some(Self::Tab),
            "Enter" => Some(Self::Enter),
            "Escape" => Some(Self::Escape),
            "Delete" => Some(Self::Delete),
            "Backspace" => Some(Self::Backspace),
            " " => Some(Self::Space),
            "r" | "R" => Some(Self::KeyR),
            "c" | "C" => Some(Self::KeyC),
            _ => None,
        }
    }
}

/// Decoded keyboard event.
#[derive(Debug, Clone, Copy)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    pub cmd_or_ctrl: bool,
    pub alt: bool,
}

/// Everything the navigation handler reads and mutates.
pub struct NavContext<'a> {
    pub columns: &'a [GridColumn],
    pub total_rows: usize,
    pub selection: &'a mut SelectionRange,
    pub active_cell: &'a mut Option<CellCoord>,
    pub editing: &'a mut Option<EditState>,
    pub allow_row_add: bool,
    pub path: Vec<usize>,
}

impl NavContext<'_> {
    /// First navigable column (0 is the row-number column).
    fn first_col(&self) -> usize {
        1.min(self.columns.len().saturating_sub(1))
    }

    fn last_col(&self) -> usize {
        self.columns.len().saturating_sub(1)
    }
}

/// Dispatch one keyboard event, returning the effects to execute.
pub fn handle_key(
    ctx: &mut NavContext<'_>,
    input: KeyInput,
    throttle: &mut KeyThrottle,
    now_ms: f64,
) -> Vec<Effect> {
    if !throttle.allow(now_ms) {
        return Vec::new();
    }

    if ctx.editing.is_some() {
        return match input.key {
            Key::Escape => exit_edit(ctx),
            Key::Enter => {
                *ctx.editing = None;
                vec![Effect::EndEdit, Effect::Redraw]
            }
            // Everything else belongs to the editor.
            _ => Vec::new(),
        };
    }

    if input.alt {
        return match input.key {
            Key::KeyR if ctx.allow_row_add => append_row(ctx),
            Key::KeyC => vec![Effect::AddColumn, Effect::Redraw],
            _ => Vec::new(),
        };
    }

    match input.key {
        Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => arrow(ctx, input),
        Key::Tab => tab(ctx, input.shift),
        Key::Enter => enter(ctx),
        Key::Delete | Key::Backspace => clear(ctx),
        Key::Escape => collapse_to_active(ctx),
        Key::Space => expand_active_row(ctx),
        Key::KeyR | Key::KeyC => Vec::new(),
    }
}

fn moved_effects(cell: CellCoord) -> Vec<Effect> {
    vec![
        Effect::ScrollIntoView {
            row: cell.row,
            col: cell.col,
        },
        Effect::Redraw,
    ]
}

fn arrow(ctx: &mut NavContext<'_>, input: KeyInput) -> Vec<Effect> {
    let Some(active) = *ctx.active_cell else {
        return Vec::new();
    };
    if ctx.total_rows == 0 {
        return Vec::new();
    }
    let last_row = ctx.total_rows - 1;
    let (first_col, last_col) = (ctx.first_col(), ctx.last_col());

    if input.shift {
        // Extend the selection; the anchor never moves, the far edge is
        // capped at the span limit.
        if ctx.selection.is_empty() {
            ctx.selection.start_range(active);
        }
        let anchor = ctx.selection.anchor().unwrap_or(active);
        let focus = ctx.selection.focus().unwrap_or(active);
        let next = match (input.key, input.cmd_or_ctrl) {
            (Key::ArrowUp, true) => CellCoord::new(0, focus.col),
            (Key::ArrowDown, true) => CellCoord::new(last_row, focus.col),
            (Key::ArrowLeft, true) => CellCoord::new(focus.row, first_col),
            (Key::ArrowRight, true) => CellCoord::new(focus.row, last_col),
            (Key::ArrowUp, false) => CellCoord::new(focus.row.saturating_sub(1), focus.col),
            (Key::ArrowDown, false) => CellCoord::new((focus.row + 1).min(last_row), focus.col),
            (Key::ArrowLeft, false) => {
                CellCoord::new(focus.row, focus.col.saturating_sub(1).max(first_col))
            }
            (Key::ArrowRight, false) => CellCoord::new(focus.row, (focus.col + 1).min(last_col)),
            _ => focus,
        };
        let next = CellCoord::new(clamp_to_span_limit(anchor.row, next.row), next.col);
        if ctx.selection.focus() == Some(next) {
            return Vec::new();
        }
        ctx.selection.end_range(next);
        return moved_effects(next);
    }

    let next = match (input.key, input.cmd_or_ctrl) {
        (Key::ArrowUp, true) => CellCoord::new(0, active.col),
        (Key::ArrowDown, true) => CellCoord::new(last_row, active.col),
        (Key::ArrowLeft, true) => CellCoord::new(active.row, first_col),
        (Key::ArrowRight, true) => CellCoord::new(active.row, last_col),
        (Key::ArrowUp, false) => CellCoord::new(active.row.saturating_sub(1), active.col),
        (Key::ArrowDown, false) => CellCoord::new((active.row + 1).min(last_row), active.col),
        (Key::ArrowLeft, false) => {
            CellCoord::new(active.row, active.col.saturating_sub(1).max(first_col))
        }
        (Key::ArrowRight, false) => CellCoord::new(active.row, (active.col + 1).min(last_col)),
        _ => active,
    };
    if next == active {
        return Vec::new();
    }
    *ctx.active_cell = Some(next);
    ctx.selection.start_range(next);
    moved_effects(next)
}

/// Column-wise movement with row wrap; Tab on the very last cell appends a
/// row when allowed.
fn tab(ctx: &mut NavContext<'_>, shift: bool) -> Vec<Effect> {
    let Some(active) = *ctx.active_cell else {
        return Vec::new();
    };
    if ctx.total_rows == 0 {
        return Vec::new();
    }
    let last_row = ctx.total_rows - 1;
    let (first_col, last_col) = (ctx.first_col(), ctx.last_col());

    let next = if shift {
        if active.col > first_col {
            Some(CellCoord::new(active.row, active.col - 1))
        } else if active.row > 0 {
            Some(CellCoord::new(active.row - 1, last_col))
        } else {
            None
        }
    } else if active.col < last_col {
        Some(CellCoord::new(active.row, active.col + 1))
    } else if active.row < last_row {
        Some(CellCoord::new(active.row + 1, first_col))
    } else if ctx.allow_row_add {
        return append_row(ctx);
    } else {
        None
    };

    let Some(next) = next else {
        return Vec::new();
    };
    *ctx.active_cell = Some(next);
    ctx.selection.start_range(next);
    moved_effects(next)
}

fn enter(ctx: &mut NavContext<'_>) -> Vec<Effect> {
    let Some(active) = *ctx.active_cell else {
        return Vec::new();
    };
    let Some(col) = ctx.columns.get(active.col) else {
        return Vec::new();
    };
    let Some(uidt) = col.uidt else {
        return Vec::new();
    };
    if !uidt.is_editable() || uidt.no_enter_navigate() || col.readonly {
        return Vec::new();
    }
    vec![
        Effect::BeginEdit {
            row: active.row,
            col: active.col,
        },
        Effect::Redraw,
    ]
}

fn clear(ctx: &mut NavContext<'_>) -> Vec<Effect> {
    if !ctx.selection.is_empty() && !ctx.selection.is_single_cell() {
        return vec![Effect::ClearSelection, Effect::Redraw];
    }
    let Some(active) = *ctx.active_cell else {
        return Vec::new();
    };
    let clearable = ctx
        .columns
        .get(active.col)
        .and_then(|c| c.uidt)
        .is_some_and(|t| t.is_clearable());
    if !clearable {
        return Vec::new();
    }
    vec![
        Effect::ClearCell {
            row: active.row,
            col: active.col,
            path: ctx.path.clone(),
        },
        Effect::Redraw,
    ]
}

fn exit_edit(ctx: &mut NavContext<'_>) -> Vec<Effect> {
    *ctx.editing = None;
    let mut effects = vec![Effect::EndEdit];
    effects.extend(collapse_to_active(ctx));
    if !effects.contains(&Effect::Redraw) {
        effects.push(Effect::Redraw);
    }
    effects
}

/// Escape collapses the selection to the active cell.
fn collapse_to_active(ctx: &mut NavContext<'_>) -> Vec<Effect> {
    let Some(active) = *ctx.active_cell else {
        return Vec::new();
    };
    if ctx.selection.is_single_cell() {
        return Vec::new();
    }
    ctx.selection.start_range(active);
    vec![Effect::Redraw]
}

fn expand_active_row(ctx: &mut NavContext<'_>) -> Vec<Effect> {
    let Some(active) = *ctx.active_cell else {
        return Vec::new();
    };
    vec![
        Effect::ExpandRow {
            row: active.row,
            path: ctx.path.clone(),
        },
        Effect::Redraw,
    ]
}

/// Append a row at the end of the dataset and focus its first cell.
fn append_row(ctx: &mut NavContext<'_>) -> Vec<Effect> {
    let next = CellCoord::new(ctx.total_rows, ctx.first_col());
    *ctx.active_cell = Some(next);
    ctx.selection.start_range(next);
    let mut effects = vec![Effect::AppendRow {
        path: ctx.path.clone(),
    }];
    effects.extend(moved_effects(next));
    effects
}
