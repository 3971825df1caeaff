//! Pointer and keyboard dispatch.
//!
//! Pointer-down handlers are tried in fixed priority order (resize
//! handle, fill handle, row drag, column header, cell selection) so only
//! one gesture can claim the pointer.

use super::{AsyncTask, GridShell};
use crate::error::log_error;
use crate::hittest::{HitFilter, HitKind};
use crate::interaction::{
    fill, keyboard, reorder_column, reorder_row, resize, select, Effect, InteractionMode,
    KeyInput, NavContext, PointerInput,
};
use crate::render::canvas::fill_handle_position;

/// Distance within which a pointer grabs the fill handle.
const FILL_HANDLE_GRAB: f64 = 8.0;

pub fn pointer_down(shell: &mut GridShell, input: PointerInput, now_ms: f64) -> Vec<AsyncTask> {
    // One gesture at a time: a press while another controller owns the
    // pointer is dropped on the floor.
    if !shell.state.mode.is_idle() {
        return Vec::new();
    }
    let header_height = shell.state.config.header_height;
    let scroll_left = shell.state.viewport.scroll_left;

    if input.y < header_height {
        // Header band: resize handle first, then column reorder.
        if let Some(index) = resize::find_resize_target(
            &shell.state.columns,
            &shell.state.layout,
            scroll_left,
            input.x,
        ) {
            if let Some(session) = resize::begin(&shell.state.columns, index, input.x) {
                shell.state.mode = InteractionMode::Resizing(session);
                return shell.apply_effects(vec![Effect::Redraw], now_ms);
            }
        }
        if let Some(drag) =
            reorder_column::begin(&shell.state.columns, &shell.state.layout, scroll_left, input.x)
        {
            shell.state.mode = InteractionMode::ReorderingColumn(drag);
            return shell.apply_effects(vec![Effect::Redraw], now_ms);
        }
        return Vec::new();
    }

    // Fill handle wins over everything in the content area.
    if let Some(handle) = fill_handle_position(&shell.state) {
        let grabbed = (input.x - handle.x).abs() <= FILL_HANDLE_GRAB
            && (input.y - handle.y).abs() <= FILL_HANDLE_GRAB;
        if grabbed {
            if let Some(session) = fill::begin(&shell.state.selection) {
                shell.state.mode = InteractionMode::Filling(session);
                return shell.apply_effects(vec![Effect::Redraw], now_ms);
            }
        }
    }

    // Row drag initiates from the row-number band.
    if input.x < shell.state.layout.width(0) {
        let region = shell
            .state
            .hit_index
            .find_element_at(input.x, input.y, Some(HitFilter::Row))
            .cloned();
        if let Some(region) = region {
            if let Some(drag) = reorder_row::begin(&region, input.y) {
                set_row_dragging(shell, &drag.path.clone(), drag.source_index, true);
                shell.state.mode = InteractionMode::ReorderingRow(drag);
                return shell.apply_effects(vec![Effect::Redraw], now_ms);
            }
        }
    }

    // Group header toggles; add-row appends; anything else selects.
    let kind = shell
        .state
        .hit_index
        .find_element_at(input.x, input.y, None)
        .map(|hit| hit.kind.clone());
    match kind {
        Some(HitKind::GroupHeader { path }) => {
            if let Some(gl) = &shell.group_loader {
                gl.cache_mut().toggle_expand(&path);
            }
            let mut tasks = shell.update_visible_rows(now_ms);
            tasks.extend(shell.apply_effects(vec![Effect::Redraw], now_ms));
            return tasks;
        }
        Some(HitKind::AddRow { path }) => {
            return shell.apply_effects(vec![Effect::AppendRow { path }], now_ms);
        }
        _ => {}
    }

    let Some((cell, path)) = select::cell_at_point(
        &shell.state.layout,
        &shell.state.hit_index,
        scroll_left,
        input.x,
        input.y,
    ) else {
        return Vec::new();
    };
    let (session, effects) = select::mouse_down(
        &mut shell.state.selection,
        &mut shell.state.active_cell,
        cell,
        path,
        input.shift,
    );
    if let Some(session) = session {
        shell.state.mode = InteractionMode::Selecting(session);
    }
    shell.apply_effects(effects, now_ms)
}

pub fn pointer_move(shell: &mut GridShell, input: PointerInput, now_ms: f64) -> Vec<AsyncTask> {
    let mode = std::mem::take(&mut shell.state.mode);
    match mode {
        InteractionMode::Idle => {
            shell.state.mode = InteractionMode::Idle;
            update_hover(shell, input, now_ms)
        }
        InteractionMode::Resizing(mut session) => {
            match resize::on_move(&mut session, &shell.state.columns, input.x) {
                Ok(effects) => {
                    shell.state.mode = InteractionMode::Resizing(session);
                    shell.apply_effects(effects, now_ms)
                }
                Err(err) => {
                    // Bad pointer math tears the session down immediately.
                    log_error("column resize aborted", &err);
                    shell.state.mode = InteractionMode::Idle;
                    shell.apply_effects(vec![Effect::Redraw], now_ms)
                }
            }
        }
        InteractionMode::ReorderingColumn(mut drag) => {
            let effects = reorder_column::on_move(
                &mut drag,
                &shell.state.columns,
                &shell.state.layout,
                shell.state.viewport.scroll_left,
                input.x,
            );
            shell.state.mode = InteractionMode::ReorderingColumn(drag);
            shell.apply_effects(effects, now_ms)
        }
        InteractionMode::ReorderingRow(mut drag) => {
            let effects = reorder_row::on_move(
                &mut drag,
                &shell.state.hit_index,
                input.x,
                input.y,
                shell.state.config.row_height,
                shell.state.viewport.height,
            );
            shell.state.mode = InteractionMode::ReorderingRow(drag);
            shell.apply_effects(effects, now_ms)
        }
        InteractionMode::Selecting(session) => {
            let effects = match select::cell_at_point(
                &shell.state.layout,
                &shell.state.hit_index,
                shell.state.viewport.scroll_left,
                input.x,
                input.y,
            ) {
                Some((cell, _)) => {
                    let total = shell.loader_for(&session.path).cache().total_rows();
                    select::mouse_move(&session, &mut shell.state.selection, total, cell)
                }
                None => Vec::new(),
            };
            shell.state.mode = InteractionMode::Selecting(session);
            shell.apply_effects(effects, now_ms)
        }
        InteractionMode::Filling(mut session) => {
            let row_hit = shell
                .state
                .hit_index
                .find_element_at(input.x, input.y, Some(HitFilter::Row))
                .and_then(|hit| match &hit.kind {
                    HitKind::Row { row_index, .. } => Some(*row_index),
                    _ => None,
                });
            let effects = match row_hit {
                Some(row_index) => {
                    let total = shell.loader_for(&session.path.clone()).cache().total_rows();
                    fill::on_move(&mut session, total, row_index)
                }
                None => Vec::new(),
            };
            shell.state.mode = InteractionMode::Filling(session);
            shell.apply_effects(effects, now_ms)
        }
    }
}

pub fn pointer_up(shell: &mut GridShell, _input: PointerInput, now_ms: f64) -> Vec<AsyncTask> {
    let mode = std::mem::take(&mut shell.state.mode);
    let effects = match mode {
        InteractionMode::Idle => Vec::new(),
        InteractionMode::Resizing(session) => resize::on_up(&session),
        InteractionMode::ReorderingColumn(drag) => reorder_column::on_drop(&drag),
        InteractionMode::ReorderingRow(drag) => {
            set_row_dragging(shell, &drag.path.clone(), drag.source_index, false);
            reorder_row::on_drop(&drag)
        }
        InteractionMode::Selecting(_) => vec![Effect::Redraw],
        InteractionMode::Filling(session) => fill::on_drop(&session, &mut shell.state.selection),
    };
    shell.apply_effects(effects, now_ms)
}

pub fn key_down(shell: &mut GridShell, input: KeyInput, now_ms: f64) -> Vec<AsyncTask> {
    let columns = shell.state.columns.clone();
    let path = shell.state.selection.path.clone();
    let total_rows = shell.loader_for(&path).cache().total_rows();
    let allow_row_add = shell.state.allow_row_add;

    let mut throttle = std::mem::take(&mut shell.state.key_throttle);
    let effects = {
        let mut ctx = NavContext {
            columns: &columns,
            total_rows,
            selection: &mut shell.state.selection,
            active_cell: &mut shell.state.active_cell,
            editing: &mut shell.state.editing,
            allow_row_add,
            path,
        };
        keyboard::handle_key(&mut ctx, input, &mut throttle, now_ms)
    };
    shell.state.key_throttle = throttle;
    shell.apply_effects(effects, now_ms)
}

fn update_hover(shell: &mut GridShell, input: PointerInput, now_ms: f64) -> Vec<AsyncTask> {
    let hovered = shell
        .state
        .hit_index
        .find_element_at(input.x, input.y, Some(HitFilter::Row))
        .and_then(|hit| match &hit.kind {
            HitKind::Row { row_index, .. } => Some(*row_index),
            _ => None,
        });
    if hovered != shell.state.hover_row {
        shell.state.hover_row = hovered;
        return shell.apply_effects(vec![Effect::Redraw], now_ms);
    }
    Vec::new()
}

fn set_row_dragging(shell: &mut GridShell, path: &[usize], row_index: usize, dragging: bool) {
    let loader = shell.loader_for(path);
    let mut cache = loader.cache_mut();
    if let Some(row) = cache.get_mut(row_index) {
        row.meta.is_dragging = dragging;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::datasource::{DataSource, GroupPage, GroupQuery, LocalFuture, RowQuery};
    use crate::error::Result as DsResult;
    use crate::hittest::HitRegion;
    use crate::types::{CellCoord, ColumnType, GridColumn, Row, RowValues};
    use std::rc::Rc;

    struct StaticSource;

    impl DataSource for StaticSource {
        fn load_rows(
            &self,
            query: RowQuery,
            _show_loading: bool,
        ) -> LocalFuture<'_, DsResult<Vec<Row>>> {
            let rows = (query.offset..query.offset + query.limit)
                .map(|i| Row::new(i, RowValues::new()))
                .collect();
            Box::pin(std::future::ready(Ok(rows)))
        }

        fn load_groups(&self, _query: GroupQuery) -> LocalFuture<'_, DsResult<GroupPage>> {
            Box::pin(std::future::ready(Ok(GroupPage::default())))
        }

        fn related_display_column(
            &self,
            _column_id: &str,
        ) -> LocalFuture<'_, DsResult<Option<String>>> {
            Box::pin(std::future::ready(Ok(None)))
        }

        fn move_row(
            &self,
            _row_index: usize,
            _before: Option<usize>,
            _path: &[usize],
        ) -> LocalFuture<'_, DsResult<()>> {
            Box::pin(std::future::ready(Ok(())))
        }
    }

    fn shell_with_rows(total: usize) -> GridShell {
        let mut shell = GridShell::new(Rc::new(StaticSource));
        let mk = |id: &str, order: f64| GridColumn {
            id: id.to_string(),
            title: id.to_string(),
            width: "100".to_string(),
            uidt: Some(ColumnType::SingleLineText),
            fixed: false,
            primary: false,
            readonly: false,
            order,
        };
        shell.state.set_columns(vec![mk("a", 1.0), mk("b", 2.0)]);
        shell.root_loader().cache_mut().set_total_rows(total);
        shell.state.update_slices(total);
        // Regions the renderer would have produced for the visible band.
        for i in shell.state.row_slice.start..shell.state.row_slice.end {
            shell.state.hit_index.push(HitRegion {
                x: None,
                y: 32.0 + 32.0 * u32::try_from(i).map_or(0.0, f64::from),
                height: 32.0,
                level: 0,
                kind: HitKind::Row {
                    row_index: i,
                    path: Vec::new(),
                },
            });
        }
        shell
    }

    fn press(shell: &mut GridShell, x: f64, y: f64, shift: bool) {
        pointer_down(
            shell,
            PointerInput {
                x,
                y,
                shift,
                alt: false,
                cmd_or_ctrl: false,
            },
            1_000.0,
        );
    }

    #[test]
    fn click_selects_cell_and_sets_mode() {
        let mut shell = shell_with_rows(100);
        // Row 2 band at y in [96, 128); column "a" spans x [80, 180).
        press(&mut shell, 120.0, 100.0, false);
        assert!(matches!(shell.state.mode, InteractionMode::Selecting(_)));
        assert_eq!(shell.state.active_cell, Some(CellCoord::new(2, 1)));
        assert!(shell.state.selection.is_single_cell());
    }

    #[test]
    fn header_click_near_edge_starts_resize() {
        let mut shell = shell_with_rows(100);
        // Column "a" trailing edge at x = 180 (no scroll).
        press(&mut shell, 181.0, 10.0, false);
        assert!(matches!(shell.state.mode, InteractionMode::Resizing(_)));
    }

    #[test]
    fn header_click_elsewhere_starts_column_drag() {
        let mut shell = shell_with_rows(100);
        press(&mut shell, 120.0, 10.0, false);
        assert!(matches!(
            shell.state.mode,
            InteractionMode::ReorderingColumn(_)
        ));
    }

    #[test]
    fn row_number_band_starts_row_drag() {
        let mut shell = shell_with_rows(100);
        {
            let loader = shell.root_loader();
            let mut cache = loader.cache_mut();
            for i in 0..10 {
                cache.insert(Row::new(i, RowValues::new()));
            }
        }
        press(&mut shell, 20.0, 100.0, false);
        assert!(matches!(shell.state.mode, InteractionMode::ReorderingRow(_)));
        let loader = shell.root_loader();
        assert!(loader.cache().get(2).unwrap().meta.is_dragging);
    }

    #[test]
    fn release_always_returns_to_idle() {
        let mut shell = shell_with_rows(100);
        press(&mut shell, 120.0, 100.0, false);
        pointer_up(&mut shell, PointerInput::default(), 1_100.0);
        assert!(shell.state.mode.is_idle());
    }

    #[test]
    fn drag_selection_extends_through_shell() {
        let mut shell = shell_with_rows(100);
        press(&mut shell, 120.0, 100.0, false);
        pointer_move(
            &mut shell,
            PointerInput {
                x: 220.0,
                y: 196.0,
                ..PointerInput::default()
            },
            1_050.0,
        );
        let (min_row, min_col, max_row, max_col) = shell.state.selection.normalized().unwrap();
        assert_eq!((min_row, min_col, max_row, max_col), (2, 1, 5, 2));
    }

    #[test]
    fn keyboard_flows_through_the_shell() {
        let mut shell = shell_with_rows(100);
        press(&mut shell, 120.0, 100.0, false);
        pointer_up(&mut shell, PointerInput::default(), 1_100.0);
        key_down(
            &mut shell,
            KeyInput {
                key: crate::interaction::Key::ArrowDown,
                shift: false,
                cmd_or_ctrl: false,
                alt: false,
            },
            2_000.0,
        );
        assert_eq!(shell.state.active_cell, Some(CellCoord::new(3, 1)));
    }

    #[test]
    fn hover_tracking_marks_rows() {
        let mut shell = shell_with_rows(100);
        pointer_move(
            &mut shell,
            PointerInput {
                x: 120.0,
                y: 100.0,
                ..PointerInput::default()
            },
            1_000.0,
        );
        assert_eq!(shell.state.hover_row, Some(2));
    }
}
