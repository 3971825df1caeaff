//! Gesture dispatch and selection bounds through the grid shell.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{block_on, text_columns, FakeSource};
use gridview::hittest::{HitKind, HitRegion};
use gridview::interaction::{InteractionMode, Key, KeyInput, PointerInput, MAX_SELECTION_LIMIT};
use gridview::types::CellCoord;
use gridview::viewer::{events, GridShell};
use std::rc::Rc;

fn shell(total: usize) -> GridShell {
    let source = FakeSource::new();
    let mut shell = GridShell::new(source);
    shell.state.set_columns(text_columns(4, "100"));
    shell.root_loader().cache_mut().set_total_rows(total);
    shell.state.update_slices(total);
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

fn pointer(x: f64, y: f64, shift: bool) -> PointerInput {
    PointerInput {
        x,
        y,
        shift,
        alt: false,
        cmd_or_ctrl: false,
    }
}

#[test]
fn selection_span_stays_bounded_across_all_extension_paths() {
    let mut shell = shell(100_000);
    // Anchor via click on row 1, then release.
    events::pointer_down(&mut shell, pointer(120.0, 70.0, false), 0.0);
    events::pointer_up(&mut shell, pointer(120.0, 70.0, false), 10.0);

    // Shift-click far below.
    events::pointer_down(&mut shell, pointer(120.0, 600.0, true), 100.0);
    let (min_row, _, max_row, _) = shell.state.selection.normalized().unwrap();
    assert!(max_row - min_row < MAX_SELECTION_LIMIT);

    // Shift-arrow with the jump modifier.
    events::key_down(
        &mut shell,
        KeyInput {
            key: Key::ArrowDown,
            shift: true,
            cmd_or_ctrl: true,
            alt: false,
        },
        1_000.0,
    );
    let (min_row, _, max_row, _) = shell.state.selection.normalized().unwrap();
    assert!(max_row - min_row < MAX_SELECTION_LIMIT);

    // Drag selection from a fresh anchor.
    events::pointer_down(&mut shell, pointer(120.0, 70.0, false), 2_000.0);
    events::pointer_move(&mut shell, pointer(220.0, 640.0, false), 2_100.0);
    let (min_row, _, max_row, _) = shell.state.selection.normalized().unwrap();
    assert!(max_row - min_row < MAX_SELECTION_LIMIT);
}

#[test]
fn gestures_are_mutually_exclusive() {
    let mut shell = shell(100);
    // A selection drag is in progress…
    events::pointer_down(&mut shell, pointer(120.0, 70.0, false), 0.0);
    assert!(matches!(shell.state.mode, InteractionMode::Selecting(_)));
    // …so a header press cannot start a second gesture without a release.
    events::pointer_down(&mut shell, pointer(120.0, 10.0, false), 50.0);
    assert!(matches!(shell.state.mode, InteractionMode::Selecting(_)));

    events::pointer_up(&mut shell, pointer(120.0, 70.0, false), 100.0);
    assert!(shell.state.mode.is_idle());
    events::pointer_down(&mut shell, pointer(120.0, 10.0, false), 150.0);
    assert!(matches!(
        shell.state.mode,
        InteractionMode::ReorderingColumn(_)
    ));
}

#[test]
fn resize_commit_flows_into_column_width() {
    let mut shell = shell(100);
    // Column c0 spans [80, 180); grab its trailing edge.
    events::pointer_down(&mut shell, pointer(180.0, 10.0, false), 0.0);
    assert!(matches!(shell.state.mode, InteractionMode::Resizing(_)));
    events::pointer_move(&mut shell, pointer(240.0, 10.0, false), 10.0);
    events::pointer_up(&mut shell, pointer(240.0, 10.0, false), 20.0);

    let col = shell.state.columns.iter().find(|c| c.id == "c0").unwrap();
    assert_eq!(col.width, "160");
    assert!(shell.state.mode.is_idle());
}

#[test]
fn column_reorder_updates_fractional_order() {
    let mut shell = shell(100);
    // Give the columns explicit orders first.
    for (i, col) in shell.state.columns.iter_mut().enumerate() {
        col.order = u32::try_from(i).map_or(0.0, f64::from);
    }
    events::pointer_down(&mut shell, pointer(120.0, 10.0, false), 0.0);
    events::pointer_move(&mut shell, pointer(350.0, 10.0, false), 10.0);
    events::pointer_up(&mut shell, pointer(350.0, 10.0, false), 20.0);

    let ids: Vec<&str> = shell.state.columns.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["row_number", "c1", "c0", "c2", "c3"]);
    let moved = shell.state.columns.iter().find(|c| c.id == "c0").unwrap();
    // Midpoint between the drop target's order and the next column's.
    assert!(moved.order > 2.0 && moved.order < 3.0);
    assert!(!shell.state.undo.is_empty());
}

#[test]
fn row_move_commits_through_the_data_source() {
    let mut shell = shell(100);
    {
        let loader = shell.root_loader();
        let mut cache = loader.cache_mut();
        for i in 0..20 {
            cache.insert(gridview::types::Row::new(
                i,
                gridview::types::RowValues::new(),
            ));
        }
    }
    // Grab row 1 from the row-number band, drop before row 6.
    events::pointer_down(&mut shell, pointer(20.0, 70.0, false), 0.0);
    assert!(matches!(shell.state.mode, InteractionMode::ReorderingRow(_)));
    events::pointer_move(&mut shell, pointer(20.0, 200.0, false), 10.0);
    let tasks = events::pointer_up(&mut shell, pointer(20.0, 200.0, false), 20.0);

    // Local reindex happened immediately…
    let loader = shell.root_loader();
    assert_eq!(loader.cache().get(1).unwrap().meta.row_index, 1);
    assert!(!shell.state.undo.is_empty());
    // …and the remote commit is deferred work.
    assert!(!tasks.is_empty());
    for task in tasks {
        block_on(task.run()).unwrap();
    }
}

#[test]
fn append_row_grows_the_cached_window() {
    let mut shell = shell(10);
    {
        let loader = shell.root_loader();
        let mut cache = loader.cache_mut();
        for i in 0..10 {
            cache.insert(gridview::types::Row::new(
                i,
                gridview::types::RowValues::new(),
            ));
        }
    }
    shell.state.active_cell = Some(CellCoord::new(0, 1));
    shell.state.selection.start_range(CellCoord::new(0, 1));
    events::key_down(
        &mut shell,
        KeyInput {
            key: Key::KeyR,
            shift: false,
            cmd_or_ctrl: false,
            alt: true,
        },
        0.0,
    );
    let loader = shell.root_loader();
    assert_eq!(loader.cache().total_rows(), 11);
    assert!(loader.cache().get(10).unwrap().meta.is_new);
    assert_eq!(shell.state.active_cell, Some(CellCoord::new(10, 1)));
}
