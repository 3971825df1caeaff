//! The grid shell: wires state, caches, loaders, and controllers together.
//!
//! [`GridShell`] is the platform-independent half: everything here
//! compiles and tests natively. The wasm-exported `GridView` (DOM events,
//! rAF scheduling, canvas) lives in `view.rs` and drives the shell.

pub mod events;
#[cfg(target_arch = "wasm32")]
pub mod source;
#[cfg(target_arch = "wasm32")]
pub mod view;

#[cfg(target_arch = "wasm32")]
pub use view::GridView;

use std::collections::HashMap;
use std::rc::Rc;

use crate::cache::{
    build_nested_where, ChunkRun, GroupByColumn, GroupLayoutParams, GroupLoader, RowLoader,
};
use crate::datasource::{DataSource, GridPersistence};
use crate::error::Result;
use crate::interaction::Effect;
use crate::state::GridState;
use crate::types::{CellCoord, Row, RowValues, Slice};
use crate::undo::UndoOp;

/// Deferred work produced by effect execution; the wasm layer spawns each
/// task on the event loop, tests drive them with a local executor.
pub enum AsyncTask {
    /// Drive planned chunk runs to completion.
    Dispatch {
        loader: Rc<RowLoader>,
        runs: Vec<ChunkRun>,
    },
    /// Commit a row move to the data source.
    CommitMove {
        source: Rc<dyn DataSource>,
        from: usize,
        to: Option<usize>,
        path: Vec<usize>,
    },
    /// Load group descriptor chunks for a sibling window.
    FetchGroups {
        loader: Rc<GroupLoader>,
        start: usize,
        end: usize,
        parent: Vec<usize>,
    },
}

impl AsyncTask {
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Dispatch { loader, runs } => {
                loader.dispatch(runs).await;
                Ok(())
            }
            Self::CommitMove {
                source,
                from,
                to,
                path,
            } => source.move_row(from, to, &path).await,
            Self::FetchGroups {
                loader,
                start,
                end,
                parent,
            } => loader.fetch_missing_chunks(start, end, &parent).await,
        }
    }
}

/// Platform-independent grid orchestration.
pub struct GridShell {
    pub state: GridState,
    pub source: Rc<dyn DataSource>,
    pub persistence: Option<Rc<dyn GridPersistence>>,
    /// Root dataset plus one loader per leaf group, keyed by path.
    loaders: HashMap<Vec<usize>, Rc<RowLoader>>,
    pub group_loader: Option<Rc<GroupLoader>>,
    /// Set by effect execution; the view coalesces it into one rAF paint.
    pub needs_render: bool,
}

impl GridShell {
    pub fn new(source: Rc<dyn DataSource>) -> Self {
        let mut loaders = HashMap::new();
        loaders.insert(
            Vec::new(),
            Rc::new(RowLoader::new(Rc::clone(&source), Vec::new(), None)),
        );
        Self {
            state: GridState::default(),
            source,
            persistence: None,
            loaders,
            group_loader: None,
            needs_render: false,
        }
    }

    /// Replace the group-by spec; clears every cache keyed by the old one.
    pub fn set_group_by(&mut self, group_by: Vec<GroupByColumn>) {
        self.loaders.retain(|path, _| path.is_empty());
        if let Some(root) = self.loaders.get(&Vec::new()) {
            root.cache_mut().clear();
        }
        self.group_loader = if group_by.is_empty() {
            None
        } else {
            Some(Rc::new(GroupLoader::new(Rc::clone(&self.source), group_by)))
        };
        self.needs_render = true;
    }

    pub fn root_loader(&self) -> Rc<RowLoader> {
        self.loaders
            .get(&Vec::new())
            .cloned()
            .unwrap_or_else(|| Rc::new(RowLoader::new(Rc::clone(&self.source), Vec::new(), None)))
    }

    /// Loader for a leaf group's dataset, created on first touch with the
    /// group's nested where filter.
    pub fn loader_for(&mut self, path: &[usize]) -> Rc<RowLoader> {
        if let Some(loader) = self.loaders.get(path) {
            return Rc::clone(loader);
        }
        let where_clause = self
            .group_loader
            .as_ref()
            .and_then(|gl| {
                let cache = gl.cache();
                cache
                    .find_group(path)
                    .map(|node| build_nested_where(&node.nested_in))
            })
            .flatten();
        let loader = Rc::new(RowLoader::new(
            Rc::clone(&self.source),
            path.to_vec(),
            where_clause,
        ));
        // Leaf row windows start from the group's reported count.
        if let Some(gl) = &self.group_loader {
            if let Some(node) = gl.cache().find_group(path) {
                loader.cache_mut().set_total_rows(node.count);
            }
        }
        self.loaders.insert(path.to_vec(), Rc::clone(&loader));
        loader
    }

    pub fn loaders(&self) -> impl Iterator<Item = (&Vec<usize>, &Rc<RowLoader>)> {
        self.loaders.iter()
    }

    /// Root dataset size (flat views).
    pub fn total_rows(&self) -> usize {
        self.root_loader().cache().total_rows()
    }

    /// Total scrollable content height for the current view.
    pub fn content_height(&self) -> f64 {
        let cfg = &self.state.config;
        match &self.group_loader {
            Some(gl) => gl.cache().band_height(
                &[],
                GroupLayoutParams {
                    row_height: cfg.row_height,
                    add_row_enabled: cfg.add_row_enabled,
                },
            ),
            None => {
                let total = u32::try_from(self.total_rows()).map_or(f64::MAX, f64::from);
                total * cfg.row_height
            }
        }
    }

    /// Visibility pass after any scroll/resize/data change: recompute
    /// slices, evict, and plan fetches for whatever the viewport (plus
    /// lookahead) needs now.
    pub fn update_visible_rows(&mut self, now_ms: f64) -> Vec<AsyncTask> {
        let mut tasks = Vec::new();
        if self.group_loader.is_some() {
            self.grouped_visible_pass(now_ms, &mut tasks);
        } else {
            let loader = self.root_loader();
            let total = loader.cache().total_rows();
            self.state.update_slices(total);
            let runs = loader.update_visible_rows(self.state.row_slice, now_ms);
            if !runs.is_empty() {
                tasks.push(AsyncTask::Dispatch { loader, runs });
            }
        }
        tasks
    }

    /// Grouped analogue: fetch the visible sibling window of group
    /// descriptors, trim the branch cache, and page rows for every
    /// expanded leaf intersecting the viewport.
    fn grouped_visible_pass(&mut self, now_ms: f64, tasks: &mut Vec<AsyncTask>) {
        let Some(gl) = self.group_loader.clone() else {
            return;
        };
        self.state.col_slice = self.state.viewport.col_slice(&self.state.layout);

        let cfg = &self.state.config;
        let params = GroupLayoutParams {
            row_height: cfg.row_height,
            add_row_enabled: cfg.add_row_enabled,
        };
        let scroll_top = self.state.viewport.scroll_top;
        let viewport_height = (self.state.viewport.height - cfg.header_height).max(0.0);
        let row_height = cfg.row_height;

        let visible_leaves: Vec<(Vec<usize>, usize, Slice)> = {
            let cache = gl.cache();
            let Some(range) =
                cache.calculate_group_range(&[], scroll_top, viewport_height, params)
            else {
                // Nothing cached yet: fetch the first window.
                tasks.push(AsyncTask::FetchGroups {
                    loader: Rc::clone(&gl),
                    start: 0,
                    end: 0,
                    parent: Vec::new(),
                });
                return;
            };
            tasks.push(AsyncTask::FetchGroups {
                loader: Rc::clone(&gl),
                start: range.start_index,
                end: range.end_index,
                parent: Vec::new(),
            });

            // Expanded leaves intersecting the viewport, with their local
            // visible row slices.
            let mut leaves = Vec::new();
            let mut y = range.start_y_offset;
            for index in range.start_index..=range.end_index {
                let Some(node) = cache.root().get(&index) else {
                    y += crate::cache::GROUP_HEADER_HEIGHT + crate::cache::GROUP_PADDING;
                    continue;
                };
                let h = cache.group_height(node, params);
                collect_visible_leaves(
                    &cache, node, &[index], y, viewport_height, row_height, params, &mut leaves,
                );
                y += h;
                if y > viewport_height {
                    break;
                }
            }
            leaves
        };

        {
            let mut cache = gl.cache_mut();
            let (start, end) = match cache.calculate_group_range(&[], scroll_top, viewport_height, params)
            {
                Some(range) => (range.start_index, range.end_index),
                None => (0, 0),
            };
            cache.clear_branch(start, end, &[]);
        }

        for (path, count, slice) in visible_leaves {
            let loader = self.loader_for(&path);
            loader.cache_mut().set_total_rows(count);
            let runs = loader.update_visible_rows(slice, now_ms);
            if !runs.is_empty() {
                tasks.push(AsyncTask::Dispatch { loader, runs });
            }
        }
    }

    /// Execute controller effects against the shell, returning the async
    /// follow-up work.
    pub fn apply_effects(&mut self, effects: Vec<Effect>, now_ms: f64) -> Vec<AsyncTask> {
        let mut tasks = Vec::new();
        for effect in effects {
            self.apply_effect(effect, now_ms, &mut tasks);
        }
        tasks
    }

    fn apply_effect(&mut self, effect: Effect, now_ms: f64, tasks: &mut Vec<AsyncTask>) {
        match effect {
            Effect::Redraw => self.needs_render = true,
            Effect::ScrollIntoView { row, col } => {
                if let Some((x, y)) = self.state.viewport.scroll_to_cell(
                    row,
                    col,
                    &self.state.layout,
                    self.state.config.header_height,
                    self.state.config.row_height,
                ) {
                    self.state.viewport.scroll_left = x;
                    self.state.viewport.scroll_top = y;
                    tasks.extend(self.update_visible_rows(now_ms));
                }
                self.needs_render = true;
            }
            Effect::ScrollBy { dx, dy } => {
                let content_height = self.content_height();
                self.state.scroll_by(dx, dy, content_height);
                tasks.extend(self.update_visible_rows(now_ms));
                self.needs_render = true;
            }
            Effect::ResizePreview { column_id, width } => {
                self.state.set_column_width(&column_id, width);
                if let Some(p) = &self.persistence {
                    p.on_resize(&column_id, width);
                }
                self.needs_render = true;
            }
            Effect::ResizeCommit { column_id, width } => {
                self.state.set_column_width(&column_id, width);
                if let Some(p) = &self.persistence {
                    p.on_resize_end(&column_id, width);
                }
                self.needs_render = true;
            }
            Effect::ReorderColumn { from, to } => {
                if let Some((column_id, old_order, new_order)) =
                    self.state.apply_column_reorder(from, to)
                {
                    self.state.undo.push(UndoOp::ColumnOrder {
                        column_id: column_id.clone(),
                        old_order,
                        new_order,
                    });
                    if let Some(p) = &self.persistence {
                        p.on_column_order(&column_id, new_order);
                        p.on_reload();
                    }
                }
                self.needs_render = true;
            }
            Effect::MoveRow { from, to, path } => {
                let loader = self.loader_for(&path);
                if let Some(landed) = loader.cache_mut().move_row(from, to) {
                    self.state.undo.push(UndoOp::RowMove {
                        path: path.clone(),
                        from,
                        to,
                        landed,
                    });
                    tasks.push(AsyncTask::CommitMove {
                        source: Rc::clone(&self.source),
                        from,
                        to,
                        path,
                    });
                }
                self.needs_render = true;
            }
            Effect::CommitFill {
                start,
                end,
                target_end_row,
                path,
            } => {
                self.apply_fill(start, end, target_end_row, &path);
                self.needs_render = true;
            }
            Effect::AppendRow { path } => {
                let loader = self.loader_for(&path);
                let mut cache = loader.cache_mut();
                let index = cache.total_rows();
                let mut row = Row::new(index, RowValues::new());
                row.meta.is_new = true;
                row.meta.path = path;
                cache.insert_row(index, row);
                self.needs_render = true;
            }
            Effect::AddColumn => {
                if let Some(p) = &self.persistence {
                    p.on_add_column();
                }
            }
            Effect::ExpandRow { row, path } => {
                if let Some(p) = &self.persistence {
                    p.on_expand_row(row, &path);
                }
            }
            Effect::ClearCell { row, col, path } => {
                self.clear_cells(row, row, col, col, &path);
                self.needs_render = true;
            }
            Effect::ClearSelection => {
                if let Some((min_row, min_col, max_row, max_col)) = self.state.selection.normalized()
                {
                    let path = self.state.selection.path.clone();
                    self.clear_cells(min_row, max_row, min_col, max_col, &path);
                }
                self.needs_render = true;
            }
            Effect::BeginEdit { row, col } => {
                self.state.editing = self.state.edit_state_for(row, col);
                self.needs_render = true;
            }
            Effect::EndEdit => {
                self.state.editing = None;
                self.needs_render = true;
            }
        }
    }

    /// Null out every editable cell in the rectangle.
    fn clear_cells(&mut self, min_row: usize, max_row: usize, min_col: usize, max_col: usize, path: &[usize]) {
        let titles: Vec<String> = (min_col..=max_col)
            .filter_map(|i| self.state.columns.get(i))
            .filter(|c| c.uidt.is_some_and(|t| t.is_clearable()) && !c.readonly)
            .map(|c| c.title.clone())
            .collect();
        let loader = self.loader_for(path);
        let mut cache = loader.cache_mut();
        for row_idx in min_row..=max_row {
            if let Some(row) = cache.get_mut(row_idx) {
                for title in &titles {
                    row.data.insert(title.clone(), serde_json::Value::Null);
                }
            }
        }
    }

    /// Replicate the source range's values downward, repeating the pattern
    /// row-by-row until `target_end_row`.
    fn apply_fill(&mut self, start: CellCoord, end: CellCoord, target_end_row: usize, path: &[usize]) {
        let titles: Vec<String> = (start.col..=end.col)
            .filter_map(|i| self.state.columns.get(i))
            .filter(|c| c.uidt.is_some_and(|t| !t.is_computed()) && !c.readonly)
            .map(|c| c.title.clone())
            .collect();
        let loader = self.loader_for(path);
        let mut cache = loader.cache_mut();
        let pattern_len = end.row - start.row + 1;

        for target_row in (end.row + 1)..=target_end_row {
            let source_row = start.row + (target_row - start.row) % pattern_len;
            let values: Vec<(String, serde_json::Value)> = match cache.get(source_row) {
                Some(src) => titles
                    .iter()
                    .map(|t| (t.clone(), src.data.get(t).cloned().unwrap_or(serde_json::Value::Null)))
                    .collect(),
                None => continue,
            };
            if let Some(dst) = cache.get_mut(target_row) {
                for (title, value) in values {
                    dst.data.insert(title, value);
                }
            }
        }
    }

    /// Undo/redo entry points; both re-derive state through the
    /// persistence callbacks plus a reload signal.
    pub fn undo(&mut self, now_ms: f64) -> Vec<AsyncTask> {
        let Some(op) = self.state.undo.pop_undo() else {
            return Vec::new();
        };
        self.apply_undo_op(op, now_ms)
    }

    pub fn redo(&mut self, now_ms: f64) -> Vec<AsyncTask> {
        let Some(op) = self.state.undo.pop_redo() else {
            return Vec::new();
        };
        self.apply_undo_op(op, now_ms)
    }

    fn apply_undo_op(&mut self, op: UndoOp, _now_ms: f64) -> Vec<AsyncTask> {
        let mut tasks = Vec::new();
        match op {
            UndoOp::ColumnOrder {
                column_id,
                new_order,
                ..
            } => {
                self.state.set_column_order(&column_id, new_order);
                if let Some(p) = &self.persistence {
                    p.on_column_order(&column_id, new_order);
                    p.on_reload();
                }
            }
            UndoOp::RowMove { path, from, to, .. } => {
                let loader = self.loader_for(&path);
                loader.cache_mut().move_row(from, to);
                tasks.push(AsyncTask::CommitMove {
                    source: Rc::clone(&self.source),
                    from,
                    to,
                    path,
                });
                if let Some(p) = &self.persistence {
                    p.on_reload();
                }
            }
        }
        self.needs_render = true;
        tasks
    }
}

/// Depth-first walk collecting expanded leaves whose bodies intersect the
/// viewport, with each leaf's local visible row slice.
#[allow(clippy::too_many_arguments)]
fn collect_visible_leaves(
    cache: &crate::cache::GroupTreeCache,
    node: &crate::cache::GroupNode,
    path: &[usize],
    y: f64,
    viewport_height: f64,
    row_height: f64,
    params: GroupLayoutParams,
    out: &mut Vec<(Vec<usize>, usize, Slice)>,
) {
    use crate::cache::{GroupChildren, GROUP_HEADER_HEIGHT, GROUP_PADDING};

    if !node.is_expanded {
        return;
    }
    let body_y = y + GROUP_HEADER_HEIGHT + GROUP_PADDING;
    match &node.children {
        GroupChildren::Leaf { path: leaf_path } => {
            let first = if body_y < 0.0 {
                floor_to_usize(-body_y / row_height)
            } else {
                0
            };
            let visible = floor_to_usize(((viewport_height - body_y).max(0.0) / row_height).ceil()) + 1;
            let start = first.min(node.count);
            let end = (first + visible).min(node.count);
            if start < end {
                out.push((leaf_path.clone(), node.count, Slice::new(start, end)));
            }
        }
        GroupChildren::Branch { subgroups, .. } => {
            let mut child_y = body_y;
            for index in 0..node.subgroup_count {
                if child_y > viewport_height {
                    break;
                }
                let slot = match subgroups.get(&index) {
                    Some(child) => cache.group_height(child, params),
                    None => GROUP_HEADER_HEIGHT + GROUP_PADDING,
                };
                if let Some(child) = subgroups.get(&index) {
                    if child_y + slot > 0.0 {
                        let mut child_path = path.to_vec();
                        child_path.push(index);
                        collect_visible_leaves(
                            cache,
                            child,
                            &child_path,
                            child_y,
                            viewport_height,
                            row_height,
                            params,
                            out,
                        );
                    }
                }
                child_y += slot;
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_to_usize(value: f64) -> usize {
    value.max(0.0) as usize
}
