//! Recursive cache for hierarchical group-by views.
//!
//! Mirrors the chunked row cache one nesting level at a time: every branch
//! node carries its own chunk-state array and subgroup window, every leaf
//! node owns a `path` identifying its row dataset in the row-cache map.
//! Ancestor filters are stored as a flat `nested_in` chain (each node's
//! chain includes its own entry), so no parent back-pointers exist anywhere
//! in the tree.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::chunks::{ChunkState, ChunkStates};
use crate::datasource::{DataSource, GroupQuery, GroupSort};
use crate::error::{log_error, Result};
use crate::render::colors::GROUP_PALETTE;
use crate::types::ColumnType;

/// Groups per fetch/cache chunk (one level).
pub const GROUP_CHUNK_SIZE: usize = 100;
/// Branch eviction threshold: a subgroup map is only trimmed above this.
pub const MAX_GROUP_CACHE_SIZE: usize = 100;

/// Height of a group header band.
pub const GROUP_HEADER_HEIGHT: f64 = 56.0;
/// Vertical padding carried by every group, collapsed or not.
pub const GROUP_PADDING: f64 = 12.0;
/// Extra padding below an expanded branch's children.
pub const GROUP_EXPANDED_BOTTOM_PADDING: f64 = 12.0;
/// Height of the trailing "add row" affordance inside an expanded leaf.
pub const ADD_ROW_HEIGHT: f64 = 33.0;
/// Reserved for the selection border on the last row of a leaf.
const LEAF_BORDER_RESERVE: f64 = 1.0;

/// Group key for the null-group sentinel and everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupValue {
    Null,
    Text(String),
}

impl GroupValue {
    pub fn from_record(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }

    /// Distinct-value key used for color assignment.
    pub fn color_key(&self) -> &str {
        match self {
            Self::Null => "",
            Self::Text(s) => s,
        }
    }
}

/// One link of a group's ancestor-filter chain (includes the group's own
/// value entry at its level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorFilter {
    /// Grouping column title used in the filter DSL.
    pub title: String,
    pub column_id: String,
    pub column_type: Option<ColumnType>,
    pub key: GroupValue,
    pub group_index: usize,
}

/// One level of the active group-by specification.
#[derive(Debug, Clone)]
pub struct GroupByColumn {
    pub column_id: String,
    pub title: String,
    pub column_type: Option<ColumnType>,
    pub sort: GroupSort,
}

/// Children of a group node. Only leaf (innermost) groups own a row
/// dataset; only branches own subgroups.
#[derive(Debug)]
pub enum GroupChildren {
    Leaf {
        /// Identity of this group's row dataset in the data-cache map.
        path: Vec<usize>,
    },
    Branch {
        subgroups: BTreeMap<usize, GroupNode>,
        chunk_states: ChunkStates,
    },
}

/// A cached group descriptor at any nesting level.
#[derive(Debug)]
pub struct GroupNode {
    pub group_index: usize,
    pub value: GroupValue,
    /// Row count of this group's (sub)dataset.
    pub count: usize,
    /// Number of groups at the next level (0 on leaves).
    pub subgroup_count: usize,
    pub is_expanded: bool,
    pub color: String,
    /// Display value resolved through the related table for link-typed
    /// grouping columns.
    pub display_value: Option<String>,
    pub nested_in: Vec<AncestorFilter>,
    pub children: GroupChildren,
}

impl GroupNode {
    /// Nesting level, 0-based.
    pub fn level(&self) -> usize {
        self.nested_in.len().saturating_sub(1)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.children, GroupChildren::Leaf { .. })
    }

    /// Row-dataset path; set iff this is the last grouping level.
    pub fn path(&self) -> Option<&[usize]> {
        match &self.children {
            GroupChildren::Leaf { path } => Some(path),
            GroupChildren::Branch { .. } => None,
        }
    }
}

/// Concatenation of the chain's `group_index`es; on a leaf this is the
/// identity of the group's own row dataset.
pub fn generate_group_path(nested_in: &[AncestorFilter]) -> Vec<usize> {
    nested_in.iter().map(|a| a.group_index).collect()
}

/// Fold an ancestor chain into the textual nested-filter expression sent as
/// `where` to the row and group-by endpoints.
pub fn build_nested_where(nested_in: &[AncestorFilter]) -> Option<String> {
    if nested_in.is_empty() {
        return None;
    }
    let mut out = String::new();
    for filter in nested_in {
        let Some(fragment) = filter_fragment(filter) else {
            continue;
        };
        if !out.is_empty() {
            out.push_str("~and");
        }
        out.push_str(&fragment);
    }
    (!out.is_empty()).then_some(out)
}

fn filter_fragment(filter: &AncestorFilter) -> Option<String> {
    let col = &filter.title;
    match (&filter.key, filter.column_type) {
        (GroupValue::Null, _) => Some(format!("({col},gb_null)")),
        (GroupValue::Text(key), Some(ColumnType::Checkbox)) => {
            if key == "1" {
                Some(format!("({col},checked)"))
            } else {
                Some(format!("({col},notchecked)"))
            }
        }
        (GroupValue::Text(key), Some(t)) if t.is_date_like() => {
            Some(format!("({col},gb_eq,exactDate,\"{key}\")"))
        }
        (GroupValue::Text(key), Some(t)) if t.is_user_like() => {
            let ids = extract_user_ids(key)?;
            Some(format!("({col},gb_eq,\"{ids}\")"))
        }
        (GroupValue::Text(key), _) => Some(format!("({col},gb_eq,\"{key}\")")),
    }
}

/// User-group keys arrive as a JSON array/object of user records; the
/// filter wants the comma-joined ids.
fn extract_user_ids(key: &str) -> Option<String> {
    let parsed: serde_json::Value = match serde_json::from_str(key) {
        Ok(v) => v,
        Err(err) => {
            log_error("user group key parse failed", &err.into());
            return None;
        }
    };
    let items = match parsed {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };
    let ids: Vec<String> = items
        .iter()
        .filter_map(|v| v.get("id"))
        .map(|id| match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    Some(ids.join(","))
}

/// Chunk id owning a group index.
pub fn group_chunk_index(group_index: usize) -> usize {
    group_index / GROUP_CHUNK_SIZE
}

/// Geometry inputs for the recursive height math.
#[derive(Debug, Clone, Copy)]
pub struct GroupLayoutParams {
    pub row_height: f64,
    pub add_row_enabled: bool,
}

/// Result of the visible-range walk over one sibling band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupRange {
    pub start_index: usize,
    /// Y of the first visible group relative to the viewport top; negative
    /// when that group is partially scrolled past.
    pub start_y_offset: f64,
    /// Inclusive: the walk keeps one trailing group to avoid blank flashes.
    pub end_index: usize,
}

/// The recursive group cache for the active group-by view.
#[derive(Debug, Default)]
pub struct GroupTreeCache {
    group_by: Vec<GroupByColumn>,
    root: BTreeMap<usize, GroupNode>,
    root_chunks: ChunkStates,
    total_groups: usize,
    color_cursor: usize,
    color_by_value: HashMap<String, String>,
}

impl GroupTreeCache {
    pub fn new(group_by: Vec<GroupByColumn>) -> Self {
        Self {
            group_by,
            ..Self::default()
        }
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn levels(&self) -> usize {
        self.group_by.len()
    }

    pub fn group_by(&self) -> &[GroupByColumn] {
        &self.group_by
    }

    pub fn total_groups(&self) -> usize {
        self.total_groups
    }

    pub fn set_total_groups(&mut self, total: usize) {
        self.total_groups = total;
    }

    pub fn root(&self) -> &BTreeMap<usize, GroupNode> {
        &self.root
    }

    pub fn find_group(&self, path: &[usize]) -> Option<&GroupNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.root.get(&first)?;
        for &index in rest {
            match &node.children {
                GroupChildren::Branch { subgroups, .. } => node = subgroups.get(&index)?,
                GroupChildren::Leaf { .. } => return None,
            }
        }
        Some(node)
    }

    pub fn find_group_mut(&mut self, path: &[usize]) -> Option<&mut GroupNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.root.get_mut(&first)?;
        for &index in rest {
            match &mut node.children {
                GroupChildren::Branch { subgroups, .. } => node = subgroups.get_mut(&index)?,
                GroupChildren::Leaf { .. } => return None,
            }
        }
        Some(node)
    }

    /// Sibling map and group count under `parent_path` (empty = root).
    fn siblings(&self, parent_path: &[usize]) -> Option<(&BTreeMap<usize, GroupNode>, usize)> {
        if parent_path.is_empty() {
            return Some((&self.root, self.total_groups));
        }
        let parent = self.find_group(parent_path)?;
        match &parent.children {
            GroupChildren::Branch { subgroups, .. } => Some((subgroups, parent.subgroup_count)),
            GroupChildren::Leaf { .. } => None,
        }
    }

    pub fn chunk_state(&self, parent_path: &[usize], chunk_id: usize) -> ChunkState {
        if parent_path.is_empty() {
            return self.root_chunks.get(chunk_id);
        }
        match self.find_group(parent_path).map(|g| &g.children) {
            Some(GroupChildren::Branch { chunk_states, .. }) => chunk_states.get(chunk_id),
            _ => ChunkState::Unloaded,
        }
    }

    pub fn set_chunk_state(&mut self, parent_path: &[usize], chunk_id: usize, state: ChunkState) {
        if parent_path.is_empty() {
            self.root_chunks.set(chunk_id, state);
            return;
        }
        if let Some(GroupChildren::Branch { chunk_states, .. }) =
            self.find_group_mut(parent_path).map(|g| &mut g.children)
        {
            chunk_states.set(chunk_id, state);
        }
    }

    pub fn insert_group(&mut self, parent_path: &[usize], node: GroupNode) {
        if parent_path.is_empty() {
            self.root.insert(node.group_index, node);
            return;
        }
        if let Some(GroupChildren::Branch { subgroups, .. }) =
            self.find_group_mut(parent_path).map(|g| &mut g.children)
        {
            subgroups.insert(node.group_index, node);
        }
    }

    pub fn toggle_expand(&mut self, path: &[usize]) -> Option<bool> {
        let node = self.find_group_mut(path)?;
        node.is_expanded = !node.is_expanded;
        Some(node.is_expanded)
    }

    pub fn toggle_expand_all(&mut self, parent_path: &[usize], expand: bool) {
        if parent_path.is_empty() {
            for node in self.root.values_mut() {
                node.is_expanded = expand;
            }
            return;
        }
        if let Some(GroupChildren::Branch { subgroups, .. }) =
            self.find_group_mut(parent_path).map(|g| &mut g.children)
        {
            for node in subgroups.values_mut() {
                node.is_expanded = expand;
            }
        }
    }

    /// Deterministic rotating palette color per distinct group value.
    pub fn color_for_value(&mut self, key: &str) -> String {
        if let Some(color) = self.color_by_value.get(key) {
            return color.clone();
        }
        let color = GROUP_PALETTE
            .get(self.color_cursor % GROUP_PALETTE.len())
            .copied()
            .unwrap_or("#eeeeee")
            .to_string();
        self.color_cursor += 1;
        self.color_by_value.insert(key.to_string(), color.clone());
        color
    }

    /// Pixel height of one group, recursing through expanded branches.
    pub fn group_height(&self, node: &GroupNode, params: GroupLayoutParams) -> f64 {
        let header = GROUP_HEADER_HEIGHT + GROUP_PADDING;
        if !node.is_expanded {
            return header;
        }
        match &node.children {
            GroupChildren::Leaf { .. } => {
                let add_row = if params.add_row_enabled { ADD_ROW_HEIGHT } else { 0.0 };
                header + to_f64(node.count) * params.row_height + add_row + LEAF_BORDER_RESERVE
            }
            GroupChildren::Branch { subgroups, .. } => {
                let mut height = header + GROUP_EXPANDED_BOTTOM_PADDING;
                for i in 0..node.subgroup_count {
                    height += subgroups.get(&i).map_or(
                        GROUP_HEADER_HEIGHT + GROUP_PADDING,
                        |child| self.group_height(child, params),
                    );
                }
                height
            }
        }
    }

    fn slot_height(
        &self,
        siblings: &BTreeMap<usize, GroupNode>,
        index: usize,
        params: GroupLayoutParams,
    ) -> f64 {
        siblings.get(&index).map_or(GROUP_HEADER_HEIGHT + GROUP_PADDING, |node| {
            self.group_height(node, params)
        })
    }

    /// Total content height of one sibling band, substituting the bare
    /// header height for not-yet-fetched slots.
    pub fn band_height(&self, parent_path: &[usize], params: GroupLayoutParams) -> f64 {
        let Some((siblings, count)) = self.siblings(parent_path) else {
            return 0.0;
        };
        (0..count).map(|i| self.slot_height(siblings, i, params)).sum()
    }

    /// Walk siblings accumulating offsets to find the groups intersecting
    /// the viewport, plus one trailing group.
    pub fn calculate_group_range(
        &self,
        parent_path: &[usize],
        scroll_top: f64,
        viewport_height: f64,
        params: GroupLayoutParams,
    ) -> Option<GroupRange> {
        let (siblings, count) = self.siblings(parent_path)?;
        if count == 0 {
            return None;
        }

        let mut offset = 0.0;
        let mut start_index = 0;
        let mut start_y_offset = -scroll_top;
        let mut found_start = false;
        let mut end_index = count - 1;

        for i in 0..count {
            let h = self.slot_height(siblings, i, params);
            if !found_start && offset + h > scroll_top {
                start_index = i;
                start_y_offset = offset - scroll_top;
                found_start = true;
            }
            offset += h;
            if found_start && offset > scroll_top + viewport_height + GROUP_HEADER_HEIGHT {
                end_index = i;
                break;
            }
        }

        if !found_start {
            start_index = count - 1;
            start_y_offset = offset - self.slot_height(siblings, count - 1, params) - scroll_top;
        }

        Some(GroupRange {
            start_index,
            start_y_offset,
            end_index,
        })
    }

    /// Content-space y of a row inside the leaf group at `path`: at every
    /// level, the heights of preceding siblings plus the current header;
    /// at the leaf, the row offset within the group body.
    pub fn calculate_group_row_top(
        &self,
        path: &[usize],
        row_index: usize,
        params: GroupLayoutParams,
    ) -> Option<f64> {
        let mut top = 0.0;
        for depth in 0..path.len() {
            let parent = path.get(..depth)?;
            let (siblings, _) = self.siblings(parent)?;
            let &index = path.get(depth)?;
            for i in 0..index {
                top += self.slot_height(siblings, i, params);
            }
            top += GROUP_HEADER_HEIGHT + GROUP_PADDING;
        }
        top += to_f64(row_index) * params.row_height;
        Some(top)
    }

    /// Trim a branch's subgroup window to `[start, end]` once it exceeds
    /// the cache-size threshold. Chunk states outside the kept window reset
    /// so the trimmed groups reload on return.
    pub fn clear_branch(&mut self, start: usize, end: usize, parent_path: &[usize]) {
        let count = match self.siblings(parent_path) {
            Some((siblings, count)) => {
                if siblings.len() <= MAX_GROUP_CACHE_SIZE {
                    return;
                }
                count
            }
            None => return,
        };

        let safe_start = start;
        let safe_end = end.min(count.saturating_sub(1));
        let start_chunk = group_chunk_index(safe_start);
        let end_chunk = group_chunk_index(safe_end);

        if parent_path.is_empty() {
            self.root.retain(|&i, _| i >= safe_start && i <= safe_end);
            self.root_chunks.retain_range(start_chunk, end_chunk);
            return;
        }
        if let Some(GroupChildren::Branch { subgroups, chunk_states }) =
            self.find_group_mut(parent_path).map(|g| &mut g.children)
        {
            subgroups.retain(|&i, _| i >= safe_start && i <= safe_end);
            chunk_states.retain_range(start_chunk, end_chunk);
        }
    }

    /// Full reset (filter/sort/group-spec change).
    pub fn clear(&mut self) {
        self.root.clear();
        self.root_chunks.clear();
        self.total_groups = 0;
    }
}

/// Async driver around [`GroupTreeCache`], one level per call.
pub struct GroupLoader {
    cache: RefCell<GroupTreeCache>,
    source: Rc<dyn DataSource>,
    /// External view filter ANDed in front of the nested group filters.
    base_where: RefCell<Option<String>>,
}

impl GroupLoader {
    pub fn new(source: Rc<dyn DataSource>, group_by: Vec<GroupByColumn>) -> Self {
        Self {
            cache: RefCell::new(GroupTreeCache::new(group_by)),
            source,
            base_where: RefCell::new(None),
        }
    }

    pub fn cache(&self) -> std::cell::Ref<'_, GroupTreeCache> {
        self.cache.borrow()
    }

    pub fn cache_mut(&self) -> std::cell::RefMut<'_, GroupTreeCache> {
        self.cache.borrow_mut()
    }

    pub fn set_base_where(&self, where_clause: Option<String>) {
        *self.base_where.borrow_mut() = where_clause;
    }

    /// Fetch one chunk of group descriptors under `parent_path` (empty =
    /// top level). No-op while that chunk is `Loading` or `Loaded`.
    pub async fn fetch_group_chunk(&self, chunk_id: usize, parent_path: &[usize]) -> Result<()> {
        let (query, level, parent_chain) = {
            let cache = self.cache.borrow();
            if cache.chunk_state(parent_path, chunk_id) != ChunkState::Unloaded {
                return Ok(());
            }
            let level = parent_path.len();
            let Some(group_col) = cache.group_by().get(level) else {
                return Ok(());
            };
            let parent_chain: Vec<AncestorFilter> = if parent_path.is_empty() {
                Vec::new()
            } else {
                match cache.find_group(parent_path) {
                    Some(parent) => parent.nested_in.clone(),
                    None => return Ok(()),
                }
            };

            let nested_where = build_nested_where(&parent_chain);
            let where_clause = match (self.base_where.borrow().clone(), nested_where) {
                (Some(base), Some(nested)) => Some(format!("{base}~and{nested}")),
                (Some(base), None) => Some(base),
                (None, nested) => nested,
            };

            let query = GroupQuery {
                offset: chunk_id * GROUP_CHUNK_SIZE,
                limit: GROUP_CHUNK_SIZE,
                where_clause,
                sort: group_col.sort,
                column_name: group_col.title.clone(),
                sub_group_column_name: cache
                    .group_by()
                    .get(level + 1)
                    .map(|c| c.title.clone()),
            };
            (query, level, parent_chain)
        };

        self.cache
            .borrow_mut()
            .set_chunk_state(parent_path, chunk_id, ChunkState::Loading);

        let offset = query.offset;
        let page = match self.source.load_groups(query).await {
            Ok(page) => page,
            Err(err) => {
                log_error("group chunk fetch failed", &err);
                self.cache
                    .borrow_mut()
                    .set_chunk_state(parent_path, chunk_id, ChunkState::Unloaded);
                return Ok(());
            }
        };

        let (group_col, levels) = {
            let cache = self.cache.borrow();
            let Some(col) = cache.group_by().get(level).cloned() else {
                return Ok(());
            };
            (col, cache.levels())
        };

        let mut nodes = Vec::with_capacity(page.list.len());
        for (idx, record) in page.list.iter().enumerate() {
            // Link-typed grouping columns render through the related
            // table's display column; a group whose metadata cannot be
            // resolved is skipped rather than failing the whole batch.
            let display_value = if group_col.column_type == Some(ColumnType::LinkToAnotherRecord) {
                match self.source.related_display_column(&group_col.column_id).await {
                    Ok(Some(title)) => Some(title),
                    Ok(None) | Err(_) => continue,
                }
            } else {
                None
            };

            let group_index = offset + idx;
            let value = GroupValue::from_record(record.value.clone());
            let mut nested_in = parent_chain.clone();
            nested_in.push(AncestorFilter {
                title: group_col.title.clone(),
                column_id: group_col.column_id.clone(),
                column_type: group_col.column_type,
                key: value.clone(),
                group_index,
            });

            let children = if level == levels.saturating_sub(1) {
                GroupChildren::Leaf {
                    path: generate_group_path(&nested_in),
                }
            } else {
                GroupChildren::Branch {
                    subgroups: BTreeMap::new(),
                    chunk_states: ChunkStates::default(),
                }
            };

            nodes.push(GroupNode {
                group_index,
                value,
                count: record.count,
                subgroup_count: record.subgroup_count.unwrap_or(0),
                is_expanded: false,
                color: String::new(),
                display_value,
                nested_in,
                children,
            });
        }

        let mut cache = self.cache.borrow_mut();
        for mut node in nodes {
            node.color = cache.color_for_value(node.value.color_key());
            cache.insert_group(parent_path, node);
        }
        if parent_path.is_empty() {
            cache.set_total_groups(page.total_groups);
        }
        cache.set_chunk_state(parent_path, chunk_id, ChunkState::Loaded);
        Ok(())
    }

    /// Fetch every unloaded group chunk covering `[start, end]` siblings.
    pub async fn fetch_missing_chunks(
        &self,
        start: usize,
        end: usize,
        parent_path: &[usize],
    ) -> Result<()> {
        let first = group_chunk_index(start);
        let last = group_chunk_index(end);
        for chunk_id in first..=last {
            self.fetch_group_chunk(chunk_id, parent_path).await?;
        }
        Ok(())
    }
}

fn to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::MAX, f64::from)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    const PARAMS: GroupLayoutParams = GroupLayoutParams {
        row_height: 32.0,
        add_row_enabled: false,
    };

    fn ancestor(title: &str, uidt: Option<ColumnType>, key: GroupValue) -> AncestorFilter {
        AncestorFilter {
            title: title.to_string(),
            column_id: format!("col_{title}"),
            column_type: uidt,
            key,
            group_index: 0,
        }
    }

    fn leaf(index: usize, count: usize, expanded: bool) -> GroupNode {
        GroupNode {
            group_index: index,
            value: GroupValue::Text(format!("v{index}")),
            count,
            subgroup_count: 0,
            is_expanded: expanded,
            color: "#cfdffe".to_string(),
            display_value: None,
            nested_in: vec![ancestor("status", Some(ColumnType::SingleSelect),
                GroupValue::Text(format!("v{index}")))],
            children: GroupChildren::Leaf { path: vec![index] },
        }
    }

    fn branch(index: usize, subgroup_count: usize, expanded: bool) -> GroupNode {
        GroupNode {
            group_index: index,
            value: GroupValue::Text(format!("b{index}")),
            count: 0,
            subgroup_count,
            is_expanded: expanded,
            color: "#d0f1fd".to_string(),
            display_value: None,
            nested_in: vec![ancestor("region", Some(ColumnType::SingleSelect),
                GroupValue::Text(format!("b{index}")))],
            children: GroupChildren::Branch {
                subgroups: BTreeMap::new(),
                chunk_states: ChunkStates::default(),
            },
        }
    }

    #[test]
    fn checkbox_keys_map_to_checked_filters() {
        let checked = ancestor("status", Some(ColumnType::Checkbox), GroupValue::Text("1".into()));
        let unchecked =
            ancestor("status", Some(ColumnType::Checkbox), GroupValue::Text("0".into()));
        assert_eq!(build_nested_where(&[checked]).unwrap(), "(status,checked)");
        assert_eq!(build_nested_where(&[unchecked]).unwrap(), "(status,notchecked)");
    }

    #[test]
    fn null_date_and_default_fragments() {
        let null = ancestor("owner", Some(ColumnType::SingleSelect), GroupValue::Null);
        assert_eq!(build_nested_where(&[null]).unwrap(), "(owner,gb_null)");

        let date = ancestor("due", Some(ColumnType::Date), GroupValue::Text("2024-03-01".into()));
        assert_eq!(
            build_nested_where(&[date]).unwrap(),
            "(due,gb_eq,exactDate,\"2024-03-01\")"
        );

        let plain = ancestor("stage", Some(ColumnType::SingleSelect), GroupValue::Text("Won".into()));
        assert_eq!(build_nested_where(&[plain]).unwrap(), "(stage,gb_eq,\"Won\")");
    }

    #[test]
    fn user_keys_extract_ids_from_json() {
        let user = ancestor(
            "assignee",
            Some(ColumnType::User),
            GroupValue::Text(r#"[{"id":"u1"},{"id":"u2"}]"#.into()),
        );
        assert_eq!(
            build_nested_where(&[user]).unwrap(),
            "(assignee,gb_eq,\"u1,u2\")"
        );
    }

    #[test]
    fn ancestor_chain_joins_with_and() {
        let a = ancestor("region", Some(ColumnType::SingleSelect), GroupValue::Text("EU".into()));
        let b = ancestor("status", Some(ColumnType::Checkbox), GroupValue::Text("1".into()));
        assert_eq!(
            build_nested_where(&[a, b]).unwrap(),
            "(region,gb_eq,\"EU\")~and(status,checked)"
        );
    }

    #[test]
    fn collapsed_height_is_constant() {
        let cache = GroupTreeCache::new(Vec::new());
        let small = leaf(0, 3, false);
        let large = leaf(1, 30_000, false);
        let deep = branch(2, 400, false);
        let expected = GROUP_HEADER_HEIGHT + GROUP_PADDING;
        assert_eq!(cache.group_height(&small, PARAMS), expected);
        assert_eq!(cache.group_height(&large, PARAMS), expected);
        assert_eq!(cache.group_height(&deep, PARAMS), expected);
    }

    #[test]
    fn expanded_leaf_height_counts_rows() {
        let cache = GroupTreeCache::new(Vec::new());
        let node = leaf(0, 10, true);
        assert_eq!(
            cache.group_height(&node, PARAMS),
            GROUP_HEADER_HEIGHT + GROUP_PADDING + 320.0 + 1.0
        );
        let with_add_row = GroupLayoutParams {
            add_row_enabled: true,
            ..PARAMS
        };
        assert_eq!(
            cache.group_height(&node, with_add_row),
            GROUP_HEADER_HEIGHT + GROUP_PADDING + 320.0 + ADD_ROW_HEIGHT + 1.0
        );
    }

    #[test]
    fn expanded_branch_substitutes_placeholder_for_unfetched() {
        let cache = GroupTreeCache::new(Vec::new());
        let mut node = branch(0, 3, true);
        if let GroupChildren::Branch { subgroups, .. } = &mut node.children {
            subgroups.insert(0, leaf(0, 5, true));
            // Slots 1 and 2 not fetched yet.
        }
        let header = GROUP_HEADER_HEIGHT + GROUP_PADDING;
        let child = header + 5.0 * 32.0 + 1.0;
        assert_eq!(
            cache.group_height(&node, PARAMS),
            header + GROUP_EXPANDED_BOTTOM_PADDING + child + 2.0 * header
        );
    }

    #[test]
    fn group_range_walk_finds_viewport_band() {
        let mut cache = GroupTreeCache::new(Vec::new());
        cache.set_total_groups(50);
        for i in 0..50 {
            cache.insert_group(&[], leaf(i, 4, false));
        }
        let header = GROUP_HEADER_HEIGHT + GROUP_PADDING; // 68
        let range = cache
            .calculate_group_range(&[], header * 3.0 + 10.0, 200.0, PARAMS)
            .unwrap();
        assert_eq!(range.start_index, 3);
        assert_eq!(range.start_y_offset, -10.0);
        // Walk covers the viewport plus one extra header.
        assert!(range.end_index >= 6);
        let covered: f64 = (range.start_index..=range.end_index)
            .map(|_| header)
            .sum();
        assert!(covered + range.start_y_offset > 200.0);
    }

    #[test]
    fn group_row_top_descends_the_path() {
        let mut cache = GroupTreeCache::new(Vec::new());
        cache.set_total_groups(3);
        cache.insert_group(&[], leaf(0, 2, true));
        cache.insert_group(&[], leaf(1, 4, true));
        let header = GROUP_HEADER_HEIGHT + GROUP_PADDING;
        let group0 = header + 2.0 * 32.0 + 1.0;
        let top = cache.calculate_group_row_top(&[1], 2, PARAMS).unwrap();
        assert_eq!(top, group0 + header + 2.0 * 32.0);
    }

    #[test]
    fn color_rotates_per_distinct_value() {
        let mut cache = GroupTreeCache::new(Vec::new());
        let a = cache.color_for_value("alpha");
        let b = cache.color_for_value("beta");
        assert_ne!(a, b);
        // Same value keeps its color.
        assert_eq!(cache.color_for_value("alpha"), a);
    }

    #[test]
    fn branch_eviction_only_above_threshold() {
        let mut cache = GroupTreeCache::new(Vec::new());
        cache.set_total_groups(300);
        for i in 0..50 {
            cache.insert_group(&[], leaf(i, 1, false));
        }
        cache.clear_branch(10, 20, &[]);
        assert_eq!(cache.root().len(), 50);

        for i in 50..150 {
            cache.insert_group(&[], leaf(i, 1, false));
        }
        cache.clear_branch(10, 20, &[]);
        assert_eq!(cache.root().len(), 11);
        assert!(cache.find_group(&[10]).is_some());
        assert!(cache.find_group(&[21]).is_none());
    }

    #[test]
    fn leaf_path_identifies_row_dataset() {
        let node = leaf(7, 3, false);
        assert!(node.is_leaf());
        assert_eq!(node.path(), Some(&[7][..]));
        let b = branch(1, 2, false);
        assert!(b.path().is_none());
    }
}
