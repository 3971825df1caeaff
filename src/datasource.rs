//! External collaborator interfaces: the remote row/group endpoints and the
//! view-configuration persistence callbacks.
//!
//! Everything behind these traits is out of scope for the grid core; the
//! wasm viewer adapts them to JS promises, tests supply local fakes.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::types::Row;

/// Boxed single-threaded future, the await shape of every remote call.
pub type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Paged row request. `path` identifies the leaf-group dataset (empty for
/// the root table); `where_clause` carries the nested group filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub offset: usize,
    pub limit: usize,
    pub where_clause: Option<String>,
    pub path: Vec<usize>,
}

/// Sort parameter of the group-by endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupSort {
    #[default]
    ValueAsc,
    ValueDesc,
    CountAsc,
    CountDesc,
}

impl GroupSort {
    /// Wire form: ascending/descending value, ascending/descending count.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::ValueAsc => "+",
            Self::ValueDesc => "-",
            Self::CountAsc => "~+",
            Self::CountDesc => "~-",
        }
    }
}

/// Paged group-by request for one nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupQuery {
    pub offset: usize,
    pub limit: usize,
    pub where_clause: Option<String>,
    pub sort: GroupSort,
    pub column_name: String,
    pub sub_group_column_name: Option<String>,
}

/// One group descriptor from the group-by endpoint. `value` is `None` for
/// the null group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupRecord {
    pub value: Option<String>,
    pub count: usize,
    pub subgroup_count: Option<usize>,
}

/// A page of group descriptors plus the level's total group count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPage {
    pub list: Vec<GroupRecord>,
    pub total_groups: usize,
}

/// The remote data/query API. Returned rows MUST carry their own absolute
/// index (used verbatim as the cache key) and MUST NOT be assumed to arrive
/// in any particular order.
pub trait DataSource {
    fn load_rows(&self, query: RowQuery, show_loading: bool) -> LocalFuture<'_, Result<Vec<Row>>>;

    fn load_groups(&self, query: GroupQuery) -> LocalFuture<'_, Result<GroupPage>>;

    /// Resolve the primary/display column title of the table a link-typed
    /// grouping column points at. `Ok(None)` means the metadata is missing
    /// and the group node should be skipped.
    fn related_display_column(&self, column_id: &str) -> LocalFuture<'_, Result<Option<String>>>;

    /// Commit a row move. `before` of `None` appends to the end of the
    /// dataset identified by `path`.
    fn move_row(
        &self,
        row_index: usize,
        before: Option<usize>,
        path: &[usize],
    ) -> LocalFuture<'_, Result<()>>;
}

/// View-configuration persistence produced by the interaction controllers.
pub trait GridPersistence {
    /// Live width preview; fires on every pointer move during a resize.
    fn on_resize(&self, column_id: &str, width_px: f64);

    /// Final width commit on pointer release.
    fn on_resize_end(&self, column_id: &str, width_px: f64);

    /// Commit a column's new fractional order value.
    fn on_column_order(&self, column_id: &str, order: f64);

    /// Ask the host to reload derived view state (fired by undo/redo so the
    /// consumer re-derives rather than assuming nothing else changed).
    fn on_reload(&self);

    /// Host hook for the add-column affordance (Alt+C).
    fn on_add_column(&self) {}

    /// Host hook for the row-expand modal (Space).
    fn on_expand_row(&self, _row_index: usize, _path: &[usize]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_sort_wire_forms() {
        assert_eq!(GroupSort::ValueAsc.as_param(), "+");
        assert_eq!(GroupSort::ValueDesc.as_param(), "-");
        assert_eq!(GroupSort::CountAsc.as_param(), "~+");
        assert_eq!(GroupSort::CountDesc.as_param(), "~-");
    }
}
