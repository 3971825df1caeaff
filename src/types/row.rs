//! Row records as delivered by the remote data source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field title → JSON value, as returned by the row endpoint.
pub type RowValues = serde_json::Map<String, Value>;

/// Bookkeeping attached to a cached row. `row_index` is the row's absolute
/// index within its (sub)dataset and doubles as the cache key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowMeta {
    pub row_index: usize,
    /// Transient flag set while the row is the source of a drag gesture.
    #[serde(default)]
    pub is_dragging: bool,
    #[serde(default)]
    pub selected: bool,
    /// Row exists locally but has not been persisted yet.
    #[serde(default)]
    pub is_new: bool,
    /// Group path of the owning leaf dataset; empty for the root dataset.
    #[serde(default)]
    pub path: Vec<usize>,
}

/// A single data row. Identity is `meta.row_index` within the dataset
/// identified by `meta.path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    pub data: RowValues,
    pub meta: RowMeta,
}

impl Row {
    pub fn new(row_index: usize, data: RowValues) -> Self {
        Self {
            data,
            meta: RowMeta {
                row_index,
                ..RowMeta::default()
            },
        }
    }

    /// Cell value for a column title, if the field is present and non-null.
    pub fn value(&self, title: &str) -> Option<&Value> {
        self.data.get(title).filter(|v| !v.is_null())
    }
}
