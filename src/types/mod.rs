//! Core data model shared by layout, cache, interaction, and rendering.

pub mod column;
pub mod config;
pub mod row;
pub mod selection;
pub mod slice;

pub use column::{row_number_column, ColumnType, GridColumn, DEFAULT_COLUMN_WIDTH};
pub use config::GridConfig;
pub use row::{Row, RowMeta, RowValues};
pub use selection::{CellCoord, SelectionRange};
pub use slice::Slice;
