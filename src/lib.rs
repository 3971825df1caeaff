//! gridview - virtualized data grid for the web
//!
//! Renders very large, remotely-paged tables in the browser via
//! WebAssembly and Canvas 2D without one DOM element per cell:
//! - Chunked row cache with prefetch, batching, and eviction
//! - Recursive group-by tree with per-branch paging
//! - Mouse/keyboard selection, column resize/reorder, row drag, fill handle
//! - Pinned columns, pluggable per-type cell renderers
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { GridView } from 'gridview';
//! await init();
//! const grid = new GridView(canvas, dataSource, devicePixelRatio);
//! grid.set_columns(columns);
//! grid.set_total_rows(count);
//! grid.load_initial();
//! ```

pub mod cache;
pub mod datasource;
pub mod error;
pub mod hittest;
pub mod interaction;
pub mod layout;
pub mod render;
pub mod state;
pub mod types;
pub mod undo;
pub mod viewer;

use wasm_bindgen::prelude::*;

// Re-export the main viewer struct
#[cfg(target_arch = "wasm32")]
pub use viewer::GridView;

pub use types::*;

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
