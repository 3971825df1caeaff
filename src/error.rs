//! Structured error types for gridview.
//!
//! Replaces `Result<T, String>` throughout the codebase with proper error types.

/// All errors that can occur in gridview data loading and rendering.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// The remote data source rejected or failed a request.
    #[error("Data source: {0}")]
    DataSource(String),

    /// A value crossing the JS boundary had an unexpected shape.
    #[error("Serialization: {0}")]
    Serde(#[from] serde_json::Error),

    /// Rendering error.
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid grid configuration (columns, widths, group spec).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Catch-all for string errors during migration.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl From<String> for GridError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GridError> for wasm_bindgen::JsValue {
    fn from(e: GridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}

/// Log a non-fatal error. Fetch failures are retried on the next
/// visibility pass, never surfaced to the user.
pub(crate) fn log_error(context: &str, err: &GridError) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&wasm_bindgen::JsValue::from_str(&format!("{context}: {err}")));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{context}: {err}");
}
