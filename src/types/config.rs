//! Visual configuration for the grid surface.

use serde::{Deserialize, Serialize};

/// Colors and metrics for the grid chrome. Field defaults match the
/// reference light theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Height of a data row in logical pixels.
    pub row_height: f64,
    /// Height of the frozen header band.
    pub header_height: f64,
    /// Whether the trailing "add row" affordance is rendered per group.
    pub add_row_enabled: bool,
    pub header_bg: String,
    pub header_text: String,
    pub border_color: String,
    pub row_border_color: String,
    pub row_bg: String,
    pub row_bg_hover: String,
    pub row_text: String,
    pub selection_fill: String,
    pub active_border: String,
    pub fill_handle_color: String,
    pub drag_indicator_color: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: 32.0,
            header_height: 32.0,
            add_row_enabled: true,
            header_bg: "#f4f4f5".to_string(),
            header_text: "#6a7184".to_string(),
            border_color: "#e7e7e9".to_string(),
            row_border_color: "#f4f4f5".to_string(),
            row_bg: "#ffffff".to_string(),
            row_bg_hover: "#f9f9fa".to_string(),
            row_text: "#4a5268".to_string(),
            selection_fill: "#ebf0ff".to_string(),
            active_border: "#3366ff".to_string(),
            fill_handle_color: "#ff4a3f".to_string(),
            drag_indicator_color: "#3366ff".to_string(),
        }
    }
}
