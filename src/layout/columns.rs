//! Column index ↔ pixel offset mapping.
//!
//! Fixed/pinned columns are laid out first, in original order, at absolute
//! offset 0 regardless of horizontal scroll; scrollable columns follow,
//! offset by the negative scroll position at draw time.

use crate::types::{GridColumn, Slice};

/// Pre-computed pixel layout for the current column list. Rebuilt whenever
/// columns are added, removed, reordered, or resized.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    widths: Vec<f64>,
    fixed: Vec<bool>,
    /// Layout-space x of each column: fixed columns measure from 0 among
    /// the fixed run; scrollable columns measure from `fixed_width`.
    offsets: Vec<f64>,
    fixed_width: f64,
    total_width: f64,
}

impl ColumnLayout {
    pub fn new(columns: &[GridColumn]) -> Self {
        let widths: Vec<f64> = columns.iter().map(GridColumn::width_px).collect();
        let fixed: Vec<bool> = columns.iter().map(|c| c.fixed).collect();

        let fixed_width: f64 = widths
            .iter()
            .zip(&fixed)
            .filter(|(_, f)| **f)
            .map(|(w, _)| *w)
            .sum();

        let mut offsets = Vec::with_capacity(widths.len());
        let mut fixed_x = 0.0;
        let mut scroll_x = fixed_width;
        for (w, is_fixed) in widths.iter().zip(&fixed) {
            if *is_fixed {
                offsets.push(fixed_x);
                fixed_x += w;
            } else {
                offsets.push(scroll_x);
                scroll_x += w;
            }
        }

        let total_width = widths.iter().sum();

        Self {
            widths,
            fixed,
            offsets,
            fixed_width,
            total_width,
        }
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    pub fn width(&self, index: usize) -> f64 {
        self.widths.get(index).copied().unwrap_or(0.0)
    }

    pub fn is_fixed(&self, index: usize) -> bool {
        self.fixed.get(index).copied().unwrap_or(false)
    }

    /// Total width of the fixed/pinned run.
    pub fn fixed_width(&self) -> f64 {
        self.fixed_width
    }

    /// Sum of all column widths.
    pub fn total_width(&self) -> f64 {
        self.total_width
    }

    /// Layout-space x offset of a column (see struct docs). For scrollable
    /// columns the on-screen x is `x_offset(i) - scroll_left`.
    pub fn x_offset(&self, index: usize) -> f64 {
        self.offsets.get(index).copied().unwrap_or(self.total_width)
    }

    /// Sum of widths over `[start, end)`.
    pub fn width_of_span(&self, span: Slice) -> f64 {
        (span.start..span.end).map(|i| self.width(i)).sum()
    }

    /// Resolve an accumulated-width coordinate to a column index.
    ///
    /// Walks the column list in order accumulating widths and returns the
    /// column whose band contains `target`. Monotonic in `target`; degrades
    /// gracefully past the end of known widths by returning the last index.
    pub fn find_column_index(&self, target: f64) -> usize {
        let mut accumulated = 0.0;
        for (i, w) in self.widths.iter().enumerate() {
            if accumulated > target {
                return i.saturating_sub(1);
            }
            accumulated += w;
        }
        self.widths.len().saturating_sub(1)
    }

    /// Resolve a viewport pixel to a column index: fixed columns are tested
    /// first at absolute offsets, then scrollable columns at scroll-adjusted
    /// offsets.
    pub fn column_at_point(&self, x: f64, scroll_left: f64) -> Option<usize> {
        if x < self.fixed_width {
            let mut acc = 0.0;
            for (i, (w, is_fixed)) in self.widths.iter().zip(&self.fixed).enumerate() {
                if !is_fixed {
                    continue;
                }
                if x >= acc && x < acc + w {
                    return Some(i);
                }
                acc += w;
            }
        }

        let sheet_x = x + scroll_left;
        for (i, (w, is_fixed)) in self.widths.iter().zip(&self.fixed).enumerate() {
            if *is_fixed {
                continue;
            }
            let offset = self.x_offset(i);
            if sheet_x >= offset && sheet_x < offset + w {
                return Some(i);
            }
        }
        None
    }

    /// Visible scrollable column slice for the current horizontal scroll.
    /// The end index is exclusive and includes one partially visible column.
    pub fn visible_cols(&self, scroll_left: f64, viewport_width: f64) -> Slice {
        if self.widths.is_empty() {
            return Slice::default();
        }
        let start = self.find_column_index(scroll_left);
        let end = (self.find_column_index(scroll_left + viewport_width) + 1).min(self.widths.len());
        Slice::new(start, end)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{row_number_column, GridColumn};

    fn col(id: &str, width: &str, fixed: bool) -> GridColumn {
        GridColumn {
            id: id.to_string(),
            title: id.to_string(),
            width: width.to_string(),
            uidt: Some(crate::types::ColumnType::SingleLineText),
            fixed,
            primary: false,
            readonly: false,
            order: 0.0,
        }
    }

    fn scrollable_grid(n: usize, width: &str) -> Vec<GridColumn> {
        (0..n).map(|i| col(&format!("c{i}"), width, false)).collect()
    }

    #[test]
    fn find_column_index_at_scroll_offset() {
        // Ten equal-width (100px) scrollable columns, scrollLeft = 250.
        let layout = ColumnLayout::new(&scrollable_grid(10, "100"));
        assert_eq!(layout.find_column_index(250.0), 2);
    }

    #[test]
    fn find_column_index_is_monotonic() {
        let layout = ColumnLayout::new(&scrollable_grid(6, "80"));
        let mut last = 0;
        for x in 0..600 {
            let idx = layout.find_column_index(f64::from(x));
            assert!(idx >= last);
            last = idx;
        }
    }

    #[test]
    fn find_column_index_clamps_past_end() {
        let layout = ColumnLayout::new(&scrollable_grid(3, "100"));
        assert_eq!(layout.find_column_index(10_000.0), 2);
    }

    #[test]
    fn fixed_columns_lay_out_first() {
        let cols = vec![
            row_number_column(),
            col("title", "200", true),
            col("a", "100", false),
            col("b", "120", false),
        ];
        let layout = ColumnLayout::new(&cols);
        assert_eq!(layout.fixed_width(), 280.0);
        assert_eq!(layout.x_offset(0), 0.0);
        assert_eq!(layout.x_offset(1), 80.0);
        // First scrollable column starts after the fixed run.
        assert_eq!(layout.x_offset(2), 280.0);
        assert_eq!(layout.x_offset(3), 380.0);
        assert_eq!(layout.total_width(), 500.0);
    }

    #[test]
    fn column_at_point_prefers_fixed_region() {
        let cols = vec![
            row_number_column(),
            col("title", "200", true),
            col("a", "100", false),
        ];
        let layout = ColumnLayout::new(&cols);
        // Inside the pinned run, scroll position is irrelevant.
        assert_eq!(layout.column_at_point(40.0, 500.0), Some(0));
        assert_eq!(layout.column_at_point(150.0, 500.0), Some(1));
        // Just past the pinned run with no scroll.
        assert_eq!(layout.column_at_point(300.0, 0.0), Some(2));
    }

    #[test]
    fn width_of_span_sums_inclusive_range() {
        let layout = ColumnLayout::new(&scrollable_grid(5, "60"));
        assert_eq!(layout.width_of_span(Slice::new(1, 4)), 180.0);
    }
}
