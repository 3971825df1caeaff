//! Column descriptors and the column-type tag.

use serde::{Deserialize, Serialize};

/// Default width (px) used when a column carries no parseable width.
pub const DEFAULT_COLUMN_WIDTH: f64 = 80.0;

/// Type tag for a column. Drives the cell-renderer registry, resize
/// clamping, and keyboard-navigation special cases.
///
/// The synthetic row-number column has no tag (`uidt: None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    SingleLineText,
    LongText,
    Number,
    Decimal,
    Checkbox,
    Date,
    DateTime,
    CreatedTime,
    LastModifiedTime,
    User,
    CreatedBy,
    LastModifiedBy,
    SingleSelect,
    MultiSelect,
    Attachment,
    Button,
    LinkToAnotherRecord,
    Lookup,
    Rollup,
    Formula,
    Barcode,
    QrCode,
    AutoNumber,
}

impl ColumnType {
    /// Date-like types group by exact date in the nested filter DSL.
    pub fn is_date_like(self) -> bool {
        matches!(
            self,
            Self::Date | Self::DateTime | Self::CreatedTime | Self::LastModifiedTime
        )
    }

    /// User-reference types carry JSON id payloads as group keys.
    pub fn is_user_like(self) -> bool {
        matches!(self, Self::User | Self::CreatedBy | Self::LastModifiedBy)
    }

    /// Computed/virtual types whose values are derived server-side.
    pub fn is_computed(self) -> bool {
        matches!(
            self,
            Self::CreatedTime
                | Self::LastModifiedTime
                | Self::CreatedBy
                | Self::LastModifiedBy
                | Self::Lookup
                | Self::Rollup
                | Self::Formula
                | Self::Barcode
                | Self::QrCode
                | Self::AutoNumber
        )
    }

    /// Types that never enter the inline editor.
    pub fn is_editable(self) -> bool {
        !self.is_computed() && !matches!(self, Self::Button)
    }

    /// Types where Enter must not toggle edit mode (the cell handles the
    /// key itself, or there is nothing to edit).
    pub fn no_enter_navigate(self) -> bool {
        matches!(self, Self::Checkbox | Self::Button)
    }

    /// Types whose value cannot be cleared with Delete/Backspace.
    pub fn is_clearable(self) -> bool {
        !self.is_computed() && !matches!(self, Self::Button)
    }
}

/// A single grid column as the layout and renderer see it.
///
/// Index 0 of the derived column list is always the synthetic row-number
/// column (fixed, untyped). `width` is stored as the pixel count in string
/// form (`"180"`), matching the persisted view-column format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridColumn {
    pub id: String,
    pub title: String,
    pub width: String,
    pub uidt: Option<ColumnType>,
    #[serde(default)]
    pub fixed: bool,
    /// Primary/display column flag.
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub readonly: bool,
    /// Fractional ordering key used by column reorder.
    #[serde(default)]
    pub order: f64,
}

impl GridColumn {
    /// Parse the stored `"NNN"` width, falling back to the default.
    pub fn width_px(&self) -> f64 {
        let digits = self.width.trim().trim_end_matches("px");
        digits.parse::<u32>().map_or(DEFAULT_COLUMN_WIDTH, f64::from)
    }

    pub fn set_width_px(&mut self, width: f64) {
        self.width = format!("{}", width.max(0.0).round());
    }
}

/// The synthetic `#` column at index 0: always fixed, never typed,
/// excluded from scrollable-offset accumulation.
pub fn row_number_column() -> GridColumn {
    GridColumn {
        id: "row_number".to_string(),
        title: "#".to_string(),
        width: "80".to_string(),
        uidt: None,
        fixed: true,
        primary: false,
        readonly: true,
        order: 0.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn width_parses_plain_and_px_suffixed() {
        let mut col = row_number_column();
        assert_eq!(col.width_px(), 80.0);
        col.width = "180px".to_string();
        assert_eq!(col.width_px(), 180.0);
        col.width = "garbage".to_string();
        assert_eq!(col.width_px(), DEFAULT_COLUMN_WIDTH);
    }

    #[test]
    fn set_width_rounds_to_whole_pixels() {
        let mut col = row_number_column();
        col.set_width_px(120.6);
        assert_eq!(col.width, "121");
    }

    #[test]
    fn computed_types_are_not_editable() {
        assert!(!ColumnType::Formula.is_editable());
        assert!(!ColumnType::AutoNumber.is_editable());
        assert!(ColumnType::SingleLineText.is_editable());
        assert!(!ColumnType::Button.is_clearable());
    }
}
