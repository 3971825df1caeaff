//! Column reorder gesture with fractional ordering.
//!
//! Dropping emits `reorder(from, to - 1)`, meaning "insert before this column".
//! The consumer derives the moved column's new order value as the midpoint
//! between the drop target's order and the next column's, so no sibling is
//! renumbered; repeated reorders of the same neighbors eventually collapse
//! the midpoint gap, at which point the whole list renormalizes to `1..=n`.

use super::Effect;
use crate::layout::ColumnLayout;
use crate::types::GridColumn;

/// Adjacent order gap below which fractional midpoints stop being exact
/// and the order list is renormalized.
pub const MIN_ORDER_GAP: f64 = 1e-9;

/// Active column drag.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDrag {
    pub from_index: usize,
    pub column_id: String,
    pub pointer_x: f64,
    /// Column currently under the pointer; fixed columns never qualify.
    pub drag_over: Option<usize>,
}

/// Start a drag from a non-fixed column header under `x`.
pub fn begin(
    columns: &[GridColumn],
    layout: &ColumnLayout,
    scroll_left: f64,
    x: f64,
) -> Option<ColumnDrag> {
    let index = layout.column_at_point(x, scroll_left)?;
    let col = columns.get(index)?;
    if col.fixed {
        return None;
    }
    Some(ColumnDrag {
        from_index: index,
        column_id: col.id.clone(),
        pointer_x: x,
        drag_over: None,
    })
}

/// Track the drop target under the pointer.
pub fn on_move(
    drag: &mut ColumnDrag,
    columns: &[GridColumn],
    layout: &ColumnLayout,
    scroll_left: f64,
    x: f64,
) -> Vec<Effect> {
    drag.pointer_x = x;
    let target = layout
        .column_at_point(x, scroll_left)
        .filter(|&i| columns.get(i).is_some_and(|c| !c.fixed));
    if target != drag.drag_over {
        drag.drag_over = target;
        return vec![Effect::Redraw];
    }
    Vec::new()
}

/// Release: emit the insert-before reorder, or nothing when the pointer
/// never reached a droppable column.
pub fn on_drop(drag: &ColumnDrag) -> Vec<Effect> {
    let Some(to) = drag.drag_over else {
        return vec![Effect::Redraw];
    };
    vec![
        Effect::ReorderColumn {
            from: drag.from_index,
            to: to.saturating_sub(1),
        },
        Effect::Redraw,
    ]
}

/// New fractional order for a column dropped after position `to_index`:
/// the midpoint of the target's and the following column's orders, or
/// `last + 1` when dropped past the end.
pub fn compute_new_order(orders: &[f64], to_index: usize) -> Option<f64> {
    let to = orders.get(to_index)?;
    match orders.get(to_index + 1) {
        Some(next) => Some(to + (next - to) / 2.0),
        None => Some(to + 1.0),
    }
}

/// True when some adjacent pair's gap has collapsed below [`MIN_ORDER_GAP`].
pub fn needs_renormalize(orders: &[f64]) -> bool {
    orders
        .windows(2)
        .any(|pair| match pair {
            [a, b] => (b - a).abs() < MIN_ORDER_GAP,
            _ => false,
        })
}

/// Reassign orders to `1..=n` in current positional order.
pub fn renormalize_orders(columns: &mut [GridColumn]) {
    let mut order = 1.0;
    for col in columns {
        col.order = order;
        order += 1.0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    fn col(id: &str, fixed: bool, order: f64) -> GridColumn {
        GridColumn {
            id: id.to_string(),
            title: id.to_string(),
            width: "100".to_string(),
            uidt: Some(ColumnType::SingleLineText),
            fixed,
            primary: false,
            readonly: false,
            order,
        }
    }

    fn columns() -> Vec<GridColumn> {
        vec![
            col("row_number", true, 0.0),
            col("a", false, 1.0),
            col("b", false, 2.0),
            col("c", false, 3.0),
        ]
    }

    #[test]
    fn fixed_headers_do_not_start_a_drag() {
        let cols = columns();
        let layout = ColumnLayout::new(&cols);
        assert!(begin(&cols, &layout, 0.0, 40.0).is_none());
        let drag = begin(&cols, &layout, 0.0, 150.0).unwrap();
        assert_eq!(drag.from_index, 1);
    }

    #[test]
    fn fixed_columns_are_never_a_drop_target() {
        let cols = columns();
        let layout = ColumnLayout::new(&cols);
        let mut drag = begin(&cols, &layout, 0.0, 150.0).unwrap();
        on_move(&mut drag, &cols, &layout, 0.0, 40.0);
        assert_eq!(drag.drag_over, None);
        on_move(&mut drag, &cols, &layout, 0.0, 350.0);
        assert_eq!(drag.drag_over, Some(3));
    }

    #[test]
    fn drop_emits_insert_before() {
        let cols = columns();
        let layout = ColumnLayout::new(&cols);
        let mut drag = begin(&cols, &layout, 0.0, 150.0).unwrap();
        on_move(&mut drag, &cols, &layout, 0.0, 350.0);
        let effects = on_drop(&drag);
        assert_eq!(effects.first(), Some(&Effect::ReorderColumn { from: 1, to: 2 }));
    }

    #[test]
    fn midpoint_order_lands_between_neighbors() {
        let orders = [1.0, 2.0, 3.0, 4.0];
        let new_order = compute_new_order(&orders, 1).unwrap();
        assert!(new_order > 2.0 && new_order < 3.0);
    }

    #[test]
    fn past_the_end_appends_plus_one() {
        let orders = [1.0, 2.0, 3.0];
        assert_eq!(compute_new_order(&orders, 2).unwrap(), 4.0);
    }

    #[test]
    fn repeated_midpoints_trigger_renormalization() {
        let mut orders = vec![1.0, 2.0];
        // Keep inserting between the same neighbors until precision dies.
        for _ in 0..64 {
            let mid = compute_new_order(&orders, 0).unwrap();
            orders.insert(1, mid);
            orders.truncate(2);
        }
        assert!(needs_renormalize(&orders));

        let mut cols = columns();
        renormalize_orders(&mut cols);
        let orders: Vec<f64> = cols.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(!needs_renormalize(&orders));
    }
}
