//! Row reorder gesture: drag a row band to a new position in its group.

use super::{Effect, EDGE_SCROLL_MARGIN};
use crate::hittest::{HitFilter, HitKind, HitRegion, HitTestIndex};

/// Pixels scrolled per pointer move while hovering a viewport edge.
const EDGE_SCROLL_STEP: f64 = 20.0;

/// Active row drag.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDrag {
    pub source_index: usize,
    pub path: Vec<usize>,
    /// Drop position: insert before this row; `None` = append to the end
    /// of the source group.
    pub target: Option<usize>,
    pub pointer_y: f64,
}

/// Start a drag from the hit under the pointer; only row bands (or the
/// add-row affordance of the same band) qualify.
pub fn begin(hit: &HitRegion, y: f64) -> Option<RowDrag> {
    match &hit.kind {
        HitKind::Row { row_index, path } => Some(RowDrag {
            source_index: *row_index,
            path: path.clone(),
            target: None,
            pointer_y: y,
        }),
        _ => None,
    }
}

/// Pointer move: re-hit the element under the pointer (biased half a row
/// down so the lower half of a band wins), ignore targets from other
/// groups, and auto-scroll near the viewport edges.
pub fn on_move(
    drag: &mut RowDrag,
    hit_index: &HitTestIndex,
    x: f64,
    y: f64,
    row_height: f64,
    viewport_height: f64,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    drag.pointer_y = y;

    if y < EDGE_SCROLL_MARGIN {
        effects.push(Effect::ScrollBy {
            dx: 0.0,
            dy: -EDGE_SCROLL_STEP,
        });
    } else if y > viewport_height - EDGE_SCROLL_MARGIN {
        effects.push(Effect::ScrollBy {
            dx: 0.0,
            dy: EDGE_SCROLL_STEP,
        });
    }

    let target = hit_index
        .find_element_at(x, y + row_height / 2.0, Some(HitFilter::Row))
        .and_then(|hit| match &hit.kind {
            HitKind::Row { row_index, path } if *path == drag.path => Some(*row_index),
            _ => None,
        });

    if let Some(target) = target {
        if drag.target != Some(target) {
            drag.target = Some(target);
            effects.push(Effect::Redraw);
        }
    } else if hit_index
        .find_element_at(x, y + row_height / 2.0, Some(HitFilter::AddRow))
        .is_some_and(|hit| hit.kind.path() == drag.path.as_slice())
    {
        // Past the last row of the group: append.
        if drag.target.is_some() {
            drag.target = None;
            effects.push(Effect::Redraw);
        }
    }

    effects
}

/// Release: commit unless the target leaves the row where it already is
/// (itself, or the slot immediately after it).
pub fn on_drop(drag: &RowDrag) -> Vec<Effect> {
    let unchanged = matches!(drag.target, Some(t) if t == drag.source_index || t == drag.source_index + 1);
    if unchanged {
        return vec![Effect::Redraw];
    }
    vec![
        Effect::MoveRow {
            from: drag.source_index,
            to: drag.target,
            path: drag.path.clone(),
        },
        Effect::Redraw,
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::hittest::{HitKind, HitRegion, HitTestIndex};

    fn row_region(row_index: usize, y: f64, path: &[usize]) -> HitRegion {
        HitRegion {
            x: None,
            y,
            height: 32.0,
            level: 1,
            kind: HitKind::Row {
                row_index,
                path: path.to_vec(),
            },
        }
    }

    fn index_for(path: &[usize]) -> HitTestIndex {
        let mut index = HitTestIndex::default();
        for i in 0..10 {
            index.push(row_region(i, 32.0 * to_f64(i), path));
        }
        index
    }

    fn to_f64(v: usize) -> f64 {
        u32::try_from(v).map_or(0.0, f64::from)
    }

    #[test]
    fn begin_requires_a_row_band() {
        let region = row_region(3, 96.0, &[]);
        let drag = begin(&region, 100.0).unwrap();
        assert_eq!(drag.source_index, 3);

        let header = HitRegion {
            x: None,
            y: 0.0,
            height: 56.0,
            level: 0,
            kind: HitKind::GroupHeader { path: vec![0] },
        };
        assert!(begin(&header, 10.0).is_none());
    }

    #[test]
    fn move_biases_to_lower_half() {
        let index = index_for(&[]);
        let mut drag = begin(&row_region(0, 0.0, &[]), 0.0).unwrap();
        // Pointer at y = 50 → biased hit at 66 → row 2.
        on_move(&mut drag, &index, 0.0, 50.0, 32.0, 600.0);
        assert_eq!(drag.target, Some(2));
    }

    #[test]
    fn targets_from_other_groups_are_ignored() {
        let index = index_for(&[1]);
        let mut drag = begin(&row_region(0, 0.0, &[2]), 0.0).unwrap();
        on_move(&mut drag, &index, 0.0, 150.0, 32.0, 600.0);
        assert_eq!(drag.target, None);
    }

    #[test]
    fn edge_hover_requests_auto_scroll() {
        let index = index_for(&[]);
        let mut drag = begin(&row_region(5, 160.0, &[]), 160.0).unwrap();
        let effects = on_move(&mut drag, &index, 0.0, 30.0, 32.0, 600.0);
        assert!(effects.contains(&Effect::ScrollBy { dx: 0.0, dy: -EDGE_SCROLL_STEP }));
        let effects = on_move(&mut drag, &index, 0.0, 550.0, 32.0, 600.0);
        assert!(effects.contains(&Effect::ScrollBy { dx: 0.0, dy: EDGE_SCROLL_STEP }));
    }

    #[test]
    fn dropping_in_place_is_a_noop() {
        let mut drag = begin(&row_region(4, 128.0, &[]), 128.0).unwrap();
        drag.target = Some(4);
        assert_eq!(on_drop(&drag), vec![Effect::Redraw]);
        drag.target = Some(5);
        assert_eq!(on_drop(&drag), vec![Effect::Redraw]);
        drag.target = Some(2);
        assert_eq!(
            on_drop(&drag).first(),
            Some(&Effect::MoveRow {
                from: 4,
                to: Some(2),
                path: Vec::new()
            })
        );
    }

    #[test]
    fn no_target_appends_to_group_end() {
        let drag = RowDrag {
            source_index: 1,
            path: vec![0],
            target: None,
            pointer_y: 0.0,
        };
        assert_eq!(
            on_drop(&drag).first(),
            Some(&Effect::MoveRow {
                from: 1,
                to: None,
                path: vec![0]
            })
        );
    }
}
