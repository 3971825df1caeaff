//! Grouped-view rendering: recursive group header bands with nested row
//! bands inside expanded leaves.

use web_sys::CanvasRenderingContext2d;

use super::rows::draw_row;
use super::truncate_text;
use crate::cache::{
    GroupChildren, GroupLayoutParams, GroupNode, GroupTreeCache, ADD_ROW_HEIGHT,
    GROUP_HEADER_HEIGHT, GROUP_PADDING,
};
use crate::hittest::{HitKind, HitRegion, HitTestIndex};
use crate::render::backend::RenderParams;
use crate::render::cells::CellRegistry;
use crate::render::colors::lighten;

pub(super) fn render_groups(
    ctx: &CanvasRenderingContext2d,
    cells: &CellRegistry,
    params: &RenderParams<'_>,
    hit_index: &mut HitTestIndex,
    width: f64,
    height: f64,
) {
    let Some(groups) = params.groups else {
        return;
    };
    let state = params.state;
    let layout_params = GroupLayoutParams {
        row_height: state.config.row_height,
        add_row_enabled: state.config.add_row_enabled,
    };
    let Some(range) = groups.calculate_group_range(
        &[],
        state.viewport.scroll_top,
        height - state.config.header_height,
        layout_params,
    ) else {
        return;
    };

    let mut y = state.config.header_height + range.start_y_offset;
    for index in range.start_index..=range.end_index {
        let band_height = match groups.root().get(&index) {
            Some(node) => {
                let h = groups.group_height(node, layout_params);
                draw_group(
                    ctx, cells, params, groups, hit_index, node, &[index], 0, y, width, height,
                    layout_params,
                );
                h
            }
            None => {
                // Not fetched yet: bare header placeholder.
                draw_placeholder_header(ctx, params, y, width);
                GROUP_HEADER_HEIGHT + GROUP_PADDING
            }
        };
        y += band_height;
        if y > height {
            break;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_group(
    ctx: &CanvasRenderingContext2d,
    cells: &CellRegistry,
    params: &RenderParams<'_>,
    groups: &GroupTreeCache,
    hit_index: &mut HitTestIndex,
    node: &GroupNode,
    path: &[usize],
    level: usize,
    y: f64,
    width: f64,
    viewport_height: f64,
    layout_params: GroupLayoutParams,
) {
    draw_group_header(ctx, params, node, path, level, y, width, hit_index);
    if !node.is_expanded {
        return;
    }

    let mut child_y = y + GROUP_HEADER_HEIGHT + GROUP_PADDING;
    match &node.children {
        GroupChildren::Leaf { path: leaf_path } => {
            draw_leaf_rows(
                ctx,
                cells,
                params,
                hit_index,
                node,
                leaf_path,
                level,
                child_y,
                width,
                viewport_height,
            );
        }
        GroupChildren::Branch { subgroups, .. } => {
            for index in 0..node.subgroup_count {
                if child_y > viewport_height {
                    break;
                }
                let slot_height = match subgroups.get(&index) {
                    Some(child) => groups.group_height(child, layout_params),
                    None => GROUP_HEADER_HEIGHT + GROUP_PADDING,
                };
                if child_y + slot_height > 0.0 {
                    let mut child_path = path.to_vec();
                    child_path.push(index);
                    match subgroups.get(&index) {
                        Some(child) => draw_group(
                            ctx,
                            cells,
                            params,
                            groups,
                            hit_index,
                            child,
                            &child_path,
                            level + 1,
                            child_y,
                            width,
                            viewport_height,
                            layout_params,
                        ),
                        None => draw_placeholder_header(ctx, params, child_y, width),
                    }
                }
                child_y += slot_height;
            }
        }
    }
}

fn draw_group_header(
    ctx: &CanvasRenderingContext2d,
    params: &RenderParams<'_>,
    node: &GroupNode,
    path: &[usize],
    level: usize,
    y: f64,
    width: f64,
    hit_index: &mut HitTestIndex,
) {
    let cfg = &params.state.config;
    let indent = nesting_indent(level);

    // Deeper levels fade towards white so nesting stays readable.
    let band = lighten(&node.color, 0.15 * u32::try_from(level).map_or(0.0, f64::from));
    ctx.set_fill_style_str(&band);
    ctx.fill_rect(indent, y + GROUP_PADDING / 2.0, width - indent, GROUP_HEADER_HEIGHT);

    ctx.set_fill_style_str(&cfg.row_text);
    ctx.set_font("600 13px Manrope");
    ctx.set_text_baseline("middle");
    let value = match &node.value {
        crate::cache::GroupValue::Null => "(empty)".to_string(),
        crate::cache::GroupValue::Text(s) => {
            node.display_value.clone().unwrap_or_else(|| s.clone())
        }
    };
    let label = format!("{} ({})", value, node.count);
    let text = truncate_text(ctx, &label, width - indent - 40.0);
    let _ = ctx.fill_text(
        &text,
        indent + 16.0,
        y + GROUP_PADDING / 2.0 + GROUP_HEADER_HEIGHT / 2.0,
    );

    hit_index.push(HitRegion {
        x: None,
        y,
        height: GROUP_HEADER_HEIGHT + GROUP_PADDING,
        level,
        kind: HitKind::GroupHeader {
            path: path.to_vec(),
        },
    });
}

fn draw_placeholder_header(
    ctx: &CanvasRenderingContext2d,
    params: &RenderParams<'_>,
    y: f64,
    width: f64,
) {
    let cfg = &params.state.config;
    ctx.set_fill_style_str(&cfg.header_bg);
    ctx.fill_rect(0.0, y + GROUP_PADDING / 2.0, width, GROUP_HEADER_HEIGHT);
}

#[allow(clippy::too_many_arguments)]
fn draw_leaf_rows(
    ctx: &CanvasRenderingContext2d,
    cells: &CellRegistry,
    params: &RenderParams<'_>,
    hit_index: &mut HitTestIndex,
    node: &GroupNode,
    leaf_path: &[usize],
    level: usize,
    body_y: f64,
    width: f64,
    viewport_height: f64,
) {
    let cfg = &params.state.config;
    let row_height = cfg.row_height;
    let cache = params.data.rows_for(leaf_path);

    let first_visible = if body_y < 0.0 {
        floor_to_usize(-body_y / row_height)
    } else {
        0
    };
    for row_idx in first_visible..node.count {
        let y = body_y + to_f64(row_idx) * row_height;
        if y > viewport_height {
            break;
        }
        let row = cache.and_then(|c| c.get(row_idx));
        draw_row(
            ctx, cells, params, hit_index, row, row_idx, y, leaf_path, level + 1, width,
        );
    }

    if cfg.add_row_enabled {
        let y = body_y + to_f64(node.count) * row_height;
        if y <= viewport_height && y + ADD_ROW_HEIGHT > 0.0 {
            ctx.set_fill_style_str(&cfg.row_bg_hover);
            ctx.fill_rect(0.0, y, width, ADD_ROW_HEIGHT);
            ctx.set_fill_style_str(&cfg.header_text);
            ctx.set_font("500 13px Manrope");
            let _ = ctx.fill_text("+ New record", 16.0, y + ADD_ROW_HEIGHT / 2.0);
            hit_index.push(HitRegion {
                x: None,
                y,
                height: ADD_ROW_HEIGHT,
                level: level + 1,
                kind: HitKind::AddRow {
                    path: leaf_path.to_vec(),
                },
            });
        }
    }
}

fn nesting_indent(level: usize) -> f64 {
    12.0 * u32::try_from(level).map_or(0.0, f64::from)
}

fn to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::MAX, f64::from)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_to_usize(value: f64) -> usize {
    value.max(0.0) as usize
}
