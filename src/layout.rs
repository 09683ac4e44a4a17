//! Two-pass tree layout: bottom-up subtree sizing, top-down placement.
//! Deterministic and idempotent; every call recomputes from scratch.

use eframe::egui::{Rect, pos2};

use crate::config::FunctionTreeConfig;
use crate::tree::{TreeData, TreeNode};

#[derive(Clone, Copy, Debug, Default)]
struct SubtreeSize {
    width: f32,
    height: f32,
}

/// Mutates node positions in place. The root lands centered on world
/// `(0, 0)`; absolute screen placement is the viewport's job.
pub fn layout_tree(tree: &mut TreeData, config: &FunctionTreeConfig) {
    if tree.is_empty() {
        return;
    }

    let mut sizes = vec![SubtreeSize::default(); tree.len()];
    measure(tree, tree.root_index(), config, &mut sizes);
    place(tree, tree.root_index(), 0.0, 0.0, config, &sizes);
}

fn is_leaf(tree: &TreeData, index: usize) -> bool {
    tree.nodes()[index].children.is_empty()
}

fn use_grid(tree: &TreeData, children: &[usize], config: &FunctionTreeConfig) -> bool {
    children.len() > config.grid_threshold && children.iter().all(|&child| is_leaf(tree, child))
}

fn grid_dimensions(count: usize) -> (usize, usize) {
    let cols = (count as f32).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols.max(1));
    (cols, rows)
}

fn measure(
    tree: &TreeData,
    index: usize,
    config: &FunctionTreeConfig,
    sizes: &mut [SubtreeSize],
) -> SubtreeSize {
    let node = &tree.nodes()[index];
    let own = node.size;
    let children = node.children.clone();

    if children.is_empty() {
        let size = SubtreeSize {
            width: own.x,
            height: own.y,
        };
        sizes[index] = size;
        return size;
    }

    let child_sizes = children
        .iter()
        .map(|&child| measure(tree, child, config, sizes))
        .collect::<Vec<_>>();

    let (children_width, children_height) = if use_grid(tree, &children, config) {
        let (cols, rows) = grid_dimensions(children.len());
        let cell = tree.nodes()[children[0]].size;
        let row_gap = config.node_gap_x * 0.5;
        (
            cols as f32 * cell.x + (cols - 1) as f32 * config.node_gap_x,
            rows as f32 * cell.y + (rows - 1) as f32 * row_gap,
        )
    } else {
        let width = child_sizes.iter().map(|s| s.width).sum::<f32>()
            + (child_sizes.len() - 1) as f32 * config.node_gap_x;
        let height = child_sizes.iter().map(|s| s.height).fold(0.0f32, f32::max);
        (width, height)
    };

    let size = SubtreeSize {
        width: own.x.max(children_width),
        height: own.y + config.node_gap_y + children_height,
    };
    sizes[index] = size;
    size
}

fn place(
    tree: &mut TreeData,
    index: usize,
    cx: f32,
    cy: f32,
    config: &FunctionTreeConfig,
    sizes: &[SubtreeSize],
) {
    let (own, children) = {
        let node = &tree.nodes()[index];
        (node.size, node.children.clone())
    };

    tree.nodes_mut()[index].pos = pos2(cx - own.x / 2.0, cy);

    if children.is_empty() {
        return;
    }

    let child_y = cy + own.y + config.node_gap_y;

    if use_grid(tree, &children, config) {
        let (cols, _) = grid_dimensions(children.len());
        let cell = tree.nodes()[children[0]].size;
        let row_gap = config.node_gap_x * 0.5;
        let grid_width = cols as f32 * cell.x + (cols - 1) as f32 * config.node_gap_x;
        let start_x = cx - grid_width / 2.0;

        for (i, &child) in children.iter().enumerate() {
            let col = i % cols;
            let row = i / cols;
            let child_cx = start_x + col as f32 * (cell.x + config.node_gap_x) + cell.x / 2.0;
            let child_cy = child_y + row as f32 * (cell.y + row_gap);
            let child_size = tree.nodes()[child].size;
            tree.nodes_mut()[child].pos = pos2(child_cx - child_size.x / 2.0, child_cy);
        }
    } else {
        let total_width = children
            .iter()
            .map(|&child| sizes[child].width)
            .sum::<f32>()
            + (children.len() - 1) as f32 * config.node_gap_x;

        let mut current_x = cx - total_width / 2.0;
        for &child in &children {
            let child_width = sizes[child].width;
            place(
                tree,
                child,
                current_x + child_width / 2.0,
                child_y,
                config,
                sizes,
            );
            current_x += child_width + config.node_gap_x;
        }
    }
}

/// Axis-aligned bounding box of all positioned nodes, `None` when empty.
pub fn tree_bounds(nodes: &[TreeNode]) -> Option<Rect> {
    let first = nodes.first()?;
    let mut bounds = Rect::from_min_size(first.pos, first.size);
    for node in &nodes[1..] {
        bounds = bounds.union(Rect::from_min_size(node.pos, node.size));
    }
    Some(bounds)
}
