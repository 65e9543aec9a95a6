use super::model::{PathTree, TreeNode};

/// Expansion status of a row as drawn by the tree view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    File,
    /// Directory whose children are not loaded.
    Collapsed,
    /// Directory with loaded children shown beneath it.
    Expanded,
    /// Directory that was listed and turned out to have no entries.
    Empty,
}

impl RowState {
    fn of(node: &TreeNode) -> Self {
        if node.is_file {
            RowState::File
        } else if !node.children.is_empty() {
            RowState::Expanded
        } else if node.loaded {
            RowState::Empty
        } else {
            RowState::Collapsed
        }
    }

    /// Whether the row should be drawn "open".
    pub fn is_open(self) -> bool {
        matches!(self, RowState::Expanded | RowState::Empty)
    }
}

/// A flattened tree row ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub path: String,
    pub name: String,
    pub is_file: bool,
    /// Number of rendered ancestor directories above this row.
    pub depth: usize,
    pub state: RowState,
}

/// Flatten `tree` into display order.
///
/// Depth-first pre-order; the synthetic root is not emitted and its direct
/// children sit at depth 0. Recomputed from scratch on every call.
pub fn project(tree: &PathTree) -> Vec<DisplayRow> {
    let mut rows = Vec::new();
    flatten_node(tree.root(), 0, &mut rows);
    rows
}

fn flatten_node(node: &TreeNode, depth: usize, rows: &mut Vec<DisplayRow>) {
    for (path, child) in node.children.iter() {
        rows.push(DisplayRow {
            path: path.clone(),
            name: child.name.clone(),
            is_file: child.is_file,
            depth,
            state: RowState::of(child),
        });
        flatten_node(child, depth + 1, rows);
    }
}
