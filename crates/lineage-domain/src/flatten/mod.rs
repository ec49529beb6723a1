//! Flattening of a lineage tree into rows for virtualized rendering.
//!
//! The flat view is recomputed in full whenever the expansion state or the
//! tree snapshot changes. Cost is bounded by the number of visible rows, not
//! by the size of the tree.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{LineageTree, NodeId, NodeKey};

/// One visible row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatRow {
    pub id: NodeId,
    pub key: NodeKey,
    /// Indentation level; the root row is at 0.
    pub depth: usize,
    /// True when this row is the last child of its parent.
    pub is_last: bool,
    pub has_children: bool,
    pub expanded: bool,
}

/// Set of expanded node keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    expanded: HashSet<NodeKey>,
}

impl ExpandState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node with children, expanded.
    pub fn all(tree: &LineageTree) -> Self {
        Self::to_depth(tree, usize::MAX)
    }

    /// Nodes at row depth `< depth` expanded; `to_depth(tree, 1)` shows the
    /// root and its direct children.
    pub fn to_depth(tree: &LineageTree, depth: usize) -> Self {
        let mut state = Self::new();
        state.expand_to_depth(tree, depth);
        state
    }

    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn expand(&mut self, key: NodeKey) {
        self.expanded.insert(key);
    }

    pub fn collapse(&mut self, key: &NodeKey) {
        self.expanded.remove(key);
    }

    /// Flips a key and returns whether it is now expanded.
    pub fn toggle(&mut self, key: &NodeKey) -> bool {
        if self.expanded.remove(key) {
            false
        } else {
            self.expanded.insert(key.clone());
            true
        }
    }

    /// Expands every node with children whose row depth is below `depth`.
    pub fn expand_to_depth(&mut self, tree: &LineageTree, depth: usize) {
        let mut stack = vec![(NodeId::ROOT, 0usize)];
        while let Some((id, level)) = stack.pop() {
            let children = tree.children(id);
            if level >= depth || children.is_empty() {
                continue;
            }
            self.expanded.insert(tree[id].node.key.clone());
            stack.extend(children.iter().map(|child| (*child, level + 1)));
        }
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

/// Flattens the visible part of `tree` in pre-order.
///
/// Uses an explicit stack so very deep trees cannot overflow the call
/// stack. Children are pushed in reverse to pop left to right, and only
/// when their parent is expanded.
pub fn flatten(tree: &LineageTree, state: &ExpandState) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    let mut stack = vec![(NodeId::ROOT, 0usize, true)];

    while let Some((id, depth, is_last)) = stack.pop() {
        let entry = &tree[id];
        let expanded = state.is_expanded(&entry.node.key);
        rows.push(FlatRow {
            id,
            key: entry.node.key.clone(),
            depth,
            is_last,
            has_children: !entry.children.is_empty(),
            expanded,
        });

        if expanded {
            let last = entry.children.len().saturating_sub(1);
            for (i, child) in entry.children.iter().enumerate().rev() {
                stack.push((*child, depth + 1, i == last));
            }
        }
    }
    rows
}
