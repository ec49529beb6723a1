//! Arena-backed lineage tree.
//!
//! The walk owns the tree while it grows; children are appended in discovery
//! order and never reordered or removed. After the walk finishes the tree is
//! handed out as an immutable snapshot.

use std::collections::HashMap;
use std::ops::Index;

use serde::Serialize;

use super::types::{GraphNode, NodeKey};

/// Index of a node inside a [`LineageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// The root always occupies the first slot.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A node and the ids of its materialized children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub node: GraphNode,
    pub children: Vec<NodeId>,
}

/// Tree of materialized lineage nodes.
#[derive(Debug, Clone)]
pub struct LineageTree {
    nodes: Vec<TreeNode>,
    index: HashMap<NodeKey, NodeId>,
}

impl LineageTree {
    /// Creates a tree containing only the root.
    pub fn new(root: GraphNode) -> Self {
        let mut index = HashMap::new();
        index.insert(root.key.clone(), NodeId::ROOT);
        Self {
            nodes: vec![TreeNode {
                node: root,
                children: Vec::new(),
            }],
            index,
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Looks up a node by its normalized key.
    pub fn find(&self, key: &NodeKey) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is present from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Appends `node` as the last child of `parent`.
    ///
    /// A key that is already present is not duplicated; the existing id is
    /// returned instead.
    pub(crate) fn attach(&mut self, parent: NodeId, node: GraphNode) -> NodeId {
        if let Some(existing) = self.index.get(&node.key) {
            return *existing;
        }
        let id = NodeId(self.nodes.len());
        self.index.insert(node.key.clone(), id);
        self.nodes.push(TreeNode {
            node,
            children: Vec::new(),
        });
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.push(id);
        }
        id
    }

    pub(crate) fn set_root_tag(&mut self, tag: Option<String>) {
        self.nodes[NodeId::ROOT.0].node.tag = tag;
    }
}

impl Index<NodeId> for LineageTree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }
}
