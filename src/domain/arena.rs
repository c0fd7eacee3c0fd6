use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

use crate::domain::network::Network;

/// Stable handle to a node of a domain tree.
///
/// Handles stay valid while other nodes come and go; a handle to a removed
/// node is detected rather than silently reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}.{}", slot, generation)
    }
}

/// Data payload for tree nodes representing an allocated block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    /// Level type, must match the schema level at the node's depth
    pub kind: String,
    /// Display label, unique among siblings (case-insensitive)
    pub name: String,
    /// Allocated block
    pub network: Network,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.name, self.network)
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Allocation data for this node
    pub data: NodeData,
    /// Parent node, None for the root
    pub parent: Option<NodeId>,
    /// Children in insertion order
    pub children: Vec<NodeId>,
}

/// Arena-based tree storage.
///
/// Parent links are plain indices, so there are no reference cycles and a
/// whole tree can be cloned cheaply for dry runs.
#[derive(Debug, Clone)]
pub struct TreeArena {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Root node, None for empty trees
    root: Option<NodeId>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Insert a node and link it as the last child of `parent`.
    /// A node inserted without parent becomes the root.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = NodeId(self.arena.insert(node));

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx.0) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: NodeId) -> Option<&TreeNode> {
        self.arena.get(idx.0)
    }

    pub fn get_node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx.0)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order traversal of the whole tree.
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self, self.root)
    }

    /// Pre-order traversal of the subtree below (and including) `start`.
    pub fn iter_from(&self, start: NodeId) -> TreeIterator {
        TreeIterator::new(self, Some(start))
    }

    /// Unlink `idx` from its parent and drop it together with its subtree.
    ///
    /// Returns the number of nodes removed.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_subtree(&mut self, idx: NodeId) -> usize {
        let doomed: Vec<NodeId> = self.iter_from(idx).map(|(id, _)| id).collect();
        let parent = self.get_node(idx).and_then(|node| node.parent);

        if let Some(parent) = parent.and_then(|p| self.arena.get_mut(p.0)) {
            parent.children.retain(|&child| child != idx);
        }
        if self.root == Some(idx) {
            self.root = None;
        }
        for id in &doomed {
            self.arena.remove(id.0);
        }
        doomed.len()
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena, start: Option<NodeId>) -> Self {
        let mut stack = Vec::new();
        if let Some(start) = start {
            stack.push(start);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}
