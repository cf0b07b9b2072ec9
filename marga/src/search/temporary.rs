//! Temporary start/end nodes.

use crate::core::Int3;
use crate::storage::{NodeIndex, TEMPORARY_NODE_START};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporaryKind {
    Start,
    End,
}

/// Literal query point attached to a real node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporaryNode {
    pub kind: TemporaryKind,
    pub position: Int3,
    /// Real node the query point was matched to
    pub associated: NodeIndex,
}

/// Per-worker pool, reset for every request.
#[derive(Debug, Default)]
pub struct TemporaryNodes {
    nodes: Vec<TemporaryNode>,
}

impl TemporaryNodes {
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Add a node and return its path-node index
    pub fn add(&mut self, node: TemporaryNode) -> NodeIndex {
        self.nodes.push(node);
        TEMPORARY_NODE_START + (self.nodes.len() - 1) as NodeIndex
    }

    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&TemporaryNode> {
        if !is_temporary(index) {
            return None;
        }
        self.nodes.get((index - TEMPORARY_NODE_START) as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// True for indices in the temporary range
#[inline]
pub fn is_temporary(index: NodeIndex) -> bool {
    index >= TEMPORARY_NODE_START
}
