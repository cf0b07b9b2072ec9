//! Per-worker search scratch buffers.
//!
//! Each worker owns one buffer. The arena holds weak references so it can
//! resize buffers on growth and reset slots on free.

use crate::search::PathNode;

use super::{NodeIndex, TEMPORARY_NODE_START};

/// PathNode array for one worker, indexed by path-node index.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    nodes: Vec<PathNode>,
    temporary: Vec<PathNode>,
}

impl ScratchBuffer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: vec![PathNode::default(); capacity],
            temporary: Vec::new(),
        }
    }

    /// Number of real path-node slots
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn get(&self, index: NodeIndex) -> &PathNode {
        if index >= TEMPORARY_NODE_START {
            &self.temporary[(index - TEMPORARY_NODE_START) as usize]
        } else {
            &self.nodes[index as usize]
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> &mut PathNode {
        if index >= TEMPORARY_NODE_START {
            &mut self.temporary[(index - TEMPORARY_NODE_START) as usize]
        } else {
            &mut self.nodes[index as usize]
        }
    }

    /// Ensure room for `count` temporary nodes and reset them
    pub(crate) fn reset_temporary(&mut self, count: usize) {
        self.temporary.clear();
        self.temporary.resize(count, PathNode::default());
    }

    pub(crate) fn resize(&mut self, capacity: usize) {
        if capacity > self.nodes.len() {
            self.nodes.resize(capacity, PathNode::default());
        }
    }

    pub(crate) fn reset_slot(&mut self, index: NodeIndex) {
        if let Some(node) = self.nodes.get_mut(index as usize) {
            *node = PathNode::default();
        }
    }

    /// Zero every slot (used on generation stamp overflow)
    pub(crate) fn reset_all(&mut self) {
        self.nodes.fill(PathNode::default());
        self.temporary.fill(PathNode::default());
    }
}
