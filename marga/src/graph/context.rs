//! Mutation context handed to graphs.

use crate::core::Int3;
use crate::error::StorageError;
use crate::hierarchy::HierarchicalGraph;
use crate::storage::{NodeIndex, NodeRecord, NodeStorage};

use super::GraphIndex;

/// Mutable access to the node arena for one graph.
///
/// Every change that can affect connectivity marks the touched nodes dirty in
/// the hierarchy, so the next recalculation picks them up.
pub struct NodeContext<'a> {
    graph: GraphIndex,
    storage: &'a mut NodeStorage,
    hierarchy: &'a mut HierarchicalGraph,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        graph: GraphIndex,
        storage: &'a mut NodeStorage,
        hierarchy: &'a mut HierarchicalGraph,
    ) -> Self {
        Self {
            graph,
            storage,
            hierarchy,
        }
    }

    /// Graph this context creates nodes for
    pub fn graph(&self) -> GraphIndex {
        self.graph
    }

    /// Read-only arena access
    pub fn storage(&self) -> &NodeStorage {
        self.storage
    }

    /// Record of a live node
    pub fn node(&self, index: NodeIndex) -> Option<&NodeRecord> {
        self.storage.get(index)
    }

    /// Allocate a new walkable node
    pub fn create_node(&mut self, position: Int3, variants: u8) -> Result<NodeIndex, StorageError> {
        let index = self.storage.allocate(self.graph, position, variants)?;
        self.hierarchy.mark_dirty(self.storage, index);
        Ok(index)
    }

    /// Destroy a node and recycle its index
    pub fn destroy_node(&mut self, index: NodeIndex) -> Result<(), StorageError> {
        self.hierarchy.mark_dirty(self.storage, index);
        self.storage.free(index)
    }

    /// Change walkability. Returns true if it changed.
    pub fn set_walkable(&mut self, index: NodeIndex, walkable: bool) -> bool {
        let Some(record) = self.storage.get_mut(index) else {
            return false;
        };
        if record.walkable == walkable {
            return false;
        }
        record.walkable = walkable;
        self.hierarchy.mark_dirty(self.storage, index);
        true
    }

    /// Set the traversal tag (0..32)
    pub fn set_tag(&mut self, index: NodeIndex, tag: u8) {
        if let Some(record) = self.storage.get_mut(index) {
            record.tag = tag.min(31);
        }
    }

    /// Set the entry penalty
    pub fn set_penalty(&mut self, index: NodeIndex, penalty: u32) {
        if let Some(record) = self.storage.get_mut(index) {
            record.penalty = penalty;
        }
    }

    /// Flag a node for hierarchy rebuild (connections changed)
    pub fn mark_dirty(&mut self, index: NodeIndex) {
        self.hierarchy.mark_dirty(self.storage, index);
    }
}
