//! Per-node records held by the arena.

use crate::core::Int3;
use crate::graph::GraphIndex;

/// Dense node index. Real nodes are below [`super::TEMPORARY_NODE_START`].
pub type NodeIndex = u32;

/// Shared state of a live graph node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    /// World position (node center)
    pub position: Int3,
    /// Owning graph
    pub graph: GraphIndex,
    /// Whether agents may enter this node
    pub walkable: bool,
    /// Tag (0..32) used by traversal constraints
    pub tag: u8,
    /// Extra cost for entering this node
    pub penalty: u32,
    /// Hierarchical node this node belongs to (0 = unassigned)
    pub hierarchical_node: u32,
    /// Number of contiguous path-node slots (1..=3)
    pub variants: u8,
    /// Queued for hierarchy rebuild
    pub(crate) hierarchy_dirty: bool,
}

impl NodeRecord {
    pub(crate) fn new(graph: GraphIndex, position: Int3, variants: u8) -> Self {
        Self {
            position,
            graph,
            walkable: true,
            tag: 0,
            penalty: 0,
            hierarchical_node: 0,
            variants,
            hierarchy_dirty: false,
        }
    }
}

/// One arena slot.
#[derive(Clone, Debug, Default)]
pub(crate) enum Slot {
    #[default]
    Free,
    /// First slot of a live node
    Node(NodeRecord),
    /// Extra path-node slot owned by the node at `base`
    Variant { base: NodeIndex },
}
