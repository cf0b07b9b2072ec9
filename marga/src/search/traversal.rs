//! Traversal predicates and costs.

use crate::graph::GraphIndex;
use crate::storage::NodeRecord;

/// Per-request node filter and tag penalties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalConstraint {
    /// Reject unwalkable nodes
    pub walkable_only: bool,
    /// Bit per tag; nodes with a cleared bit are rejected
    pub tag_mask: u32,
    /// Bit per graph index; nodes of a cleared graph are rejected
    pub graph_mask: u32,
    /// Extra cost for entering a node with a given tag
    pub tag_penalties: [u32; 32],
}

impl Default for TraversalConstraint {
    fn default() -> Self {
        Self {
            walkable_only: true,
            tag_mask: u32::MAX,
            graph_mask: u32::MAX,
            tag_penalties: [0; 32],
        }
    }
}

impl TraversalConstraint {
    /// Only allow tags whose bit is set
    pub fn with_tag_mask(mut self, mask: u32) -> Self {
        self.tag_mask = mask;
        self
    }

    /// Only allow graphs whose bit is set
    pub fn with_graph_mask(mut self, mask: u32) -> Self {
        self.graph_mask = mask;
        self
    }

    /// Add a penalty for entering nodes with `tag`
    pub fn with_tag_penalty(mut self, tag: u8, penalty: u32) -> Self {
        self.tag_penalties[(tag & 31) as usize] = penalty;
        self
    }

    #[inline]
    pub fn allows_graph(&self, graph: GraphIndex) -> bool {
        graph < 32 && self.graph_mask & (1 << graph) != 0
    }

    #[inline]
    pub fn allows(&self, node: &NodeRecord) -> bool {
        (!self.walkable_only || node.walkable)
            && self.tag_mask & (1 << (node.tag & 31)) != 0
            && self.allows_graph(node.graph)
    }

    #[inline]
    pub fn tag_penalty(&self, tag: u8) -> u32 {
        self.tag_penalties[(tag & 31) as usize]
    }
}

/// Pluggable traversal predicate and cost.
///
/// The default methods apply the request's [`TraversalConstraint`]; override
/// them to add custom rules (one-way zones, size limits, ...).
pub trait TraversalProvider: Send + Sync {
    /// Whether a node may be entered at all
    fn can_traverse_node(&self, constraint: &TraversalConstraint, node: &NodeRecord) -> bool {
        constraint.allows(node)
    }

    /// Whether the directed edge `from -> to` may be used
    fn can_traverse_edge(
        &self,
        constraint: &TraversalConstraint,
        _from: &NodeRecord,
        to: &NodeRecord,
    ) -> bool {
        self.can_traverse_node(constraint, to)
    }

    /// Extra cost for entering `node`
    fn traversal_cost(&self, constraint: &TraversalConstraint, node: &NodeRecord) -> u32 {
        node.penalty.saturating_add(constraint.tag_penalty(node.tag))
    }
}

/// Provider that only applies the constraint
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTraversal;

impl TraversalProvider for DefaultTraversal {}
