//! Free-form waypoint graph with explicit edges.

use std::collections::HashMap;

use crate::core::Int3;
use crate::error::StorageError;
use crate::storage::{NodeIndex, NodeStorage};

use super::{Connection, GraphIndex, NavGraph, NodeContext};

/// Waypoint graph. Edges are directed; use [`PointGraph::connect_both`] for
/// two-way links.
#[derive(Debug)]
pub struct PointGraph {
    index: GraphIndex,
    nodes: Vec<NodeIndex>,
    outgoing: HashMap<NodeIndex, Vec<(NodeIndex, u32)>>,
    incoming: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl PointGraph {
    /// Create an empty graph
    pub fn new(index: GraphIndex) -> Self {
        Self {
            index,
            nodes: Vec::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    /// Add a waypoint
    pub fn add_node(
        &mut self,
        ctx: &mut NodeContext<'_>,
        position: Int3,
    ) -> Result<NodeIndex, StorageError> {
        let node = ctx.create_node(position, 1)?;
        self.nodes.push(node);
        Ok(node)
    }

    /// Add or replace the edge `from -> to`.
    ///
    /// `cost` defaults to the Euclidean distance.
    pub fn connect(
        &mut self,
        ctx: &mut NodeContext<'_>,
        from: NodeIndex,
        to: NodeIndex,
        cost: Option<u32>,
    ) {
        if from == to {
            return;
        }
        let (Some(a), Some(b)) = (ctx.node(from), ctx.node(to)) else {
            return;
        };
        let cost = cost.unwrap_or_else(|| a.position.cost_to(&b.position));

        let edges = self.outgoing.entry(from).or_default();
        match edges.iter_mut().find(|(t, _)| *t == to) {
            Some(edge) => edge.1 = cost,
            None => {
                edges.push((to, cost));
                self.incoming.entry(to).or_default().push(from);
            }
        }
        ctx.mark_dirty(from);
        ctx.mark_dirty(to);
    }

    /// Add or replace edges in both directions
    pub fn connect_both(
        &mut self,
        ctx: &mut NodeContext<'_>,
        a: NodeIndex,
        b: NodeIndex,
        cost: Option<u32>,
    ) {
        self.connect(ctx, a, b, cost);
        self.connect(ctx, b, a, cost);
    }

    /// Remove the edge `from -> to`. Returns true if it existed.
    pub fn disconnect(&mut self, ctx: &mut NodeContext<'_>, from: NodeIndex, to: NodeIndex) -> bool {
        let removed = self
            .outgoing
            .get_mut(&from)
            .and_then(|edges| {
                let i = edges.iter().position(|(t, _)| *t == to)?;
                Some(edges.swap_remove(i))
            })
            .is_some();
        if removed {
            if let Some(sources) = self.incoming.get_mut(&to) {
                sources.retain(|&s| s != from);
            }
            ctx.mark_dirty(from);
            ctx.mark_dirty(to);
        }
        removed
    }

    /// Remove edges in both directions
    pub fn disconnect_both(&mut self, ctx: &mut NodeContext<'_>, a: NodeIndex, b: NodeIndex) -> bool {
        let ab = self.disconnect(ctx, a, b);
        let ba = self.disconnect(ctx, b, a);
        ab || ba
    }

    /// Remove a waypoint and all edges touching it
    pub fn remove_node(&mut self, ctx: &mut NodeContext<'_>, node: NodeIndex) -> Result<(), StorageError> {
        let Some(pos) = self.nodes.iter().position(|&n| n == node) else {
            return Err(StorageError::NotAllocated(node));
        };

        for (target, _) in self.outgoing.remove(&node).unwrap_or_default() {
            if let Some(sources) = self.incoming.get_mut(&target) {
                sources.retain(|&s| s != node);
            }
            ctx.mark_dirty(target);
        }
        for source in self.incoming.remove(&node).unwrap_or_default() {
            if let Some(edges) = self.outgoing.get_mut(&source) {
                edges.retain(|&(t, _)| t != node);
            }
            ctx.mark_dirty(source);
        }

        self.nodes.swap_remove(pos);
        ctx.destroy_node(node)
    }

    /// Change walkability of a waypoint
    pub fn set_walkable(&self, ctx: &mut NodeContext<'_>, node: NodeIndex, walkable: bool) -> bool {
        ctx.set_walkable(node, walkable)
    }

    /// Outgoing edges of a waypoint
    pub fn edges(&self, node: NodeIndex) -> &[(NodeIndex, u32)] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All waypoints
    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }
}

impl NavGraph for PointGraph {
    fn index(&self) -> GraphIndex {
        self.index
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn for_each_node(&self, f: &mut dyn FnMut(NodeIndex)) {
        for &node in &self.nodes {
            f(node);
        }
    }

    fn for_each_connection(
        &self,
        node: NodeIndex,
        _variant: u8,
        _storage: &NodeStorage,
        f: &mut dyn FnMut(Connection),
    ) {
        for &(target, cost) in self.edges(node) {
            f(Connection::new(target, cost));
        }
    }

    fn for_each_incoming(
        &self,
        node: NodeIndex,
        _storage: &NodeStorage,
        f: &mut dyn FnMut(NodeIndex),
    ) {
        if let Some(sources) = self.incoming.get(&node) {
            for &source in sources {
                f(source);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{HierarchicalGraph, HierarchyConfig};

    #[test]
    fn test_connect_and_disconnect() {
        let mut storage = NodeStorage::new();
        let mut hierarchy = HierarchicalGraph::new(HierarchyConfig::default());
        let mut ctx = NodeContext::new(0, &mut storage, &mut hierarchy);
        let mut graph = PointGraph::new(0);

        let a = graph.add_node(&mut ctx, Int3::new(0, 0, 0)).unwrap();
        let b = graph.add_node(&mut ctx, Int3::new(3000, 4000, 0)).unwrap();
        graph.connect(&mut ctx, a, b, None);
        assert_eq!(graph.edges(a), &[(b, 5000)]);
        assert!(graph.edges(b).is_empty());

        // Replacing keeps a single edge
        graph.connect(&mut ctx, a, b, Some(7000));
        assert_eq!(graph.edges(a), &[(b, 7000)]);

        let mut incoming = Vec::new();
        graph.for_each_incoming(b, ctx.storage(), &mut |n| incoming.push(n));
        assert_eq!(incoming, vec![a]);

        assert!(graph.disconnect(&mut ctx, a, b));
        assert!(!graph.disconnect(&mut ctx, a, b));
        assert!(graph.edges(a).is_empty());
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut storage = NodeStorage::new();
        let mut hierarchy = HierarchicalGraph::new(HierarchyConfig::default());
        let mut ctx = NodeContext::new(0, &mut storage, &mut hierarchy);
        let mut graph = PointGraph::new(0);

        let a = graph.add_node(&mut ctx, Int3::new(0, 0, 0)).unwrap();
        let b = graph.add_node(&mut ctx, Int3::new(1000, 0, 0)).unwrap();
        let c = graph.add_node(&mut ctx, Int3::new(2000, 0, 0)).unwrap();
        graph.connect_both(&mut ctx, a, b, None);
        graph.connect_both(&mut ctx, b, c, None);

        graph.remove_node(&mut ctx, b).unwrap();
        assert!(graph.edges(a).is_empty());
        assert!(graph.edges(c).is_empty());
        assert_eq!(graph.node_count(), 2);
        assert!(ctx.node(b).is_none());
        assert!(graph.remove_node(&mut ctx, b).is_err());
    }
}
