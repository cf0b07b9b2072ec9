//! Shared navigation data: node arena, graphs and hierarchy.
//!
//! A single [`NavData`] sits behind a reader/writer lock. Searches take the
//! read side; graph edits and hierarchy rebuilds take the write side while
//! the processor is paused.

use log::info;

use crate::config::MargaConfig;
use crate::core::Int3;
use crate::error::{Result, UsageError};
use crate::graph::{GraphIndex, GraphRegistry, NavGraph, NearestNode, NodeContext, NodeFilter};
use crate::hierarchy::{HierarchicalGraph, HierarchyConfig, RecalculateStats};
use crate::search::{PathHandler, SearchConfig};
use crate::storage::{NodeIndex, NodeRecord, NodeStorage};

/// Node arena, graph registry and hierarchical graph.
pub struct NavData {
    storage: NodeStorage,
    graphs: GraphRegistry,
    hierarchy: HierarchicalGraph,
}

impl Default for NavData {
    fn default() -> Self {
        Self::with_config(0, HierarchyConfig::default())
    }
}

impl NavData {
    /// Create from a full configuration
    pub fn new(config: &MargaConfig) -> Self {
        Self::with_config(
            config.storage.initial_capacity,
            config.to_hierarchy_config(),
        )
    }

    /// Create with explicit arena capacity and hierarchy settings
    pub fn with_config(initial_capacity: usize, hierarchy: HierarchyConfig) -> Self {
        Self {
            storage: NodeStorage::with_capacity(initial_capacity),
            graphs: GraphRegistry::new(),
            hierarchy: HierarchicalGraph::new(hierarchy),
        }
    }

    pub fn storage(&self) -> &NodeStorage {
        &self.storage
    }

    /// Create a search handler with its own scratch view of the arena
    pub fn new_handler(&mut self, worker_id: usize, config: SearchConfig) -> PathHandler {
        PathHandler::new(worker_id, &mut self.storage, config)
    }

    pub fn graphs(&self) -> &GraphRegistry {
        &self.graphs
    }

    pub fn hierarchy(&self) -> &HierarchicalGraph {
        &self.hierarchy
    }

    /// Record of a live node
    pub fn node(&self, index: NodeIndex) -> Option<&NodeRecord> {
        self.storage.get(index)
    }

    /// Register a new graph built by `build`.
    ///
    /// ```rust,ignore
    /// let index = data.add_graph(|ctx| GridGraph::new(ctx, 10, 10, 1000, Int3::ZERO))?;
    /// ```
    pub fn add_graph<G, F, E>(&mut self, build: F) -> Result<GraphIndex>
    where
        G: NavGraph,
        F: FnOnce(&mut NodeContext<'_>) -> std::result::Result<G, E>,
        crate::error::Error: From<E>,
    {
        let index = self.graphs.next_index()?;
        let mut ctx = NodeContext::new(index, &mut self.storage, &mut self.hierarchy);
        let graph = build(&mut ctx)?;
        info!(
            "[NavData] added graph {} ({} nodes)",
            index,
            graph.node_count()
        );
        self.graphs.insert(Box::new(graph));
        Ok(index)
    }

    /// Typed read access to a graph
    pub fn graph<G: NavGraph>(&self, index: GraphIndex) -> Option<&G> {
        self.graphs.get_as::<G>(index)
    }

    /// Mutate a graph through a [`NodeContext`]
    pub fn update_graph<G, R>(
        &mut self,
        index: GraphIndex,
        f: impl FnOnce(&mut G, &mut NodeContext<'_>) -> R,
    ) -> Result<R>
    where
        G: NavGraph,
    {
        let graph = self
            .graphs
            .get_mut(index)
            .ok_or(UsageError::UnknownGraph(index))?
            .downcast_mut::<G>()
            .ok_or(UsageError::GraphTypeMismatch(index))?;
        let mut ctx = NodeContext::new(index, &mut self.storage, &mut self.hierarchy);
        Ok(f(graph, &mut ctx))
    }

    /// Unregister a graph and destroy all of its nodes
    pub fn remove_graph(&mut self, index: GraphIndex) -> Result<()> {
        let graph = self
            .graphs
            .remove(index)
            .ok_or(UsageError::UnknownGraph(index))?;
        let mut nodes = Vec::with_capacity(graph.node_count());
        graph.for_each_node(&mut |n| nodes.push(n));

        let mut ctx = NodeContext::new(index, &mut self.storage, &mut self.hierarchy);
        for node in nodes {
            ctx.destroy_node(node)?;
        }
        info!("[NavData] removed graph {}", index);
        Ok(())
    }

    /// Rebuild dirty parts of the hierarchy
    pub fn recalculate_hierarchy(&mut self) -> RecalculateStats {
        self.hierarchy.recalculate(&mut self.storage, &self.graphs)
    }

    /// Closest accepted node across all graphs
    pub fn nearest_node(
        &self,
        point: Int3,
        filter: NodeFilter<'_>,
        max_sqr_distance: i64,
    ) -> Option<NearestNode> {
        self.graphs
            .iter()
            .filter_map(|g| g.nearest_node(point, &self.storage, filter, max_sqr_distance))
            .min_by_key(|n| n.sqr_distance)
    }

    /// True if both nodes are in the same connected component
    pub fn is_reachable(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.hierarchy.is_reachable(&self.storage, a, b)
    }

    /// Position of a path-node (node + variant) at an edge fraction
    pub fn path_node_position(&self, index: NodeIndex, fraction: u8) -> Option<Int3> {
        let base = self.storage.base_of(index)?;
        let record = self.storage.get(base)?;
        let graph = self.graphs.get(record.graph)?;
        Some(graph.variant_position(base, (index - base) as u8, fraction, &self.storage))
    }
}
