//! Graph collaborators.
//!
//! Concrete graphs supply geometry: which nodes exist, how they connect, and
//! where a path through them lies. The core never owns nodes through a graph;
//! graphs hold node indices into the shared [`NodeStorage`] and mutate it
//! through a [`NodeContext`], which keeps the hierarchy informed.
//!
//! Two reference graphs are provided:
//! - [`GridGraph`]: regular 4/8-connected cell grid
//! - [`PointGraph`]: free-form waypoints with explicit (possibly one-way) edges

mod context;
mod grid;
mod point_graph;

pub use context::NodeContext;
pub use grid::{GridConnectivity, GridGraph};
pub use point_graph::PointGraph;

use downcast_rs::{Downcast, impl_downcast};

use crate::core::Int3;
use crate::error::UsageError;
use crate::search::FRACTION_CENTER;
use crate::storage::{NodeIndex, NodeRecord, NodeStorage};

/// Index of a graph in the [`GraphRegistry`]
pub type GraphIndex = u32;

/// Maximum number of simultaneously registered graphs (graph masks are u32)
pub const MAX_GRAPHS: usize = 32;

/// A directed edge produced during expansion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Base index of the neighbor node
    pub target: NodeIndex,
    /// Variant of the neighbor entered through this edge
    pub target_variant: u8,
    /// Quantized position along the entry edge (0..=15)
    pub fraction: u8,
    /// Edge cost in integer units
    pub cost: u32,
}

impl Connection {
    /// Plain node-to-node edge
    pub fn new(target: NodeIndex, cost: u32) -> Self {
        Self {
            target,
            target_variant: 0,
            fraction: FRACTION_CENTER,
            cost,
        }
    }
}

/// Result of a nearest-node query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NearestNode {
    pub node: NodeIndex,
    /// Closest point on the node to the query
    pub closest: Int3,
    /// Squared distance from the query to `closest`
    pub sqr_distance: i64,
}

/// Node filter used by nearest-node queries
pub type NodeFilter<'a> = &'a dyn Fn(NodeIndex, &NodeRecord) -> bool;

/// Graph-type collaborator.
pub trait NavGraph: Downcast + Send + Sync {
    /// Registry index of this graph
    fn index(&self) -> GraphIndex;

    /// Number of nodes owned by this graph
    fn node_count(&self) -> usize;

    /// Visit every node owned by this graph
    fn for_each_node(&self, f: &mut dyn FnMut(NodeIndex));

    /// Visit the outgoing connections of `node` entered as `variant`
    fn for_each_connection(
        &self,
        node: NodeIndex,
        variant: u8,
        storage: &NodeStorage,
        f: &mut dyn FnMut(Connection),
    );

    /// Visit nodes with a connection into `node`.
    ///
    /// The default assumes symmetric connectivity.
    fn for_each_incoming(
        &self,
        node: NodeIndex,
        storage: &NodeStorage,
        f: &mut dyn FnMut(NodeIndex),
    ) {
        let variants = storage.get(node).map_or(1, |r| r.variants);
        for variant in 0..variants {
            self.for_each_connection(node, variant, storage, &mut |c| f(c.target));
        }
    }

    /// Position of a path through `node` entered as `variant` at `fraction`
    fn variant_position(
        &self,
        node: NodeIndex,
        _variant: u8,
        _fraction: u8,
        storage: &NodeStorage,
    ) -> Int3 {
        storage.get(node).map_or(Int3::ZERO, |r| r.position)
    }

    /// Closest point on the surface of `node` to `point`
    fn closest_point_on_node(&self, node: NodeIndex, _point: Int3, storage: &NodeStorage) -> Int3 {
        storage.get(node).map_or(Int3::ZERO, |r| r.position)
    }

    /// Nearest node accepted by `filter` within `max_sqr_distance`.
    ///
    /// The default is a linear scan.
    fn nearest_node(
        &self,
        point: Int3,
        storage: &NodeStorage,
        filter: NodeFilter<'_>,
        max_sqr_distance: i64,
    ) -> Option<NearestNode> {
        let mut best: Option<NearestNode> = None;
        self.for_each_node(&mut |node| {
            let Some(record) = storage.get(node) else {
                return;
            };
            if !filter(node, record) {
                return;
            }
            let closest = self.closest_point_on_node(node, point, storage);
            let sqr_distance = closest.sqr_distance(&point);
            if sqr_distance <= max_sqr_distance
                && best.is_none_or(|b| sqr_distance < b.sqr_distance)
            {
                best = Some(NearestNode {
                    node,
                    closest,
                    sqr_distance,
                });
            }
        });
        best
    }
}

impl_downcast!(NavGraph);

/// Graphs keyed by [`GraphIndex`].
#[derive(Default)]
pub struct GraphRegistry {
    graphs: Vec<Option<Box<dyn NavGraph>>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next registered graph will receive
    pub fn next_index(&self) -> Result<GraphIndex, UsageError> {
        if let Some(free) = self.graphs.iter().position(Option::is_none) {
            return Ok(free as GraphIndex);
        }
        if self.graphs.len() >= MAX_GRAPHS {
            return Err(UsageError::TooManyGraphs(MAX_GRAPHS));
        }
        Ok(self.graphs.len() as GraphIndex)
    }

    pub(crate) fn insert(&mut self, graph: Box<dyn NavGraph>) -> GraphIndex {
        let index = graph.index() as usize;
        if index >= self.graphs.len() {
            self.graphs.resize_with(index + 1, || None);
        }
        self.graphs[index] = Some(graph);
        index as GraphIndex
    }

    pub(crate) fn remove(&mut self, index: GraphIndex) -> Option<Box<dyn NavGraph>> {
        self.graphs.get_mut(index as usize)?.take()
    }

    /// Graph by index
    #[inline]
    pub fn get(&self, index: GraphIndex) -> Option<&dyn NavGraph> {
        self.graphs.get(index as usize)?.as_deref()
    }

    pub(crate) fn get_mut(&mut self, index: GraphIndex) -> Option<&mut Box<dyn NavGraph>> {
        self.graphs.get_mut(index as usize)?.as_mut()
    }

    /// Typed access to a graph
    pub fn get_as<G: NavGraph>(&self, index: GraphIndex) -> Option<&G> {
        self.get(index)?.downcast_ref::<G>()
    }

    /// Iterate registered graphs
    pub fn iter(&self) -> impl Iterator<Item = &dyn NavGraph> {
        self.graphs.iter().filter_map(|g| g.as_deref())
    }

    /// Number of registered graphs
    pub fn len(&self) -> usize {
        self.graphs.iter().filter(|g| g.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
