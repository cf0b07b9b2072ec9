//! Incrementally maintained connectivity over clusters of graph nodes.
//!
//! Graph nodes are grouped into hierarchical nodes (clusters) of up to
//! `max_children_per_node` members, built by breadth-first expansion over
//! walkable neighbors of the same graph. Clusters link to each other through
//! a bidirectional adjacency list, and connected-component ids are assigned
//! by flood-filling that coarse graph.
//!
//! ```text
//!   mark_dirty(node)            recalculate()
//!        │            ┌──────────────────────────────────┐
//!        ▼            │ a. remove dirty clusters         │
//!   dirty nodes ─────▶│ b. BFS-build clusters from dirty │
//!   dirty clusters    │ c. link touched clusters         │
//!                     │ d. flood-fill components         │
//!                     └──────────────────────────────────┘
//! ```
//!
//! Only clusters touched since the last recalculation are rebuilt, so an edit
//! costs O(cluster size) plus a flood over the affected components rather
//! than O(nodes).

mod slab;

pub use slab::{SlabAllocator, SlabList};

use std::collections::VecDeque;

use log::debug;

use crate::core::IntBounds;
use crate::graph::{GraphIndex, GraphRegistry, NavGraph};
use crate::storage::{NodeIndex, NodeStorage};

/// Hierarchical graph configuration
#[derive(Clone, Debug)]
pub struct HierarchyConfig {
    /// Maximum graph nodes per cluster
    pub max_children_per_node: usize,
    /// Neighbor clusters smaller than this are absorbed on rebuild
    pub min_children_per_node: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_children_per_node: 256,
            min_children_per_node: 128,
        }
    }
}

impl HierarchyConfig {
    /// Set cluster size limits
    pub fn with_children_limits(mut self, min: usize, max: usize) -> Self {
        self.max_children_per_node = max.max(1);
        self.min_children_per_node = min.min(self.max_children_per_node);
        self
    }
}

/// Summary of one recalculation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecalculateStats {
    pub removed: usize,
    pub created: usize,
    pub relinked: usize,
    pub components: usize,
}

#[derive(Debug, Default)]
struct HierarchicalNode {
    children: Vec<NodeIndex>,
    bounds: IntBounds,
    adjacency: SlabList,
    graph: GraphIndex,
    component: u32,
    version: u32,
    dirty: bool,
    alive: bool,
    visit: u32,
}

/// Coarse connectivity graph.
#[derive(Debug)]
pub struct HierarchicalGraph {
    config: HierarchyConfig,
    /// Index 0 is the "unassigned" sentinel and never alive
    nodes: Vec<HierarchicalNode>,
    free_ids: Vec<u32>,
    slab: SlabAllocator,
    dirty_nodes: Vec<NodeIndex>,
    dirty_clusters: Vec<u32>,
    next_component: u32,
    visit_epoch: u32,
    targets: Vec<NodeIndex>,
}

impl HierarchicalGraph {
    pub fn new(config: HierarchyConfig) -> Self {
        Self {
            config,
            nodes: vec![HierarchicalNode::default()],
            free_ids: Vec::new(),
            slab: SlabAllocator::new(),
            dirty_nodes: Vec::new(),
            dirty_clusters: Vec::new(),
            next_component: 1,
            visit_epoch: 0,
            targets: Vec::new(),
        }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Flag a node's cluster for rebuild.
    ///
    /// Idempotent; a no-op for nodes already marked or no longer live.
    pub fn mark_dirty(&mut self, storage: &mut NodeStorage, node: NodeIndex) {
        let Some(base) = storage.base_of(node) else {
            return;
        };
        let Some(record) = storage.get_mut(base) else {
            return;
        };
        if record.hierarchy_dirty {
            return;
        }
        record.hierarchy_dirty = true;
        self.dirty_nodes.push(base);

        let h = record.hierarchical_node;
        if h != 0 {
            self.flag_cluster(h);
        }
    }

    fn flag_cluster(&mut self, h: u32) {
        if let Some(cluster) = self.nodes.get_mut(h as usize)
            && cluster.alive
            && !cluster.dirty
        {
            cluster.dirty = true;
            self.dirty_clusters.push(h);
        }
    }

    /// True if a recalculation has pending work
    pub fn is_dirty(&self) -> bool {
        !self.dirty_nodes.is_empty() || !self.dirty_clusters.is_empty()
    }

    /// Number of nodes waiting for a cluster
    pub fn pending_nodes(&self) -> usize {
        self.dirty_nodes.len()
    }

    /// Rebuild every dirty cluster and refresh component ids.
    pub fn recalculate(
        &mut self,
        storage: &mut NodeStorage,
        graphs: &GraphRegistry,
    ) -> RecalculateStats {
        let mut stats = RecalculateStats::default();
        if !self.is_dirty() {
            return stats;
        }

        // a. Remove dirty clusters, absorbing small neighbors
        let mut stack = std::mem::take(&mut self.dirty_clusters);
        let mut relink = Vec::new();
        while let Some(h) = stack.pop() {
            if self.nodes[h as usize].alive {
                self.remove_cluster(h, storage, &mut stack, &mut relink);
                stats.removed += 1;
            }
        }

        // b. Build fresh clusters from dirty, walkable, unassigned nodes
        let dirty = std::mem::take(&mut self.dirty_nodes);
        for &node in &dirty {
            if let Some(record) = storage.get_mut(node) {
                record.hierarchy_dirty = false;
            }
        }
        let mut touched = Vec::new();
        for &node in &dirty {
            let eligible = storage.is_live(node)
                && storage
                    .get(node)
                    .is_some_and(|r| r.walkable && r.hierarchical_node == 0);
            if eligible {
                touched.push(self.build_cluster(node, storage, graphs));
            }
        }
        stats.created = touched.len();

        // c. Link new clusters and neighbors of removed ones
        relink.retain(|&h| self.nodes[h as usize].alive);
        stats.relinked = relink.len();
        touched.extend(relink);
        for &h in &touched {
            self.link_cluster(h, storage, graphs);
        }

        // d. Flood-fill components reachable from touched clusters
        stats.components = self.flood_components(&touched);

        debug!(
            "[Hierarchy] recalculated: removed={} created={} relinked={} components={} clusters={}",
            stats.removed,
            stats.created,
            stats.relinked,
            stats.components,
            self.cluster_count()
        );
        stats
    }

    fn remove_cluster(
        &mut self,
        h: u32,
        storage: &mut NodeStorage,
        stack: &mut Vec<u32>,
        relink: &mut Vec<u32>,
    ) {
        let min = self.config.min_children_per_node;
        let mut adjacency = self.nodes[h as usize].adjacency;
        let neighbors = self.slab.get(&adjacency).to_vec();
        for n in neighbors {
            let mut list = self.nodes[n as usize].adjacency;
            self.slab.remove(&mut list, h);
            let neighbor = &mut self.nodes[n as usize];
            neighbor.adjacency = list;
            if neighbor.dirty {
                continue;
            }
            if neighbor.children.len() < min {
                neighbor.dirty = true;
                stack.push(n);
            } else {
                relink.push(n);
            }
        }
        self.slab.free(&mut adjacency);

        let children = std::mem::take(&mut self.nodes[h as usize].children);
        for child in children {
            let Some(record) = storage.get_mut(child) else {
                continue;
            };
            if record.hierarchical_node != h {
                continue;
            }
            record.hierarchical_node = 0;
            if !record.hierarchy_dirty {
                record.hierarchy_dirty = true;
                self.dirty_nodes.push(child);
            }
        }

        let cluster = &mut self.nodes[h as usize];
        cluster.adjacency = SlabList::EMPTY;
        cluster.alive = false;
        cluster.dirty = false;
        cluster.component = 0;
        cluster.version = cluster.version.wrapping_add(1);
        self.free_ids.push(h);
    }

    fn allocate_cluster(&mut self) -> u32 {
        match self.free_ids.pop() {
            Some(h) => h,
            None => {
                self.nodes.push(HierarchicalNode::default());
                (self.nodes.len() - 1) as u32
            }
        }
    }

    fn build_cluster(&mut self, seed: NodeIndex, storage: &mut NodeStorage, graphs: &GraphRegistry) -> u32 {
        let h = self.allocate_cluster();
        let max = self.config.max_children_per_node;

        let (graph, seed_position) = match storage.get_mut(seed) {
            Some(record) => {
                record.hierarchical_node = h;
                (record.graph, record.position)
            }
            None => (0, Default::default()),
        };
        let mut children = vec![seed];
        let mut bounds = IntBounds::from_point(seed_position);
        let mut queue = VecDeque::from([seed]);

        if let Some(graph_ref) = graphs.get(graph) {
            while let Some(current) = queue.pop_front() {
                if children.len() >= max {
                    break;
                }
                self.targets.clear();
                collect_outgoing(graph_ref, current, storage, &mut self.targets);
                for &target in &self.targets {
                    if children.len() >= max {
                        break;
                    }
                    let Some(base) = storage.base_of(target) else {
                        continue;
                    };
                    let Some(record) = storage.get_mut(base) else {
                        continue;
                    };
                    if record.walkable && record.hierarchical_node == 0 && record.graph == graph {
                        record.hierarchical_node = h;
                        bounds.encapsulate(record.position);
                        children.push(base);
                        queue.push_back(base);
                    }
                }
            }
        }

        let cluster = &mut self.nodes[h as usize];
        cluster.children = children;
        cluster.bounds = bounds;
        cluster.adjacency = SlabList::EMPTY;
        cluster.graph = graph;
        cluster.component = 0;
        cluster.version = cluster.version.wrapping_add(1);
        cluster.dirty = false;
        cluster.alive = true;
        h
    }

    fn link_cluster(&mut self, h: u32, storage: &NodeStorage, graphs: &GraphRegistry) {
        let children = std::mem::take(&mut self.nodes[h as usize].children);
        for &child in &children {
            let Some(graph) = storage.get(child).and_then(|r| graphs.get(r.graph)) else {
                continue;
            };
            self.targets.clear();
            collect_outgoing(graph, child, storage, &mut self.targets);
            let targets = &mut self.targets;
            graph.for_each_incoming(child, storage, &mut |source| targets.push(source));

            for i in 0..self.targets.len() {
                let other = storage
                    .get(self.targets[i])
                    .filter(|r| r.walkable)
                    .map_or(0, |r| r.hierarchical_node);
                if other != 0 && other != h {
                    self.add_link(h, other);
                }
            }
        }
        self.nodes[h as usize].children = children;
    }

    fn add_link(&mut self, a: u32, b: u32) {
        if self.slab.contains(&self.nodes[a as usize].adjacency, b) {
            return;
        }
        let mut list = self.nodes[a as usize].adjacency;
        self.slab.push(&mut list, b);
        self.nodes[a as usize].adjacency = list;

        let mut list = self.nodes[b as usize].adjacency;
        self.slab.push(&mut list, a);
        self.nodes[b as usize].adjacency = list;
    }

    fn flood_components(&mut self, seeds: &[u32]) -> usize {
        self.visit_epoch = self.visit_epoch.wrapping_add(1);
        let epoch = self.visit_epoch;
        let mut components = 0;
        let mut stack = Vec::new();

        for &seed in seeds {
            let cluster = &self.nodes[seed as usize];
            if !cluster.alive || cluster.visit == epoch {
                continue;
            }
            let component = self.next_component;
            self.next_component = self.next_component.wrapping_add(1).max(1);
            components += 1;

            self.nodes[seed as usize].visit = epoch;
            stack.push(seed);
            while let Some(h) = stack.pop() {
                let cluster = &mut self.nodes[h as usize];
                if cluster.component != component {
                    cluster.component = component;
                    cluster.version = cluster.version.wrapping_add(1);
                }
                let adjacency = cluster.adjacency;
                for &n in self.slab.get(&adjacency) {
                    let neighbor = &mut self.nodes[n as usize];
                    if neighbor.visit != epoch {
                        neighbor.visit = epoch;
                        stack.push(n);
                    }
                }
            }
        }
        components
    }

    /// Connected-component id of a cluster (0 for none)
    #[inline]
    pub fn connected_component(&self, h: u32) -> u32 {
        self.nodes
            .get(h as usize)
            .filter(|c| c.alive)
            .map_or(0, |c| c.component)
    }

    /// Cluster containing a node (0 if unassigned)
    #[inline]
    pub fn hierarchical_node_of(&self, storage: &NodeStorage, node: NodeIndex) -> u32 {
        storage.get(node).map_or(0, |r| r.hierarchical_node)
    }

    /// Component id of a node (0 if unassigned)
    pub fn component_of(&self, storage: &NodeStorage, node: NodeIndex) -> u32 {
        self.connected_component(self.hierarchical_node_of(storage, node))
    }

    /// True if `a` and `b` are mutually reachable, ignoring edge direction
    pub fn is_reachable(&self, storage: &NodeStorage, a: NodeIndex, b: NodeIndex) -> bool {
        let ca = self.component_of(storage, a);
        ca != 0 && ca == self.component_of(storage, b)
    }

    /// Number of live clusters
    pub fn cluster_count(&self) -> usize {
        self.nodes.iter().filter(|c| c.alive).count()
    }

    /// Members of a cluster
    pub fn children(&self, h: u32) -> &[NodeIndex] {
        self.nodes
            .get(h as usize)
            .map(|c| c.children.as_slice())
            .unwrap_or(&[])
    }

    /// Adjacent clusters
    pub fn neighbors(&self, h: u32) -> &[u32] {
        match self.nodes.get(h as usize) {
            Some(c) if c.alive => self.slab.get(&c.adjacency),
            _ => &[],
        }
    }

    /// Bounding box of a cluster's member positions
    pub fn bounds(&self, h: u32) -> Option<IntBounds> {
        self.nodes.get(h as usize).filter(|c| c.alive).map(|c| c.bounds)
    }

    /// Graph a cluster belongs to
    pub fn graph_of(&self, h: u32) -> Option<GraphIndex> {
        self.nodes.get(h as usize).filter(|c| c.alive).map(|c| c.graph)
    }

    /// Bumped whenever a cluster is rebuilt or changes component
    pub fn version(&self, h: u32) -> u32 {
        self.nodes.get(h as usize).map_or(0, |c| c.version)
    }

    /// Ids of live clusters
    pub fn cluster_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.alive)
            .map(|(i, _)| i as u32)
    }
}

fn collect_outgoing(
    graph: &dyn NavGraph,
    node: NodeIndex,
    storage: &NodeStorage,
    out: &mut Vec<NodeIndex>,
) {
    let variants = storage.get(node).map_or(1, |r| r.variants);
    for variant in 0..variants {
        graph.for_each_connection(node, variant, storage, &mut |c| out.push(c.target));
    }
}
