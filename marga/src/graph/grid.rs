//! Regular cell grid graph.

use log::debug;

use crate::core::{GridCoord, Int3};
use crate::error::StorageError;
use crate::storage::{NodeIndex, NodeStorage};

use super::{Connection, GraphIndex, NavGraph, NearestNode, NodeContext, NodeFilter};

/// Neighbor connectivity of a grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GridConnectivity {
    /// Cardinal neighbors only
    Four,
    /// Cardinal and diagonal neighbors
    #[default]
    Eight,
}

/// Width x depth grid of square cells in the X/Y plane.
///
/// Cell (x, y) is centered at `origin + (x, y) * node_size`. Straight moves
/// cost `node_size`; diagonal moves cost `node_size * sqrt(2)` rounded.
#[derive(Debug)]
pub struct GridGraph {
    index: GraphIndex,
    width: i32,
    depth: i32,
    node_size: i32,
    origin: Int3,
    connectivity: GridConnectivity,
    cut_corners: bool,
    nodes: Vec<NodeIndex>,
}

impl GridGraph {
    /// Create a grid and allocate all of its nodes (walkable)
    pub fn new(
        ctx: &mut NodeContext<'_>,
        width: i32,
        depth: i32,
        node_size: i32,
        origin: Int3,
    ) -> Result<Self, StorageError> {
        let width = width.max(1);
        let depth = depth.max(1);
        let mut nodes = Vec::with_capacity((width * depth) as usize);
        for y in 0..depth {
            for x in 0..width {
                let position = origin + Int3::new(x * node_size, y * node_size, 0);
                nodes.push(ctx.create_node(position, 1)?);
            }
        }
        debug!(
            "[GridGraph] graph {} created {}x{} cells ({} units)",
            ctx.graph(),
            width,
            depth,
            node_size
        );
        Ok(Self {
            index: ctx.graph(),
            width,
            depth,
            node_size: node_size.max(1),
            origin,
            connectivity: GridConnectivity::default(),
            cut_corners: false,
            nodes,
        })
    }

    /// Set neighbor connectivity
    pub fn with_connectivity(mut self, connectivity: GridConnectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Allow diagonal moves past a blocked cardinal neighbor
    pub fn with_corner_cutting(mut self, cut_corners: bool) -> Self {
        self.cut_corners = cut_corners;
        self
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn node_size(&self) -> i32 {
        self.node_size
    }

    /// Cost of a diagonal step, rounded up so it never undercuts the
    /// straight-line distance
    pub fn diagonal_cost(&self) -> u32 {
        (self.node_size as f64 * std::f64::consts::SQRT_2).ceil() as u32
    }

    /// Check whether a coordinate is inside the grid
    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.depth
    }

    /// Node at a cell
    #[inline]
    pub fn node_at(&self, coord: GridCoord) -> Option<NodeIndex> {
        if !self.contains(coord) {
            return None;
        }
        self.nodes
            .get((coord.y * self.width + coord.x) as usize)
            .copied()
    }

    /// Cell containing a world position (clamped to the grid)
    pub fn coord_of(&self, position: Int3) -> GridCoord {
        let half = self.node_size / 2;
        let rel = position - self.origin;
        let x = (rel.x + half).div_euclid(self.node_size);
        let y = (rel.y + half).div_euclid(self.node_size);
        GridCoord::new(x.clamp(0, self.width - 1), y.clamp(0, self.depth - 1))
    }

    /// Center of a cell
    pub fn cell_center(&self, coord: GridCoord) -> Int3 {
        self.origin + Int3::new(coord.x * self.node_size, coord.y * self.node_size, 0)
    }

    /// Change walkability of a cell.
    ///
    /// Diagonal edges depend on their cardinal neighbors, so the whole
    /// 3x3 block is marked dirty.
    pub fn set_walkable(&self, ctx: &mut NodeContext<'_>, coord: GridCoord, walkable: bool) -> bool {
        let Some(node) = self.node_at(coord) else {
            return false;
        };
        if !ctx.set_walkable(node, walkable) {
            return false;
        }
        for neighbor in coord.neighbors_8() {
            if let Some(n) = self.node_at(neighbor) {
                ctx.mark_dirty(n);
            }
        }
        true
    }

    /// Set the tag of a cell
    pub fn set_tag(&self, ctx: &mut NodeContext<'_>, coord: GridCoord, tag: u8) {
        if let Some(node) = self.node_at(coord) {
            ctx.set_tag(node, tag);
        }
    }

    /// Set the entry penalty of a cell
    pub fn set_penalty(&self, ctx: &mut NodeContext<'_>, coord: GridCoord, penalty: u32) {
        if let Some(node) = self.node_at(coord) {
            ctx.set_penalty(node, penalty);
        }
    }

    fn is_walkable(&self, coord: GridCoord, storage: &NodeStorage) -> bool {
        self.node_at(coord)
            .and_then(|n| storage.get(n))
            .is_some_and(|r| r.walkable)
    }
}

impl NavGraph for GridGraph {
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
        storage: &NodeStorage,
        f: &mut dyn FnMut(Connection),
    ) {
        let Some(record) = storage.get(node) else {
            return;
        };
        let coord = self.coord_of(record.position);
        let straight = self.node_size as u32;
        let diagonal = self.diagonal_cost();

        let neighbors = coord.neighbors_8();
        let count = match self.connectivity {
            GridConnectivity::Four => 4,
            GridConnectivity::Eight => 8,
        };
        for &neighbor in &neighbors[..count] {
            if !self.is_walkable(neighbor, storage) {
                continue;
            }
            let is_diagonal = coord.is_diagonal_to(&neighbor);
            if is_diagonal && !self.cut_corners {
                let side_a = GridCoord::new(neighbor.x, coord.y);
                let side_b = GridCoord::new(coord.x, neighbor.y);
                if !self.is_walkable(side_a, storage) || !self.is_walkable(side_b, storage) {
                    continue;
                }
            }
            if let Some(target) = self.node_at(neighbor) {
                let cost = if is_diagonal { diagonal } else { straight };
                f(Connection::new(target, cost));
            }
        }
    }

    fn closest_point_on_node(&self, node: NodeIndex, point: Int3, storage: &NodeStorage) -> Int3 {
        let Some(record) = storage.get(node) else {
            return point;
        };
        let half = self.node_size / 2;
        let c = record.position;
        Int3::new(
            point.x.clamp(c.x - half, c.x + half),
            point.y.clamp(c.y - half, c.y + half),
            c.z,
        )
    }

    /// Ring search outward from the cell under `point`.
    fn nearest_node(
        &self,
        point: Int3,
        storage: &NodeStorage,
        filter: NodeFilter<'_>,
        max_sqr_distance: i64,
    ) -> Option<NearestNode> {
        let center = self.coord_of(point);
        let max_ring = self.width.max(self.depth);
        let mut best: Option<NearestNode> = None;
        let mut stop_ring = max_ring;

        let mut ring = 0;
        while ring <= stop_ring {
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let coord = GridCoord::new(center.x + dx, center.y + dy);
                    let Some(node) = self.node_at(coord) else {
                        continue;
                    };
                    let Some(record) = storage.get(node) else {
                        continue;
                    };
                    if !filter(node, record) {
                        continue;
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
                }
            }
            // A closer cell can still sit in a ring up to sqrt(2) further out
            if best.is_some() && stop_ring == max_ring {
                stop_ring = ((ring as f32 * std::f32::consts::SQRT_2).ceil() as i32 + 1).min(max_ring);
            }
            ring += 1;
        }
        best
    }
}
