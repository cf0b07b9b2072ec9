//! Shared helpers for marga integration tests.

#![allow(dead_code)]

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use marga::{
    GraphIndex, GridCoord, GridGraph, HierarchyConfig, Int3, NavData, NodeIndex, PointGraph,
    StorageError,
};
use rand::Rng;
use rand::rngs::StdRng;

/// Enable log output for a test run.
pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// A fully walkable grid with 1 m cells, hierarchy already built.
pub fn grid_world(width: i32, depth: i32) -> (NavData, GraphIndex) {
    let mut data = NavData::with_config(1024, HierarchyConfig::default());
    let index = data
        .add_graph(|ctx| GridGraph::new(ctx, width, depth, 1000, Int3::ZERO))
        .unwrap();
    data.recalculate_hierarchy();
    (data, index)
}

/// Mark cells unwalkable and rebuild the hierarchy.
pub fn block_cells(data: &mut NavData, index: GraphIndex, cells: &[(i32, i32)]) {
    data.update_graph::<GridGraph, _>(index, |grid, ctx| {
        for &(x, y) in cells {
            grid.set_walkable(ctx, GridCoord::new(x, y), false);
        }
    })
    .unwrap();
    data.recalculate_hierarchy();
}

/// World position of a grid cell center (1 m cells at the origin).
pub fn cell(x: i32, y: i32) -> Int3 {
    Int3::new(x * 1000, y * 1000, 0)
}

/// Waypoints on a jittered lattice, so no two share a position.
pub fn lattice_positions(rng: &mut StdRng, count: usize) -> Vec<Int3> {
    (0..count)
        .map(|i| {
            let x = (i % 25) as i32 * 800 + rng.random_range(0..400);
            let y = (i / 25) as i32 * 800 + rng.random_range(0..400);
            Int3::new(x, y, 0)
        })
        .collect()
}

/// Random point graph: `count` nodes, `edges` random directed edges.
///
/// Edge costs are at least the rounded distance plus one, which keeps the
/// Euclidean heuristic consistent.
pub fn random_point_world(
    rng: &mut StdRng,
    count: usize,
    edges: usize,
    hierarchy: HierarchyConfig,
) -> (NavData, GraphIndex, Vec<NodeIndex>) {
    let positions = lattice_positions(rng, count);
    let mut data = NavData::with_config(count, hierarchy);
    let mut nodes = Vec::new();
    let index = data
        .add_graph(|ctx| {
            let mut graph = PointGraph::new(ctx.graph());
            for &p in &positions {
                nodes.push(graph.add_node(ctx, p)?);
            }
            for _ in 0..edges {
                let a = nodes[rng.random_range(0..count)];
                let b = nodes[rng.random_range(0..count)];
                let base = ctx.node(a).unwrap().position.cost_to(&ctx.node(b).unwrap().position);
                let extra = rng.random_range(0..500);
                if rng.random_bool(0.7) {
                    graph.connect_both(ctx, a, b, Some(base + 1 + extra));
                } else {
                    graph.connect(ctx, a, b, Some(base + 1 + extra));
                }
            }
            Ok::<_, StorageError>(graph)
        })
        .unwrap();
    data.recalculate_hierarchy();
    (data, index, nodes)
}

/// Component label per walkable node, by flood fill over undirected edges.
pub fn flood_fill_components(data: &NavData, graph: &PointGraph) -> HashMap<NodeIndex, usize> {
    let walkable: HashSet<NodeIndex> = graph
        .nodes()
        .iter()
        .copied()
        .filter(|&n| data.node(n).is_some_and(|r| r.walkable))
        .collect();

    let mut adjacency: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    for &a in &walkable {
        for &(b, _) in graph.edges(a) {
            if walkable.contains(&b) {
                adjacency.entry(a).or_default().push(b);
                adjacency.entry(b).or_default().push(a);
            }
        }
    }

    let mut labels = HashMap::new();
    let mut next = 0;
    for &seed in &walkable {
        if labels.contains_key(&seed) {
            continue;
        }
        let mut stack = vec![seed];
        labels.insert(seed, next);
        while let Some(n) = stack.pop() {
            for &m in adjacency.get(&n).map(Vec::as_slice).unwrap_or(&[]) {
                if !labels.contains_key(&m) {
                    labels.insert(m, next);
                    stack.push(m);
                }
            }
        }
        next += 1;
    }
    labels
}

/// Reference shortest path cost over directed, walkable edges.
pub fn dijkstra(data: &NavData, graph: &PointGraph, start: NodeIndex, goal: NodeIndex) -> Option<u32> {
    let walkable = |n: NodeIndex| data.node(n).is_some_and(|r| r.walkable);
    let mut best: HashMap<NodeIndex, u32> = HashMap::new();
    let mut heap = BinaryHeap::new();
    best.insert(start, 0);
    heap.push(Reverse((0u32, start)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == goal {
            return Some(cost);
        }
        if best.get(&node).is_some_and(|&c| cost > c) {
            continue;
        }
        for &(next, edge) in graph.edges(node) {
            if !walkable(next) {
                continue;
            }
            let candidate = cost + edge;
            if best.get(&next).is_none_or(|&c| candidate < c) {
                best.insert(next, candidate);
                heap.push(Reverse((candidate, next)));
            }
        }
    }
    None
}

/// Euclidean length of a polyline in integer units.
pub fn polyline_length(points: &[Int3]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}
