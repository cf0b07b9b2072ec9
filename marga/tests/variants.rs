//! Nodes with several variants: a two-lane road where lane 1 opens halfway.

mod common;

use marga::{
    Connection, GraphIndex, HierarchyConfig, Int3, NavData, NavGraph, NodeIndex, NodeStorage,
    SearchConfig, SearchRequest, StorageError,
};

const LANE_OFFSET: i32 = 500;
const LANE_CHANGE_COST: u32 = 200;
/// First node where lane 1 is connected
const LANE_OPENS_AT: usize = 2;

struct LaneGraph {
    index: GraphIndex,
    nodes: Vec<NodeIndex>,
    lanes: u8,
}

impl LaneGraph {
    fn build(data: &mut NavData, length: usize, lanes: u8) -> Result<GraphIndex, marga::Error> {
        data.add_graph(|ctx| {
            let mut nodes = Vec::with_capacity(length);
            for i in 0..length {
                nodes.push(ctx.create_node(Int3::new(i as i32 * 1000, 0, 0), lanes)?);
            }
            Ok::<_, StorageError>(LaneGraph {
                index: ctx.graph(),
                nodes,
                lanes,
            })
        })
    }

    fn slot(&self, node: NodeIndex) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    fn lane_open(&self, lane: u8, slot: usize) -> bool {
        lane == 0 || slot >= LANE_OPENS_AT
    }
}

impl NavGraph for LaneGraph {
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
        variant: u8,
        _storage: &NodeStorage,
        f: &mut dyn FnMut(Connection),
    ) {
        let Some(slot) = self.slot(node) else {
            return;
        };
        let mut along = |other: usize| {
            if self.lane_open(variant, slot) && self.lane_open(variant, other) {
                f(Connection {
                    target: self.nodes[other],
                    target_variant: variant,
                    fraction: marga::search::FRACTION_CENTER,
                    cost: 1000,
                });
            }
        };
        if slot > 0 {
            along(slot - 1);
        }
        if slot + 1 < self.nodes.len() {
            along(slot + 1);
        }

        if slot == LANE_OPENS_AT {
            for other in 0..self.lanes {
                if other != variant {
                    f(Connection {
                        target: node,
                        target_variant: other,
                        fraction: marga::search::FRACTION_CENTER,
                        cost: LANE_CHANGE_COST,
                    });
                }
            }
        }
        // Out-of-range variants are dropped by the search
        if slot == 0 {
            f(Connection {
                target: self.nodes[1],
                target_variant: self.lanes,
                fraction: marga::search::FRACTION_CENTER,
                cost: 1,
            });
        }
    }

    fn variant_position(
        &self,
        node: NodeIndex,
        variant: u8,
        _fraction: u8,
        storage: &NodeStorage,
    ) -> Int3 {
        let base = storage.get(node).map_or(Int3::ZERO, |r| r.position);
        base + Int3::new(0, variant as i32 * LANE_OFFSET, 0)
    }
}

fn road(length: usize, lanes: u8) -> (NavData, GraphIndex) {
    common::init_logging();
    let mut data = NavData::with_config(64, HierarchyConfig::default());
    let index = LaneGraph::build(&mut data, length, lanes).unwrap();
    data.recalculate_hierarchy();
    (data, index)
}

// ============================================================================
// Search over variants
// ============================================================================

#[test]
fn test_lane_change_collapses_to_one_node() {
    let (mut data, index) = road(5, 2);
    let config = SearchConfig::default();
    let mut handler = data.new_handler(0, config.clone());

    let result = handler
        .search(
            &data,
            &SearchRequest::new(Int3::ZERO, Int3::new(4000, 500, 0), &config),
        )
        .unwrap();

    let graph = data.graph::<LaneGraph>(index).unwrap();
    assert_eq!(result.nodes, graph.nodes);
    assert_eq!(result.cost, 4000 + LANE_CHANGE_COST);
    assert_eq!(
        result.vector_path,
        vec![
            Int3::new(0, 0, 0),
            Int3::new(1000, 0, 0),
            Int3::new(2000, 0, 0),
            Int3::new(3000, 500, 0),
            Int3::new(4000, 500, 0),
        ]
    );
}

#[test]
fn test_closed_lane_is_left_by_synthesized_end_edge() {
    let (mut data, _) = road(5, 2);
    let config = SearchConfig::default();
    let mut handler = data.new_handler(0, config.clone());

    let result = handler
        .search(
            &data,
            &SearchRequest::new(Int3::ZERO, Int3::new(1000, 500, 0), &config),
        )
        .unwrap();

    assert_eq!(result.nodes.len(), 2);
    assert_eq!(result.cost, 1000 + 500);
    assert_eq!(
        result.vector_path,
        vec![Int3::ZERO, Int3::new(1000, 0, 0), Int3::new(1000, 500, 0)]
    );
}

#[test]
fn test_start_enters_every_variant() {
    let (mut data, index) = road(5, 3);
    let config = SearchConfig::default();
    let mut handler = data.new_handler(0, config.clone());

    // From lane 2 at the lane-change node straight down lane 2
    let result = handler
        .search(
            &data,
            &SearchRequest::new(Int3::new(2000, 1000, 0), Int3::new(4000, 1000, 0), &config),
        )
        .unwrap();

    let graph = data.graph::<LaneGraph>(index).unwrap();
    assert_eq!(result.nodes, graph.nodes[2..].to_vec());
    assert_eq!(result.cost, 2000);
    assert_eq!(result.vector_path.last(), Some(&Int3::new(4000, 1000, 0)));
}

// ============================================================================
// Arena and hierarchy
// ============================================================================

#[test]
fn test_variant_indices_are_contiguous() {
    let (data, index) = road(4, 3);
    let graph = data.graph::<LaneGraph>(index).unwrap();
    let storage = data.storage();

    for &node in &graph.nodes {
        assert_eq!(storage.get(node).unwrap().variants, 3);
        for v in 0..3 {
            assert_eq!(storage.base_of(node + v), Some(node));
        }
        assert_eq!(
            data.path_node_position(node + 2, marga::search::FRACTION_CENTER),
            Some(storage.get(node).unwrap().position + Int3::new(0, 1000, 0))
        );
    }
    for pair in graph.nodes.windows(2) {
        assert!(pair[1] >= pair[0] + 3);
    }
}

#[test]
fn test_invalid_variant_count_rejected() {
    let mut data = NavData::default();
    assert!(LaneGraph::build(&mut data, 3, 4).is_err());
    assert!(LaneGraph::build(&mut data, 3, 0).is_err());
    assert!(data.graphs().is_empty());
}

#[test]
fn test_lane_road_is_one_component() {
    let (data, index) = road(6, 2);
    let graph = data.graph::<LaneGraph>(index).unwrap();
    for &node in &graph.nodes {
        assert!(data.is_reachable(graph.nodes[0], node));
    }
}
