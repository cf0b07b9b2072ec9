//! End-to-end scenarios through the `Pathfinder` front end.

mod common;

use std::io::Write;

use approx::assert_relative_eq;
use marga::{
    CompletionState, EndpointSnapping, GridCoord, GridGraph, Int3, MargaConfig, NodeIndex,
    PathError, PathRequest, Pathfinder, PointGraph, StorageError,
};

// ============================================================================
// Grids
// ============================================================================

#[test]
fn test_open_grid_diagonal() {
    common::init_logging();
    let (data, index) = common::grid_world(10, 10);
    let mut finder = Pathfinder::with_data(data, &MargaConfig::default());

    let path = finder
        .find_path(PathRequest::new(common::cell(0, 0), common::cell(9, 9)))
        .unwrap();

    assert_eq!(path.completion_state().unwrap(), CompletionState::Complete);
    assert_eq!(path.cost().unwrap(), 9 * 1415);

    let data = finder.data();
    let grid = data.graph::<GridGraph>(index).unwrap();
    let expected: Vec<NodeIndex> = (0..10)
        .map(|i| grid.node_at(GridCoord::new(i, i)).unwrap())
        .collect();
    assert_eq!(path.nodes().unwrap(), expected);

    // F = G + floor(euclidean H) along the returned path never decreases
    // and never exceeds the path cost
    let goal = common::cell(9, 9);
    let f: Vec<u32> = expected
        .iter()
        .enumerate()
        .map(|(i, &node)| {
            let h = data.node(node).unwrap().position.distance(&goal).floor() as u32;
            i as u32 * 1415 + h
        })
        .collect();
    assert!(f.windows(2).all(|w| w[1] >= w[0]), "{:?}", f);
    assert_eq!(f.last(), Some(&(9 * 1415)));

    let vector = path.vector_path().unwrap();
    assert_eq!(vector.first(), Some(&common::cell(0, 0)));
    assert_eq!(vector.last(), Some(&common::cell(9, 9)));
    assert_relative_eq!(
        common::polyline_length(&vector),
        9000.0 * std::f64::consts::SQRT_2,
        epsilon = 1.0
    );
}

#[test]
fn test_node_center_snapping_starts_on_node() {
    let (data, _) = common::grid_world(5, 5);
    let mut finder = Pathfinder::with_data(data, &MargaConfig::default());

    let original = finder
        .find_path(PathRequest::new(Int3::new(200, 100, 0), common::cell(4, 0)))
        .unwrap();
    let snapped = finder
        .find_path(
            PathRequest::new(Int3::new(200, 100, 0), common::cell(4, 0))
                .endpoint_snapping(EndpointSnapping::NodeCenter),
        )
        .unwrap();

    assert_eq!(original.vector_path().unwrap()[0], Int3::new(200, 100, 0));
    assert_eq!(snapped.vector_path().unwrap()[0], common::cell(0, 0));
    assert_eq!(snapped.cost().unwrap(), 4000);
    assert!(original.cost().unwrap() > snapped.cost().unwrap());
}

#[test]
fn test_wall_built_and_removed() {
    let mut finder = Pathfinder::new(&MargaConfig::default());
    let index = finder
        .update_graphs(|data| data.add_graph(|ctx| GridGraph::new(ctx, 9, 9, 1000, Int3::ZERO)))
        .unwrap();
    let request = || PathRequest::new(common::cell(0, 4), common::cell(8, 4));

    assert_eq!(finder.find_path(request()).unwrap().cost().unwrap(), 8000);

    let set_wall = |finder: &mut Pathfinder, walkable: bool| {
        finder
            .update_graphs(|data| {
                data.update_graph::<GridGraph, _>(index, |grid, ctx| {
                    for y in 0..9 {
                        grid.set_walkable(ctx, GridCoord::new(4, y), walkable);
                    }
                })
            })
            .unwrap();
    };

    set_wall(&mut finder, false);
    let blocked = finder.find_path(request()).unwrap();
    assert_eq!(blocked.error().unwrap(), Some(PathError::Unreachable));
    assert_eq!(blocked.searched_nodes().unwrap(), 0);

    set_wall(&mut finder, true);
    assert_eq!(finder.find_path(request()).unwrap().cost().unwrap(), 8000);
}

// ============================================================================
// Waypoint graphs
// ============================================================================

/// Two rings of waypoints joined by one bridge edge
fn two_islands(finder: &mut Pathfinder) -> (u32, Vec<NodeIndex>, Vec<NodeIndex>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let index = finder
        .update_graphs(|data| {
            data.add_graph(|ctx| {
                let mut graph = PointGraph::new(ctx.graph());
                for i in 0..12 {
                    let angle = i as f64 * std::f64::consts::TAU / 12.0;
                    let (sin, cos) = angle.sin_cos();
                    let offset = Int3::new((cos * 3000.0) as i32, (sin * 3000.0) as i32, 0);
                    left.push(graph.add_node(ctx, Int3::new(0, 0, 0) + offset)?);
                    right.push(graph.add_node(ctx, Int3::new(20_000, 0, 0) + offset)?);
                }
                for i in 0..12 {
                    let j = (i + 1) % 12;
                    graph.connect_both(ctx, left[i], left[j], None);
                    graph.connect_both(ctx, right[i], right[j], None);
                }
                // Rightmost of the left ring to leftmost of the right ring
                graph.connect_both(ctx, left[0], right[6], None);
                Ok::<_, StorageError>(graph)
            })
        })
        .unwrap();
    (index, left, right)
}

#[test]
fn test_bridge_removal_disconnects_islands() {
    let mut config = MargaConfig::default();
    config.hierarchy.min_children_per_node = 2;
    config.hierarchy.max_children_per_node = 4;
    let mut finder = Pathfinder::new(&config);
    let (index, left, right) = two_islands(&mut finder);

    let position = |finder: &Pathfinder, node: NodeIndex| finder.data().node(node).unwrap().position;
    let from = position(&finder, left[6]);
    let to = position(&finder, right[0]);

    let across = finder.find_path(PathRequest::new(from, to)).unwrap();
    assert_eq!(across.completion_state().unwrap(), CompletionState::Complete);
    let nodes = across.nodes().unwrap();
    assert!(nodes.contains(&left[0]) && nodes.contains(&right[6]));
    assert!(finder.data().hierarchy().cluster_count() > 2);

    finder
        .update_graphs(|data| {
            data.update_graph::<PointGraph, _>(index, |graph, ctx| {
                graph.disconnect_both(ctx, left[0], right[6])
            })
        })
        .unwrap();
    assert!(!finder.data().is_reachable(left[6], right[0]));
    assert!(finder.data().is_reachable(left[6], left[3]));

    let cut = finder.find_path(PathRequest::new(from, to)).unwrap();
    let err = cut.error().unwrap().unwrap();
    assert_eq!(err, PathError::Unreachable);
    assert!(err.is_no_path());

    let partial = finder
        .find_path(PathRequest::new(from, to).calculate_partial(true))
        .unwrap();
    assert!(partial.is_partial().unwrap());
    assert_eq!(partial.nodes().unwrap().last(), Some(&left[0]));
}

#[test]
fn test_deleting_bridge_nodes_splits_components() {
    let mut config = MargaConfig::default();
    config.hierarchy.min_children_per_node = 2;
    config.hierarchy.max_children_per_node = 4;
    let mut finder = Pathfinder::new(&config);
    let (index, left, right) = two_islands(&mut finder);

    let from = finder.data().node(left[6]).unwrap().position;
    let to = finder.data().node(right[0]).unwrap().position;
    {
        let data = finder.data();
        let h = data.hierarchy();
        assert_eq!(
            h.component_of(data.storage(), left[6]),
            h.component_of(data.storage(), right[0])
        );
    }

    finder
        .update_graphs(|data| {
            data.update_graph::<PointGraph, _>(index, |graph, ctx| {
                graph.remove_node(ctx, left[0])?;
                graph.remove_node(ctx, right[6])
            })
        })
        .unwrap()
        .unwrap();

    {
        let data = finder.data();
        let h = data.hierarchy();
        let a = h.component_of(data.storage(), left[6]);
        let b = h.component_of(data.storage(), right[0]);
        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a, b);
        assert_eq!(a, h.component_of(data.storage(), left[1]));
        assert_eq!(b, h.component_of(data.storage(), right[5]));
    }

    let path = finder.find_path(PathRequest::new(from, to)).unwrap();
    assert!(path.error().unwrap().is_some_and(|e| e.is_no_path()));
}

#[test]
fn test_one_way_bridge_reports_no_path() {
    let mut finder = Pathfinder::new(&MargaConfig::default());
    let (index, left, right) = two_islands(&mut finder);
    finder
        .update_graphs(|data| {
            data.update_graph::<PointGraph, _>(index, |graph, ctx| {
                graph.disconnect(ctx, left[0], right[6])
            })
        })
        .unwrap();

    let from = finder.data().node(left[6]).unwrap().position;
    let to = finder.data().node(right[0]).unwrap().position;

    // Components ignore direction, so the search runs and exhausts the left ring
    let path = finder.find_path(PathRequest::new(from, to)).unwrap();
    match path.error().unwrap() {
        Some(PathError::NoPath { searched }) => assert!(searched >= 12),
        other => panic!("expected NoPath, got {:?}", other),
    }

    let back = finder.find_path(PathRequest::new(to, from)).unwrap();
    assert_eq!(back.completion_state().unwrap(), CompletionState::Complete);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_pathfinder_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "search:\n  heuristic: manhattan\n  endpoint_snapping: node_center\nprocessor:\n  worker_threads: 2"
    )
    .unwrap();

    let config = MargaConfig::load(file.path()).unwrap();
    let mut finder = Pathfinder::new(&config);
    assert!(finder.processor().is_threaded());

    finder
        .update_graphs(|data| data.add_graph(|ctx| GridGraph::new(ctx, 4, 4, 1000, Int3::ZERO)))
        .unwrap();
    let path = finder
        .find_path(PathRequest::new(Int3::new(100, 100, 0), common::cell(3, 0)))
        .unwrap();
    assert_eq!(path.vector_path().unwrap()[0], common::cell(0, 0));
    assert_eq!(path.cost().unwrap(), 3000);
    finder.shutdown();
}
