//! # Marga
//!
//! Hierarchical, multi-threaded A* pathfinding core for navigation graphs.
//!
//! ## Overview
//!
//! - **Node arena**: every node of every graph lives in one index-addressed
//!   [`NodeStorage`] with recyclable indices
//! - **Hierarchical connectivity**: [`HierarchicalGraph`] clusters nodes and
//!   keeps connected components current under edits, so unreachable
//!   requests fail before any search
//! - **A\* with temporary endpoints**: searches start and end at the literal
//!   query points, not at snapped node centers
//! - **Worker pool**: a [`PathProcessor`] runs searches on OS threads or on
//!   one cooperative worker driven by `tick`, with pausable intake
//! - **Pooled paths**: [`Path`] objects are recycled through a two-class
//!   claim ledger
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marga::{GridGraph, Int3, MargaConfig, PathRequest, Pathfinder};
//!
//! let mut finder = Pathfinder::new(&MargaConfig::default());
//! finder.update_graphs(|data| {
//!     data.add_graph(|ctx| GridGraph::new(ctx, 10, 10, 1000, Int3::ZERO))
//! })?;
//!
//! let path = finder.find_path(PathRequest::new(Int3::ZERO, Int3::new(9000, 9000, 0)))?;
//! println!("cost {} via {} nodes", path.cost()?, path.nodes()?.len());
//! ```
//!
//! ## Coordinate Frame
//!
//! Positions are fixed-point [`Int3`] with [`PRECISION`] units per meter.
//! Following ROS REP-103, the ground plane is X/Y with Z up.
//!
//! ## Data Flow
//!
//! ```text
//!   PathRequest ──► PathPool::take ──► Path
//!                                       │ submit
//!                                       ▼
//!                              ┌─────────────────┐
//!                              │  PathProcessor  │  pause() / PauseGuard
//!                              │  (work queue)   │
//!                              └────────┬────────┘
//!                                       │
//!                ┌──────────────────────┼──────────────────────┐
//!                ▼                      ▼                      ▼
//!        ┌──────────────┐       ┌──────────────┐       ┌──────────────┐
//!        │ PathHandler  │       │ PathHandler  │  ...  │ PathHandler  │
//!        │  (scratch)   │       │  (scratch)   │       │  (scratch)   │
//!        └──────┬───────┘       └──────┬───────┘       └──────┬───────┘
//!               │     read lock        │                      │
//!               └──────────┬───────────┴──────────────────────┘
//!                          ▼
//!        ┌───────────────────────────────────────┐
//!        │ NavData: NodeStorage + graphs +       │
//!        │          HierarchicalGraph            │
//!        └───────────────────────────────────────┘
//!                          │ results
//!                          ▼
//!                  PathReturnQueue ──► callback on owner thread
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod path;
pub mod pathfinder;
pub mod processor;
pub mod search;
pub mod storage;

pub use config::{ConfigLoadError, MargaConfig};
pub use core::{GridCoord, Int3, IntBounds, PRECISION};
pub use data::NavData;
pub use error::{Error, PathError, Result, StorageError, UsageError};
pub use graph::{
    Connection, GraphIndex, GraphRegistry, GridConnectivity, GridGraph, NavGraph, NearestNode,
    NodeContext, PointGraph,
};
pub use hierarchy::{HierarchicalGraph, HierarchyConfig, RecalculateStats};
pub use path::{
    CompletionState, OwnerId, Path, PathCallback, PathPool, PathRequest, PathResult,
    PipelineState,
};
pub use pathfinder::Pathfinder;
pub use processor::{PathProcessor, PathReturnQueue, PauseGuard, ProcessorConfig, ProcessorStats};
pub use search::{
    DefaultTraversal, EndpointSnapping, Heuristic, PathHandler, SearchConfig, SearchRequest,
    SearchResult, TraversalConstraint, TraversalProvider,
};
pub use storage::{NodeIndex, NodeRecord, NodeStorage};
