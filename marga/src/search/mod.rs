//! A* search core.
//!
//! Each worker owns one [`PathHandler`]: its own [`ScratchBuffer`] view of
//! the node arena, an open list, and a pool of temporary nodes. Nothing in
//! here is shared between workers.
//!
//! ## Search loop
//!
//! ```text
//! prepare ──► nearest start/end ──► reachability check ──► open start temp
//!                                                               │
//!          ┌────────────────────────────────────────────────────┘
//!          ▼
//!   ┌─► pop best ──► end temp? ──yes──► trace ──► Finished
//!   │      │ no
//!   │      ▼
//!   │   expand neighbors (+ synthesized edge to end temp)
//!   │      │
//!   └──────┴── every batch: deadline passed? ──► InProgress
//! ```
//!
//! [`ScratchBuffer`]: crate::storage::ScratchBuffer

mod handler;
mod heap;
mod heuristic;
mod path_node;
mod temporary;
mod traversal;

pub use handler::{PathHandler, SearchRequest, SearchResult, StepOutcome};
pub use heap::{HeapEntry, OpenList};
pub use heuristic::{Heuristic, HeuristicObjective};
pub use path_node::{FRACTION_CENTER, FRACTION_MAX, NOT_IN_HEAP, PathNode};
pub use temporary::{TemporaryKind, TemporaryNode, TemporaryNodes, is_temporary};
pub use traversal::{DefaultTraversal, TraversalConstraint, TraversalProvider};

use serde::{Deserialize, Serialize};

/// Where the temporary start/end nodes are placed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSnapping {
    /// Center of the nearest node
    NodeCenter,
    /// Closest point on the nearest node's surface
    ClosestOnNode,
    /// The literal query point
    #[default]
    Original,
}

/// Search configuration shared by all workers
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Default heuristic
    pub heuristic: Heuristic,
    /// Default heuristic multiplier
    pub heuristic_scale: f32,
    /// Max distance (meters) from a query point to its node
    pub max_nearest_node_distance: f32,
    /// Default endpoint placement
    pub endpoint_snapping: EndpointSnapping,
    /// Longest parent chain accepted by trace-back
    pub max_trace_length: usize,
    /// Expansion cap per search (0 = unlimited)
    pub max_expansions: usize,
    /// Expansions between deadline checks
    pub batch_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            heuristic: Heuristic::Euclidean,
            heuristic_scale: 1.0,
            max_nearest_node_distance: 100.0,
            endpoint_snapping: EndpointSnapping::Original,
            max_trace_length: 16_384,
            max_expansions: 0,
            batch_size: 500,
        }
    }
}

impl SearchConfig {
    /// Set the expansion batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the expansion cap
    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    /// Squared nearest-node radius in integer units
    pub fn max_nearest_sqr_distance(&self) -> i64 {
        let d = (self.max_nearest_node_distance.max(0.0) as f64) * crate::core::PRECISION as f64;
        (d * d).min(i64::MAX as f64) as i64
    }
}
