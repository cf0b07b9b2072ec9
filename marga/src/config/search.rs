//! Search configuration section.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::search::{EndpointSnapping, Heuristic, SearchConfig};

/// A* search settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchSection {
    /// Default heuristic for requests that do not set one
    #[serde(default)]
    pub heuristic: Heuristic,

    /// Heuristic multiplier (values above 1.0 trade optimality for speed)
    #[serde(default = "defaults::heuristic_scale")]
    pub heuristic_scale: f32,

    /// Maximum distance (meters) from a query point to its nearest node
    #[serde(default = "defaults::max_nearest_node_distance")]
    pub max_nearest_node_distance: f32,

    /// Where the temporary start/end nodes are placed
    #[serde(default)]
    pub endpoint_snapping: EndpointSnapping,

    /// Parent chains longer than this are treated as corrupt
    #[serde(default = "defaults::max_trace_length")]
    pub max_trace_length: usize,

    /// Abort a search after this many expansions (0 = unlimited)
    #[serde(default)]
    pub max_expansions: usize,

    /// Node expansions between deadline checks
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            heuristic: Heuristic::default(),
            heuristic_scale: defaults::heuristic_scale(),
            max_nearest_node_distance: defaults::max_nearest_node_distance(),
            endpoint_snapping: EndpointSnapping::default(),
            max_trace_length: defaults::max_trace_length(),
            max_expansions: 0,
            batch_size: defaults::batch_size(),
        }
    }
}

impl SearchSection {
    /// Convert to runtime config
    pub fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            heuristic: self.heuristic,
            heuristic_scale: self.heuristic_scale,
            max_nearest_node_distance: self.max_nearest_node_distance,
            endpoint_snapping: self.endpoint_snapping,
            max_trace_length: self.max_trace_length,
            max_expansions: self.max_expansions,
            batch_size: self.batch_size.max(1),
        }
    }
}
