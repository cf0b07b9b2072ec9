//! Hierarchical graph configuration section.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::hierarchy::HierarchyConfig;

/// Hierarchical graph settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HierarchySection {
    /// Maximum graph nodes per hierarchical node
    #[serde(default = "defaults::max_children_per_node")]
    pub max_children_per_node: usize,

    /// Neighbors smaller than this are absorbed when a cluster is rebuilt
    #[serde(default = "defaults::min_children_per_node")]
    pub min_children_per_node: usize,
}

impl Default for HierarchySection {
    fn default() -> Self {
        Self {
            max_children_per_node: defaults::max_children_per_node(),
            min_children_per_node: defaults::min_children_per_node(),
        }
    }
}

impl HierarchySection {
    /// Convert to runtime config
    pub fn to_hierarchy_config(&self) -> HierarchyConfig {
        HierarchyConfig {
            max_children_per_node: self.max_children_per_node.max(1),
            min_children_per_node: self.min_children_per_node.min(self.max_children_per_node),
        }
    }
}
