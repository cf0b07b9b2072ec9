//! Main MargaConfig and conversion methods.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyConfig;
use crate::processor::ProcessorConfig;
use crate::search::SearchConfig;

use super::error::ConfigLoadError;
use super::hierarchy::HierarchySection;
use super::processor::ProcessorSection;
use super::search::SearchSection;
use super::storage::StorageSection;

/// Full marga configuration loaded from YAML
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct MargaConfig {
    /// Node arena settings
    #[serde(default)]
    pub storage: StorageSection,

    /// Hierarchical graph settings
    #[serde(default)]
    pub hierarchy: HierarchySection,

    /// A* search settings
    #[serde(default)]
    pub search: SearchSection,

    /// Worker pool settings
    #[serde(default)]
    pub processor: ProcessorSection,
}

impl MargaConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Load from default config path (configs/marga.yaml)
    pub fn load_default() -> Result<Self, ConfigLoadError> {
        let path = Path::new("configs/marga.yaml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigLoadError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot honor
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.hierarchy.max_children_per_node == 0 {
            return Err(ConfigLoadError::Invalid(
                "hierarchy.max_children_per_node must be positive".into(),
            ));
        }
        if self.hierarchy.min_children_per_node > self.hierarchy.max_children_per_node {
            return Err(ConfigLoadError::Invalid(
                "hierarchy.min_children_per_node exceeds max_children_per_node".into(),
            ));
        }
        if !(self.search.heuristic_scale >= 0.0) {
            return Err(ConfigLoadError::Invalid(
                "search.heuristic_scale must be non-negative".into(),
            ));
        }
        if self.search.batch_size == 0 {
            return Err(ConfigLoadError::Invalid(
                "search.batch_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Get the hierarchical graph config
    pub fn to_hierarchy_config(&self) -> HierarchyConfig {
        self.hierarchy.to_hierarchy_config()
    }

    /// Get the search config
    pub fn to_search_config(&self) -> SearchConfig {
        self.search.to_search_config()
    }

    /// Get the processor config
    pub fn to_processor_config(&self) -> ProcessorConfig {
        self.processor.to_processor_config()
    }

    /// Use N worker threads (0 = cooperative)
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.processor.worker_threads = threads;
        self
    }
}
