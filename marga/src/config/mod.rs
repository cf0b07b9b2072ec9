//! Unified configuration loading for marga.
//!
//! Loads all configuration from a single YAML file.

mod defaults;
mod error;
mod hierarchy;
mod marga;
mod processor;
mod search;
mod storage;

// Re-export main types
pub use error::ConfigLoadError;
pub use marga::MargaConfig;

// Re-export section types
pub use hierarchy::HierarchySection;
pub use processor::ProcessorSection;
pub use search::SearchSection;
pub use storage::StorageSection;
