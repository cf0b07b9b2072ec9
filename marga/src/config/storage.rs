//! Node storage configuration section.

use serde::{Deserialize, Serialize};

use super::defaults;

/// Node arena settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageSection {
    /// Number of node slots reserved up front (rounded up to a power of two)
    #[serde(default = "defaults::initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            initial_capacity: defaults::initial_capacity(),
        }
    }
}
