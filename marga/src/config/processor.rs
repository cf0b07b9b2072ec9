//! Path processor configuration section.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::processor::ProcessorConfig;

/// Worker pool settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorSection {
    /// Worker threads (0 = single cooperative worker driven by `tick`)
    #[serde(default)]
    pub worker_threads: usize,

    /// Cooperative search budget per tick (milliseconds)
    #[serde(default = "defaults::max_frame_time_ms")]
    pub max_frame_time_ms: f32,

    /// Threaded workers release the graph read lock this often (milliseconds)
    #[serde(default = "defaults::thread_time_slice_ms")]
    pub thread_time_slice_ms: f32,

    /// Recalculate the hierarchy after every graph update
    #[serde(default = "defaults::enabled")]
    pub auto_recalculate_hierarchy: bool,
}

impl Default for ProcessorSection {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_frame_time_ms: defaults::max_frame_time_ms(),
            thread_time_slice_ms: defaults::thread_time_slice_ms(),
            auto_recalculate_hierarchy: true,
        }
    }
}

impl ProcessorSection {
    /// Convert to runtime config
    pub fn to_processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            worker_threads: self.worker_threads,
            max_frame_time: ms_to_duration(self.max_frame_time_ms),
            thread_time_slice: ms_to_duration(self.thread_time_slice_ms),
        }
    }
}

fn ms_to_duration(ms: f32) -> std::time::Duration {
    std::time::Duration::from_secs_f32(ms.max(0.0) / 1000.0)
}
