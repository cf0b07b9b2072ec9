//! High-level facade owning the shared data, the processor and the pool.

use std::sync::Arc;

use log::debug;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::config::MargaConfig;
use crate::data::NavData;
use crate::error::UsageError;
use crate::path::{Path, PathPool, PathRequest};
use crate::processor::{PathProcessor, PauseGuard, ProcessorStats};

/// Pathfinding front end.
///
/// ```rust,ignore
/// let mut finder = Pathfinder::new(&MargaConfig::default());
/// finder.update_graphs(|data| {
///     data.add_graph(|ctx| GridGraph::new(ctx, 20, 20, 1000, Int3::ZERO))
/// })?;
/// let path = finder.new_path(PathRequest::new(start, end));
/// finder.submit(&path)?;
/// finder.block_until_calculated(&path)?;
/// ```
pub struct Pathfinder {
    data: Arc<RwLock<NavData>>,
    processor: PathProcessor,
    pool: PathPool,
    auto_recalculate: bool,
}

impl Pathfinder {
    /// Empty world with the given configuration
    pub fn new(config: &MargaConfig) -> Self {
        Self::with_data(NavData::new(config), config)
    }

    /// Wrap prebuilt navigation data
    pub fn with_data(data: NavData, config: &MargaConfig) -> Self {
        let data = Arc::new(RwLock::new(data));
        let processor = PathProcessor::new(
            &data,
            config.to_search_config(),
            config.to_processor_config(),
        );
        Self {
            data,
            processor,
            pool: PathPool::new(),
            auto_recalculate: config.processor.auto_recalculate_hierarchy,
        }
    }

    /// Read access to the navigation data
    pub fn data(&self) -> RwLockReadGuard<'_, NavData> {
        self.data.read()
    }

    /// Mutate graphs while every worker is idle.
    ///
    /// The hierarchy is recalculated afterwards unless
    /// `auto_recalculate_hierarchy` is off.
    pub fn update_graphs<R>(&mut self, f: impl FnOnce(&mut NavData) -> R) -> R {
        let _pause = self.processor.pause(true);
        let mut data = self.data.write();
        let result = f(&mut data);
        if self.auto_recalculate {
            let stats = data.recalculate_hierarchy();
            debug!(
                "[Pathfinder] hierarchy updated: {} removed, {} created, {} components",
                stats.removed, stats.created, stats.components
            );
        }
        result
    }

    /// Take a path from the pool
    pub fn new_path(&self, request: PathRequest) -> Path {
        self.pool.take(request)
    }

    pub fn submit(&self, path: &Path) -> Result<(), UsageError> {
        self.processor.submit(path)
    }

    pub fn block_until_calculated(&mut self, path: &Path) -> Result<(), UsageError> {
        self.processor.block_until_calculated(path)
    }

    /// Take, submit and wait for a path in one call
    pub fn find_path(&mut self, request: PathRequest) -> Result<Path, UsageError> {
        let path = self.new_path(request);
        self.submit(&path)?;
        self.block_until_calculated(&path)?;
        Ok(path)
    }

    /// Drive cooperative work and return finished paths
    pub fn tick(&mut self) -> usize {
        self.processor.tick()
    }

    /// Pause the processor; see [`PathProcessor::pause`]
    pub fn pause(&mut self, block: bool) -> PauseGuard {
        self.processor.pause(block)
    }

    pub fn stats(&self) -> ProcessorStats {
        self.processor.stats()
    }

    pub fn pool(&self) -> &PathPool {
        &self.pool
    }

    pub fn processor(&self) -> &PathProcessor {
        &self.processor
    }

    /// Fail outstanding paths and stop workers
    pub fn shutdown(&mut self) {
        self.processor.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GridCoord, Int3};
    use crate::error::PathError;
    use crate::graph::GridGraph;
    use crate::path::CompletionState;

    fn finder_with_grid(size: i32) -> (Pathfinder, u32) {
        let mut finder = Pathfinder::new(&MargaConfig::default());
        let index = finder
            .update_graphs(|data| {
                data.add_graph(|ctx| GridGraph::new(ctx, size, size, 1000, Int3::ZERO))
            })
            .unwrap();
        (finder, index)
    }

    #[test]
    fn test_find_path_on_grid() {
        let (mut finder, _) = finder_with_grid(5);
        let path = finder
            .find_path(PathRequest::new(Int3::ZERO, Int3::new(4000, 0, 0)))
            .unwrap();
        assert_eq!(path.completion_state().unwrap(), CompletionState::Complete);
        assert_eq!(path.cost().unwrap(), 4000);
    }

    #[test]
    fn test_update_graphs_recalculates_hierarchy() {
        let (mut finder, index) = finder_with_grid(5);
        finder
            .update_graphs(|data| {
                data.update_graph::<GridGraph, _>(index, |grid, ctx| {
                    for y in 0..5 {
                        grid.set_walkable(ctx, GridCoord::new(2, y), false);
                    }
                })
            })
            .unwrap();

        let path = finder
            .find_path(PathRequest::new(Int3::ZERO, Int3::new(4000, 0, 0)))
            .unwrap();
        assert_eq!(path.error().unwrap(), Some(PathError::Unreachable));
    }

    #[test]
    fn test_shutdown_rejects_new_paths() {
        let (mut finder, _) = finder_with_grid(3);
        finder.shutdown();
        let path = finder.new_path(PathRequest::new(Int3::ZERO, Int3::ZERO));
        assert_eq!(finder.submit(&path), Err(UsageError::ProcessorShutDown));
        assert_eq!(finder.stats().live_workers, 0);
    }
}
