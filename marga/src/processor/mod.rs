//! Path processor: worker pool, work queue and return queue.
//!
//! ## Flow
//!
//! ```text
//! submit ──► BlockableChannel ──► worker (PathHandler) ──► PathReturnQueue
//!                 ▲  pause()            │ time slices             │
//!                 │                     ▼                         ▼
//!            PauseGuard            NavData (read)         owner thread: drain,
//!                                                         callback, Returned
//! ```
//!
//! With `worker_threads == 0` a single cooperative worker runs inside
//! [`PathProcessor::tick`]. Otherwise each worker is an OS thread that
//! releases the graph read lock every `thread_time_slice`.

mod channel;
mod return_queue;
mod worker;

pub use channel::{BlockableChannel, Closed, Receiver, TryRecv};
pub use return_queue::PathReturnQueue;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{info, warn};
use parking_lot::RwLock;

use crate::data::NavData;
use crate::error::{PathError, UsageError};
use crate::path::Path;
use crate::search::SearchConfig;

use worker::{CooperativeExecutor, PathExecutor, ThreadedExecutor, WorkerContext};

/// Worker pool settings
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorConfig {
    /// OS worker threads (0 = one cooperative worker driven by `tick`)
    pub worker_threads: usize,
    /// Search budget per `tick` in cooperative mode
    pub max_frame_time: Duration,
    /// How long a threaded worker searches before re-checking for
    /// cancellation and releasing the read lock
    pub thread_time_slice: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_frame_time: Duration::from_millis(1),
            thread_time_slice: Duration::from_millis(10),
        }
    }
}

impl ProcessorConfig {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_max_frame_time(mut self, budget: Duration) -> Self {
        self.max_frame_time = budget;
        self
    }
}

/// Processor counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Paths returned to their owner
    pub completed: usize,
    /// Workers still running
    pub live_workers: usize,
    /// Paths waiting for a worker
    pub queued: usize,
}

/// Holds the work queue paused until dropped.
#[must_use = "the processor resumes as soon as the guard is dropped"]
pub struct PauseGuard {
    channel: BlockableChannel<Path>,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.channel.unlock();
    }
}

/// Schedules path searches over a pool of workers.
pub struct PathProcessor {
    config: ProcessorConfig,
    channel: BlockableChannel<Path>,
    returns: PathReturnQueue,
    executor: Box<dyn PathExecutor>,
    shutdown: Arc<AtomicBool>,
    shut_down: bool,
}

impl PathProcessor {
    /// Create the processor and its workers.
    ///
    /// Takes the `data` write lock briefly to register worker scratch
    /// buffers; the caller must not hold it.
    pub fn new(data: &Arc<RwLock<NavData>>, search: SearchConfig, config: ProcessorConfig) -> Self {
        let channel = BlockableChannel::new();
        let returns = PathReturnQueue::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let ctx = WorkerContext {
            data: Arc::clone(data),
            returns: returns.sender(),
            search,
            shutdown: Arc::clone(&shutdown),
        };

        let threaded = if config.worker_threads > 0 {
            ThreadedExecutor::spawn(
                config.worker_threads,
                &ctx,
                || channel.receiver(),
                config.thread_time_slice,
            )
        } else {
            None
        };
        let executor: Box<dyn PathExecutor> = match threaded {
            Some(executor) => Box::new(executor),
            None => {
                if config.worker_threads > 0 {
                    warn!("[PathProcessor] no worker thread started, falling back to cooperative");
                }
                Box::new(CooperativeExecutor::new(&ctx, channel.receiver()))
            }
        };

        Self {
            config,
            channel,
            returns,
            executor,
            shutdown,
            shut_down: false,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn is_threaded(&self) -> bool {
        self.executor.is_threaded()
    }

    /// Queue a path for calculation
    pub fn submit(&self, path: &Path) -> Result<(), UsageError> {
        if self.shut_down {
            return Err(UsageError::ProcessorShutDown);
        }
        path.mark_submitted()?;
        if let Err(path) = self.channel.push(path.clone()) {
            path.fail(PathError::HostDestroyed);
            self.returns.push(path);
            return Err(UsageError::ProcessorShutDown);
        }
        Ok(())
    }

    /// Run cooperative work for one frame, then return finished paths.
    ///
    /// Returns the number of paths returned.
    pub fn tick(&mut self) -> usize {
        if !self.shut_down {
            self.executor.tick(self.config.max_frame_time);
        }
        self.returns.drain()
    }

    /// Drive the processor until `path` has been returned.
    ///
    /// Other paths returned meanwhile get their callbacks too.
    pub fn block_until_calculated(&mut self, path: &Path) -> Result<(), UsageError> {
        if path.is_settled() {
            return Ok(());
        }
        if !path.is_submitted()? {
            return Err(UsageError::NotSubmitted);
        }

        loop {
            self.returns.drain();
            if path.is_settled() {
                return Ok(());
            }
            if self.shut_down || self.executor.live_workers() == 0 {
                return Err(UsageError::ProcessorShutDown);
            }
            if self.channel.is_locked() {
                return Err(UsageError::ProcessorPaused);
            }
            if self.executor.is_threaded() {
                self.returns.wait_one(self.config.thread_time_slice);
            } else if !self.executor.tick(self.config.max_frame_time) && self.returns.is_empty() {
                // Nothing queued and nothing in hand: the path is elsewhere
                return Err(UsageError::NotSubmitted);
            }
        }
    }

    /// Stop workers from taking new paths.
    ///
    /// With `block`, also wait until every worker has finished the path in
    /// hand, so graph data can be mutated safely. Pauses nest; the queue
    /// resumes when the last guard is dropped.
    pub fn pause(&mut self, block: bool) -> PauseGuard {
        self.channel.lock();
        if block {
            self.executor.settle();
            self.channel.wait_until_idle();
        }
        PauseGuard {
            channel: self.channel.clone(),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.channel.is_locked()
    }

    /// Paths waiting to be returned to the owner
    pub fn return_queue(&self) -> &PathReturnQueue {
        &self.returns
    }

    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            completed: self.returns.returned(),
            live_workers: if self.shut_down {
                0
            } else {
                self.executor.live_workers()
            },
            queued: self.channel.len(),
        }
    }

    /// Stop all workers.
    ///
    /// Queued and in-flight paths fail with "host destroyed" and are
    /// returned (callbacks run) before this returns.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.shutdown.store(true, Ordering::Release);

        let leftovers = self.channel.close();
        let dropped = leftovers.len();
        for path in leftovers {
            path.fail(PathError::HostDestroyed);
            self.returns.push(path);
        }
        self.executor.shutdown();
        let returned = self.returns.drain();
        info!(
            "[PathProcessor] shut down ({} queued paths failed, {} returned)",
            dropped, returned
        );
    }
}

impl Drop for PathProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Int3;
    use crate::error::PathError;
    use crate::graph::GridGraph;
    use crate::hierarchy::HierarchyConfig;
    use crate::path::{CompletionState, OwnerId, PathPool, PathRequest, PipelineState};
    use std::sync::atomic::AtomicUsize;

    fn shared_grid(size: i32) -> Arc<RwLock<NavData>> {
        let mut data = NavData::with_config(256, HierarchyConfig::default());
        data.add_graph(|ctx| GridGraph::new(ctx, size, size, 1000, Int3::ZERO))
            .unwrap();
        data.recalculate_hierarchy();
        Arc::new(RwLock::new(data))
    }

    fn corner_request(size: i32) -> PathRequest {
        let far = (size - 1) * 1000;
        PathRequest::new(Int3::ZERO, Int3::new(far, far, 0))
    }

    #[test]
    fn test_cooperative_tick_completes_path() {
        let data = shared_grid(8);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let pool = PathPool::new();
        let path = pool.take(corner_request(8));

        processor.submit(&path).unwrap();
        let mut ticks = 0;
        while !path.is_settled() && ticks < 1000 {
            processor.tick();
            ticks += 1;
        }

        assert_eq!(path.completion_state().unwrap(), CompletionState::Complete);
        assert_eq!(path.pipeline_state().unwrap(), PipelineState::Returned);
        assert_eq!(path.nodes().unwrap().len(), 8);
        assert_eq!(processor.stats().completed, 1);
    }

    #[test]
    fn test_block_until_calculated_cooperative() {
        let data = shared_grid(6);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let pool = PathPool::new();
        let path = pool.take(corner_request(6));

        processor.submit(&path).unwrap();
        processor.block_until_calculated(&path).unwrap();
        assert!(path.is_done().unwrap());
        assert!(path.duration().unwrap() > Duration::ZERO);
    }

    #[test]
    fn test_block_until_calculated_requires_submit() {
        let data = shared_grid(3);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let path = PathPool::new().take(corner_request(3));
        assert_eq!(
            processor.block_until_calculated(&path),
            Err(UsageError::NotSubmitted)
        );
    }

    #[test]
    fn test_block_while_paused_is_usage_error() {
        let data = shared_grid(3);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let path = PathPool::new().take(corner_request(3));
        processor.submit(&path).unwrap();

        let guard = processor.pause(false);
        assert_eq!(
            processor.block_until_calculated(&path),
            Err(UsageError::ProcessorPaused)
        );
        drop(guard);
        processor.block_until_calculated(&path).unwrap();
    }

    #[test]
    fn test_resubmit_rejected() {
        let data = shared_grid(3);
        let processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let path = PathPool::new().take(corner_request(3));
        processor.submit(&path).unwrap();
        assert_eq!(processor.submit(&path), Err(UsageError::AlreadySubmitted));
    }

    #[test]
    fn test_pause_blocks_new_work() {
        let data = shared_grid(4);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let path = PathPool::new().take(corner_request(4));

        let first = processor.pause(true);
        let second = processor.pause(false);
        processor.submit(&path).unwrap();
        for _ in 0..5 {
            processor.tick();
        }
        assert_eq!(path.pipeline_state().unwrap(), PipelineState::Created);

        drop(first);
        processor.tick();
        assert_eq!(path.pipeline_state().unwrap(), PipelineState::Created);

        drop(second);
        processor.block_until_calculated(&path).unwrap();
        assert_eq!(path.completion_state().unwrap(), CompletionState::Complete);
    }

    #[test]
    fn test_threaded_workers_complete_paths() {
        let data = shared_grid(10);
        let mut processor = PathProcessor::new(
            &data,
            SearchConfig::default(),
            ProcessorConfig::default().with_worker_threads(3),
        );
        assert!(processor.is_threaded());
        assert_eq!(processor.stats().live_workers, 3);

        let pool = PathPool::new();
        let paths: Vec<Path> = (0..12).map(|_| pool.take(corner_request(10))).collect();
        for path in &paths {
            processor.submit(path).unwrap();
        }
        for path in &paths {
            processor.block_until_calculated(path).unwrap();
            assert_eq!(path.completion_state().unwrap(), CompletionState::Complete);
            assert_eq!(path.nodes().unwrap().len(), 10);
        }
        processor.shutdown();
        assert_eq!(processor.stats().live_workers, 0);
    }

    #[test]
    fn test_shutdown_fails_queued_paths_once() {
        let data = shared_grid(4);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let pool = PathPool::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let path = pool.take(corner_request(4).callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        processor.submit(&path).unwrap();
        processor.shutdown();
        processor.shutdown();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(path.error().unwrap(), Some(PathError::HostDestroyed));
        assert_eq!(path.pipeline_state().unwrap(), PipelineState::Returned);

        let late = pool.take(corner_request(4));
        assert_eq!(processor.submit(&late), Err(UsageError::ProcessorShutDown));
    }

    #[test]
    fn test_cancelled_path_still_returned() {
        let data = shared_grid(4);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let pool = PathPool::new();
        let path = pool.take(corner_request(4));

        processor.submit(&path).unwrap();
        path.cancel().unwrap();
        processor.block_until_calculated(&path).unwrap();

        assert_eq!(path.error().unwrap(), Some(PathError::Cancelled));
        assert_eq!(path.pipeline_state().unwrap(), PipelineState::Returned);
    }

    #[test]
    fn test_released_path_pooled_after_return() {
        let data = shared_grid(4);
        let mut processor =
            PathProcessor::new(&data, SearchConfig::default(), ProcessorConfig::default());
        let pool = PathPool::new();
        let path = pool.take(corner_request(4));
        let owner = OwnerId::unique();

        path.claim(owner).unwrap();
        processor.submit(&path).unwrap();
        path.release(owner).unwrap();
        assert_eq!(pool.available(), 0);

        processor.block_until_calculated(&path).unwrap();
        assert_eq!(pool.available(), 1);
        assert!(path.is_recycled());
    }
}
