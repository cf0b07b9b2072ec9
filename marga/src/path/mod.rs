//! Path requests and their lifecycle.
//!
//! A [`Path`] is a handle to a pooled request object. The same object is
//! reused after it is released, so every handle carries the generation it
//! was issued for and fails with [`UsageError::Recycled`] once that
//! generation is gone.
//!
//! ## Pipeline
//!
//! ```text
//! Created ─► Processing ─► ReturnQueue ─► Returning ─► Returned
//!   (pool)     (worker)     (worker)      (owner thread, callback)
//! ```
//!
//! The pipeline state only moves forward. Completion is tracked separately
//! (`NotCalculated`, `Complete`, `Error`) and an error, once set, is never
//! replaced.

mod claim;
mod pool;
mod request;

pub use claim::OwnerId;
pub use pool::PathPool;
pub use request::{PathCallback, PathRequest};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::trace;
use parking_lot::{Mutex, MutexGuard};

use crate::core::Int3;
use crate::error::{PathError, UsageError};
use crate::search::{SearchConfig, SearchRequest, SearchResult};
use crate::storage::NodeIndex;

use claim::ClaimLedger;
use pool::PoolShared;

/// Position of a path in the processing pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    Created,
    Processing,
    ReturnQueue,
    Returning,
    Returned,
}

/// Outcome of the search
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompletionState {
    NotCalculated,
    Complete,
    Error,
}

/// Snapshot of a finished path
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathResult {
    pub nodes: Vec<NodeIndex>,
    pub vector_path: Vec<Int3>,
    pub cost: u32,
    pub searched_nodes: usize,
    pub partial: bool,
    pub duration: Duration,
}

pub(crate) struct PathData {
    generation: u64,
    request_id: u64,
    pipeline: PipelineState,
    completion: CompletionState,
    error: Option<PathError>,
    request: Option<PathRequest>,
    callback: Option<PathCallback>,
    result: SearchResult,
    duration: Duration,
    claims: ClaimLedger,
    submitted: bool,
}

impl PathData {
    fn new() -> Self {
        Self {
            generation: 1,
            request_id: 0,
            pipeline: PipelineState::Created,
            completion: CompletionState::NotCalculated,
            error: None,
            request: None,
            callback: None,
            result: SearchResult::default(),
            duration: Duration::ZERO,
            claims: ClaimLedger::default(),
            submitted: false,
        }
    }

    /// Clear everything and invalidate outstanding handles
    fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self::new();
        self.generation = generation;
    }
}

pub(crate) struct PathInner {
    data: Mutex<PathData>,
    cancelled: AtomicBool,
    pool: Weak<PoolShared>,
}

impl PathInner {
    pub(crate) fn new(pool: Weak<PoolShared>) -> Self {
        Self {
            data: Mutex::new(PathData::new()),
            cancelled: AtomicBool::new(false),
            pool,
        }
    }

    /// Bind a fresh request; returns the handle generation
    pub(crate) fn bind(&self, request_id: u64, mut request: PathRequest) -> u64 {
        let mut data = self.data.lock();
        data.request_id = request_id;
        data.callback = request.callback.take();
        data.request = Some(request);
        data.generation
    }
}

/// Handle to a pooled path request.
#[derive(Clone)]
pub struct Path {
    inner: Arc<PathInner>,
    generation: u64,
}

impl Path {
    pub(crate) fn from_inner(inner: Arc<PathInner>, generation: u64) -> Self {
        Self { inner, generation }
    }

    fn data(&self) -> Result<MutexGuard<'_, PathData>, UsageError> {
        let data = self.inner.data.lock();
        if data.generation != self.generation {
            return Err(UsageError::Recycled);
        }
        Ok(data)
    }

    /// True once the underlying object has been pooled and reused
    pub fn is_recycled(&self) -> bool {
        self.data().is_err()
    }

    /// Request id, unique per issued handle
    pub fn id(&self) -> Result<u64, UsageError> {
        Ok(self.data()?.request_id)
    }

    pub fn pipeline_state(&self) -> Result<PipelineState, UsageError> {
        Ok(self.data()?.pipeline)
    }

    pub fn completion_state(&self) -> Result<CompletionState, UsageError> {
        Ok(self.data()?.completion)
    }

    /// True once the search completed or failed
    pub fn is_done(&self) -> Result<bool, UsageError> {
        Ok(self.data()?.completion != CompletionState::NotCalculated)
    }

    pub fn error(&self) -> Result<Option<PathError>, UsageError> {
        Ok(self.data()?.error.clone())
    }

    /// Nodes from start to goal
    pub fn nodes(&self) -> Result<Vec<NodeIndex>, UsageError> {
        Ok(self.data()?.result.nodes.clone())
    }

    /// Waypoints from start to goal
    pub fn vector_path(&self) -> Result<Vec<Int3>, UsageError> {
        Ok(self.data()?.result.vector_path.clone())
    }

    pub fn cost(&self) -> Result<u32, UsageError> {
        Ok(self.data()?.result.cost)
    }

    pub fn searched_nodes(&self) -> Result<usize, UsageError> {
        Ok(self.data()?.result.searched_nodes)
    }

    pub fn is_partial(&self) -> Result<bool, UsageError> {
        Ok(self.data()?.result.partial)
    }

    /// Time spent in search steps
    pub fn duration(&self) -> Result<Duration, UsageError> {
        Ok(self.data()?.duration)
    }

    pub fn result(&self) -> Result<PathResult, UsageError> {
        let data = self.data()?;
        Ok(PathResult {
            nodes: data.result.nodes.clone(),
            vector_path: data.result.vector_path.clone(),
            cost: data.result.cost,
            searched_nodes: data.result.searched_nodes,
            partial: data.result.partial,
            duration: data.duration,
        })
    }

    /// Add a user claim
    pub fn claim(&self, owner: OwnerId) -> Result<(), UsageError> {
        self.data()?.claims.claim(owner)
    }

    /// Drop a user claim; the path is pooled once no claims are left
    pub fn release(&self, owner: OwnerId) -> Result<(), UsageError> {
        let mut data = self.data()?;
        if data.claims.release(owner)? {
            self.recycle(data);
        }
        Ok(())
    }

    /// Fail the path with [`PathError::Cancelled`].
    ///
    /// The worker notices at its next time-slice boundary. No-op once the
    /// search is done.
    pub fn cancel(&self) -> Result<(), UsageError> {
        let mut data = self.data()?;
        if data.completion == CompletionState::NotCalculated {
            data.completion = CompletionState::Error;
            data.error = Some(PathError::Cancelled);
            self.inner.cancelled.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn recycle(&self, mut data: MutexGuard<'_, PathData>) {
        trace!("[PathPool] recycling path {}", data.request_id);
        data.reset();
        self.inner.cancelled.store(false, Ordering::Release);
        drop(data);
        if let Some(pool) = self.inner.pool.upgrade() {
            pool.give_back(Arc::clone(&self.inner));
        }
    }

    // Processor side. The keepalive claim taken on submit keeps the
    // generation stable until the path is returned.

    pub(crate) fn mark_submitted(&self) -> Result<(), UsageError> {
        let mut data = self.data()?;
        if data.submitted || data.pipeline != PipelineState::Created {
            return Err(UsageError::AlreadySubmitted);
        }
        data.submitted = true;
        data.claims.retain_keepalive();
        Ok(())
    }

    pub(crate) fn is_submitted(&self) -> Result<bool, UsageError> {
        Ok(self.data()?.submitted)
    }

    /// Advance to Processing and resolve the search request.
    ///
    /// Returns `None` if the path already failed (cancelled).
    pub(crate) fn start_processing(&self, config: &SearchConfig) -> Option<SearchRequest> {
        let mut data = self.inner.data.lock();
        data.pipeline = data.pipeline.max(PipelineState::Processing);
        if data.completion == CompletionState::Error {
            return None;
        }
        data.request
            .as_ref()
            .map(|request| request.to_search_request(config))
    }

    pub(crate) fn advance(&self, state: PipelineState) {
        let mut data = self.inner.data.lock();
        data.pipeline = data.pipeline.max(state);
    }

    pub(crate) fn complete(&self, result: SearchResult) {
        let mut data = self.inner.data.lock();
        if data.completion == CompletionState::Error {
            return;
        }
        data.completion = CompletionState::Complete;
        data.result = result;
    }

    /// Set the error unless one is already set
    pub(crate) fn fail(&self, error: PathError) {
        let mut data = self.inner.data.lock();
        if data.completion == CompletionState::Error {
            return;
        }
        data.completion = CompletionState::Error;
        data.error = Some(error);
    }

    pub(crate) fn add_duration(&self, elapsed: Duration) {
        self.inner.data.lock().duration += elapsed;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn take_callback(&self) -> Option<PathCallback> {
        self.inner.data.lock().callback.take()
    }

    pub(crate) fn release_keepalive(&self) {
        let mut data = self.inner.data.lock();
        if data.generation != self.generation {
            return;
        }
        if data.claims.release_keepalive() {
            self.recycle(data);
        }
    }

    /// Returned to the owner, or already pooled
    pub(crate) fn is_settled(&self) -> bool {
        self.data()
            .map_or(true, |data| data.pipeline >= PipelineState::Returned)
    }

    #[cfg(test)]
    pub(crate) fn claim_counts(&self) -> (usize, u32) {
        let data = self.inner.data.lock();
        (data.claims.user_count(), data.claims.keepalive_count())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.data.lock();
        f.debug_struct("Path")
            .field("id", &data.request_id)
            .field("generation", &self.generation)
            .field("recycled", &(data.generation != self.generation))
            .field("pipeline", &data.pipeline)
            .field("completion", &data.completion)
            .finish()
    }
}
