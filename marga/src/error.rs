//! Error types for marga.
//!
//! Three families:
//! - [`UsageError`]: lifecycle misuse, returned immediately to the caller.
//! - [`PathError`]: request failures, stored inside the `Path` and delivered
//!   through its callback. Never returned across the scheduler boundary.
//! - [`StorageError`]: node arena exhaustion or bad indices.

use thiserror::Error;

use crate::config::ConfigLoadError;
use crate::storage::NodeIndex;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigLoadError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Programmer errors in the Path and processor lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("owner id must not be null")]
    NullOwner,

    #[error("path is already claimed by owner {0}")]
    AlreadyClaimed(u64),

    #[error("path is not claimed by owner {0}")]
    NotClaimed(u64),

    #[error("path handle refers to a recycled request")]
    Recycled,

    #[error("path has already been submitted")]
    AlreadySubmitted,

    #[error("path has not been submitted")]
    NotSubmitted,

    #[error("processor is paused and cannot block on a path")]
    ProcessorPaused,

    #[error("processor has been shut down")]
    ProcessorShutDown,

    #[error("unknown graph {0}")]
    UnknownGraph(u32),

    #[error("graph {0} has a different type")]
    GraphTypeMismatch(u32),

    #[error("too many graphs (max {0})")]
    TooManyGraphs(usize),
}

/// Failure of a single path request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("no valid node found near the start point")]
    NoStartNode,

    #[error("no valid node found near the end point")]
    NoEndNode,

    #[error("no path: start and end are in different connected components")]
    Unreachable,

    #[error("no path: searched {searched} nodes without reaching the target")]
    NoPath { searched: usize },

    #[error("path trace exceeded {0} nodes; parent chain is corrupt")]
    TraceTooLong(usize),

    #[error("search exceeded the expansion limit of {0} nodes")]
    SearchLimitExceeded(usize),

    #[error("host destroyed")]
    HostDestroyed,

    #[error("path was cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PathError {
    /// True for the "no path" family of failures
    pub fn is_no_path(&self) -> bool {
        matches!(self, PathError::Unreachable | PathError::NoPath { .. })
    }
}

/// Node arena errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("node index space exhausted ({0} indices in use)")]
    Exhausted(u32),

    #[error("invalid variant count {0} (expected 1..=3)")]
    InvalidVariantCount(u8),

    #[error("node {0} is not allocated")]
    NotAllocated(NodeIndex),
}
