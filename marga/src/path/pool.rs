use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use log::trace;
use parking_lot::Mutex;

use super::{Path, PathInner, PathRequest};

pub(crate) struct PoolShared {
    free: Mutex<Vec<Arc<PathInner>>>,
    next_id: AtomicU64,
    created: AtomicUsize,
}

impl PoolShared {
    pub(crate) fn give_back(&self, inner: Arc<PathInner>) {
        self.free.lock().push(inner);
    }
}

/// Free list of reusable path objects.
#[derive(Clone)]
pub struct PathPool {
    shared: Arc<PoolShared>,
}

impl Default for PathPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PathPool {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                created: AtomicUsize::new(0),
            }),
        }
    }

    /// Take a pooled path (or allocate one) bound to `request`
    pub fn take(&self, request: PathRequest) -> Path {
        let pooled = self.shared.free.lock().pop();
        let inner = pooled.unwrap_or_else(|| {
            self.shared.created.fetch_add(1, Ordering::Relaxed);
            Arc::new(PathInner::new(Arc::downgrade(&self.shared)))
        });
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let generation = inner.bind(id, request);
        trace!("[PathPool] path {} taken (generation {})", id, generation);
        Path::from_inner(inner, generation)
    }

    /// Paths waiting in the free list
    pub fn available(&self) -> usize {
        self.shared.free.lock().len()
    }

    /// Path objects allocated over the pool's lifetime
    pub fn created(&self) -> usize {
        self.shared.created.load(Ordering::Relaxed)
    }
}
