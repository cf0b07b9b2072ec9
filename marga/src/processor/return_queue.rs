//! Finished paths waiting for their owner.
//!
//! Workers push from any thread. The owner drains on its own thread, which
//! is where callbacks run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::trace;

use crate::path::{Path, PipelineState};

pub struct PathReturnQueue {
    sender: Sender<Path>,
    receiver: Receiver<Path>,
    returned: AtomicUsize,
}

impl Default for PathReturnQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PathReturnQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            returned: AtomicUsize::new(0),
        }
    }

    pub(crate) fn sender(&self) -> Sender<Path> {
        self.sender.clone()
    }

    pub(crate) fn push(&self, path: Path) {
        path.advance(PipelineState::ReturnQueue);
        // The queue owns a receiver, so this cannot disconnect
        let _ = self.sender.send(path);
    }

    /// Return every queued path; yields the number returned
    pub fn drain(&self) -> usize {
        let mut count = 0;
        while let Ok(path) = self.receiver.try_recv() {
            self.return_path(path);
            count += 1;
        }
        count
    }

    /// Wait up to `timeout` for one path and return it
    pub fn wait_one(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(path) => {
                self.return_path(path);
                true
            }
            Err(_) => false,
        }
    }

    /// Paths waiting to be returned
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Paths returned so far
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::Relaxed)
    }

    fn return_path(&self, path: Path) {
        path.advance(PipelineState::Returning);
        if let Some(callback) = path.take_callback() {
            callback(&path);
        }
        path.advance(PipelineState::Returned);
        trace!("[ReturnQueue] returned {:?}", path);
        path.release_keepalive();
        self.returned.fetch_add(1, Ordering::Relaxed);
    }
}
