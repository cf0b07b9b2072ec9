//! FIFO work queue that can be paused.
//!
//! Pauses are reference counted: the queue stays blocked until every
//! [`lock`](BlockableChannel::lock) has a matching
//! [`unlock`](BlockableChannel::unlock). Receivers report when they are
//! idle so a caller can wait for all in-flight work to drain.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct State<T> {
    queue: VecDeque<T>,
    locks: usize,
    closed: bool,
    /// Receivers holding an item
    active: usize,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    available: Condvar,
    idle: Condvar,
}

/// Sending side and control handle.
pub struct BlockableChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BlockableChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for BlockableChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockableChannel<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    locks: 0,
                    closed: false,
                    active: 0,
                }),
                available: Condvar::new(),
                idle: Condvar::new(),
            }),
        }
    }

    /// Enqueue an item; gives it back if the channel is closed
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(item);
        }
        state.queue.push_back(item);
        drop(state);
        self.shared.available.notify_one();
        Ok(())
    }

    pub fn receiver(&self) -> Receiver<T> {
        Receiver {
            shared: Arc::clone(&self.shared),
            busy: false,
        }
    }

    /// Block dequeueing
    pub fn lock(&self) {
        self.shared.state.lock().locks += 1;
    }

    /// Release one lock; the queue resumes when the last lock is gone
    pub fn unlock(&self) {
        let mut state = self.shared.state.lock();
        state.locks = state.locks.saturating_sub(1);
        let resumed = state.locks == 0;
        drop(state);
        if resumed {
            self.shared.available.notify_all();
        }
    }

    pub fn is_locked(&self) -> bool {
        self.shared.state.lock().locks > 0
    }

    /// Wait until no receiver holds an item
    pub fn wait_until_idle(&self) {
        let mut state = self.shared.state.lock();
        while state.active > 0 {
            self.shared.idle.wait(&mut state);
        }
    }

    /// Close the channel and return everything still queued
    pub fn close(&self) -> Vec<T> {
        let mut state = self.shared.state.lock();
        state.closed = true;
        let leftovers = state.queue.drain(..).collect();
        drop(state);
        self.shared.available.notify_all();
        leftovers
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a non-blocking receive
#[derive(Debug, PartialEq, Eq)]
pub enum TryRecv<T> {
    Item(T),
    Empty,
    Blocked,
    Closed,
}

/// Channel closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

/// Receiving side, one per worker.
///
/// A receiver counts as busy from the moment it takes an item until its
/// next receive call (or [`set_idle`](Receiver::set_idle), or drop).
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
    busy: bool,
}

impl<T> Receiver<T> {
    /// Wait for the next item
    pub fn recv(&mut self) -> Result<T, Closed> {
        let shared = &*self.shared;
        let busy = &mut self.busy;
        let mut state = shared.state.lock();
        mark_idle(busy, shared, &mut state);
        loop {
            if state.closed {
                return Err(Closed);
            }
            if state.locks == 0
                && let Some(item) = state.queue.pop_front()
            {
                state.active += 1;
                *busy = true;
                return Ok(item);
            }
            shared.available.wait(&mut state);
        }
    }

    pub fn try_recv(&mut self) -> TryRecv<T> {
        let shared = &*self.shared;
        let busy = &mut self.busy;
        let mut state = shared.state.lock();
        mark_idle(busy, shared, &mut state);
        if state.closed {
            return TryRecv::Closed;
        }
        if state.locks > 0 {
            return TryRecv::Blocked;
        }
        match state.queue.pop_front() {
            Some(item) => {
                state.active += 1;
                *busy = true;
                TryRecv::Item(item)
            }
            None => TryRecv::Empty,
        }
    }

    /// Report that the last item is finished
    pub fn set_idle(&mut self) {
        let shared = &*self.shared;
        let busy = &mut self.busy;
        let mut state = shared.state.lock();
        mark_idle(busy, shared, &mut state);
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

fn mark_idle<T>(busy: &mut bool, shared: &Shared<T>, state: &mut State<T>) {
    if *busy {
        *busy = false;
        state.active -= 1;
        if state.active == 0 {
            shared.idle.notify_all();
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.set_idle();
    }
}
