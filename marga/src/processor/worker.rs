//! Path workers and the two ways of running them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use parking_lot::RwLock;

use crate::data::NavData;
use crate::error::PathError;
use crate::path::{Path, PipelineState};
use crate::search::{PathHandler, SearchConfig, StepOutcome};

use super::channel::{Receiver, TryRecv};

/// Handles shared by every worker
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub data: Arc<RwLock<NavData>>,
    pub returns: Sender<Path>,
    pub search: SearchConfig,
    pub shutdown: Arc<AtomicBool>,
}

/// Result of driving a worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slice {
    /// Current path still searching
    Working,
    /// Current path handed to the return queue
    Done,
    /// Search panicked; path failed and returned
    Panicked,
}

/// One search context bound to at most one path at a time.
pub(crate) struct PathWorker {
    id: usize,
    handler: PathHandler,
    current: Option<Path>,
    ctx: WorkerContext,
}

impl PathWorker {
    /// Create a worker; `data` must not be locked by the caller
    pub fn new(id: usize, ctx: WorkerContext) -> Self {
        let handler = {
            let mut data = ctx.data.write();
            data.new_handler(id, ctx.search.clone())
        };
        Self {
            id,
            handler,
            current: None,
            ctx,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Bind a path and prepare its search
    pub fn begin(&mut self, path: Path) -> Slice {
        let request = path.start_processing(&self.ctx.search);
        self.current = Some(path);
        let Some(request) = request else {
            self.finish();
            return Slice::Done;
        };

        let started = Instant::now();
        let prepared = {
            let data = self.ctx.data.read();
            catch(|| self.handler.prepare(&data, &request))
        };
        self.record(started);

        match prepared {
            Ok(Ok(())) => Slice::Working,
            Ok(Err(err)) => {
                self.fail(err);
                Slice::Done
            }
            Err(message) => {
                self.panicked(message);
                Slice::Panicked
            }
        }
    }

    /// Run the current search until `deadline` (or completion with `None`)
    pub fn advance(&mut self, deadline: Option<Instant>) -> Slice {
        let Some(cancelled) = self.current.as_ref().map(Path::is_cancelled) else {
            return Slice::Done;
        };
        if self.ctx.shutdown.load(Ordering::Acquire) {
            self.abort_current(PathError::HostDestroyed);
            return Slice::Done;
        }
        if cancelled {
            self.abort_current(PathError::Cancelled);
            return Slice::Done;
        }

        let started = Instant::now();
        let stepped = {
            let data = self.ctx.data.read();
            catch(|| self.handler.step(&data, deadline))
        };
        self.record(started);

        match stepped {
            Ok(Ok(StepOutcome::InProgress)) => Slice::Working,
            Ok(Ok(StepOutcome::Finished(result))) => {
                if let Some(path) = &self.current {
                    path.complete(result);
                }
                self.finish();
                Slice::Done
            }
            Ok(Err(err)) => {
                self.fail(err);
                Slice::Done
            }
            Err(message) => {
                self.panicked(message);
                Slice::Panicked
            }
        }
    }

    /// Fail and return the current path, if any
    pub fn abort_current(&mut self, error: PathError) {
        if self.current.is_some() {
            self.handler.abort();
            self.fail(error);
        }
    }

    fn record(&self, started: Instant) {
        if let Some(path) = &self.current {
            path.add_duration(started.elapsed());
        }
    }

    fn fail(&mut self, err: PathError) {
        if let Some(path) = &self.current {
            debug!("[AStar] worker {} {:?} failed: {}", self.id, path, err);
            path.fail(err);
        }
        self.finish();
    }

    fn panicked(&mut self, message: String) {
        error!(
            "[PathProcessor] worker {} panicked during search: {}",
            self.id, message
        );
        self.handler.abort();
        self.fail(PathError::Internal(format!("worker panicked: {}", message)));
    }

    fn finish(&mut self) {
        let Some(path) = self.current.take() else {
            return;
        };
        path.advance(PipelineState::ReturnQueue);
        if self.ctx.returns.send(path).is_err() {
            warn!(
                "[PathProcessor] worker {} return queue is gone, dropping path",
                self.id
            );
        }
    }
}

fn catch<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs workers for the processor.
pub(crate) trait PathExecutor: Send {
    /// Drive cooperative work for up to `budget`; true if anything ran
    fn tick(&mut self, budget: Duration) -> bool;

    /// Finish the path in hand so the queue can report idle
    fn settle(&mut self);

    fn live_workers(&self) -> usize;

    fn is_threaded(&self) -> bool;

    /// Stop all workers; in-flight paths fail with `HostDestroyed`
    fn shutdown(&mut self);
}

/// OS thread per worker, each looping on the queue.
pub(crate) struct ThreadedExecutor {
    handles: Vec<JoinHandle<()>>,
    live: Arc<AtomicUsize>,
}

impl ThreadedExecutor {
    /// Spawn up to `threads` workers; returns `None` if none could start
    pub fn spawn(
        threads: usize,
        ctx: &WorkerContext,
        receivers: impl Fn() -> Receiver<Path>,
        slice: Duration,
    ) -> Option<Self> {
        let live = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = PathWorker::new(id, ctx.clone());
            let rx = receivers();
            let live_count = Arc::clone(&live);
            live_count.fetch_add(1, Ordering::AcqRel);
            let spawned = thread::Builder::new()
                .name(format!("marga-worker-{}", id))
                .spawn(move || run_thread(worker, rx, slice, live_count));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    live.fetch_sub(1, Ordering::AcqRel);
                    error!("[PathProcessor] failed to spawn worker {}: {}", id, e);
                }
            }
        }

        if handles.is_empty() {
            return None;
        }
        info!("[PathProcessor] started {} worker threads", handles.len());
        Some(Self { handles, live })
    }
}

fn run_thread(mut worker: PathWorker, mut rx: Receiver<Path>, slice: Duration, live: Arc<AtomicUsize>) {
    debug!("[PathProcessor] worker {} running", worker.id());
    while let Ok(path) = rx.recv() {
        let mut state = worker.begin(path);
        while state == Slice::Working {
            state = worker.advance(Some(Instant::now() + slice));
        }
        if state == Slice::Panicked {
            error!(
                "[PathProcessor] worker {} exiting after panic",
                worker.id()
            );
            break;
        }
    }
    live.fetch_sub(1, Ordering::AcqRel);
    debug!("[PathProcessor] worker {} stopped", worker.id());
}

impl PathExecutor for ThreadedExecutor {
    fn tick(&mut self, _budget: Duration) -> bool {
        false
    }

    fn settle(&mut self) {}

    fn live_workers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn is_threaded(&self) -> bool {
        true
    }

    fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("[PathProcessor] worker thread panicked outside a search");
            }
        }
    }
}

/// Single worker driven from the owner thread by `tick`.
pub(crate) struct CooperativeExecutor {
    worker: PathWorker,
    rx: Receiver<Path>,
}

impl CooperativeExecutor {
    pub fn new(ctx: &WorkerContext, rx: Receiver<Path>) -> Self {
        info!("[PathProcessor] started cooperative worker");
        Self {
            worker: PathWorker::new(0, ctx.clone()),
            rx,
        }
    }
}

impl PathExecutor for CooperativeExecutor {
    fn tick(&mut self, budget: Duration) -> bool {
        let deadline = Instant::now() + budget;
        let mut worked = false;
        loop {
            let slice = if self.worker.is_busy() {
                self.worker.advance(Some(deadline))
            } else {
                let TryRecv::Item(path) = self.rx.try_recv() else {
                    break;
                };
                match self.worker.begin(path) {
                    Slice::Working => self.worker.advance(Some(deadline)),
                    other => other,
                }
            };
            worked = true;
            if slice == Slice::Working || Instant::now() >= deadline {
                break;
            }
        }
        if !self.worker.is_busy() {
            self.rx.set_idle();
        }
        worked
    }

    fn settle(&mut self) {
        while self.worker.is_busy() {
            self.worker.advance(None);
        }
        self.rx.set_idle();
    }

    fn live_workers(&self) -> usize {
        1
    }

    fn is_threaded(&self) -> bool {
        false
    }

    fn shutdown(&mut self) {
        self.worker.abort_current(PathError::HostDestroyed);
        self.rx.set_idle();
    }
}
