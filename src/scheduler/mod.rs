//! Single-slot asynchronous decode scheduler.
//!
//! A [`Scheduler`] owns one dedicated worker thread and a job slot shared
//! with it. Callers [`submit`](Scheduler::submit) a job together with a
//! callback; the worker decodes it off-thread and posts a completion event
//! to the caller's [`EventLoop`], where the callback runs exactly once.
//! Only one job may be outstanding at a time.
//!
//! # Example
//!
//! ```no_run
//! use barscan::bitmap::ImageBuffer;
//! use barscan::engine::ExternalReader;
//! use barscan::job::Job;
//! use barscan::options::ReaderOptions;
//! use barscan::scheduler::{EventLoop, Scheduler};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut events = EventLoop::new();
//! let scheduler = Scheduler::new(ExternalReader::new("ZXingReader"), events.handle());
//! scheduler.start()?;
//!
//! let image = ImageBuffer::from_raw(640, 480, 1, vec![255; 640 * 480])?;
//! scheduler.submit(Job::new(image, ReaderOptions::default()), |elapsed_ms, outcome| {
//!     println!("{elapsed_ms}ms: {:?}", outcome.map(|b| b.len()));
//!     Ok(())
//! })?;
//!
//! events.dispatch_next().await;
//! scheduler.stop();
//! # Ok(())
//! # }
//! ```

mod bridge;
mod registry;
mod slot;
mod worker;

pub use bridge::{CompletionEvent, Dispatch, EventLoop, LoopHandle};
pub use registry::EventId;

use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

use crate::barcode::DecodeOutcome;
use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::SchedulerError;
use crate::job::Job;
use registry::InvalidationRegistry;
use slot::JobSlot;
use worker::WorkerContext;

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    /// No worker thread.
    Stopped,
    /// Worker alive, nothing outstanding.
    Ready,
    /// A job is queued, decoding, or awaiting delivery.
    Running,
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerStatus::Stopped => "stopped",
            SchedulerStatus::Ready => "ready",
            SchedulerStatus::Running => "running",
        };
        f.write_str(name)
    }
}

/// Handle to a single-slot decode scheduler.
///
/// Clones share the same worker and slot. The worker is stopped when the
/// last handle is dropped. A handle captured by a pending callback counts
/// until that callback is delivered, or until the [`EventLoop`] is dropped. Methods are meant to be called from the thread
/// that runs the scheduler's [`EventLoop`].
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    slot: Arc<JobSlot>,
    registry: Arc<InvalidationRegistry>,
    engine: Arc<dyn Recognizer>,
    events: LoopHandle,
    worker_name: String,
    worker: Mutex<Option<JoinHandle<()>>>,
    owner: Mutex<Option<ThreadId>>,
}

impl Scheduler {
    pub fn new<R: Recognizer>(engine: R, events: LoopHandle) -> Self {
        Self::with_config(engine, events, &Config::default())
    }

    pub fn with_config<R: Recognizer>(engine: R, events: LoopHandle, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Arc::new(JobSlot::new()),
                registry: Arc::new(InvalidationRegistry::new()),
                engine: Arc::new(engine),
                events,
                worker_name: config.worker_name.clone(),
                worker: Mutex::new(None),
                owner: Mutex::new(None),
            }),
        }
    }

    /// Spawn the worker thread if it is not already running.
    ///
    /// Records the calling thread as the owner that completions are
    /// delivered to.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let inner = &self.inner;
        let mut worker = inner.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        if inner.worker_name.contains('\0') {
            return Err(SchedulerError::StartFailed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker thread name contains a NUL byte",
            )));
        }

        inner.slot.lock().run = true;
        let ctx = WorkerContext {
            slot: Arc::clone(&inner.slot),
            registry: Arc::clone(&inner.registry),
            engine: Arc::clone(&inner.engine),
            events: inner.events.clone(),
        };

        match worker::spawn(&inner.worker_name, ctx) {
            Ok(handle) => {
                let current = thread::current().id();
                if current != inner.events.thread() {
                    warn!("Scheduler started outside its event loop thread");
                }
                *inner.owner.lock() = Some(current);
                *worker = Some(handle);
                info!("Decode worker '{}' started", inner.worker_name);
                Ok(())
            }
            Err(err) => {
                inner.slot.lock().run = false;
                error!("Failed to spawn decode worker: {}", err);
                Err(SchedulerError::StartFailed(err))
            }
        }
    }

    /// Hand a job to the worker.
    ///
    /// Fails with [`SchedulerError::Busy`] while another job is outstanding,
    /// leaving that job untouched. The callback runs on the event loop thread
    /// once the decode completes, unless [`stop`](Self::stop) intervenes.
    pub fn submit<F>(&self, job: Job, callback: F) -> Result<(), SchedulerError>
    where
        F: FnOnce(u64, DecodeOutcome) -> anyhow::Result<()> + Send + 'static,
    {
        if self.inner.worker.lock().is_none() {
            return Err(SchedulerError::NotStarted);
        }

        let mut state = self.inner.slot.lock();
        if !state.is_idle() {
            drop(state);
            debug!("Rejecting {}: decoder busy", job.display_name());
            return Err(SchedulerError::Busy);
        }

        debug!("Submitting {}", job.display_name());
        state.job = Some(job);
        state.callback = Some(Box::new(callback));
        drop(state);

        self.inner.slot.notify();
        Ok(())
    }

    /// Stop the worker and discard anything outstanding.
    ///
    /// Blocks until the worker exits, which includes waiting out a decode
    /// already in progress. Completion events posted before this returns are
    /// invalidated, so no callback for this scheduler runs afterwards.
    pub fn stop(&self) {
        self.inner.shutdown();
    }

    pub fn status(&self) -> SchedulerStatus {
        if self.inner.worker.lock().is_none() {
            return SchedulerStatus::Stopped;
        }
        if self.inner.slot.lock().is_idle() {
            SchedulerStatus::Ready
        } else {
            SchedulerStatus::Running
        }
    }

    /// Thread that called [`start`](Self::start), while running
    pub fn owner_thread(&self) -> Option<ThreadId> {
        *self.inner.owner.lock()
    }

    /// Completion events posted but not yet delivered or invalidated
    pub fn pending_events(&self) -> usize {
        self.inner.registry.len()
    }
}

impl Inner {
    fn shutdown(&self) {
        let handle = self.worker.lock().take();

        self.slot.lock().run = false;
        self.slot.notify();

        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                warn!("Decode worker stopped from its own thread; not joining");
            } else if handle.join().is_err() {
                error!("Decode worker panicked");
            } else {
                info!("Decode worker '{}' stopped", self.worker_name);
            }
        }

        let invalidated = self.registry.invalidate_all();
        let discarded = self.slot.lock().take_pending();
        if invalidated > 0 || !discarded.is_empty() {
            debug!(
                "Discarded outstanding work: {} event(s) invalidated, job: {}, outcome: {}",
                invalidated,
                discarded.job.is_some(),
                discarded.outcome.is_some()
            );
        }
        drop(discarded);

        *self.owner.lock() = None;
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
