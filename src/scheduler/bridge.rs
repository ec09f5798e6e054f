//! Delivery of completion events from the worker thread onto the owning
//! thread's event loop.
//!
//! The worker never calls user callbacks. It posts a [`CompletionEvent`]
//! through a [`LoopHandle`]; the thread that owns the [`EventLoop`] later
//! dispatches it, validating it against the scheduler's invalidation
//! registry before touching the job slot.

use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, trace};

use super::registry::{EventId, InvalidationRegistry, OwnerToken};
use super::slot::JobSlot;

/// Token for one finished job, awaiting delivery on the owning thread.
///
/// Holds only weak references to the scheduler state it belongs to.
pub struct CompletionEvent {
    id: EventId,
    elapsed_ms: u64,
    owner: OwnerToken,
    slot: Weak<JobSlot>,
    registry: Weak<InvalidationRegistry>,
}

impl CompletionEvent {
    pub(crate) fn new(
        id: EventId,
        elapsed_ms: u64,
        owner: OwnerToken,
        slot: &Arc<JobSlot>,
        registry: &Arc<InvalidationRegistry>,
    ) -> Self {
        Self {
            id,
            elapsed_ms,
            owner,
            slot: Arc::downgrade(slot),
            registry: Arc::downgrade(registry),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Whether the owning scheduler has been stopped since this was posted
    pub fn is_stale(&self) -> bool {
        self.owner.is_cleared()
    }
}

/// Result of dispatching one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The callback ran.
    Delivered,
    /// The owner was stopped or dropped; nothing ran.
    Stale,
}

/// Sending side of an event loop, handed to schedulers.
#[derive(Clone)]
pub struct LoopHandle {
    sender: UnboundedSender<CompletionEvent>,
    thread: ThreadId,
}

impl LoopHandle {
    /// Queue an event at the tail of the loop and wake it if idle.
    ///
    /// Returns the event back if the loop no longer exists.
    pub(crate) fn post(&self, event: CompletionEvent) -> Result<(), CompletionEvent> {
        self.sender.send(event).map_err(|err| err.0)
    }

    /// Thread the event loop runs on
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

type BackgroundErrorHandler = Box<dyn Fn(&anyhow::Error)>;

/// Cooperative event loop owned by a single thread.
///
/// Not `Send`: events are always dispatched on the thread that created it.
pub struct EventLoop {
    sender: UnboundedSender<CompletionEvent>,
    receiver: UnboundedReceiver<CompletionEvent>,
    thread: ThreadId,
    on_background_error: BackgroundErrorHandler,
    _local: PhantomData<Rc<()>>,
}

impl EventLoop {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            thread: thread::current().id(),
            on_background_error: Box::new(|err| {
                error!("Completion callback failed: {:#}", err);
            }),
            _local: PhantomData,
        }
    }

    /// Replace the handler that receives errors returned by callbacks.
    pub fn with_background_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&anyhow::Error) + 'static,
    {
        self.on_background_error = Box::new(handler);
        self
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            sender: self.sender.clone(),
            thread: self.thread,
        }
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Wait for the next posted event without dispatching it.
    ///
    /// The loop keeps its own sender, so this only returns `None` if the
    /// channel was closed from the outside.
    pub async fn next_event(&mut self) -> Option<CompletionEvent> {
        self.receiver.recv().await
    }

    /// Take the next posted event if one is already queued.
    pub fn try_next_event(&mut self) -> Option<CompletionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next event and dispatch it.
    pub async fn dispatch_next(&mut self) -> Option<Dispatch> {
        let event = self.next_event().await?;
        Some(self.dispatch(event))
    }

    /// Dispatch everything already queued without waiting.
    ///
    /// Returns the number of callbacks that ran.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.try_next_event() {
            if self.dispatch(event) == Dispatch::Delivered {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver one event: validate it, detach callback and outcome from the
    /// slot, release the lock, then run the callback exactly once.
    pub fn dispatch(&self, event: CompletionEvent) -> Dispatch {
        let CompletionEvent {
            id,
            elapsed_ms,
            owner,
            slot,
            registry,
        } = event;

        let claimed = registry
            .upgrade()
            .map(|registry| registry.claim(id))
            .unwrap_or(false);
        if !claimed || owner.is_cleared() {
            debug!(event = id, "Dropping stale completion event");
            return Dispatch::Stale;
        }

        let Some(slot) = slot.upgrade() else {
            debug!(event = id, "Scheduler gone before delivery");
            return Dispatch::Stale;
        };

        let pending = {
            let mut state = slot.lock();
            (state.callback.take(), state.outcome.take())
        };
        drop(slot);

        match pending {
            (Some(callback), Some(outcome)) => {
                trace!(event = id, elapsed_ms, "Delivering completion");
                if let Err(err) = callback(elapsed_ms, outcome) {
                    (self.on_background_error)(&err);
                }
                Dispatch::Delivered
            }
            _ => {
                debug!(event = id, "Completion already discarded");
                Dispatch::Stale
            }
        }
    }
}

/// Release one undelivered event without running its callback.
///
/// Takes whatever the slot still holds so a callback that owns a
/// `Scheduler` handle cannot keep its own scheduler alive.
fn discard(event: CompletionEvent) {
    let CompletionEvent {
        id, slot, registry, ..
    } = event;

    let claimed = registry
        .upgrade()
        .map(|registry| registry.claim(id))
        .unwrap_or(false);
    if !claimed {
        return;
    }
    let Some(slot) = slot.upgrade() else {
        return;
    };

    let pending = slot.lock().take_pending();
    drop(slot);
    if !pending.is_empty() {
        debug!(event = id, "Discarding undelivered completion");
    }
    drop(pending);
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Later posts fail and the worker releases the slot itself.
        self.receiver.close();
        while let Ok(event) = self.receiver.try_recv() {
            discard(event);
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
