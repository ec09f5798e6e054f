//! The dedicated decode thread.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, warn};

use super::bridge::{CompletionEvent, LoopHandle};
use super::registry::InvalidationRegistry;
use super::slot::JobSlot;
use crate::barcode::DecodeOutcome;
use crate::engine::Recognizer;
use crate::error::DecodeFailure;
use crate::job::Job;

/// Everything the worker thread shares with its scheduler.
pub(crate) struct WorkerContext {
    pub slot: Arc<JobSlot>,
    pub registry: Arc<InvalidationRegistry>,
    pub engine: Arc<dyn Recognizer>,
    pub events: LoopHandle,
}

/// Spawn the worker thread bound to `ctx.slot`.
pub(crate) fn spawn(name: &str, ctx: WorkerContext) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || run(ctx))
}

/// Main worker loop.
///
/// Waits for a job, decodes it outside the lock, then stores the outcome and
/// posts a completion event under the lock. Exits as soon as it wakes with
/// the run flag cleared; it does not touch the slot after that.
fn run(ctx: WorkerContext) {
    debug!("Decode worker started");

    while let Some(job) = ctx.slot.wait_for_job() {
        let name = job.display_name().to_string();
        debug!("Decoding {}", name);

        let started = Instant::now();
        let outcome = decode(ctx.engine.as_ref(), &job);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &outcome {
            Ok(barcodes) => debug!("Decoded {} in {}ms: {} symbol(s)", name, elapsed_ms, barcodes.len()),
            Err(failure) => debug!("Decoding {} failed after {}ms: {}", name, elapsed_ms, failure),
        }

        let mut state = ctx.slot.lock();
        drop(job);
        state.outcome = Some(outcome);

        let (id, owner) = ctx.registry.register();
        let event = CompletionEvent::new(id, elapsed_ms, owner, &ctx.slot, &ctx.registry);
        if ctx.events.post(event).is_err() {
            // Nobody can deliver this anymore; release the slot.
            ctx.registry.claim(id);
            let orphaned = state.take_pending();
            drop(state);
            drop(orphaned);
            warn!("Event loop closed; dropped completion for {}", name);
        }
    }

    debug!("Decode worker exiting");
}

/// Run the recognizer, turning a panic into a decode failure.
fn decode(engine: &dyn Recognizer, job: &Job) -> DecodeOutcome {
    panic::catch_unwind(AssertUnwindSafe(|| engine.decode(&job.image, &job.options)))
        .unwrap_or_else(|_| Err(DecodeFailure::new("recognizer panicked")))
}
