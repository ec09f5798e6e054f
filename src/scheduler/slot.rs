//! Shared job slot: the single handoff point between the scheduler and its
//! worker thread.

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::barcode::DecodeOutcome;
use crate::job::{DecodeCallback, Job};

/// Fields guarded by the slot mutex.
///
/// At most one live job and at most one undelivered outcome exist at a time.
pub(crate) struct SlotState {
    pub run: bool,
    pub job: Option<Job>,
    pub outcome: Option<DecodeOutcome>,
    pub callback: Option<DecodeCallback>,
}

impl SlotState {
    /// No job queued, in flight, or awaiting delivery.
    ///
    /// The callback is set at submit and cleared at delivery, so it also
    /// covers the window where the worker holds the job outside the lock.
    pub fn is_idle(&self) -> bool {
        self.job.is_none() && self.outcome.is_none() && self.callback.is_none()
    }

    /// Remove everything pending so the caller can drop it outside the lock.
    pub fn take_pending(&mut self) -> Pending {
        Pending {
            job: self.job.take(),
            outcome: self.outcome.take(),
            callback: self.callback.take(),
        }
    }
}

/// Leftovers pulled out of the slot, dropped by whoever holds them.
pub(crate) struct Pending {
    pub job: Option<Job>,
    pub outcome: Option<DecodeOutcome>,
    pub callback: Option<DecodeCallback>,
}

impl Pending {
    pub fn is_empty(&self) -> bool {
        self.job.is_none() && self.outcome.is_none() && self.callback.is_none()
    }
}

pub(crate) struct JobSlot {
    state: Mutex<SlotState>,
    signal: Condvar,
}

impl JobSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                run: false,
                job: None,
                outcome: None,
                callback: None,
            }),
            signal: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock()
    }

    /// Wake the worker: a job was stored or shutdown was requested.
    pub fn notify(&self) {
        self.signal.notify_all();
    }

    /// Block until a job is available or the run flag drops.
    ///
    /// Returns `None` when the worker should exit. Any outcome left over from
    /// a previous job is discarded before the new job is handed out.
    pub fn wait_for_job(&self) -> Option<Job> {
        let mut state = self.state.lock();
        while state.run && state.job.is_none() {
            self.signal.wait(&mut state);
        }
        if !state.run {
            return None;
        }
        let stale = state.outcome.take();
        let job = state.job.take();
        drop(state);
        drop(stale);
        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::ImageBuffer;
    use crate::options::ReaderOptions;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn job() -> Job {
        Job::new(
            ImageBuffer::from_raw(1, 1, 1, vec![0]).unwrap(),
            ReaderOptions::default(),
        )
    }

    #[test]
    fn test_idle_tracking() {
        let slot = JobSlot::new();
        assert!(slot.lock().is_idle());

        slot.lock().callback = Some(Box::new(|_, _| Ok(())));
        assert!(!slot.lock().is_idle());

        let pending = slot.lock().take_pending();
        assert!(!pending.is_empty());
        assert!(slot.lock().is_idle());
    }

    #[test]
    fn test_wait_returns_none_when_stopped() {
        let slot = JobSlot::new();
        slot.lock().job = Some(job());
        // run flag is false, so even a present job is not handed out
        assert!(slot.wait_for_job().is_none());
    }

    #[test]
    fn test_wait_wakes_on_job() {
        let slot = Arc::new(JobSlot::new());
        slot.lock().run = true;

        let waiter = {
            let slot = slot.clone();
            thread::spawn(move || slot.wait_for_job().map(|j| j.id))
        };

        thread::sleep(Duration::from_millis(20));
        let submitted = job();
        let id = submitted.id.clone();
        {
            let mut state = slot.lock();
            state.outcome = Some(Ok(Vec::new()));
            state.job = Some(submitted);
        }
        slot.notify();

        assert_eq!(waiter.join().unwrap(), Some(id));
        // leftover outcome is discarded when the next job is picked up
        assert!(slot.lock().outcome.is_none());
    }

    #[test]
    fn test_wait_wakes_on_shutdown() {
        let slot = Arc::new(JobSlot::new());
        slot.lock().run = true;

        let waiter = {
            let slot = slot.clone();
            thread::spawn(move || slot.wait_for_job().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        slot.lock().run = false;
        slot.notify();

        assert!(waiter.join().unwrap());
    }
}
