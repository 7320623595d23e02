//! Graceful start/stop control for the event processor's background worker.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc::SyncSender, Arc, Condvar, Mutex};

use crate::{Error, Result};

/// Controls graceful shutdown of a [`BatchEventProcessor`](crate::processor::BatchEventProcessor)
/// worker.
///
/// Construct one controller per processor instance and pass it to
/// [`start`](crate::processor::BatchEventProcessor::start), so multiple processors can be run
/// and torn down independently.
///
/// [`terminate`](LifecycleController::terminate) is one-shot and idempotent;
/// [`terminate_and_wait`](LifecycleController::terminate_and_wait) additionally blocks until the
/// worker has drained the queue with one final flush and exited.
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    terminating: AtomicBool,

    /// Wake channel of the attached worker. `None` until the processor is started.
    wake: Mutex<Option<SyncSender<()>>>,

    /// Holds `None` while the worker is running (or not yet started). Holds `Some(Ok(()))` once
    /// the worker has completed its final flush and exited. Holds `Some(Err(...))` if the worker
    /// panicked.
    done: Mutex<Option<Result<()>>>,
    done_cv: Condvar,
}

impl LifecycleController {
    /// Create a controller in the not-started state.
    pub fn new() -> LifecycleController {
        LifecycleController {
            inner: Arc::new(ControllerInner {
                terminating: AtomicBool::new(false),
                wake: Mutex::new(None),
                done: Mutex::new(None),
                done_cv: Condvar::new(),
            }),
        }
    }

    /// Called by the processor when the worker is spawned.
    pub(crate) fn attach(&self, wake: SyncSender<()>) {
        let mut slot = self
            .inner
            .wake
            .lock()
            .expect("thread holding lifecycle lock should not panic");
        if slot.is_some() {
            log::warn!(target: "exp_events", "lifecycle controller is attached to more than one worker");
        }
        *slot = Some(wake);
    }

    pub(crate) fn is_terminating(&self) -> bool {
        self.inner.terminating.load(Ordering::Acquire)
    }

    /// Called by the worker after its final flush (or after a panic).
    pub(crate) fn mark_done(&self, result: Result<()>) {
        let mut done = self
            .inner
            .done
            .lock()
            .expect("thread holding lifecycle lock should not panic");
        if done.is_none() {
            *done = Some(result);
        }
        self.inner.done_cv.notify_all();
    }

    /// Signal termination. One-shot and idempotent; does not block.
    ///
    /// The worker performs one final flush, draining the entire queue, before exiting. Use
    /// [`terminate_and_wait`](LifecycleController::terminate_and_wait) to block until that flush
    /// has completed.
    pub fn terminate(&self) {
        self.inner.terminating.store(true, Ordering::Release);

        let wake = self
            .inner
            .wake
            .lock()
            .expect("thread holding lifecycle lock should not panic");
        match &*wake {
            Some(sender) => {
                // Error means the buffer is full (the worker has a wake pending and will observe
                // the termination flag) or the worker already exited. Nothing to do either way.
                let _ = sender.try_send(());
            }
            None => {
                // Never attached to a worker: there is nothing to flush, so termination is
                // already complete.
                self.mark_done(Ok(()));
            }
        }
    }

    /// Signal termination and block until the worker has completed its final flush and exited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] if the worker thread panicked.
    pub fn terminate_and_wait(&self) -> Result<()> {
        self.terminate();

        let mut done = self
            .inner
            .done
            .lock()
            .map_err(|_| Error::WorkerPanicked)?;
        loop {
            match &*done {
                Some(result) => return result.clone(),
                None => {
                    done = self
                        .inner
                        .done_cv
                        .wait(done)
                        .map_err(|_| Error::WorkerPanicked)?;
                }
            }
        }
    }
}

impl Default for LifecycleController {
    fn default() -> LifecycleController {
        LifecycleController::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminating_an_unattached_controller_completes_immediately() {
        let controller = LifecycleController::new();
        assert!(controller.terminate_and_wait().is_ok());
    }

    #[test]
    fn terminate_is_idempotent() {
        let controller = LifecycleController::new();
        controller.terminate();
        controller.terminate();
        assert!(controller.terminate_and_wait().is_ok());
    }

    #[test]
    fn wait_returns_worker_panic() {
        let controller = LifecycleController::new();
        let (sender, _receiver) = std::sync::mpsc::sync_channel(1);
        controller.attach(sender);

        controller.mark_done(Err(Error::WorkerPanicked));

        assert!(matches!(
            controller.terminate_and_wait(),
            Err(Error::WorkerPanicked)
        ));
    }
}
