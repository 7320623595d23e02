//! The batching engine: owns the queue and the dispatcher, runs the background flush worker.
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::batch::assemble_batches;
use crate::event::UserEvent;
use crate::event_dispatcher::{EventDispatcher, HttpEventDispatcher, DEFAULT_EVENTS_ENDPOINT};
use crate::event_queue::{EventQueue, InMemoryQueue};
use crate::lifecycle::LifecycleController;
use crate::{Error, Result};

/// Configuration for [`BatchEventProcessor`].
// Not implementing `Copy` as we may add non-copyable fields in the future.
#[derive(Debug, Clone)]
pub struct BatchEventProcessorConfig {
    /// Maximum number of buffered events. Reaching it triggers an immediate flush.
    ///
    /// Defaults to [`BatchEventProcessorConfig::DEFAULT_QUEUE_CAPACITY`].
    pub queue_capacity: usize,
    /// Wall-clock period between timer-driven flushes.
    ///
    /// Defaults to [`BatchEventProcessorConfig::DEFAULT_FLUSH_INTERVAL`].
    pub flush_interval: Duration,
}

impl BatchEventProcessorConfig {
    /// Default value for [`BatchEventProcessorConfig::queue_capacity`].
    pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
    /// Default value for [`BatchEventProcessorConfig::flush_interval`].
    pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

    /// Create a new `BatchEventProcessorConfig` using default configuration.
    pub fn new() -> BatchEventProcessorConfig {
        BatchEventProcessorConfig::default()
    }

    /// Update queue capacity with `queue_capacity`.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> BatchEventProcessorConfig {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Update flush interval with `flush_interval`.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> BatchEventProcessorConfig {
        self.flush_interval = flush_interval;
        self
    }
}

impl Default for BatchEventProcessorConfig {
    fn default() -> BatchEventProcessorConfig {
        BatchEventProcessorConfig {
            queue_capacity: BatchEventProcessorConfig::DEFAULT_QUEUE_CAPACITY,
            flush_interval: BatchEventProcessorConfig::DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// A concurrent, bounded, time- and size-triggered batching engine.
///
/// Producer threads call [`process_event`](BatchEventProcessor::process_event), which never
/// blocks longer than a queue lock acquisition. A background worker thread, launched by
/// [`start`](BatchEventProcessor::start), flushes the queue whenever the flush interval elapses,
/// the queue reaches capacity, or termination is signalled through the
/// [`LifecycleController`].
///
/// Dispatch failures are recovered locally: events from a failed batch stay at the head of the
/// queue and are retried on the next flush, so nothing is lost unless the process exits without
/// a graceful termination.
pub struct BatchEventProcessor {
    config: BatchEventProcessorConfig,
    queue: Arc<dyn EventQueue<UserEvent>>,
    dispatcher: Arc<dyn EventDispatcher>,
    /// Wake channel of the worker. `None` until [`start`](BatchEventProcessor::start).
    wake: Mutex<Option<SyncSender<()>>>,
    started: AtomicBool,
}

impl BatchEventProcessor {
    /// Create a processor with the default in-memory queue and the default HTTP dispatcher
    /// posting to [`DEFAULT_EVENTS_ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the default endpoint fails to parse, which should
    /// normally never happen.
    pub fn new(config: BatchEventProcessorConfig) -> Result<BatchEventProcessor> {
        let dispatcher = Arc::new(HttpEventDispatcher::new(DEFAULT_EVENTS_ENDPOINT)?);
        Ok(BatchEventProcessor::with_dispatcher(config, dispatcher))
    }

    /// Create a processor with the default in-memory queue and a custom dispatcher.
    pub fn with_dispatcher(
        config: BatchEventProcessorConfig,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> BatchEventProcessor {
        let queue = Arc::new(InMemoryQueue::new(config.queue_capacity));
        BatchEventProcessor::with_queue_and_dispatcher(config, queue, dispatcher)
    }

    /// Create a processor with a custom queue and dispatcher.
    pub fn with_queue_and_dispatcher(
        config: BatchEventProcessorConfig,
        queue: Arc<dyn EventQueue<UserEvent>>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> BatchEventProcessor {
        BatchEventProcessor {
            config,
            queue,
            dispatcher,
            wake: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Launch the background worker thread and arm the periodic flush timer. Returns
    /// immediately.
    ///
    /// The worker runs until `controller` signals termination, at which point it performs one
    /// final flush that drains the entire queue before exiting. Calling `start` a second time
    /// logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the worker thread failed to spawn.
    pub fn start(&self, controller: &LifecycleController) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            log::warn!(target: "exp_events", "event processor is already started");
            return Ok(());
        }

        // Buffer size of 1 is enough for the wake channel: a pending wake already guarantees
        // the worker will run another flush cycle, so further signals can be dropped.
        let (wake_sender, wake_receiver) = sync_channel::<()>(1);
        controller.attach(wake_sender.clone());
        *self
            .wake
            .lock()
            .expect("thread holding processor lock should not panic") = Some(wake_sender);

        let worker = Worker {
            queue: Arc::clone(&self.queue),
            dispatcher: Arc::clone(&self.dispatcher),
            flush_interval: self.config.flush_interval,
            controller: controller.clone(),
            wake_receiver,
        };

        std::thread::Builder::new()
            .name("exp-events-worker".to_owned())
            .spawn(move || worker.run())?;

        Ok(())
    }

    /// Enqueue one event for batching.
    ///
    /// Never blocks on network I/O: if the queue has reached capacity, the worker is woken for
    /// an immediate flush and this call returns. While a flush is failing and the queue is
    /// pinned at capacity, further events are silently dropped, imposing backpressure on the
    /// producer; [`events_count`](BatchEventProcessor::events_count) stays at capacity in that
    /// state.
    pub fn process_event(&self, event: UserEvent) {
        self.queue.add(event);

        if self.queue.size() >= self.config.queue_capacity {
            log::debug!(target: "exp_events", "event queue reached capacity, requesting flush");
            self.request_flush();
        }
    }

    /// Current number of queued events.
    pub fn events_count(&self) -> usize {
        self.queue.size()
    }

    fn request_flush(&self) {
        let wake = self
            .wake
            .lock()
            .expect("thread holding processor lock should not panic");
        if let Some(sender) = &*wake {
            // Error means the buffer is full (a flush is already pending) or the worker exited.
            let _ = sender.try_send(());
        }
    }
}

struct Worker {
    queue: Arc<dyn EventQueue<UserEvent>>,
    dispatcher: Arc<dyn EventDispatcher>,
    flush_interval: Duration,
    controller: LifecycleController,
    wake_receiver: Receiver<()>,
}

impl Worker {
    fn run(self) {
        let controller = self.controller.clone();
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| self.event_loop()));
        match result {
            Ok(()) => controller.mark_done(Ok(())),
            Err(_panic_info) => controller.mark_done(Err(Error::WorkerPanicked)),
        }
    }

    fn event_loop(&self) {
        loop {
            if self.controller.is_terminating() {
                break;
            }
            match self.wake_receiver.recv_timeout(self.flush_interval) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {
                    if self.controller.is_terminating() {
                        break;
                    }
                    self.flush();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // All wake senders are gone, so neither a size-triggered flush nor a
                    // termination signal can arrive anymore. Drain and exit.
                    log::debug!(target: "exp_events", "event worker wake channel disconnected");
                    break;
                }
            }
        }

        log::debug!(target: "exp_events", "event worker terminating, flushing remaining events");
        self.flush();
    }

    /// Drains the queue: peeks everything pending, assembles batches, dispatches them in order.
    ///
    /// Events are removed from the queue only after their batch is delivered, so a failed batch
    /// stays at the head (in original order, ahead of newer arrivals) and is retried on the next
    /// flush trigger. On the first failure the cycle stops; there is no in-cycle retry and no
    /// backoff.
    fn flush(&self) {
        while self.queue.size() > 0 {
            let pending = self.queue.get(self.queue.size());
            if pending.is_empty() {
                return;
            }

            for batch in assemble_batches(&pending) {
                match self.dispatcher.dispatch_event(&batch) {
                    Ok(()) => {
                        self.queue.remove(batch.visitors.len());
                    }
                    Err(err) => {
                        log::warn!(target: "exp_events", "event batch failed to send, will retry on next flush: {err}");
                        return;
                    }
                }
            }
        }
    }
}
