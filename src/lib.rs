//! `exp_events` is the event-batching core used to build experimentation SDKs. Application code
//! reports discrete user-interaction events (experiment exposures, conversions) and this crate
//! accumulates them and delivers them to a collection endpoint as compact batches instead of one
//! network call per event.
//!
//! # Overview
//!
//! `exp_events` is organized as a set of building blocks wired together by the processor:
//!
//! [`UserEvent`](event::UserEvent) is an immutable record of a single exposure or conversion,
//! stamped with the [`EventContext`](event::EventContext) (project and configuration revision)
//! it was generated under. Producing events is the job of the embedding SDK's decision engine;
//! this crate only moves them.
//!
//! [`EventQueue`](event_queue::EventQueue) is a bounded, thread-safe FIFO of pending events.
//! [`InMemoryQueue`](event_queue::InMemoryQueue) is the default implementation. Capacity is
//! enforced by flushing when full, not by surfacing errors to producers.
//!
//! [`batch`] contains the dispatch-ready wire types ([`EventBatch`](batch::EventBatch), one
//! [`Visitor`](batch::Visitor) per event) and the pure assembler that partitions a run of queued
//! events into batches of mutually compatible events.
//!
//! [`EventDispatcher`](event_dispatcher::EventDispatcher) is the delivery capability. The
//! default [`HttpEventDispatcher`](event_dispatcher::HttpEventDispatcher) posts each batch as
//! JSON. A failed dispatch is never fatal: the processor keeps the affected events queued and
//! retries them on the next flush.
//!
//! [`BatchEventProcessor`](processor::BatchEventProcessor) is the orchestrating engine: it owns
//! the queue and the dispatcher, runs a background worker thread that flushes on a fixed
//! interval or when the queue reaches capacity, and never blocks the caller reporting an event.
//!
//! [`LifecycleController`](lifecycle::LifecycleController) starts and gracefully stops a
//! processor. Terminating waits for one final flush that drains everything still queued, so a
//! well-behaved shutdown loses no events.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod batch;
pub mod event;
pub mod event_dispatcher;
pub mod event_queue;
pub mod lifecycle;
pub mod processor;

mod error;

pub use error::{Error, Result};
