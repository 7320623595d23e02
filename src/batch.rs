//! Dispatch-ready wire types and the pure batch assembler.
use serde::Serialize;

use crate::event::{Attributes, EventPayload, Tags, UserEvent};
#[cfg(test)]
use crate::event::EventContext;

/// The wire representation of one [`UserEvent`] inside a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub visitor_id: String,
    pub uuid: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Visitor {
    fn from_user_event(event: &UserEvent) -> Visitor {
        Visitor {
            visitor_id: event.visitor_id.clone(),
            uuid: event.uuid.clone(),
            timestamp: event.timestamp.timestamp_millis(),
            attributes: event.attributes.clone(),
            tags: event.tags.clone(),
            payload: event.payload.clone(),
        }
    }
}

/// An assembled, dispatch-ready payload: one [`EventContext`] plus an ordered list of visitor
/// records. Created only by [`assemble_batches`]; the visitor list is never empty and never
/// mixes events from different contexts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    pub account_id: String,
    pub project_id: String,
    pub revision: String,
    pub client_name: String,
    pub client_version: String,
    pub visitors: Vec<Visitor>,
}

impl EventBatch {
    fn from_first_event(event: &UserEvent) -> EventBatch {
        let context = &event.context;
        EventBatch {
            account_id: context.account_id.clone(),
            project_id: context.project_id.clone(),
            revision: context.revision.clone(),
            client_name: context.client_name.clone(),
            client_version: context.client_version.clone(),
            visitors: vec![Visitor::from_user_event(event)],
        }
    }

    /// Whether `event` is compatible with the events already in this batch.
    pub fn accepts(&self, event: &UserEvent) -> bool {
        self.project_id == event.context.project_id && self.revision == event.context.revision
    }
}

/// Partitions a run of events, dequeued in FIFO order, into dispatchable batches.
///
/// The list is scanned once; a new batch opens whenever the event context stops matching the
/// batch currently being filled. This yields the minimum number of batches for the given order:
/// compatible neighbours share a batch, but compatible events separated by a mismatch are *not*
/// merged, since that would reorder dispatch relative to arrival.
pub fn assemble_batches(events: &[UserEvent]) -> Vec<EventBatch> {
    let mut batches: Vec<EventBatch> = Vec::new();
    for event in events {
        match batches.last_mut() {
            Some(batch) if batch.accepts(event) => {
                batch.visitors.push(Visitor::from_user_event(event));
            }
            _ => batches.push(EventBatch::from_first_event(event)),
        }
    }
    batches
}
