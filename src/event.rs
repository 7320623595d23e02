//! User-interaction events reported by the embedding SDK's decision engine.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Custom attributes attached to an event (e.g., audience targeting values).
pub type Attributes = HashMap<String, serde_json::Value>;

/// Free-form tags attached to an event.
pub type Tags = HashMap<String, serde_json::Value>;

/// Identifies the project and the configuration revision under which an event was generated.
///
/// The context is captured from the configuration source at event-creation time, so events keep
/// pointing at the configuration snapshot that produced them even after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    pub account_id: String,
    pub project_id: String,
    pub revision: String,
    /// SDK name. Usually, language name.
    pub client_name: String,
    /// Version of SDK.
    pub client_version: String,
}

impl EventContext {
    /// Two events may share a batch only if they were generated under the same project and the
    /// same configuration revision. Account and client metadata are not part of the check since
    /// they cannot differ within one SDK instance.
    pub fn is_batchable_with(&self, other: &EventContext) -> bool {
        self.project_id == other.project_id && self.revision == other.revision
    }
}

/// An experiment exposure: the subject was shown a variation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureEvent {
    pub experiment_id: String,
    pub variation_id: String,
}

/// A conversion: the subject performed a tracked action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionEvent {
    pub event_key: String,
    /// Revenue amount in minor currency units, if the action carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<i64>,
    /// Scalar metric value, if the action carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Payload of a [`UserEvent`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventPayload {
    Exposure(ExposureEvent),
    Conversion(ConversionEvent),
}

/// A single user-interaction event. Immutable once created.
///
/// Events are created by the caller of
/// [`BatchEventProcessor::process_event`](crate::processor::BatchEventProcessor::process_event),
/// queued, and later consumed into exactly one [`EventBatch`](crate::batch::EventBatch).
#[derive(Debug, Clone)]
pub struct UserEvent {
    pub context: EventContext,
    /// Unique id assigned at construction; ends up on the wire so the collection endpoint can
    /// detect duplicates from retried batches.
    pub uuid: String,
    pub timestamp: DateTime<Utc>,
    /// The key identifying the subject the event is about.
    pub visitor_id: String,
    pub attributes: Option<Attributes>,
    pub tags: Option<Tags>,
    pub payload: EventPayload,
}

impl UserEvent {
    /// Create a new event stamped with the current time and a fresh uuid.
    pub fn new(
        context: EventContext,
        visitor_id: impl Into<String>,
        payload: EventPayload,
    ) -> UserEvent {
        UserEvent {
            context,
            uuid: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            visitor_id: visitor_id.into(),
            attributes: None,
            tags: None,
            payload,
        }
    }

    /// Attach subject attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> UserEvent {
        self.attributes = Some(attributes);
        self
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: Tags) -> UserEvent {
        self.tags = Some(tags);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(project_id: &str, revision: &str) -> EventContext {
        EventContext {
            account_id: "12001".to_owned(),
            project_id: project_id.to_owned(),
            revision: revision.to_owned(),
            client_name: "rust-sdk".to_owned(),
            client_version: "0.1.0".to_owned(),
        }
    }

    #[test]
    fn same_project_and_revision_is_batchable() {
        assert!(context("p1", "5").is_batchable_with(&context("p1", "5")));
    }

    #[test]
    fn revision_change_is_not_batchable() {
        assert!(!context("p1", "5").is_batchable_with(&context("p1", "6")));
    }

    #[test]
    fn project_change_is_not_batchable() {
        assert!(!context("p1", "5").is_batchable_with(&context("p2", "5")));
    }

    #[test]
    fn events_get_distinct_uuids() {
        let a = UserEvent::new(
            context("p1", "5"),
            "visitor-a",
            EventPayload::Conversion(ConversionEvent {
                event_key: "purchase".to_owned(),
                revenue: None,
                value: None,
            }),
        );
        let b = UserEvent::new(
            context("p1", "5"),
            "visitor-a",
            EventPayload::Conversion(ConversionEvent {
                event_key: "purchase".to_owned(),
                revenue: None,
                value: None,
            }),
        );
        assert_ne!(a.uuid, b.uuid);
    }
}
