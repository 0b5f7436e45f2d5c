use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// Envelope for a serialized domain event.
///
/// This is the unit that travels over the bus (and out to SSE clients). The
/// payload is already JSON so the bus stays agnostic of every domain crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    event_id: Uuid,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    /// Wrap a typed domain event, serializing its payload.
    pub fn from_event<E: Event + Serialize>(event: &E) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            event.event_type(),
            event.occurred_at(),
            serde_json::to_value(event)?,
        ))
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn into_payload(self) -> serde_json::Value {
        self.payload
    }
}
