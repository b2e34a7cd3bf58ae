//! Fire-and-forget events pushed by the backend.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::envelope::EventEnvelope;

/// Row count of a session's stream changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUpdated {
	pub guid: String,
	pub rows: u64,
}

/// A new source started feeding a session's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSourceNew {
	pub guid: String,
	pub source: u32,
}

/// Events the backend may push at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BackendEvent {
	StreamUpdated(StreamUpdated),
	StreamSourceNew(StreamSourceNew),
}

impl BackendEvent {
	/// Decodes an event frame, returning `None` for event types this client does not know.
	pub fn from_envelope(envelope: EventEnvelope) -> Option<Self> {
		serde_json::from_value(json!({
			"type": envelope.kind,
			"payload": envelope.payload,
		}))
		.ok()
	}

	/// Session the event belongs to.
	pub fn guid(&self) -> &str {
		match self {
			Self::StreamUpdated(event) => &event.guid,
			Self::StreamSourceNew(event) => &event.guid,
		}
	}
}
