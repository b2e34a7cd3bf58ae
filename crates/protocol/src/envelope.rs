//! Framing of messages exchanged with the backend.
//!
//! Requests carry an `id` that the backend echoes on the matching response.
//! Events are distinguished from responses by the absence of an `id` field:
//!
//! ```json
//! {"id": 3, "type": "StreamRemoveRequest", "payload": {"guid": "..."}}
//! {"id": 3, "type": "StreamRemoveResponse", "payload": {"error": null}}
//! {"id": 4, "error": {"message": "no such session"}}
//! {"type": "StreamUpdated", "payload": {"guid": "...", "rows": 120}}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request the backend answers with exactly one [`Request::Response`].
pub trait Request: Serialize + Send + 'static {
	/// Wire name carried in the `type` field.
	const TYPE: &'static str;

	/// Message the backend replies with.
	type Response: Response;
}

/// A response payload correlated to a [`Request`].
pub trait Response: DeserializeOwned + Send + 'static {
	/// Wire name carried in the `type` field.
	const TYPE: &'static str;
}

/// Outgoing request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
	/// Correlation id, echoed by the backend.
	pub id: u32,
	/// Request type name.
	#[serde(rename = "type")]
	pub kind: String,
	/// Request body.
	pub payload: Value,
}

/// Incoming response frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
	/// Id of the request this response answers.
	pub id: u32,
	/// Response type name; absent on channel-level failures.
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	/// Response body (mutually exclusive with `error`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<Value>,
	/// Channel-level failure (mutually exclusive with `payload`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
}

/// Incoming fire-and-forget event frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
	/// Event type name.
	#[serde(rename = "type")]
	pub kind: String,
	/// Event body.
	#[serde(default)]
	pub payload: Value,
}

/// Failure reported by the backend for a request it could not process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Discriminated union of incoming messages.
///
/// Uses serde's `untagged` to distinguish based on presence of `id` field:
/// - Messages with `id` are responses
/// - Messages without `id` are events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Response(ResponseEnvelope),
	Event(EventEnvelope),
}
