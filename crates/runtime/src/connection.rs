//! Request/response correlation layer for the backend channel.
//!
//! This module implements the correlation layer on top of the transport.
//! It handles:
//! - Generating unique request IDs
//! - Correlating responses with pending requests
//! - Checking the response type against the one the request expects
//! - Distinguishing events from responses and fanning events out to subscribers
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::request`] with a typed request
//! 2. Connection generates a unique ID and parks a oneshot sender under it
//! 3. Request is serialized and sent via transport
//! 4. Caller awaits on the oneshot receiver
//! 5. Message loop receives the response from the transport
//! 6. Response is correlated by ID and sent via the oneshot channel
//! 7. Caller decodes the typed response
//!
//! Every request resolves exactly once: with its response, with the transport
//! error that prevented sending it, or with [`Error::ChannelClosed`] when the
//! message loop ends first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use lv_protocol::{BackendEvent, ErrorPayload, Message, Request, RequestEnvelope, Response, ResponseEnvelope};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex as AsyncMutex, broadcast, mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Default number of backend events buffered per subscriber before it lags.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

struct PendingRequest {
	expected: &'static str,
	tx: oneshot::Sender<Result<JsonValue>>,
}

/// Connection to the backend indexer process.
///
/// Shared across sessions behind an `Arc`; any number of requests may be in
/// flight at once. [`Connection::run`] must be spawned once to drive the
/// message loop.
pub struct Connection {
	last_id: AtomicU32,
	callbacks: Mutex<HashMap<u32, PendingRequest>>,
	sender: AsyncMutex<Box<dyn Transport>>,
	receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
	message_rx: Mutex<Option<mpsc::UnboundedReceiver<JsonValue>>>,
	events: broadcast::Sender<BackendEvent>,
	closed: AtomicBool,
}

impl Connection {
	/// Creates a connection over `parts` with the default event capacity.
	pub fn new(parts: TransportParts) -> Self {
		Self::with_event_capacity(parts, DEFAULT_EVENT_CAPACITY)
	}

	/// Creates a connection buffering up to `capacity` events per lagging subscriber.
	pub fn with_event_capacity(parts: TransportParts, capacity: usize) -> Self {
		let (events, _) = broadcast::channel(capacity.max(1));
		Self {
			last_id: AtomicU32::new(0),
			callbacks: Mutex::new(HashMap::new()),
			sender: AsyncMutex::new(parts.sender),
			receiver: Mutex::new(Some(parts.receiver)),
			message_rx: Mutex::new(Some(parts.message_rx)),
			events,
			closed: AtomicBool::new(false),
		}
	}

	/// Sends a typed request and awaits its typed response.
	pub async fn request<Q: Request>(&self, request: Q) -> Result<Q::Response> {
		let payload = serde_json::to_value(&request)?;
		let value = self.send_message(Q::TYPE, <Q::Response as Response>::TYPE, payload).await?;
		Ok(serde_json::from_value(value)?)
	}

	/// Sends a raw request frame and awaits the payload of a response of type `expected`.
	pub async fn send_message(&self, kind: &str, expected: &'static str, payload: JsonValue) -> Result<JsonValue> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, PendingRequest { expected, tx });

		if self.closed.load(Ordering::SeqCst) {
			self.callbacks.lock().remove(&id);
			return Err(Error::ChannelClosed);
		}

		let envelope = RequestEnvelope {
			id,
			kind: kind.to_string(),
			payload,
		};
		let sent = match serde_json::to_value(&envelope) {
			Ok(frame) => self.sender.lock().await.send(frame).await,
			Err(e) => Err(e.into()),
		};
		if let Err(e) = sent {
			self.callbacks.lock().remove(&id);
			return Err(e);
		}
		trace!(target = "lv.backend", id, kind, "request sent");

		rx.await.map_err(|_| Error::ChannelClosed).and_then(|result| result)
	}

	/// Subscribes to events pushed by the backend from now on.
	pub fn subscribe_events(&self) -> broadcast::Receiver<BackendEvent> {
		self.events.subscribe()
	}

	/// Whether the message loop has ended.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Number of requests still awaiting a response.
	pub fn pending_requests(&self) -> usize {
		self.callbacks.lock().len()
	}

	/// Runs the message dispatch loop until the transport closes.
	///
	/// Pending requests are failed with [`Error::ChannelClosed`] once the loop ends.
	pub async fn run(&self) -> Result<()> {
		let receiver = self.receiver.lock().take();
		let message_rx = self.message_rx.lock().take();
		let (Some(receiver), Some(mut message_rx)) = (receiver, message_rx) else {
			return Err(Error::AlreadyRunning);
		};

		let transport_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				error!(target = "lv.backend", error = %e, "transport error");
			}
		});

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(message_value.clone()) {
				Ok(message) => {
					if let Err(e) = self.dispatch(message) {
						error!(target = "lv.backend", error = %e, "error dispatching message");
					}
				}
				Err(e) => {
					error!(target = "lv.backend", error = %e, raw = %message_value, "failed to parse message");
				}
			}
		}

		debug!(target = "lv.backend", "message loop ended (transport closed)");
		self.closed.store(true, Ordering::SeqCst);
		self.fail_pending();

		let _ = transport_handle.await;
		Ok(())
	}

	fn dispatch(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => {
				let pending = self
					.callbacks
					.lock()
					.remove(&response.id)
					.ok_or_else(|| Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id)))?;

				let result = resolve_response(pending.expected, response);
				let _ = pending.tx.send(result);
				Ok(())
			}
			Message::Event(envelope) => {
				let kind = envelope.kind.clone();
				match BackendEvent::from_envelope(envelope) {
					Some(event) => {
						trace!(target = "lv.backend", kind = %kind, guid = event.guid(), "event received");
						let _ = self.events.send(event);
					}
					None => debug!(target = "lv.backend", kind = %kind, "ignoring unknown event"),
				}
				Ok(())
			}
		}
	}

	fn fail_pending(&self) {
		let pending: Vec<PendingRequest> = self.callbacks.lock().drain().map(|(_, pending)| pending).collect();
		for request in pending {
			let _ = request.tx.send(Err(Error::ChannelClosed));
		}
	}
}

fn resolve_response(expected: &'static str, response: ResponseEnvelope) -> Result<JsonValue> {
	if let Some(error) = response.error {
		return Err(parse_remote_error(error));
	}

	match response.kind.as_deref() {
		Some(kind) if kind == expected => Ok(response.payload.unwrap_or_else(|| JsonValue::Object(Default::default()))),
		other => Err(Error::ProtocolError(format!(
			"unexpected response type for id={}: expected {expected}, got {}",
			response.id,
			other.unwrap_or("<none>")
		))),
	}
}

fn parse_remote_error(error: ErrorPayload) -> Error {
	Error::Remote {
		name: error.name,
		message: error.message,
	}
}
