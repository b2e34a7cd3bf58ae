//! Fake transport for unit testing request correlation and event dispatch.
//!
//! Provides an in-memory transport for exercising the protocol layer without a
//! backend process.
//!
//! # Example
//!
//! ```ignore
//! let (parts, controller) = FakeTransportBuilder::new().build();
//! let connection = Arc::new(Connection::new(parts));
//!
//! tokio::spawn({
//!     let conn = Arc::clone(&connection);
//!     async move { conn.run().await }
//! });
//!
//! let fut = connection.request(StreamResetRequest { guid: "s1".into() });
//! controller.inject_response(0, "StreamResetResponse", json!({}));
//! let result = fut.await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {
	fail_sends: bool,
}

impl FakeTransportBuilder {
	/// Create a new fake transport builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every send fail with [`Error::Transport`], simulating a broken pipe.
	pub fn failing_sends(mut self) -> Self {
		self.fail_sends = true;
		self
	}

	/// Build the fake transport and return both parts and a controller.
	///
	/// Returns [`TransportParts`] for creating a [`Connection`] and a
	/// [`FakeTransportController`] for injecting responses and inspecting sent messages.
	///
	/// [`Connection`]: crate::connection::Connection
	pub fn build(self) -> (TransportParts, FakeTransportController) {
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let (sent_tx, sent_rx) = mpsc::unbounded_channel();
		let sent_messages = Arc::new(Mutex::new(Vec::new()));

		let sender = FakeTransportSender {
			sent: Arc::clone(&sent_messages),
			sent_tx,
			fail: self.fail_sends,
		};

		let receiver = FakeTransportReceiver { inbound_rx, message_tx };

		let controller = FakeTransportController {
			inbound_tx: Mutex::new(Some(inbound_tx)),
			sent: sent_messages,
			sent_rx: AsyncMutex::new(sent_rx),
		};

		let parts = TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		};

		(parts, controller)
	}
}

/// Controller for injecting responses/events and inspecting sent messages.
pub struct FakeTransportController {
	inbound_tx: Mutex<Option<mpsc::UnboundedSender<JsonValue>>>,
	sent: Arc<Mutex<Vec<JsonValue>>>,
	sent_rx: AsyncMutex<mpsc::UnboundedReceiver<JsonValue>>,
}

impl FakeTransportController {
	/// Inject a raw JSON message into the connection.
	///
	/// Use this to simulate receiving a message from the backend.
	pub fn inject(&self, message: JsonValue) {
		if let Some(tx) = self.inbound_tx.lock().as_ref() {
			let _ = tx.send(message);
		}
	}

	/// Inject a response of type `kind` for request `id`.
	pub fn inject_response(&self, id: u32, kind: &str, payload: JsonValue) {
		self.inject(serde_json::json!({
			"id": id,
			"type": kind,
			"payload": payload
		}));
	}

	/// Inject a channel-level error response.
	pub fn inject_error(&self, id: u32, message: &str) {
		self.inject(serde_json::json!({
			"id": id,
			"error": {
				"message": message
			}
		}));
	}

	/// Inject an event message.
	pub fn inject_event(&self, kind: &str, payload: JsonValue) {
		self.inject(serde_json::json!({
			"type": kind,
			"payload": payload
		}));
	}

	/// Waits for the next message the connection sends.
	///
	/// Returns `None` once the sending half has been dropped.
	pub async fn next_sent(&self) -> Option<JsonValue> {
		self.sent_rx.lock().await.recv().await
	}

	/// Take all sent messages, clearing the buffer.
	pub fn take_sent(&self) -> Vec<JsonValue> {
		std::mem::take(&mut *self.sent.lock())
	}

	/// Simulates the backend going away: the receiving half finishes once queued messages drain.
	pub fn close(&self) {
		self.inbound_tx.lock().take();
	}
}

struct FakeTransportSender {
	sent: Arc<Mutex<Vec<JsonValue>>>,
	sent_tx: mpsc::UnboundedSender<JsonValue>,
	fail: bool,
}

impl Transport for FakeTransportSender {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			if self.fail {
				return Err(Error::Transport("broken pipe".to_string()));
			}
			self.sent.lock().push(message.clone());
			let _ = self.sent_tx.send(message);
			Ok(())
		})
	}
}

struct FakeTransportReceiver {
	inbound_rx: mpsc::UnboundedReceiver<JsonValue>,
	message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl TransportReceiver for FakeTransportReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(message) = self.inbound_rx.recv().await {
				if self.message_tx.send(message).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}
