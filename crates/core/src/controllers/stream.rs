//! Live content of one session.
//!
//! The stream controller opens the backend stream for the session, follows the
//! backend's row-count and source events, and exposes the result as an
//! [`OutputStream`] that search and map read from.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lv_protocol::{BackendEvent, StreamAddRequest, StreamChunkRequest};
use lv_runtime::Connection;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::bookmarks::Bookmarks;
use crate::error::{Result, SessionError};
use crate::events::{DEFAULT_HUB_CAPACITY, EventHub, Subscription};
use crate::scope::Scope;

/// Scope key holding the id of the latest source feeding the stream.
pub const SCOPE_SOURCE_KEY: &str = "stream.source";

/// Row count and current source of a session's stream.
#[derive(Debug)]
pub struct OutputStream {
	rows: AtomicU64,
	source: Mutex<Option<u32>>,
	updates: EventHub<u64>,
}

impl OutputStream {
	fn new() -> Self {
		Self {
			rows: AtomicU64::new(0),
			source: Mutex::new(None),
			updates: EventHub::new(DEFAULT_HUB_CAPACITY),
		}
	}

	pub fn rows(&self) -> u64 {
		self.rows.load(Ordering::SeqCst)
	}

	pub fn source(&self) -> Option<u32> {
		*self.source.lock()
	}

	/// Row-count updates from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<u64> {
		self.updates.subscribe()
	}

	fn set_rows(&self, rows: u64) {
		self.rows.store(rows, Ordering::SeqCst);
		self.updates.publish(rows);
	}

	fn clear(&self) {
		self.rows.store(0, Ordering::SeqCst);
		self.source.lock().take();
		self.updates.close();
	}
}

pub struct StreamController {
	guid: String,
	transports: Vec<String>,
	scope: Arc<Scope>,
	backend: Arc<Connection>,
	bookmarks: Bookmarks,
	output: Arc<OutputStream>,
	source_changed: Arc<EventHub<u32>>,
	listener: Mutex<Option<Subscription>>,
}

impl StreamController {
	pub fn new(guid: impl Into<String>, transports: Vec<String>, scope: Arc<Scope>, backend: Arc<Connection>) -> Self {
		let guid = guid.into();
		Self {
			bookmarks: Bookmarks::new(guid.clone()),
			guid,
			transports,
			scope,
			backend,
			output: Arc::new(OutputStream::new()),
			source_changed: Arc::new(EventHub::new(DEFAULT_HUB_CAPACITY)),
			listener: Mutex::new(None),
		}
	}

	/// Opens the backend stream and starts following its events.
	pub async fn init(&self) -> Result<()> {
		if self.listener.lock().is_some() {
			return Err(SessionError::subsystem("stream", &self.guid, "already initialized"));
		}

		// Subscribe before the add request so no early update is missed.
		let events = self.backend.subscribe_events();
		let response = self
			.backend
			.request(StreamAddRequest {
				guid: self.guid.clone(),
				transports: self.transports.clone(),
			})
			.await?;
		if let Some(error) = response.error {
			return Err(SessionError::subsystem("stream", &self.guid, error));
		}

		let task = tokio::spawn(follow_backend(
			self.guid.clone(),
			events,
			Arc::clone(&self.output),
			Arc::clone(&self.scope),
			Arc::clone(&self.source_changed),
		));
		*self.listener.lock() = Some(Subscription::from_task(task));
		info!(target = "lv.stream", guid = %self.guid, transports = ?self.transports, "stream opened");
		Ok(())
	}

	/// Fetches rows `start..end` as text.
	pub async fn chunk(&self, start: u64, end: u64) -> Result<Vec<String>> {
		if end < start {
			return Err(SessionError::subsystem("stream", &self.guid, format!("invalid range {start}..{end}")));
		}
		let response = self
			.backend
			.request(StreamChunkRequest {
				guid: self.guid.clone(),
				start,
				end,
			})
			.await?;
		match response.error {
			Some(error) => Err(SessionError::subsystem("stream", &self.guid, error)),
			None => Ok(response.rows),
		}
	}

	/// Stops following backend events and releases the output handle.
	pub async fn destroy(&self) -> Result<()> {
		if let Some(mut listener) = self.listener.lock().take() {
			listener.unsubscribe();
		}
		self.output.clear();
		self.source_changed.close();
		debug!(target = "lv.stream", guid = %self.guid, "stream destroyed");
		Ok(())
	}

	pub fn guid(&self) -> &str {
		&self.guid
	}

	pub fn transports(&self) -> &[String] {
		&self.transports
	}

	pub fn bookmarks(&self) -> &Bookmarks {
		&self.bookmarks
	}

	pub fn output(&self) -> Arc<OutputStream> {
		Arc::clone(&self.output)
	}

	/// Source ids announced from now on.
	pub fn on_source_changed(&self) -> broadcast::Receiver<u32> {
		self.source_changed.subscribe()
	}

	pub fn is_following(&self) -> bool {
		self.listener.lock().as_ref().is_some_and(Subscription::is_active)
	}
}

async fn follow_backend(guid: String, mut events: broadcast::Receiver<BackendEvent>, output: Arc<OutputStream>, scope: Arc<Scope>, source_changed: Arc<EventHub<u32>>) {
	loop {
		let event = match events.recv().await {
			Ok(event) => event,
			Err(RecvError::Lagged(skipped)) => {
				warn!(target = "lv.stream", guid = %guid, skipped, "stream listener lagged behind backend events");
				continue;
			}
			Err(RecvError::Closed) => break,
		};
		if event.guid() != guid {
			continue;
		}

		match event {
			BackendEvent::StreamUpdated(update) => output.set_rows(update.rows),
			BackendEvent::StreamSourceNew(source) => {
				*output.source.lock() = Some(source.source);
				if let Err(e) = scope.set(SCOPE_SOURCE_KEY, source.source) {
					warn!(target = "lv.stream", guid = %guid, error = %e, "failed to record stream source");
				}
				source_changed.publish(source.source);
			}
		}
	}
	debug!(target = "lv.stream", guid = %guid, "backend event stream closed");
}
