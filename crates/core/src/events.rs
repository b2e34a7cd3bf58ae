//! Publish/subscribe primitives shared by the session and its controllers.
//!
//! Two flavours exist:
//!
//! - [`EventHub`] wraps [`tokio::sync::broadcast`]. It is a multicast relay, not a
//!   queue: receivers only see events sent after they subscribed, nothing is
//!   replayed, and events published with no receivers are dropped.
//! - [`Signal`] invokes synchronous callbacks in registration order. Host-wide
//!   triggers (hotkeys) use it so subscribing never needs a runtime.
//!
//! Both hand out a [`Subscription`] (or a receiver) whose release is explicit.
//! The session keeps its handles in a [`SubscriptionSet`] and unsubscribes them
//! all on teardown.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Default per-hub buffer before slow receivers start lagging.
pub const DEFAULT_HUB_CAPACITY: usize = 128;

/// Multicast channel of `T` that can be closed.
///
/// Once closed, publishing is a no-op and receivers observe
/// [`broadcast::error::RecvError::Closed`] after draining what was already sent.
pub struct EventHub<T> {
	tx: Mutex<Option<broadcast::Sender<T>>>,
}

impl<T: Clone + Send + 'static> EventHub<T> {
	/// Creates an open hub; capacity is clamped to at least 1.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity.max(1));
		Self { tx: Mutex::new(Some(tx)) }
	}

	/// Sends `event` to every current receiver and returns how many there were.
	pub fn publish(&self, event: T) -> usize {
		match self.tx.lock().as_ref() {
			Some(tx) => tx.send(event).unwrap_or(0),
			None => 0,
		}
	}

	/// Returns a receiver for events published from now on.
	///
	/// Subscribing to a closed hub yields a receiver that is already closed.
	pub fn subscribe(&self) -> broadcast::Receiver<T> {
		match self.tx.lock().as_ref() {
			Some(tx) => tx.subscribe(),
			None => {
				let (tx, rx) = broadcast::channel(1);
				drop(tx);
				rx
			}
		}
	}

	pub fn receiver_count(&self) -> usize {
		self.tx.lock().as_ref().map_or(0, broadcast::Sender::receiver_count)
	}

	/// Drops the sender so receivers see the channel close.
	pub fn close(&self) {
		self.tx.lock().take();
	}

	pub fn is_closed(&self) -> bool {
		self.tx.lock().is_none()
	}
}

impl<T: Clone + Send + 'static> Default for EventHub<T> {
	fn default() -> Self {
		Self::new(DEFAULT_HUB_CAPACITY)
	}
}

impl<T> fmt::Debug for EventHub<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventHub").field("closed", &self.tx.lock().is_none()).finish()
	}
}

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
	next_id: AtomicU64,
	handlers: Mutex<Vec<(u64, Handler<T>)>>,
}

/// Synchronous multicast signal.
///
/// Cloning yields another handle to the same signal.
pub struct Signal<T> {
	inner: Arc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(SignalInner {
				next_id: AtomicU64::new(0),
				handlers: Mutex::new(Vec::new()),
			}),
		}
	}

	/// Registers `handler`; it runs on every [`Signal::emit`] until the subscription is released.
	pub fn subscribe<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&T) + Send + Sync + 'static,
	{
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		self.inner.handlers.lock().push((id, Arc::new(handler)));

		let weak: Weak<SignalInner<T>> = Arc::downgrade(&self.inner);
		Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.handlers.lock().retain(|(handler_id, _)| *handler_id != id);
			}
		})
	}

	/// Invokes every registered handler with `value`.
	///
	/// Handlers run outside the registry lock, so a handler may subscribe or
	/// unsubscribe without deadlocking.
	pub fn emit(&self, value: &T) {
		let handlers: Vec<Handler<T>> = self.inner.handlers.lock().iter().map(|(_, handler)| Arc::clone(handler)).collect();
		for handler in handlers {
			handler(value);
		}
	}

	pub fn handler_count(&self) -> usize {
		self.inner.handlers.lock().len()
	}
}

impl<T: 'static> Default for Signal<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal").field("handlers", &self.inner.handlers.lock().len()).finish()
	}
}

/// Handle to a registration that is released exactly once.
///
/// Released by [`Subscription::unsubscribe`] or, failing that, on drop.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
	release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
	/// Wraps the closure that undoes a registration.
	pub fn new<F>(release: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		Self {
			release: Some(Box::new(release)),
		}
	}

	/// Subscription that aborts `task` when released.
	pub fn from_task(task: tokio::task::JoinHandle<()>) -> Self {
		Self::new(move || task.abort())
	}

	/// Releases the registration. Later calls do nothing.
	pub fn unsubscribe(&mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}

	pub fn is_active(&self) -> bool {
		self.release.is_some()
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("active", &self.is_active()).finish()
	}
}

/// Named subscriptions owned by one component.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
	entries: BTreeMap<&'static str, Subscription>,
}

impl SubscriptionSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `subscription` under `name`, releasing whatever was stored there before.
	pub fn insert(&mut self, name: &'static str, subscription: Subscription) {
		if let Some(mut previous) = self.entries.insert(name, subscription) {
			previous.unsubscribe();
		}
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Releases every subscription in name order and returns how many were released.
	pub fn unsubscribe_all(&mut self) -> usize {
		let entries = std::mem::take(&mut self.entries);
		let count = entries.len();
		for (_, mut subscription) in entries {
			subscription.unsubscribe();
		}
		count
	}
}
