//! Viewport events shared by the output area's components.

use tokio::sync::broadcast;

use crate::events::{DEFAULT_HUB_CAPACITY, EventHub};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewportEvent {
	Resized { width: u32, height: u32 },
	RowSelected { row: u64 },
}

/// Multicast hub for [`ViewportEvent`]s of one session.
#[derive(Debug)]
pub struct ViewportEvents {
	hub: EventHub<ViewportEvent>,
}

impl ViewportEvents {
	pub fn new() -> Self {
		Self {
			hub: EventHub::new(DEFAULT_HUB_CAPACITY),
		}
	}

	pub fn emit(&self, event: ViewportEvent) {
		self.hub.publish(event);
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ViewportEvent> {
		self.hub.subscribe()
	}

	/// Releases the hub. Later emits are dropped and receivers see the channel close.
	pub fn destroy(&self) {
		self.hub.close();
	}

	pub fn is_destroyed(&self) -> bool {
		self.hub.is_closed()
	}
}

impl Default for ViewportEvents {
	fn default() -> Self {
		Self::new()
	}
}
