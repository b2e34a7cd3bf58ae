//! User-marked stream positions.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::{DEFAULT_HUB_CAPACITY, EventHub};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarksEvent {
	Added(u64),
	Removed(u64),
	Reset,
}

/// Ordered set of bookmarked rows for one session.
#[derive(Debug)]
pub struct Bookmarks {
	guid: String,
	rows: Mutex<BTreeSet<u64>>,
	events: EventHub<BookmarksEvent>,
}

impl Bookmarks {
	pub fn new(guid: impl Into<String>) -> Self {
		Self {
			guid: guid.into(),
			rows: Mutex::new(BTreeSet::new()),
			events: EventHub::new(DEFAULT_HUB_CAPACITY),
		}
	}

	/// Returns `false` if `row` was already bookmarked.
	pub fn add(&self, row: u64) -> bool {
		let added = self.rows.lock().insert(row);
		if added {
			self.events.publish(BookmarksEvent::Added(row));
		}
		added
	}

	pub fn remove(&self, row: u64) -> bool {
		let removed = self.rows.lock().remove(&row);
		if removed {
			self.events.publish(BookmarksEvent::Removed(row));
		}
		removed
	}

	/// Flips `row` and returns whether it is bookmarked afterwards.
	pub fn toggle(&self, row: u64) -> bool {
		if self.has(row) {
			!self.remove(row)
		} else {
			self.add(row)
		}
	}

	pub fn has(&self, row: u64) -> bool {
		self.rows.lock().contains(&row)
	}

	/// Bookmarked rows in ascending order.
	pub fn positions(&self) -> Vec<u64> {
		self.rows.lock().iter().copied().collect()
	}

	pub fn len(&self) -> usize {
		self.rows.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.lock().is_empty()
	}

	/// Drops every bookmark.
	pub fn reset(&self) {
		let dropped = std::mem::take(&mut *self.rows.lock()).len();
		debug!(target = "lv.bookmarks", guid = %self.guid, dropped, "bookmarks reset");
		self.events.publish(BookmarksEvent::Reset);
	}

	pub fn subscribe(&self) -> broadcast::Receiver<BookmarksEvent> {
		self.events.subscribe()
	}
}
