//! Per-session key/value store shared by sibling controllers.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SessionError};

/// Ad-hoc shared state for one session.
///
/// Stream, search and map write here instead of holding references to each other.
/// Nothing is persisted and no other session can see the entries.
#[derive(Debug)]
pub struct Scope {
	session: String,
	entries: RwLock<HashMap<String, Value>>,
}

impl Scope {
	pub fn new(session: impl Into<String>) -> Self {
		Self {
			session: session.into(),
			entries: RwLock::new(HashMap::new()),
		}
	}

	/// Guid of the owning session.
	pub fn session(&self) -> &str {
		&self.session
	}

	pub fn get(&self, key: &str) -> Option<Value> {
		self.entries.read().get(key).cloned()
	}

	/// Reads `key` as `T`; `None` when absent or of another shape.
	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		let value = self.get(key)?;
		match serde_json::from_value(value) {
			Ok(typed) => Some(typed),
			Err(e) => {
				debug!(target = "lv.scope", session = %self.session, key, error = %e, "scope entry has unexpected shape");
				None
			}
		}
	}

	/// Stores `value` under `key` and returns the previous value.
	///
	/// A value that does not serialize leaves the entry untouched.
	pub fn set(&self, key: impl Into<String>, value: impl Serialize) -> Result<Option<Value>> {
		let key = key.into();
		let value = serde_json::to_value(value).map_err(|e| SessionError::subsystem("scope", &self.session, format!("entry \"{key}\": {e}")))?;
		Ok(self.entries.write().insert(key, value))
	}

	pub fn remove(&self, key: &str) -> Option<Value> {
		self.entries.write().remove(key)
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}
