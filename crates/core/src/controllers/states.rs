//! Session-scoped view state, independent of stream content.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SessionError};

pub struct StatesController {
	guid: String,
	states: RwLock<HashMap<String, Value>>,
}

impl StatesController {
	pub fn new(guid: impl Into<String>) -> Self {
		Self {
			guid: guid.into(),
			states: RwLock::new(HashMap::new()),
		}
	}

	/// Stores the state of view `key`, replacing what was there.
	pub fn set(&self, key: impl Into<String>, state: impl Serialize) -> Result<()> {
		let key = key.into();
		let value = serde_json::to_value(state).map_err(|e| SessionError::subsystem("states", &self.guid, format!("state \"{key}\": {e}")))?;
		self.states.write().insert(key, value);
		Ok(())
	}

	pub fn get(&self, key: &str) -> Option<Value> {
		self.states.read().get(key).cloned()
	}

	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.get(key).and_then(|value| serde_json::from_value(value).ok())
	}

	pub fn remove(&self, key: &str) -> Option<Value> {
		self.states.write().remove(key)
	}

	/// Stored keys in ascending order.
	pub fn keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.states.read().keys().cloned().collect();
		keys.sort();
		keys
	}

	pub async fn destroy(&self) -> Result<()> {
		let dropped = std::mem::take(&mut *self.states.write()).len();
		debug!(target = "lv.states", guid = %self.guid, dropped, "states destroyed");
		Ok(())
	}
}
