//! Session construction options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::events::DEFAULT_HUB_CAPACITY;
use crate::ids;
use crate::sidebar::SidebarApp;

/// Everything a session is built from besides its host collaborators.
///
/// Loadable from camelCase JSON:
///
/// ```json
/// {
///   "guid": "7f0c…",
///   "transports": ["dlt", "serial"],
///   "defaultSidebarApps": [{"guid": "search", "name": "Search", "component": "search-filters"}],
///   "eventCapacity": 64
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
	#[serde(default = "ids::guid")]
	pub guid: String,
	/// Transport plugin names, in extension precedence order.
	#[serde(default)]
	pub transports: Vec<String>,
	#[serde(default)]
	pub default_sidebar_apps: Vec<SidebarApp>,
	/// Buffer of the session's outward event hubs.
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
	DEFAULT_HUB_CAPACITY
}

impl SessionOptions {
	pub fn new(guid: impl Into<String>) -> Self {
		Self {
			guid: guid.into(),
			transports: Vec::new(),
			default_sidebar_apps: Vec::new(),
			event_capacity: DEFAULT_HUB_CAPACITY,
		}
	}

	pub fn with_transports<I, S>(mut self, transports: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.transports = transports.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_default_sidebar_app(mut self, app: SidebarApp) -> Self {
		self.default_sidebar_apps.push(app);
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	/// Reads options from a JSON file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path).map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
		let options: Self = serde_json::from_str(&raw).map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
		options.validate()?;
		Ok(options)
	}

	fn validate(&self) -> Result<()> {
		if self.guid.trim().is_empty() {
			return Err(SessionError::Config("session guid must not be empty".to_string()));
		}
		if self.event_capacity == 0 {
			return Err(SessionError::Config("eventCapacity must be at least 1".to_string()));
		}
		Ok(())
	}
}
