//! Sidebar tab registry.
//!
//! An ordered set of tabs keyed by guid with at most one active tab. Sessions
//! rebuild it from scratch rather than merging, so the registry itself has no
//! notion of where a tab came from.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, SessionError};
use crate::views::{ComponentFactory, Inputs};

/// What a tab renders.
#[derive(Debug, Clone, PartialEq)]
pub struct TabContent {
	pub factory: ComponentFactory,
	/// The factory can be instantiated without further negotiation.
	pub resolved: bool,
	pub inputs: Inputs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidebarTab {
	pub guid: String,
	pub name: String,
	pub active: bool,
	pub closable: bool,
	pub content: TabContent,
}

/// A tab as described by the host, before it gets a guid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarApp {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub guid: Option<String>,
	pub name: String,
	pub component: ComponentFactory,
	#[serde(default)]
	pub closable: bool,
	#[serde(default)]
	pub active: bool,
	#[serde(default, skip_serializing_if = "Inputs::is_empty")]
	pub inputs: Inputs,
}

impl SidebarApp {
	pub fn new(name: impl Into<String>, component: impl Into<ComponentFactory>) -> Self {
		Self {
			guid: None,
			name: name.into(),
			component: component.into(),
			closable: false,
			active: false,
			inputs: Inputs::new(),
		}
	}

	pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
		self.guid = Some(guid.into());
		self
	}

	pub fn with_closable(mut self, closable: bool) -> Self {
		self.closable = closable;
		self
	}

	pub fn with_active(mut self, active: bool) -> Self {
		self.active = active;
		self
	}
}

/// Ordered tab collection with single-selection semantics.
#[derive(Debug, Default)]
pub struct SidebarTabs {
	tabs: Vec<SidebarTab>,
}

impl SidebarTabs {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `tab`, rejecting a guid that is already present.
	///
	/// A tab added as active becomes the only active tab.
	pub fn add(&mut self, tab: SidebarTab) -> Result<()> {
		if self.has(&tab.guid) {
			return Err(SessionError::Sidebar(format!("tab \"{}\" already exists", tab.guid)));
		}
		if tab.active {
			self.deactivate_all();
		}
		trace!(target = "lv.sidebar", guid = %tab.guid, name = %tab.name, active = tab.active, "tab added");
		self.tabs.push(tab);
		Ok(())
	}

	pub fn has(&self, guid: &str) -> bool {
		self.tabs.iter().any(|tab| tab.guid == guid)
	}

	pub fn get(&self, guid: &str) -> Option<&SidebarTab> {
		self.tabs.iter().find(|tab| tab.guid == guid)
	}

	/// Makes `guid` the only active tab. Returns `false` (changing nothing) when absent.
	pub fn set_active(&mut self, guid: &str) -> bool {
		if !self.has(guid) {
			return false;
		}
		for tab in &mut self.tabs {
			tab.active = tab.guid == guid;
		}
		true
	}

	/// Removes `guid`; when it was active the first remaining tab takes over.
	pub fn remove(&mut self, guid: &str) -> Option<SidebarTab> {
		let index = self.tabs.iter().position(|tab| tab.guid == guid)?;
		let removed = self.tabs.remove(index);
		if removed.active {
			if let Some(first) = self.tabs.first_mut() {
				first.active = true;
			}
		}
		Some(removed)
	}

	pub fn clear(&mut self) {
		self.tabs.clear();
	}

	pub fn tabs(&self) -> &[SidebarTab] {
		&self.tabs
	}

	pub fn active(&self) -> Option<&SidebarTab> {
		self.tabs.iter().find(|tab| tab.active)
	}

	pub fn len(&self) -> usize {
		self.tabs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tabs.is_empty()
	}

	fn deactivate_all(&mut self) {
		for tab in &mut self.tabs {
			tab.active = false;
		}
	}
}
