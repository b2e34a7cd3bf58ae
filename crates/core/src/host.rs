//! Host-side collaborators a session talks to.
//!
//! The session never reaches for process-wide singletons. Plugin lookup and
//! lifecycle notifications go through [`PluginHost`], sidebar sizing through
//! [`Layout`], and global shortcuts arrive on [`Hotkeys`]. All of them are
//! bundled into a [`SessionHost`] at construction.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use lv_runtime::Connection;
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer};
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::{EventHub, Signal};
use crate::views::{ComponentFactory, ViewKind};

/// Numeric plugin identifier assigned by the plugin manager.
pub type PluginId = u32;

/// IPC endpoint of a plugin process, passed through to the components it contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginIpc {
	pub plugin_id: PluginId,
	pub channel: String,
}

/// Sessions a plugin's controller currently serves.
///
/// Shared by every clone; serializes as the list of session guids.
#[derive(Debug, Clone, Default)]
pub struct PluginSessions {
	guids: Arc<Mutex<BTreeSet<String>>>,
}

impl PluginSessions {
	pub fn insert(&self, guid: &str) -> bool {
		self.guids.lock().insert(guid.to_string())
	}

	pub fn remove(&self, guid: &str) -> bool {
		self.guids.lock().remove(guid)
	}

	pub fn contains(&self, guid: &str) -> bool {
		self.guids.lock().contains(guid)
	}

	pub fn snapshot(&self) -> Vec<String> {
		self.guids.lock().iter().cloned().collect()
	}
}

impl Serialize for PluginSessions {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.collect_seq(self.guids.lock().iter())
	}
}

/// Everything the session needs to know about one plugin.
#[derive(Debug, Clone)]
pub struct PluginData {
	pub id: PluginId,
	pub name: String,
	pub factories: HashMap<ViewKind, ComponentFactory>,
	pub ipc: PluginIpc,
	pub sessions: PluginSessions,
}

impl PluginData {
	/// Plugin without any view contributions.
	pub fn new(id: PluginId, name: impl Into<String>) -> Self {
		let name = name.into();
		Self {
			id,
			ipc: PluginIpc {
				plugin_id: id,
				channel: format!("plugin:{name}"),
			},
			name,
			factories: HashMap::new(),
			sessions: PluginSessions::default(),
		}
	}

	/// Declares the component this plugin contributes for `kind`.
	pub fn with_factory(mut self, kind: ViewKind, factory: impl Into<ComponentFactory>) -> Self {
		self.factories.insert(kind, factory.into());
		self
	}

	pub fn with_ipc_channel(mut self, channel: impl Into<String>) -> Self {
		self.ipc.channel = channel.into();
		self
	}
}

/// Looks up the component `plugin` contributes for `kind`.
pub fn factory_for(plugin: &PluginData, kind: ViewKind) -> Option<&ComponentFactory> {
	plugin.factories.get(&kind)
}

/// Session-scoped plugin API handle, handed to plugin sidebar tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginApi {
	pub plugin_id: PluginId,
	pub session: String,
}

/// Produces the API handle for a plugin; supplied by the host per session.
pub type PluginApiResolver = Arc<dyn Fn(PluginId) -> PluginApi + Send + Sync>;

/// Plugin lookup plus the session lifecycle notifications plugins receive.
pub trait PluginHost: Send + Sync {
	fn plugin(&self, name: &str) -> Option<Arc<PluginData>>;

	fn plugin_by_id(&self, id: PluginId) -> Option<Arc<PluginData>>;

	fn on_session_open(&self, guid: &str);

	fn on_session_close(&self, guid: &str);

	fn on_session_change(&self, guid: &str);
}

/// Lifecycle notification fanned out by [`PluginRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotification {
	Opened(String),
	Closed(String),
	Changed(String),
}

/// In-memory [`PluginHost`].
///
/// Registering a plugin under an existing name replaces it.
#[derive(Debug, Default)]
pub struct PluginRegistry {
	plugins: RwLock<Vec<Arc<PluginData>>>,
	notifications: EventHub<SessionNotification>,
}

impl PluginRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, plugin: PluginData) -> Arc<PluginData> {
		let plugin = Arc::new(plugin);
		let mut plugins = self.plugins.write();
		plugins.retain(|existing| existing.name != plugin.name);
		plugins.push(Arc::clone(&plugin));
		debug!(target = "lv.plugins", name = %plugin.name, id = plugin.id, "plugin registered");
		plugin
	}

	pub fn len(&self) -> usize {
		self.plugins.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.plugins.read().is_empty()
	}

	/// Notifications published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionNotification> {
		self.notifications.subscribe()
	}
}

impl PluginHost for PluginRegistry {
	fn plugin(&self, name: &str) -> Option<Arc<PluginData>> {
		self.plugins.read().iter().find(|plugin| plugin.name == name).cloned()
	}

	fn plugin_by_id(&self, id: PluginId) -> Option<Arc<PluginData>> {
		self.plugins.read().iter().find(|plugin| plugin.id == id).cloned()
	}

	fn on_session_open(&self, guid: &str) {
		for plugin in self.plugins.read().iter() {
			plugin.sessions.insert(guid);
		}
		self.notifications.publish(SessionNotification::Opened(guid.to_string()));
	}

	fn on_session_close(&self, guid: &str) {
		for plugin in self.plugins.read().iter() {
			plugin.sessions.remove(guid);
		}
		self.notifications.publish(SessionNotification::Closed(guid.to_string()));
	}

	fn on_session_change(&self, guid: &str) {
		self.notifications.publish(SessionNotification::Changed(guid.to_string()));
	}
}

/// Global keyboard shortcuts.
#[derive(Debug, Clone, Default)]
pub struct Hotkeys {
	open_search_filters: Signal<()>,
}

impl Hotkeys {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fired when the user asks for the search filters tab.
	pub fn open_search_filters(&self) -> &Signal<()> {
		&self.open_search_filters
	}
}

/// Window layout controls used by sessions.
pub trait Layout: Send + Sync {
	/// Expands the sidebar to its maximum size.
	fn sidebar_max(&self);
}

/// Collaborators shared by every session of one host.
#[derive(Clone)]
pub struct SessionHost {
	pub backend: Arc<Connection>,
	pub plugins: Arc<dyn PluginHost>,
	pub hotkeys: Hotkeys,
	pub layout: Arc<dyn Layout>,
	pub api_resolver: PluginApiResolver,
}

impl SessionHost {
	pub fn new(backend: Arc<Connection>, plugins: Arc<dyn PluginHost>, hotkeys: Hotkeys, layout: Arc<dyn Layout>, api_resolver: PluginApiResolver) -> Self {
		Self {
			backend,
			plugins,
			hotkeys,
			layout,
			api_resolver,
		}
	}
}
