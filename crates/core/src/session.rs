//! Session orchestration.
//!
//! A [`Session`] owns every controller of one opened log source and drives
//! their lifecycle against the backend:
//!
//! 1. [`Session::new`] wires stream, search, map and states around a shared
//!    [`Scope`] and subscribes to the "open search filters" hotkey. No remote work.
//! 2. [`Session::init`] opens the backend stream, tells plugins the session
//!    opened and builds the sidebar.
//! 3. [`Session::destroy`] releases subscriptions, asks the backend to drop the
//!    stream and, only if it agrees, tears down everything local.
//!
//! Every other operation requires the session to be [`Lifecycle::Active`] and
//! fails fast with [`SessionError::InvalidState`] otherwise.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use lv_protocol::{StreamRemoveRequest, StreamResetRequest};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::controllers::{Bookmarks, MapController, SearchController, StatesController, StreamController};
use crate::error::{Result, SessionError};
use crate::events::{EventHub, SubscriptionSet};
use crate::host::{PluginData, SessionHost, factory_for};
use crate::ids;
use crate::options::SessionOptions;
use crate::scope::Scope;
use crate::sidebar::{SidebarApp, SidebarTab, SidebarTabs, TabContent};
use crate::viewport::ViewportEvents;
use crate::views::{ComponentInjection, InjectionAddEvent, InjectionRemoveEvent, Inputs, ViewKind};

/// Guid (or, failing that, name) of the tab the search hotkey activates.
pub const SEARCH_TAB: &str = "search";

const HOTKEY_SUBSCRIPTION: &str = "open_search_filters";

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
	Created,
	Initializing,
	Active,
	/// Initialization failed; terminal.
	Failed,
	Destroying,
	/// The backend refused to release the stream; `destroy` may be retried.
	DestroyFailed,
	Destroyed,
}

impl fmt::Display for Lifecycle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Created => "created",
			Self::Initializing => "initializing",
			Self::Active => "active",
			Self::Failed => "failed",
			Self::Destroying => "destroying",
			Self::DestroyFailed => "destroy failed",
			Self::Destroyed => "destroyed",
		};
		f.write_str(name)
	}
}

type SharedSidebar = Arc<Mutex<Option<SidebarTabs>>>;

/// One opened log source and everything it owns.
pub struct Session {
	guid: String,
	transports: Vec<String>,
	default_apps: Vec<SidebarApp>,
	host: SessionHost,
	scope: Arc<Scope>,
	stream: Arc<StreamController>,
	search: Arc<SearchController>,
	map: MapController,
	states: StatesController,
	viewport: ViewportEvents,
	sidebar: SharedSidebar,
	subscriptions: Mutex<SubscriptionSet>,
	injection_added: EventHub<InjectionAddEvent>,
	injection_removed: EventHub<InjectionRemoveEvent>,
	lifecycle: Mutex<Lifecycle>,
}

impl Session {
	/// Builds the session's controllers in dependency order.
	pub fn new(options: SessionOptions, host: SessionHost) -> Self {
		let SessionOptions {
			guid,
			transports,
			default_sidebar_apps,
			event_capacity,
		} = options;

		let scope = Arc::new(Scope::new(guid.clone()));
		let stream = Arc::new(StreamController::new(guid.clone(), transports.clone(), Arc::clone(&scope), Arc::clone(&host.backend)));
		let search = Arc::new(SearchController::new(
			guid.clone(),
			transports.clone(),
			stream.output(),
			Arc::clone(&scope),
			Arc::clone(&host.backend),
		));
		let map = MapController::new(guid.clone(), Arc::clone(&search), Arc::clone(&stream));
		let states = StatesController::new(guid.clone());

		let sidebar: SharedSidebar = Arc::new(Mutex::new(None));
		let mut subscriptions = SubscriptionSet::new();
		subscriptions.insert(HOTKEY_SUBSCRIPTION, {
			let sidebar = Arc::clone(&sidebar);
			let layout = Arc::clone(&host.layout);
			let guid = guid.clone();
			host.hotkeys.open_search_filters().subscribe(move |_| {
				layout.sidebar_max();
				match sidebar.lock().as_mut() {
					Some(tabs) => {
						if !activate_search_tab(tabs) {
							debug!(target = "lv.session", guid = %guid, "no search tab to open");
						}
					}
					None => debug!(target = "lv.session", guid = %guid, "search hotkey before sidebar was built"),
				}
			})
		});

		debug!(target = "lv.session", guid = %guid, transports = ?transports, "session created");
		Self {
			guid,
			transports,
			default_apps: default_sidebar_apps,
			host,
			scope,
			stream,
			search,
			map,
			states,
			viewport: ViewportEvents::new(),
			sidebar,
			subscriptions: Mutex::new(subscriptions),
			injection_added: EventHub::new(event_capacity),
			injection_removed: EventHub::new(event_capacity),
			lifecycle: Mutex::new(Lifecycle::Created),
		}
	}

	/// Opens the backend stream, announces the session to plugins and builds the sidebar.
	///
	/// Single attempt: on failure the session becomes [`Lifecycle::Failed`].
	pub async fn init(&self) -> Result<()> {
		self.transition("init", &[Lifecycle::Created], Lifecycle::Initializing)?;

		if let Err(source) = self.stream.init().await {
			self.set_lifecycle(Lifecycle::Failed);
			let err = SessionError::Init {
				guid: self.guid.clone(),
				source: Box::new(source),
			};
			error!(target = "lv.session", guid = %self.guid, error = %err, "session init failed");
			return Err(err);
		}

		self.host.plugins.on_session_open(&self.guid);
		self.update_sidebar();
		self.set_lifecycle(Lifecycle::Active);
		info!(target = "lv.session", guid = %self.guid, "session initialized");
		Ok(())
	}

	/// Replaces the sidebar with default apps followed by plugin tabs.
	pub fn rebuild_sidebar(&self) -> Result<()> {
		self.ensure_active("rebuild sidebar")?;
		self.update_sidebar();
		Ok(())
	}

	/// Announces `injection` to current output-injection observers.
	pub fn add_output_injection(&self, injection: ComponentInjection, kind: ViewKind) -> Result<()> {
		self.ensure_active("add output injection")?;
		self.injection_added.publish(InjectionAddEvent { injection, kind });
		Ok(())
	}

	/// Announces removal of injection `id` to current observers.
	pub fn remove_output_injection(&self, id: impl Into<String>, kind: ViewKind) -> Result<()> {
		self.ensure_active("remove output injection")?;
		self.injection_removed.publish(InjectionRemoveEvent { id: id.into(), kind });
		Ok(())
	}

	pub fn on_output_injection_add(&self) -> broadcast::Receiver<InjectionAddEvent> {
		self.injection_added.subscribe()
	}

	pub fn on_output_injection_remove(&self) -> broadcast::Receiver<InjectionRemoveEvent> {
		self.injection_removed.subscribe()
	}

	/// Source ids announced by the stream.
	pub fn on_source_changed(&self) -> broadcast::Receiver<u32> {
		self.stream.on_source_changed()
	}

	/// Injections every transport plugin contributes for `kind`, keyed by plugin name.
	pub fn output_injections(&self, kind: ViewKind) -> Result<BTreeMap<String, ComponentInjection>> {
		self.ensure_active("query output injections")?;

		let mut injections = BTreeMap::new();
		for plugin in self.transport_plugins() {
			let Some(factory) = factory_for(&plugin, kind) else {
				continue;
			};
			let mut inputs = Inputs::new();
			inputs.insert("ipc".to_string(), tab_input(&self.guid, &plugin.name, "ipc", &plugin.ipc));
			inputs.insert("session".to_string(), Value::String(self.guid.clone()));
			injections.insert(
				plugin.name.clone(),
				ComponentInjection {
					id: ids::guid(),
					factory: factory.clone(),
					inputs,
				},
			);
		}
		Ok(injections)
	}

	/// Adds a tab to the sidebar and returns its guid, generating one when absent.
	pub fn add_sidebar_app(&self, app: SidebarApp) -> Result<String> {
		self.ensure_active("add sidebar app")?;
		let guid = app.guid.unwrap_or_else(ids::guid);
		let tab = SidebarTab {
			guid: guid.clone(),
			name: app.name,
			active: app.active,
			closable: app.closable,
			content: TabContent {
				factory: app.component,
				resolved: false,
				inputs: app.inputs,
			},
		};
		self.with_sidebar(|tabs| tabs.add(tab))??;
		Ok(guid)
	}

	pub fn has_sidebar_tab(&self, guid: &str) -> Result<bool> {
		self.ensure_active("query sidebar")?;
		self.with_sidebar(|tabs| tabs.has(guid))
	}

	/// Activates tab `guid`; returns `false` when there is no such tab.
	pub fn open_sidebar_tab(&self, guid: &str) -> Result<bool> {
		self.ensure_active("open sidebar tab")?;
		self.with_sidebar(|tabs| tabs.set_active(guid))
	}

	/// Removes tab `guid`; returns `false` when there is no such tab.
	pub fn remove_sidebar_app(&self, guid: &str) -> Result<bool> {
		self.ensure_active("remove sidebar app")?;
		self.with_sidebar(|tabs| tabs.remove(guid).is_some())
	}

	/// Drops the raw content of the stream and its bookmarks.
	///
	/// Backend failures are returned unchanged.
	pub async fn reset_session_content(&self) -> Result<()> {
		self.ensure_active("reset session content")?;
		self.host.backend.request(StreamResetRequest { guid: self.guid.clone() }).await?;
		self.stream.bookmarks().reset();
		debug!(target = "lv.session", guid = %self.guid, "session content reset");
		Ok(())
	}

	/// Tells plugins this session became the visible one.
	pub fn set_active(&self) -> Result<()> {
		self.ensure_active("set active")?;
		self.host.plugins.on_session_change(&self.guid);
		Ok(())
	}

	/// Releases the backend stream, then every local resource.
	///
	/// If the backend refuses (or cannot be reached) nothing local is torn down
	/// and the session moves to [`Lifecycle::DestroyFailed`], from which
	/// `destroy` may be called again.
	pub async fn destroy(&self) -> Result<()> {
		self.transition("destroy", &[Lifecycle::Active, Lifecycle::DestroyFailed], Lifecycle::Destroying)?;

		let released = self.subscriptions.lock().unsubscribe_all();
		debug!(target = "lv.session", guid = %self.guid, released, "subscriptions released");

		let response = match self.host.backend.request(StreamRemoveRequest { guid: self.guid.clone() }).await {
			Ok(response) => response,
			Err(source) => {
				return Err(self.destroy_failed(SessionError::Transport {
					guid: self.guid.clone(),
					source,
				}));
			}
		};
		if let Some(message) = response.error {
			return Err(self.destroy_failed(SessionError::RemoteRejected {
				guid: self.guid.clone(),
				message,
			}));
		}

		self.host.plugins.on_session_close(&self.guid);
		self.viewport.destroy();
		if let Some(mut tabs) = self.sidebar.lock().take() {
			tabs.clear();
		}
		self.injection_added.close();
		self.injection_removed.close();

		// Current controllers never fail to tear down; the aggregate still reports the first failure.
		let (stream, search, states) = tokio::join!(self.stream.destroy(), self.search.destroy(), self.states.destroy());
		self.set_lifecycle(Lifecycle::Destroyed);
		teardown_outcome(&self.guid, [("stream", stream), ("search", search), ("states", states)])?;

		info!(target = "lv.session", guid = %self.guid, "session destroyed");
		Ok(())
	}

	pub fn guid(&self) -> &str {
		&self.guid
	}

	pub fn transports(&self) -> &[String] {
		&self.transports
	}

	pub fn scope(&self) -> &Arc<Scope> {
		&self.scope
	}

	pub fn stream(&self) -> &StreamController {
		&self.stream
	}

	pub fn bookmarks(&self) -> &Bookmarks {
		self.stream.bookmarks()
	}

	pub fn search(&self) -> &SearchController {
		&self.search
	}

	pub fn map(&self) -> &MapController {
		&self.map
	}

	pub fn states(&self) -> &StatesController {
		&self.states
	}

	pub fn viewport(&self) -> &ViewportEvents {
		&self.viewport
	}

	/// Snapshot of the sidebar tabs; `None` when no sidebar exists.
	pub fn sidebar_tabs(&self) -> Option<Vec<SidebarTab>> {
		self.sidebar.lock().as_ref().map(|tabs| tabs.tabs().to_vec())
	}

	pub fn lifecycle(&self) -> Lifecycle {
		*self.lifecycle.lock()
	}

	fn update_sidebar(&self) {
		let mut tabs = SidebarTabs::new();

		for (index, app) in self.default_apps.iter().enumerate() {
			let mut inputs = app.inputs.clone();
			inputs.insert("session".to_string(), Value::String(self.guid.clone()));
			let tab = SidebarTab {
				guid: app.guid.clone().unwrap_or_else(ids::guid),
				name: app.name.clone(),
				active: index == 0,
				closable: app.closable,
				content: TabContent {
					factory: app.component.clone(),
					resolved: false,
					inputs,
				},
			};
			if let Err(e) = tabs.add(tab) {
				warn!(target = "lv.session", guid = %self.guid, error = %e, "skipping default sidebar app");
			}
		}

		for plugin in self.transport_plugins() {
			let Some(factory) = factory_for(&plugin, ViewKind::SidebarVertical) else {
				continue;
			};
			let mut inputs = Inputs::new();
			inputs.insert("session".to_string(), Value::String(self.guid.clone()));
			inputs.insert("api".to_string(), tab_input(&self.guid, &plugin.name, "api", (self.host.api_resolver)(plugin.id)));
			inputs.insert("sessions".to_string(), tab_input(&self.guid, &plugin.name, "sessions", &plugin.sessions));
			let tab = SidebarTab {
				guid: ids::guid(),
				name: plugin.name.clone(),
				active: false,
				closable: false,
				content: TabContent {
					factory: factory.clone(),
					resolved: true,
					inputs,
				},
			};
			if let Err(e) = tabs.add(tab) {
				warn!(target = "lv.session", guid = %self.guid, plugin = %plugin.name, error = %e, "skipping plugin sidebar tab");
			}
		}

		let count = tabs.len();
		let mut sidebar = self.sidebar.lock();
		if let Some(previous) = sidebar.as_mut() {
			previous.clear();
		}
		*sidebar = Some(tabs);
		debug!(target = "lv.session", guid = %self.guid, tabs = count, "sidebar rebuilt");
	}

	/// Known transport plugins in precedence order; unknown names are warned about and skipped.
	fn transport_plugins(&self) -> Vec<Arc<PluginData>> {
		self.transports
			.iter()
			.filter_map(|name| {
				let plugin = self.host.plugins.plugin(name);
				if plugin.is_none() {
					warn!(target = "lv.session", guid = %self.guid, plugin = %name, "plugin is defined as transport, but doesn't exist in storage");
				}
				plugin
			})
			.collect()
	}

	fn with_sidebar<T>(&self, f: impl FnOnce(&mut SidebarTabs) -> T) -> Result<T> {
		match self.sidebar.lock().as_mut() {
			Some(tabs) => Ok(f(tabs)),
			None => Err(SessionError::Sidebar(format!("session \"{}\" has no sidebar", self.guid))),
		}
	}

	fn destroy_failed(&self, err: SessionError) -> SessionError {
		self.set_lifecycle(Lifecycle::DestroyFailed);
		warn!(target = "lv.session", guid = %self.guid, error = %err, "session destroy aborted");
		err
	}

	fn ensure_active(&self, operation: &'static str) -> Result<()> {
		let state = self.lifecycle();
		if state == Lifecycle::Active {
			return Ok(());
		}
		Err(self.invalid_state(operation, state))
	}

	fn transition(&self, operation: &'static str, from: &[Lifecycle], to: Lifecycle) -> Result<()> {
		let mut lifecycle = self.lifecycle.lock();
		if !from.contains(&*lifecycle) {
			let state = *lifecycle;
			drop(lifecycle);
			return Err(self.invalid_state(operation, state));
		}
		*lifecycle = to;
		Ok(())
	}

	fn set_lifecycle(&self, state: Lifecycle) {
		*self.lifecycle.lock() = state;
	}

	fn invalid_state(&self, operation: &'static str, state: Lifecycle) -> SessionError {
		debug!(target = "lv.session", guid = %self.guid, operation, %state, "operation rejected");
		SessionError::InvalidState {
			guid: self.guid.clone(),
			operation,
			state,
		}
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("guid", &self.guid)
			.field("transports", &self.transports)
			.field("lifecycle", &self.lifecycle())
			.finish_non_exhaustive()
	}
}

/// Serializes a plugin-provided input; `null` (with a warning) when that fails.
fn tab_input(guid: &str, plugin: &str, field: &'static str, value: impl Serialize) -> Value {
	serde_json::to_value(value).unwrap_or_else(|e| {
		warn!(target = "lv.session", guid = %guid, plugin = %plugin, field, error = %e, "plugin input not serializable");
		Value::Null
	})
}

/// Logs every failed controller teardown and returns the first one.
fn teardown_outcome(guid: &str, outcomes: [(&'static str, Result<()>); 3]) -> Result<()> {
	let mut first = None;
	for (controller, outcome) in outcomes {
		if let Err(e) = outcome {
			warn!(target = "lv.session", guid = %guid, controller, error = %e, "controller teardown failed");
			first.get_or_insert(e);
		}
	}
	first.map_or(Ok(()), Err)
}

fn activate_search_tab(tabs: &mut SidebarTabs) -> bool {
	if tabs.set_active(SEARCH_TAB) {
		return true;
	}
	let by_name = tabs.tabs().iter().find(|tab| tab.name == SEARCH_TAB).map(|tab| tab.guid.clone());
	by_name.is_some_and(|guid| tabs.set_active(&guid))
}
