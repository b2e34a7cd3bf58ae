mod common;

use common::{Harness, capture_logs};
use lv::{
	BookmarksEvent, ComponentInjection, Lifecycle, PluginData, SearchFilter, SessionError, SessionNotification, SessionOptions, SidebarApp, SidebarTab,
	ViewKind, ViewportEvent,
};
use serde_json::json;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

fn options(guid: &str) -> SessionOptions {
	SessionOptions::new(guid)
}

/// Tab structure without generated guids.
fn shape(tabs: &[SidebarTab]) -> Vec<(String, bool, bool)> {
	tabs.iter().map(|tab| (tab.name.clone(), tab.active, tab.content.resolved)).collect()
}

#[tokio::test]
async fn plugin_without_sidebar_factory_leaves_only_default_tab() {
	let harness = Harness::new();
	harness.plugins.register(PluginData::new(1, "pluginA").with_factory(ViewKind::OutputBottom, "a-bottom"));

	let session = harness
		.active_session(options("s-main").with_transports(["pluginA"]).with_default_sidebar_app(SidebarApp::new("main", "main-view")))
		.await;

	let tabs = session.sidebar_tabs().expect("sidebar built");
	assert_eq!(tabs.len(), 1);
	assert_eq!(tabs[0].name, "main");
	assert!(tabs[0].active);
	assert!(!tabs[0].content.resolved);
	assert_eq!(tabs[0].content.inputs["session"], "s-main");
	assert_eq!(session.lifecycle(), Lifecycle::Active);
	assert_eq!(harness.requests_of("StreamAddRequest"), 1);
}

#[tokio::test]
async fn plugin_sidebar_tabs_follow_defaults_and_stay_inactive() {
	let harness = Harness::new();
	harness.plugins.register(PluginData::new(4, "dlt").with_factory(ViewKind::SidebarVertical, "dlt-sidebar"));
	harness.plugins.register(PluginData::new(5, "serial").with_factory(ViewKind::SidebarVertical, "serial-sidebar"));

	let session = harness
		.active_session(
			options("s-plugins")
				.with_transports(["serial", "dlt"])
				.with_default_sidebar_app(SidebarApp::new("Search", "search-filters").with_guid("search"))
				.with_default_sidebar_app(SidebarApp::new("Charts", "charts")),
		)
		.await;

	let tabs = session.sidebar_tabs().unwrap();
	assert_eq!(
		shape(&tabs),
		vec![
			("Search".to_string(), true, false),
			("Charts".to_string(), false, false),
			("serial".to_string(), false, true),
			("dlt".to_string(), false, true),
		]
	);
	assert_eq!(tabs[0].guid, "search");
	assert!(!tabs[1].guid.is_empty());

	let dlt = &tabs[3].content.inputs;
	assert_eq!(dlt["session"], "s-plugins");
	assert_eq!(dlt["api"], json!({"pluginId": 4, "session": "s-plugins"}));
	assert_eq!(dlt["sessions"], json!(["s-plugins"]));
}

#[tokio::test]
async fn unknown_transport_is_warned_about_and_skipped() {
	let (logs, _guard) = capture_logs();
	let harness = Harness::new();

	let session = harness
		.active_session(options("s-unknown").with_transports(["ghost"]).with_default_sidebar_app(SidebarApp::new("main", "main-view")))
		.await;

	let tabs = session.sidebar_tabs().unwrap();
	assert_eq!(tabs.len(), 1);
	assert!(tabs.iter().all(|tab| tab.name != "ghost"));

	let output = logs.contents();
	assert!(output.contains("WARN"), "no warning logged:\n{output}");
	assert!(output.contains("ghost"));
}

#[tokio::test]
async fn sidebar_rebuild_is_structurally_idempotent() {
	let harness = Harness::new();
	harness.plugins.register(PluginData::new(4, "dlt").with_factory(ViewKind::SidebarVertical, "dlt-sidebar"));

	let session = harness
		.active_session(
			options("s-rebuild")
				.with_transports(["dlt"])
				.with_default_sidebar_app(SidebarApp::new("main", "main-view").with_guid("main"))
				.with_default_sidebar_app(SidebarApp::new("Search", "search-filters").with_guid("search")),
		)
		.await;
	let first = session.sidebar_tabs().unwrap();

	session.open_sidebar_tab("search").unwrap();
	session.add_sidebar_app(SidebarApp::new("extra", "extra-view")).unwrap();
	session.rebuild_sidebar().unwrap();
	let second = session.sidebar_tabs().unwrap();

	assert_eq!(shape(&first), shape(&second));
	assert_eq!(second[0].guid, "main");
	assert!(second[0].active);
	assert_eq!(second.iter().filter(|tab| tab.active).count(), 1);
}

#[tokio::test]
async fn add_sidebar_app_generates_guid() {
	let harness = Harness::new();
	let session = harness.active_session(options("s-add")).await;

	let guid = session.add_sidebar_app(SidebarApp::new("notes", "notes-view").with_closable(true)).unwrap();
	assert!(!guid.is_empty());
	assert!(session.has_sidebar_tab(&guid).unwrap());

	let explicit = session.add_sidebar_app(SidebarApp::new("pinned", "pinned-view").with_guid("pinned")).unwrap();
	assert_eq!(explicit, "pinned");
	assert!(matches!(
		session.add_sidebar_app(SidebarApp::new("again", "pinned-view").with_guid("pinned")),
		Err(SessionError::Sidebar(_))
	));

	assert!(session.open_sidebar_tab(&guid).unwrap());
	assert!(!session.open_sidebar_tab("missing").unwrap());
	assert!(session.remove_sidebar_app(&guid).unwrap());
	assert!(!session.has_sidebar_tab(&guid).unwrap());
}

#[tokio::test]
async fn output_injections_contain_one_entry_per_capable_plugin() {
	let harness = Harness::new();
	let dlt = harness.plugins.register(PluginData::new(1, "dlt").with_factory(ViewKind::OutputBottom, "dlt-bottom").with_ipc_channel("ipc-dlt"));
	harness.plugins.register(PluginData::new(2, "serial").with_factory(ViewKind::OutputTop, "serial-top"));

	let session = harness.active_session(options("s-inject").with_transports(["dlt", "serial", "missing"])).await;

	let bottom = session.output_injections(ViewKind::OutputBottom).unwrap();
	assert_eq!(bottom.len(), 1);
	let injection = &bottom["dlt"];
	assert_eq!(injection.factory.as_str(), "dlt-bottom");
	assert!(!injection.id.is_empty());
	assert_eq!(injection.inputs["session"], "s-inject");
	assert_eq!(injection.inputs["ipc"], json!({"pluginId": dlt.id, "channel": "ipc-dlt"}));

	let top = session.output_injections(ViewKind::OutputTop).unwrap();
	assert_eq!(top.keys().collect::<Vec<_>>(), vec!["serial"]);
	assert!(session.output_injections(ViewKind::OutputRow).unwrap().is_empty());

	let again = session.output_injections(ViewKind::OutputBottom).unwrap();
	assert_ne!(again["dlt"].id, injection.id);
}

#[tokio::test]
async fn injection_events_reach_current_observers_in_order() {
	let harness = Harness::new();
	let session = harness.active_session(options("s-relay")).await;

	let early = ComponentInjection::new("unseen");
	session.add_output_injection(early, ViewKind::OutputTop).unwrap();

	let mut added = session.on_output_injection_add();
	let mut removed = session.on_output_injection_remove();
	let first = ComponentInjection::new("first");
	let second = ComponentInjection::new("second");
	session.add_output_injection(first.clone(), ViewKind::OutputTop).unwrap();
	session.add_output_injection(second.clone(), ViewKind::OutputBottom).unwrap();
	session.remove_output_injection(first.id.clone(), ViewKind::OutputTop).unwrap();

	let event = added.recv().await.unwrap();
	assert_eq!(event.injection, first);
	assert_eq!(event.kind, ViewKind::OutputTop);
	assert_eq!(added.recv().await.unwrap().injection, second);
	assert!(matches!(added.try_recv(), Err(TryRecvError::Empty)));

	let removal = removed.recv().await.unwrap();
	assert_eq!(removal.id, first.id);
	assert_eq!(removal.kind, ViewKind::OutputTop);
}

#[tokio::test]
async fn rejected_destroy_keeps_local_state() {
	let harness = Harness::new();
	harness.respond_with("StreamRemoveRequest", json!({"error": "locked"}));
	let session = harness
		.active_session(options("s-locked").with_default_sidebar_app(SidebarApp::new("main", "main-view")))
		.await;
	session.states().set("output", json!({"row": 3})).unwrap();

	let err = session.destroy().await.unwrap_err();
	let message = err.to_string();
	assert!(message.contains("s-locked"), "{message}");
	assert!(message.contains("locked"), "{message}");
	assert!(matches!(err, SessionError::RemoteRejected { .. }));

	assert_eq!(session.lifecycle(), Lifecycle::DestroyFailed);
	assert_eq!(session.sidebar_tabs().map(|tabs| tabs.len()), Some(1));
	assert!(session.stream().is_following());
	assert!(!session.viewport().is_destroyed());
	assert_eq!(session.states().keys(), vec!["output"]);
	assert!(harness.hotkeys.open_search_filters().handler_count() == 0);

	harness.respond_with("StreamRemoveRequest", json!({}));
	session.destroy().await.unwrap();
	assert_eq!(session.lifecycle(), Lifecycle::Destroyed);
	assert!(session.sidebar_tabs().is_none());
	assert_eq!(harness.requests_of("StreamRemoveRequest"), 2);
}

#[tokio::test]
async fn destroy_over_closed_channel_is_a_transport_failure() {
	let harness = Harness::new();
	let session = harness.active_session(options("s-closed")).await;

	harness.transport.close();
	while !harness.backend.is_closed() {
		tokio::task::yield_now().await;
	}

	let err = session.destroy().await.unwrap_err();
	assert!(matches!(err, SessionError::Transport { .. }));
	assert!(err.to_string().contains("s-closed"));
	assert!(err.is_backend());
	assert_eq!(session.lifecycle(), Lifecycle::DestroyFailed);
	assert!(session.sidebar_tabs().is_some());
}

#[tokio::test]
async fn successful_destroy_tears_everything_down() {
	let harness = Harness::new();
	let plugin = harness.plugins.register(PluginData::new(9, "dlt"));
	let mut notifications = harness.plugins.subscribe();

	let session = harness
		.active_session(options("s-bye").with_transports(["dlt"]).with_default_sidebar_app(SidebarApp::new("main", "main-view")))
		.await;
	let mut viewport = session.viewport().subscribe();
	let mut added = session.on_output_injection_add();
	session.states().set("output", 1).unwrap();

	session.destroy().await.unwrap();

	assert_eq!(notifications.recv().await.unwrap(), SessionNotification::Opened("s-bye".to_string()));
	assert_eq!(notifications.recv().await.unwrap(), SessionNotification::Closed("s-bye".to_string()));
	assert!(!plugin.sessions.contains("s-bye"));

	assert_eq!(session.lifecycle(), Lifecycle::Destroyed);
	assert!(session.sidebar_tabs().is_none());
	assert!(session.viewport().is_destroyed());
	assert!(matches!(viewport.recv().await, Err(RecvError::Closed)));
	assert!(matches!(added.recv().await, Err(RecvError::Closed)));
	assert!(!session.stream().is_following());
	assert!(session.states().keys().is_empty());
	assert_eq!(harness.hotkeys.open_search_filters().handler_count(), 0);
}

#[tokio::test]
async fn reset_clears_bookmarks_once_and_nothing_else() {
	let harness = Harness::new();
	harness.respond_with("SearchRequest", json!({"matches": [1, 4]}));
	let session = harness.active_session(options("s-reset")).await;

	session.bookmarks().add(3);
	session.bookmarks().add(8);
	session.search().search(vec![SearchFilter::plain("error")]).await.unwrap();
	session.states().set("output", json!({"row": 12})).unwrap();
	let mut bookmark_events = session.bookmarks().subscribe();

	session.reset_session_content().await.unwrap();

	assert!(session.bookmarks().is_empty());
	assert_eq!(bookmark_events.recv().await.unwrap(), BookmarksEvent::Reset);
	assert!(matches!(bookmark_events.try_recv(), Err(TryRecvError::Empty)));

	assert_eq!(session.search().matches(), vec![1, 4]);
	assert_eq!(session.states().get("output"), Some(json!({"row": 12})));
	assert_eq!(session.map().state(2).columns.len(), 2);
	assert_eq!(harness.requests_of("StreamResetRequest"), 1);
}

#[tokio::test]
async fn reset_failure_propagates_and_keeps_bookmarks() {
	let harness = Harness::new();
	let session = harness.active_session(options("s-reset-fail")).await;
	session.bookmarks().add(4);

	harness.fail_with("StreamResetRequest", "reset refused");
	let err = session.reset_session_content().await.unwrap_err();
	assert!(matches!(err, SessionError::Backend(lv_runtime::Error::Remote { .. })), "{err:?}");
	assert_eq!(err.to_string(), "Backend error: reset refused");
	assert_eq!(session.bookmarks().positions(), vec![4]);
	assert_eq!(session.lifecycle(), Lifecycle::Active);

	harness.transport.close();
	while !harness.backend.is_closed() {
		tokio::task::yield_now().await;
	}
	let err = session.reset_session_content().await.unwrap_err();
	assert!(matches!(err, SessionError::Backend(lv_runtime::Error::ChannelClosed)), "{err:?}");
	assert_eq!(err.to_string(), "Backend channel closed");
	assert_eq!(session.bookmarks().positions(), vec![4]);
}

#[tokio::test]
async fn operations_fail_fast_outside_active_state() {
	let harness = Harness::new();
	let session = harness.session(options("s-early"));

	assert!(matches!(session.destroy().await, Err(SessionError::InvalidState { state: Lifecycle::Created, .. })));
	assert!(matches!(session.reset_session_content().await, Err(SessionError::InvalidState { .. })));
	assert!(matches!(session.add_sidebar_app(SidebarApp::new("a", "b")), Err(SessionError::InvalidState { .. })));
	assert!(matches!(session.output_injections(ViewKind::OutputTop), Err(SessionError::InvalidState { .. })));
	assert!(matches!(session.set_active(), Err(SessionError::InvalidState { .. })));
	assert!(session.sidebar_tabs().is_none());
	assert_eq!(harness.requests_of("StreamRemoveRequest"), 0);

	session.init().await.unwrap();
	assert!(matches!(session.init().await, Err(SessionError::InvalidState { state: Lifecycle::Active, .. })));

	session.destroy().await.unwrap();
	assert!(matches!(session.destroy().await, Err(SessionError::InvalidState { state: Lifecycle::Destroyed, .. })));
	assert!(matches!(session.has_sidebar_tab("main"), Err(SessionError::InvalidState { .. })));
	assert!(matches!(
		session.add_output_injection(ComponentInjection::new("late"), ViewKind::OutputTop),
		Err(SessionError::InvalidState { .. })
	));
}

#[tokio::test]
async fn failed_init_builds_no_sidebar() {
	let harness = Harness::new();
	harness.respond_with("StreamAddRequest", json!({"error": "transport not available"}));
	let mut notifications = harness.plugins.subscribe();
	let session = harness.session(options("s-fail").with_default_sidebar_app(SidebarApp::new("main", "main-view")));

	let err = session.init().await.unwrap_err();
	let message = err.to_string();
	assert!(matches!(err, SessionError::Init { .. }));
	assert!(message.contains("s-fail"), "{message}");
	assert!(message.contains("transport not available"), "{message}");

	assert_eq!(session.lifecycle(), Lifecycle::Failed);
	assert!(session.sidebar_tabs().is_none());
	assert!(matches!(notifications.try_recv(), Err(TryRecvError::Empty)));
	assert!(matches!(session.init().await, Err(SessionError::InvalidState { .. })));
}

#[tokio::test]
async fn search_hotkey_maximizes_sidebar_and_opens_search_tab() {
	let harness = Harness::new();
	let session = harness
		.active_session(
			options("s-hotkey")
				.with_default_sidebar_app(SidebarApp::new("main", "main-view"))
				.with_default_sidebar_app(SidebarApp::new("Search", "search-filters").with_guid("search")),
		)
		.await;

	harness.hotkeys.open_search_filters().emit(&());

	assert_eq!(harness.layout.maximized(), 1);
	let tabs = session.sidebar_tabs().unwrap();
	let active: Vec<_> = tabs.iter().filter(|tab| tab.active).map(|tab| tab.guid.as_str()).collect();
	assert_eq!(active, vec!["search"]);
}

#[tokio::test]
async fn set_active_notifies_plugins() {
	let harness = Harness::new();
	let session = harness.active_session(options("s-focus")).await;
	let mut notifications = harness.plugins.subscribe();

	session.set_active().unwrap();

	assert_eq!(notifications.recv().await.unwrap(), SessionNotification::Changed("s-focus".to_string()));
}

#[tokio::test]
async fn stream_events_drive_source_changes_and_map() {
	let harness = Harness::new();
	harness.respond_with("SearchRequest", json!({"matches": [0, 1, 50, 99]}));
	let session = harness.active_session(options("s-map")).await;
	let mut sources = session.on_source_changed();
	let mut rows = session.stream().output().subscribe();

	harness.transport.inject_event("StreamSourceNew", json!({"guid": "s-map", "source": 7}));
	harness.transport.inject_event("StreamUpdated", json!({"guid": "s-map", "rows": 100}));
	assert_eq!(sources.recv().await.unwrap(), 7);
	assert_eq!(rows.recv().await.unwrap(), 100);
	assert_eq!(session.scope().get_as::<u32>("stream.source"), Some(7));

	session.search().search(vec![SearchFilter::plain("warn")]).await.unwrap();
	let map = session.map().state(4);
	assert_eq!(map.rows, 100);
	assert_eq!(map.columns, vec![2, 0, 1, 1]);
	assert_eq!(map.marked().collect::<Vec<_>>(), vec![0, 2, 3]);
}

#[tokio::test]
async fn viewport_events_are_shared() {
	let harness = Harness::new();
	let session = harness.active_session(options("s-viewport")).await;
	let mut first = session.viewport().subscribe();
	let mut second = session.viewport().subscribe();

	session.viewport().emit(ViewportEvent::RowSelected { row: 12 });

	assert_eq!(first.recv().await.unwrap(), ViewportEvent::RowSelected { row: 12 });
	assert_eq!(second.recv().await.unwrap(), ViewportEvent::RowSelected { row: 12 });
}
