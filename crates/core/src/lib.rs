//! Per-session orchestration for the log viewer.
//!
//! A [`Session`] is one opened log source. It owns the controllers that
//! follow the backend stream ([`StreamController`]), run searches
//! ([`SearchController`]), summarize matches ([`MapController`]) and keep view
//! state ([`StatesController`]), plus the sidebar tab registry and the output
//! injection relay plugins use to extend the UI.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lv::{Hotkeys, PluginRegistry, Session, SessionHost, SessionOptions, SidebarApp};
//! use lv_runtime::{BackendProcess, Connection};
//!
//! let (_process, parts) = BackendProcess::spawn("lv-indexer", ["--stdio"])?;
//! let backend = Arc::new(Connection::new(parts));
//! tokio::spawn({
//!     let backend = Arc::clone(&backend);
//!     async move { backend.run().await }
//! });
//!
//! let host = SessionHost::new(backend, Arc::new(PluginRegistry::new()), Hotkeys::new(), layout, resolver);
//! let options = SessionOptions::new("session-1")
//!     .with_transports(["dlt"])
//!     .with_default_sidebar_app(SidebarApp::new("Search", "search-filters").with_guid("search"));
//!
//! let session = Session::new(options, host);
//! session.init().await?;
//! // ...
//! session.destroy().await?;
//! ```

pub mod controllers;
pub mod error;
pub mod events;
pub mod host;
pub mod ids;
pub mod options;
pub mod scope;
pub mod session;
pub mod sidebar;
pub mod viewport;
pub mod views;

pub use controllers::{Bookmarks, BookmarksEvent, MapController, MapState, OutputStream, SearchController, SearchEvent, SearchResults, StatesController, StreamController};
pub use error::{Result, SessionError};
pub use events::{EventHub, Signal, Subscription, SubscriptionSet};
pub use host::{Hotkeys, Layout, PluginApi, PluginApiResolver, PluginData, PluginHost, PluginId, PluginIpc, PluginRegistry, PluginSessions, SessionHost, SessionNotification, factory_for};
pub use lv_protocol::SearchFilter;
pub use options::SessionOptions;
pub use scope::Scope;
pub use session::{Lifecycle, SEARCH_TAB, Session};
pub use sidebar::{SidebarApp, SidebarTab, SidebarTabs, TabContent};
pub use viewport::{ViewportEvent, ViewportEvents};
pub use views::{ComponentFactory, ComponentInjection, InjectionAddEvent, InjectionRemoveEvent, Inputs, ViewKind};
