//! Shared fixtures for session integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lv::{Hotkeys, Layout, PluginApi, PluginRegistry, Session, SessionHost, SessionOptions};
use lv_runtime::{Connection, FakeTransportBuilder, FakeTransportController};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing_subscriber::fmt::MakeWriter;

/// Layout that counts how often the sidebar was maximized.
#[derive(Default)]
pub struct CountingLayout {
	maximized: AtomicUsize,
}

impl CountingLayout {
	pub fn maximized(&self) -> usize {
		self.maximized.load(Ordering::SeqCst)
	}
}

impl Layout for CountingLayout {
	fn sidebar_max(&self) {
		self.maximized.fetch_add(1, Ordering::SeqCst);
	}
}

/// Fake backend answering every request with a scripted (or empty) payload.
pub struct Harness {
	pub backend: Arc<Connection>,
	pub transport: Arc<FakeTransportController>,
	pub plugins: Arc<PluginRegistry>,
	pub hotkeys: Hotkeys,
	pub layout: Arc<CountingLayout>,
	responses: Arc<Mutex<HashMap<String, Value>>>,
	failures: Arc<Mutex<HashMap<String, String>>>,
	requests: Arc<Mutex<Vec<Value>>>,
}

impl Harness {
	pub fn new() -> Self {
		let (parts, controller) = FakeTransportBuilder::new().build();
		let backend = Arc::new(Connection::new(parts));
		let transport = Arc::new(controller);
		let responses: Arc<Mutex<HashMap<String, Value>>> = Arc::default();
		let failures: Arc<Mutex<HashMap<String, String>>> = Arc::default();
		let requests: Arc<Mutex<Vec<Value>>> = Arc::default();

		tokio::spawn({
			let backend = Arc::clone(&backend);
			async move { backend.run().await }
		});
		tokio::spawn({
			let transport = Arc::clone(&transport);
			let responses = Arc::clone(&responses);
			let failures = Arc::clone(&failures);
			let requests = Arc::clone(&requests);
			async move {
				while let Some(sent) = transport.next_sent().await {
					let id = sent["id"].as_u64().unwrap_or_default() as u32;
					let kind = sent["type"].as_str().unwrap_or_default().to_string();
					requests.lock().push(sent);
					if let Some(message) = failures.lock().get(&kind).cloned() {
						transport.inject_error(id, &message);
						continue;
					}
					let payload = responses.lock().get(&kind).cloned().unwrap_or_else(|| json!({}));
					transport.inject_response(id, &kind.replace("Request", "Response"), payload);
				}
			}
		});

		Self {
			backend,
			transport,
			plugins: Arc::new(PluginRegistry::new()),
			hotkeys: Hotkeys::new(),
			layout: Arc::new(CountingLayout::default()),
			responses,
			failures,
			requests,
		}
	}

	/// Answers every later request of type `request` with `payload`.
	pub fn respond_with(&self, request: &str, payload: Value) {
		self.responses.lock().insert(request.to_string(), payload);
	}

	/// Answers every later request of type `request` with a remote error frame.
	pub fn fail_with(&self, request: &str, message: &str) {
		self.failures.lock().insert(request.to_string(), message.to_string());
	}

	/// Number of requests of type `request` answered so far.
	pub fn requests_of(&self, request: &str) -> usize {
		self.requests.lock().iter().filter(|sent| sent["type"] == request).count()
	}

	pub fn host(&self, guid: &str) -> SessionHost {
		let guid = guid.to_string();
		SessionHost::new(
			Arc::clone(&self.backend),
			self.plugins.clone(),
			self.hotkeys.clone(),
			self.layout.clone(),
			Arc::new(move |plugin_id| PluginApi {
				plugin_id,
				session: guid.clone(),
			}),
		)
	}

	pub fn session(&self, options: SessionOptions) -> Session {
		let host = self.host(&options.guid);
		Session::new(options, host)
	}

	/// Builds and initializes a session.
	pub async fn active_session(&self, options: SessionOptions) -> Session {
		let session = self.session(options);
		session.init().await.expect("session init");
		session
	}
}

/// Buffer collecting formatted log lines.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.0.lock()).into_owned()
	}
}

impl io::Write for LogCapture {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.0.lock().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl<'a> MakeWriter<'a> for LogCapture {
	type Writer = LogCapture;

	fn make_writer(&'a self) -> Self::Writer {
		self.clone()
	}
}

/// Routes this thread's logs into a [`LogCapture`] until the guard drops.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
	let capture = LogCapture::default();
	let subscriber = tracing_subscriber::fmt()
		.with_writer(capture.clone())
		.with_ansi(false)
		.with_max_level(tracing::Level::DEBUG)
		.finish();
	let guard = tracing::subscriber::set_default(subscriber);
	(capture, guard)
}
