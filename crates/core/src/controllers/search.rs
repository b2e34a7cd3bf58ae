//! Search over a session's stream.
//!
//! Matching happens in the backend; this controller only sends the active
//! filters and keeps the latest set of matched rows.

use std::sync::Arc;

use lv_protocol::{SearchFilter, SearchRequest};
use lv_runtime::Connection;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use super::stream::OutputStream;
use crate::error::{Result, SessionError};
use crate::events::{DEFAULT_HUB_CAPACITY, EventHub};
use crate::ids;
use crate::scope::Scope;

/// Scope key holding the filters of the latest search.
pub const SCOPE_FILTERS_KEY: &str = "search.filters";

/// Outcome of the latest search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
	pub request_id: String,
	pub filters: Vec<SearchFilter>,
	/// Matched stream rows, ascending.
	pub matches: Vec<u64>,
	/// Stream row count when the results arrived.
	pub stream_rows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
	Updated { request_id: String, matches: usize },
	Dropped,
}

pub struct SearchController {
	guid: String,
	transports: Vec<String>,
	output: Arc<OutputStream>,
	scope: Arc<Scope>,
	backend: Arc<Connection>,
	results: Mutex<Option<SearchResults>>,
	events: EventHub<SearchEvent>,
}

impl SearchController {
	pub fn new(guid: impl Into<String>, transports: Vec<String>, output: Arc<OutputStream>, scope: Arc<Scope>, backend: Arc<Connection>) -> Self {
		Self {
			guid: guid.into(),
			transports,
			output,
			scope,
			backend,
			results: Mutex::new(None),
			events: EventHub::new(DEFAULT_HUB_CAPACITY),
		}
	}

	/// Runs `filters` against the stream and stores the matches.
	pub async fn search(&self, filters: Vec<SearchFilter>) -> Result<SearchResults> {
		if filters.is_empty() {
			return Err(SessionError::subsystem("search", &self.guid, "no filters given"));
		}

		let request_id = ids::guid();
		let response = self
			.backend
			.request(SearchRequest {
				guid: self.guid.clone(),
				request_id: request_id.clone(),
				filters: filters.clone(),
			})
			.await?;
		if let Some(error) = response.error {
			return Err(SessionError::subsystem("search", &self.guid, error));
		}

		let mut matches = response.matches;
		matches.sort_unstable();
		matches.dedup();

		let results = SearchResults {
			request_id,
			filters,
			matches,
			stream_rows: self.output.rows(),
		};
		debug!(target = "lv.search", guid = %self.guid, request_id = %results.request_id, matches = results.matches.len(), "search finished");
		self.scope.set(SCOPE_FILTERS_KEY, &results.filters)?;
		*self.results.lock() = Some(results.clone());
		self.events.publish(SearchEvent::Updated {
			request_id: results.request_id.clone(),
			matches: results.matches.len(),
		});
		Ok(results)
	}

	pub fn results(&self) -> Option<SearchResults> {
		self.results.lock().clone()
	}

	/// Matched rows of the latest search; empty when there is none.
	pub fn matches(&self) -> Vec<u64> {
		self.results.lock().as_ref().map(|results| results.matches.clone()).unwrap_or_default()
	}

	/// Forgets the latest results and filters.
	pub fn drop_results(&self) {
		let had_results = self.results.lock().take().is_some();
		self.scope.remove(SCOPE_FILTERS_KEY);
		if had_results {
			self.events.publish(SearchEvent::Dropped);
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
		self.events.subscribe()
	}

	pub fn transports(&self) -> &[String] {
		&self.transports
	}

	pub async fn destroy(&self) -> Result<()> {
		self.drop_results();
		self.events.close();
		debug!(target = "lv.search", guid = %self.guid, "search destroyed");
		Ok(())
	}
}
