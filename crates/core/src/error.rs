//! Error types for session orchestration.

use crate::session::Lifecycle;

/// Result alias used throughout `lv`.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures surfaced by a [`Session`](crate::Session) and the controllers it owns.
///
/// Every variant raised on behalf of a session carries its guid so callers can
/// report which session failed without extra context.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	/// Operation attempted outside the lifecycle state that permits it.
	#[error("Session \"{guid}\": cannot {operation} while {state}")]
	InvalidState {
		guid: String,
		operation: &'static str,
		state: Lifecycle,
	},

	/// Stream initialization failed; the session is unusable.
	#[error("Fail to init session \"{guid}\": {source}")]
	Init {
		guid: String,
		#[source]
		source: Box<SessionError>,
	},

	/// The backend answered with an explicit `error` field.
	#[error("Fail to destroy session \"{guid}\" due error: {message}")]
	RemoteRejected { guid: String, message: String },

	/// The backend channel failed to deliver a request or its response.
	#[error("Fail to destroy session \"{guid}\" due IPC error: {source}")]
	Transport {
		guid: String,
		#[source]
		source: lv_runtime::Error,
	},

	/// A controller owned by the session rejected its own init/destroy/request.
	#[error("Session \"{guid}\": {subsystem} failed: {message}")]
	Subsystem {
		subsystem: &'static str,
		guid: String,
		message: String,
	},

	/// The sidebar registry refused a mutation.
	#[error("Sidebar error: {0}")]
	Sidebar(String),

	/// Backend channel error propagated unchanged.
	#[error(transparent)]
	Backend(#[from] lv_runtime::Error),

	/// Session options could not be loaded.
	#[error("Invalid session options: {0}")]
	Config(String),
}

impl SessionError {
	pub(crate) fn subsystem(subsystem: &'static str, guid: &str, message: impl Into<String>) -> Self {
		Self::Subsystem {
			subsystem,
			guid: guid.to_string(),
			message: message.into(),
		}
	}

	/// Whether the failure came from the backend (explicit rejection or channel failure).
	pub fn is_backend(&self) -> bool {
		match self {
			Self::RemoteRejected { .. } | Self::Transport { .. } | Self::Backend(_) => true,
			Self::Init { source, .. } => source.is_backend(),
			_ => false,
		}
	}
}
