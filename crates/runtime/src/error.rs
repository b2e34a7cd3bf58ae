//! Error type for the backend channel.

/// Result alias used throughout `lv-runtime`.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the backend channel itself.
///
/// Application-level rejections (a response payload carrying an `error`
/// field) are not represented here; they are part of the response type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Writing to or reading from the transport failed.
	#[error("Transport error: {0}")]
	Transport(String),

	/// The channel closed before a response arrived.
	#[error("Backend channel closed")]
	ChannelClosed,

	/// A frame did not follow the protocol.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// The backend answered with a channel-level error frame.
	#[error("Backend error: {message}")]
	Remote { name: Option<String>, message: String },

	/// The backend process could not be started.
	#[error("Failed to launch backend: {0}")]
	ProcessLaunch(String),

	/// [`Connection::run`](crate::Connection::run) was invoked more than once.
	#[error("Connection message loop is already running")]
	AlreadyRunning,

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Whether the failure happened below the protocol (the message may not have been delivered).
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_) | Self::ChannelClosed | Self::Io(_))
	}
}
