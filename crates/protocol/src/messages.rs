//! Request/response pairs understood by the backend.

use serde::{Deserialize, Serialize};

use crate::envelope::{Request, Response};

/// Opens a backend stream for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamAddRequest {
	pub guid: String,
	/// Transport plugins feeding the stream, in precedence order.
	pub transports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamAddResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Releases the backend stream owned by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRemoveRequest {
	pub guid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRemoveResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Drops the raw content of a session's stream, keeping the stream itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResetRequest {
	pub guid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResetResponse {}

/// Fetches rows `start..end` of a session's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunkRequest {
	pub guid: String,
	pub start: u64,
	pub end: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunkResponse {
	#[serde(default)]
	pub start: u64,
	#[serde(default)]
	pub end: u64,
	#[serde(default)]
	pub rows: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// One search filter as understood by the backend matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
	pub value: String,
	#[serde(default)]
	pub case_sensitive: bool,
	#[serde(default)]
	pub whole_word: bool,
	#[serde(default)]
	pub regex: bool,
}

impl SearchFilter {
	/// Plain, case-insensitive substring filter.
	pub fn plain(value: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			..Default::default()
		}
	}
}

/// Runs `filters` against a session's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
	pub guid: String,
	pub request_id: String,
	pub filters: Vec<SearchFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	#[serde(default)]
	pub request_id: String,
	/// Stream row positions that matched, ascending.
	#[serde(default)]
	pub matches: Vec<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

macro_rules! request_pair {
	($($request:ident => $response:ident),* $(,)?) => {
		$(
			impl Request for $request {
				const TYPE: &'static str = stringify!($request);
				type Response = $response;
			}

			impl Response for $response {
				const TYPE: &'static str = stringify!($response);
			}
		)*
	};
}

request_pair! {
	StreamAddRequest => StreamAddResponse,
	StreamRemoveRequest => StreamRemoveResponse,
	StreamResetRequest => StreamResetResponse,
	StreamChunkRequest => StreamChunkResponse,
	SearchRequest => SearchResponse,
}
