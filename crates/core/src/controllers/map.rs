//! Overview of where search matches sit in the stream.

use std::sync::Arc;

use super::search::SearchController;
use super::stream::StreamController;

/// Match density across a fixed number of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapState {
	/// Stream row count the state was computed against.
	pub rows: u64,
	/// Number of matches falling into each column.
	pub columns: Vec<u32>,
}

impl MapState {
	/// Indexes of columns holding at least one match.
	pub fn marked(&self) -> impl Iterator<Item = usize> + '_ {
		self.columns.iter().enumerate().filter(|(_, count)| **count > 0).map(|(index, _)| index)
	}
}

pub struct MapController {
	guid: String,
	search: Arc<SearchController>,
	stream: Arc<StreamController>,
}

impl MapController {
	pub fn new(guid: impl Into<String>, search: Arc<SearchController>, stream: Arc<StreamController>) -> Self {
		Self {
			guid: guid.into(),
			search,
			stream,
		}
	}

	pub fn guid(&self) -> &str {
		&self.guid
	}

	/// Buckets the current matches into `columns` equal slices of the stream.
	///
	/// Matches beyond the current row count (stale results) are ignored.
	pub fn state(&self, columns: usize) -> MapState {
		let rows = self.stream.output().rows();
		let mut counts = vec![0u32; columns];
		if columns == 0 || rows == 0 {
			return MapState { rows, columns: counts };
		}

		for row in self.search.matches() {
			if row >= rows {
				continue;
			}
			let column = (u128::from(row) * columns as u128 / u128::from(rows)) as usize;
			counts[column] = counts[column].saturating_add(1);
		}
		MapState { rows, columns: counts }
	}
}
