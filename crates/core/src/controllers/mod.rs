//! Controllers owned by a session.

mod bookmarks;
mod map;
mod search;
mod states;
mod stream;

pub use bookmarks::{Bookmarks, BookmarksEvent};
pub use map::{MapController, MapState};
pub use search::{SCOPE_FILTERS_KEY, SearchController, SearchEvent, SearchResults};
pub use states::StatesController;
pub use stream::{OutputStream, SCOPE_SOURCE_KEY, StreamController};
